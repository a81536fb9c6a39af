//! Product filters and their URL form.
//!
//! The URL query string is the source of truth for what the listing shows,
//! so a [`ProductQuery`] must survive a round trip through it. Keys are
//! `search`, `category`, `author`, `price`, `page` and `lang`.

use url::form_urlencoded;

use boighor_core::{Language, PriceSort};

use crate::api::ProductListParams;

/// Filters, sort and page of the product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: String,
    pub category: String,
    pub author: String,
    pub price_sort: Option<PriceSort>,
    /// 1-indexed.
    pub page: u32,
    pub language: Language,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: String::new(),
            author: String::new(),
            price_sort: None,
            page: 1,
            language: Language::En,
        }
    }
}

/// One change to the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryChange {
    Search(String),
    Category(String),
    Author(String),
    PriceSort(Option<PriceSort>),
    Language(Language),
    Page(u32),
}

impl ProductQuery {
    /// Parse a URL query string (with or without the leading `?`).
    ///
    /// Unknown keys are ignored; a missing, zero or malformed page becomes 1.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => parsed.search = value.into_owned(),
                "category" => parsed.category = value.into_owned(),
                "author" => parsed.author = value.into_owned(),
                "price" => parsed.price_sort = value.parse().ok(),
                "page" => parsed.page = value.parse().ok().filter(|p| *p >= 1).unwrap_or(1),
                "lang" => parsed.language = value.parse().unwrap_or_default(),
                _ => {}
            }
        }

        parsed
    }

    /// Render as a URL query string without the leading `?`.
    ///
    /// Empty filters, page 1 and the default language are left out so the
    /// plain listing has a clean URL.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());

        for (key, value) in [
            ("search", self.search.as_str()),
            ("category", self.category.as_str()),
            ("author", self.author.as_str()),
        ] {
            if !value.is_empty() {
                out.append_pair(key, value);
            }
        }
        if let Some(sort) = self.price_sort {
            out.append_pair("price", sort.as_str());
        }
        if self.page > 1 {
            out.append_pair("page", &self.page.to_string());
        }
        if self.language != Language::default() {
            out.append_pair("lang", self.language.code());
        }

        out.finish()
    }

    /// Apply `change`. Any change other than a page change goes back to
    /// page 1.
    ///
    /// Returns whether the query actually changed.
    pub fn apply(&mut self, change: QueryChange) -> bool {
        let before = self.clone();

        match change {
            QueryChange::Page(page) => {
                self.page = page.max(1);
                return *self != before;
            }
            QueryChange::Search(search) => self.search = search,
            QueryChange::Category(category) => self.category = category,
            QueryChange::Author(author) => self.author = author,
            QueryChange::PriceSort(sort) => self.price_sort = sort,
            QueryChange::Language(language) => self.language = language,
        }

        if *self != before {
            self.page = 1;
            true
        } else {
            false
        }
    }

    /// Drop every filter and the sort, keeping the language.
    pub fn clear_filters(&mut self) {
        *self = Self {
            language: self.language,
            ..Self::default()
        };
    }

    /// Parameters for the listing endpoint.
    #[must_use]
    pub fn to_params(&self) -> ProductListParams {
        ProductListParams {
            search: self.search.clone(),
            category: self.category.clone(),
            author: self.author.clone(),
            sort_by_price: self
                .price_sort
                .map(|sort| sort.as_str().to_string())
                .unwrap_or_default(),
            page: self.page,
            lang: self.language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered() -> ProductQuery {
        ProductQuery {
            search: "pather panchali".to_string(),
            category: "Novel".to_string(),
            author: "Bibhutibhushan".to_string(),
            price_sort: Some(PriceSort::HighToLow),
            page: 3,
            language: Language::Bn,
        }
    }

    #[test]
    fn test_query_string_round_trip() {
        let query = filtered();
        let rendered = query.to_query_string();

        assert_eq!(
            rendered,
            "search=pather+panchali&category=Novel&author=Bibhutibhushan&price=highToLow&page=3&lang=bn"
        );
        assert_eq!(ProductQuery::from_query_string(&rendered), query);
    }

    #[test]
    fn test_default_query_renders_empty() {
        assert_eq!(ProductQuery::default().to_query_string(), "");
        assert_eq!(ProductQuery::from_query_string(""), ProductQuery::default());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let query = ProductQuery::from_query_string("?page=0&price=cheap&lang=fr&utm_source=x");
        assert_eq!(query.page, 1);
        assert_eq!(query.price_sort, None);
        assert_eq!(query.language, Language::En);

        assert_eq!(ProductQuery::from_query_string("page=two").page, 1);
    }

    #[test]
    fn test_category_change_resets_page() {
        let mut query = filtered();
        assert!(query.apply(QueryChange::Category("Poetry".to_string())));
        assert_eq!(query.page, 1);
        assert_eq!(query.category, "Poetry");
    }

    #[test]
    fn test_page_change_keeps_filters() {
        let mut query = filtered();
        assert!(query.apply(QueryChange::Page(5)));

        let expected = ProductQuery {
            page: 5,
            ..filtered()
        };
        assert_eq!(query, expected);
    }

    #[test]
    fn test_noop_change_keeps_page() {
        let mut query = filtered();
        assert!(!query.apply(QueryChange::Category("Novel".to_string())));
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_clear_filters_keeps_language() {
        let mut query = filtered();
        query.clear_filters();
        assert_eq!(
            query,
            ProductQuery {
                language: Language::Bn,
                ..ProductQuery::default()
            }
        );
    }

    #[test]
    fn test_params_use_backend_names() {
        let params = filtered().to_params();
        assert_eq!(params.sort_by_price, "highToLow");
        assert_eq!(params.page, 3);
        assert_eq!(ProductQuery::default().to_params().sort_by_price, "");
    }
}
