//! Customer commands: catalogue, orders, checkout.

use std::path::Path;

use boighor_core::{AddressId, CatalogueId, Language, OrderId, PriceSort, ProductId};
use boighor_storefront::Storefront;
use boighor_storefront::services::{PaymentOutcome, ProductQuery};

use super::CliError;
use super::output;

/// Filters given on the command line.
pub struct ListFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub sort: Option<PriceSort>,
    pub page: u32,
    pub lang: Option<Language>,
}

impl ListFilters {
    fn into_query(self, default_language: Language) -> ProductQuery {
        ProductQuery {
            search: self.search.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            price_sort: self.sort,
            page: self.page.max(1),
            language: self.lang.unwrap_or(default_language),
        }
    }
}

pub async fn list_products(storefront: &Storefront, filters: ListFilters) -> Result<(), CliError> {
    let query = filters.into_query(storefront.config().language);
    let listing = storefront
        .products()
        .navigate(&query.to_query_string())
        .await?;
    output::listing(&listing, query.page, query.language);
    Ok(())
}

pub async fn show_product(storefront: &Storefront, id: &ProductId) -> Result<(), CliError> {
    let detail = storefront.products().fetch_product(id).await?;
    output::product_detail(&detail, storefront.config().language);
    Ok(())
}

pub async fn suggest(storefront: &Storefront, text: &str) -> Result<(), CliError> {
    let suggestions = storefront
        .products()
        .suggest(text)
        .await?
        .unwrap_or_default();
    output::suggestions(&suggestions, storefront.config().language);
    Ok(())
}

pub async fn addresses(storefront: &Storefront) -> Result<(), CliError> {
    let addresses = storefront.addresses().list().await?;
    output::addresses(&addresses);
    Ok(())
}

pub async fn list_orders(storefront: &Storefront) -> Result<(), CliError> {
    let orders = storefront.orders().list().await?;
    output::orders(&orders);
    Ok(())
}

pub async fn show_order(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    let order = storefront.orders().get(id).await?;
    output::order(&order, storefront.config().language);
    Ok(())
}

pub async fn cancel_order(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    let orders = storefront.orders();
    let order = orders.get(id).await?;
    let cancelled = orders.cancel(&order).await?;
    output::order(&cancelled, storefront.config().language);
    Ok(())
}

pub async fn checkout_cod(storefront: &Storefront, address: &str) -> Result<(), CliError> {
    storefront
        .checkout()
        .place_cod(&AddressId::new(address))
        .await?;
    Ok(())
}

pub async fn checkout_online(storefront: &Storefront, address: &str) -> Result<(), CliError> {
    let url = storefront
        .checkout()
        .start_online(&AddressId::new(address))
        .await?;
    output::line(format!("Complete your payment at: {url}"));
    output::line("Then run `bg-cli checkout verify <session_id>`.");
    Ok(())
}

pub async fn verify_payment(storefront: &Storefront, session_id: &str) -> Result<(), CliError> {
    match storefront.checkout().verify_payment(Some(session_id)).await? {
        PaymentOutcome::Verified => output::line("Payment confirmed."),
        PaymentOutcome::AlreadyVerified => output::line("Payment was already confirmed."),
    }
    Ok(())
}

pub async fn list_catalogues(storefront: &Storefront) -> Result<(), CliError> {
    let catalogues = storefront.catalogues().list().await?;
    output::catalogues(&catalogues);
    Ok(())
}

pub async fn download_catalogue(
    storefront: &Storefront,
    id: &str,
    out: &Path,
) -> Result<(), CliError> {
    let shelf = storefront.catalogues();
    let id = CatalogueId::new(id);
    let catalogue = shelf
        .list()
        .await?
        .into_iter()
        .find(|catalogue| catalogue.id == id)
        .ok_or_else(|| CliError::NotFound(format!("No catalogue with id {id}")))?;

    let bytes = shelf.download(&catalogue).await?;
    tokio::fs::write(out, &bytes)
        .await
        .map_err(|source| CliError::Write {
            path: out.display().to_string(),
            source,
        })?;

    output::line(format!("Saved {} ({} bytes) to {}", catalogue.title, bytes.len(), out.display()));
    Ok(())
}
