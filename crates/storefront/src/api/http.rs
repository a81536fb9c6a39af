//! `reqwest` implementation of [`Backend`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use boighor_core::{
    AddressId, CartItemId, CatalogueId, Email, Language, OrderId, OrderStatus, OtpCode,
    ProductId,
};

use super::types::{
    Address, AddressInput, CancelOrderResponse, CartAction, CartResponse, Catalogue,
    CatalogueUpload, FileUpload, LastUpdate, LoginRequest, MessageResponse, NewOrderRequest,
    Order, OrderListResponse, PaymentSessionResponse, PaymentVerification, ProductDetailResponse,
    ProductDraft, ProductListParams, ProductListResponse, SalesStats, Suggestion, User,
    VerifyRequest, VerifyResponse,
};
use super::{ApiError, Backend};

/// Header (and cookie) name the backend reads the session credential from.
const TOKEN_HEADER: &str = "token";

/// Retry delay assumed when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for the bookstore backend.
///
/// Cloning is cheap; clones share the connection pool and the credential.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
    /// Session credential installed after OTP verification
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    ///
    /// A path on `base_url` is kept as a prefix for every endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url,
                token: RwLock::new(None),
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether a credential is currently installed.
    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Resolve `path` under the base URL. Absolute URLs pass through.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn endpoint_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Start a request with the credential attached.
    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.token.read().await.as_ref() {
            Some(token) => {
                let token = token.expose_secret();
                builder
                    .header(TOKEN_HEADER, token)
                    .header(reqwest::header::COOKIE, format!("{TOKEN_HEADER}={token}"))
            }
            None => builder,
        }
    }

    /// Send a request, turning non-2xx responses into `ApiError`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, url).await;
        self.json(builder).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, url).await.json(body);
        self.json(builder).await
    }

    async fn multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        form: Form,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, url).await.multipart(form);
        self.json(builder).await
    }
}

/// Map a failed response to an error, reading the message from the body.
///
/// The backend puts human-readable errors in `message`, a few handlers use
/// `error` instead, and proxies may return no JSON at all.
fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"].into_iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned)
            })
        })
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        _ => ApiError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn file_part(file: &FileUpload) -> Result<Part, ApiError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime)?)
}

fn image_parts(mut form: Form, images: &[FileUpload]) -> Result<Form, ApiError> {
    for image in images {
        form = form.part("files", file_part(image)?);
    }
    Ok(form)
}

fn draft_form(draft: &ProductDraft) -> Form {
    let localized = [
        ("title", &draft.title),
        ("description", &draft.description),
        ("category", &draft.category),
        ("author", &draft.author),
    ];

    let mut form = Form::new();
    for (field, value) in localized {
        form = form
            .text(format!("{field}[en]"), value.en.clone())
            .text(
                format!("{field}[bn]"),
                value.bn.clone().unwrap_or_default(),
            );
    }

    form.text("price", draft.price.to_string())
        .text(
            "oldPrice",
            draft.old_price.map(|p| p.to_string()).unwrap_or_default(),
        )
        .text("stock", draft.stock.to_string())
}

#[async_trait]
impl Backend for HttpBackend {
    async fn set_token(&self, token: Option<SecretString>) {
        *self.inner.token.write().await = token;
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn send_otp(&self, email: &Email) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint("/api/user/login")?;
        self.post(url, &LoginRequest { email }).await
    }

    #[instrument(skip(self, otp), fields(email = %email))]
    async fn verify_otp(&self, email: &Email, otp: OtpCode) -> Result<VerifyResponse, ApiError> {
        let url = self.endpoint("/api/user/verify")?;
        self.post(url, &VerifyRequest { email, otp }).await
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<User, ApiError> {
        self.get(self.endpoint("/api/user/me")?).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        let url = self.endpoint("/api/user/logout")?;
        let builder = self.request(Method::POST, url).await;
        self.send(builder).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cart(&self) -> Result<CartResponse, ApiError> {
        self.get(self.endpoint("/api/cart/all")?).await
    }

    #[instrument(skip(self), fields(product = %product))]
    async fn add_to_cart(&self, product: &ProductId) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint("/api/cart/add")?;
        self.post(url, &json!({ "product": product })).await
    }

    #[instrument(skip(self), fields(item = %item, action = action.as_str()))]
    async fn update_cart(
        &self,
        action: CartAction,
        item: &CartItemId,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint_with_query("/api/cart/update", &[("action", action.as_str())])?;
        self.post(url, &json!({ "id": item })).await
    }

    #[instrument(skip(self), fields(item = %item))]
    async fn remove_from_cart(&self, item: &CartItemId) -> Result<MessageResponse, ApiError> {
        self.get(self.endpoint(&format!("/api/cart/remove/{item}"))?)
            .await
    }

    #[instrument(skip(self, params), fields(page = params.page))]
    async fn products(&self, params: &ProductListParams) -> Result<ProductListResponse, ApiError> {
        let page = params.page.to_string();
        let url = self.endpoint_with_query(
            "/api/product/all",
            &[
                ("search", params.search.as_str()),
                ("category", params.category.as_str()),
                ("author", params.author.as_str()),
                ("sortByPrice", params.sort_by_price.as_str()),
                ("page", page.as_str()),
                ("lang", params.lang.code()),
            ],
        )?;
        self.get(url).await
    }

    #[instrument(skip(self))]
    async fn autocomplete(
        &self,
        query: &str,
        lang: Language,
    ) -> Result<Vec<Suggestion>, ApiError> {
        let url = self.endpoint_with_query(
            "/api/product/autocomplete",
            &[("q", query), ("lang", lang.code())],
        )?;
        self.get(url).await
    }

    #[instrument(skip(self), fields(product = %id))]
    async fn product(&self, id: &ProductId) -> Result<ProductDetailResponse, ApiError> {
        self.get(self.endpoint(&format!("/api/product/{id}"))?).await
    }

    #[instrument(skip(self))]
    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.get(self.endpoint("/api/address/all")?).await
    }

    #[instrument(skip(self), fields(address = %id))]
    async fn address(&self, id: &AddressId) -> Result<Address, ApiError> {
        self.get(self.endpoint(&format!("/api/address/{id}"))?).await
    }

    #[instrument(skip(self, input))]
    async fn create_address(&self, input: &AddressInput) -> Result<MessageResponse, ApiError> {
        self.post(self.endpoint("/api/address/new")?, input).await
    }

    #[instrument(skip(self), fields(address = %id))]
    async fn delete_address(&self, id: &AddressId) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&format!("/api/address/{id}"))?;
        let builder = self.request(Method::DELETE, url).await;
        self.json(builder).await
    }

    #[instrument(skip(self, order))]
    async fn place_cod_order(&self, order: &NewOrderRequest) -> Result<MessageResponse, ApiError> {
        self.post(self.endpoint("/api/order/new/cod")?, order).await
    }

    #[instrument(skip(self, order))]
    async fn start_online_payment(
        &self,
        order: &NewOrderRequest,
    ) -> Result<PaymentSessionResponse, ApiError> {
        self.post(self.endpoint("/api/order/new/online")?, order)
            .await
    }

    #[instrument(skip(self))]
    async fn verify_payment(&self, session_id: &str) -> Result<PaymentVerification, ApiError> {
        let url = self.endpoint("/api/order/verify/payment")?;
        self.post(url, &json!({ "sessionId": session_id })).await
    }

    #[instrument(skip(self))]
    async fn my_orders(&self) -> Result<OrderListResponse, ApiError> {
        self.get(self.endpoint("/api/order/all")?).await
    }

    #[instrument(skip(self), fields(order = %id))]
    async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.get(self.endpoint(&format!("/api/order/{id}"))?).await
    }

    #[instrument(skip(self), fields(order = %id))]
    async fn cancel_order(&self, id: &OrderId) -> Result<CancelOrderResponse, ApiError> {
        let url = self.endpoint(&format!("/api/order/{id}/cancel"))?;
        let builder = self.request(Method::POST, url).await;
        self.json(builder).await
    }

    #[instrument(skip(self))]
    async fn admin_orders(&self, page: u32) -> Result<Vec<Order>, ApiError> {
        let page = page.to_string();
        let url = self.endpoint_with_query("/api/order/admin/all", &[("page", page.as_str())])?;
        self.get(url).await
    }

    #[instrument(skip(self))]
    async fn orders_last_update(&self) -> Result<LastUpdate, ApiError> {
        self.get(self.endpoint("/api/order/admin/last-update")?)
            .await
    }

    #[instrument(skip(self), fields(order = %id, status = %status))]
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&format!("/api/order/{id}"))?;
        self.post(url, &json!({ "status": status })).await
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<SalesStats, ApiError> {
        self.get(self.endpoint("/api/stats")?).await
    }

    #[instrument(skip(self, draft, images), fields(images = images.len()))]
    async fn create_product(
        &self,
        draft: &ProductDraft,
        images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError> {
        let form = image_parts(draft_form(draft), images)?;
        let url = self.endpoint("/api/product/new")?;
        self.multipart(Method::POST, url, form).await
    }

    #[instrument(skip(self, draft), fields(product = %id))]
    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&format!("/api/product/{id}"))?;
        let builder = self.request(Method::PUT, url).await.json(draft);
        self.json(builder).await
    }

    #[instrument(skip(self, images), fields(product = %id, images = images.len()))]
    async fn replace_product_images(
        &self,
        id: &ProductId,
        images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError> {
        let form = image_parts(Form::new(), images)?;
        let url = self.endpoint(&format!("/api/product/{id}"))?;
        self.multipart(Method::POST, url, form).await
    }

    #[instrument(skip(self))]
    async fn catalogues(&self) -> Result<Vec<Catalogue>, ApiError> {
        self.get(self.endpoint("/api/catalogues")?).await
    }

    #[instrument(skip(self, upload), fields(title = %upload.title))]
    async fn upload_catalogue(
        &self,
        upload: &CatalogueUpload,
    ) -> Result<MessageResponse, ApiError> {
        let form = Form::new()
            .text("title", upload.title.clone())
            .text("description", upload.description.clone())
            .part("file", file_part(&upload.file)?);
        let url = self.endpoint("/api/catalogues")?;
        self.multipart(Method::POST, url, form).await
    }

    #[instrument(skip(self), fields(catalogue = %id))]
    async fn delete_catalogue(&self, id: &CatalogueId) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&format!("/api/catalogues/{id}"))?;
        let builder = self.request(Method::DELETE, url).await;
        self.json(builder).await
    }

    #[instrument(skip(self))]
    async fn download(&self, file_url: &str) -> Result<Vec<u8>, ApiError> {
        // Catalogue URLs are usually absolute (object storage) but may be
        // relative to the API host.
        let url = self.endpoint(file_url)?;
        let builder = self.request(Method::GET, url).await;
        let response = self.send(builder).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new(
            Url::parse("https://api.boighor.test").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_error_prefers_message_field() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Wrong OTP","error":"ignored"}"#,
        );
        assert!(matches!(
            err,
            ApiError::Rejected { status: 400, ref message } if message == "Wrong OTP"
        ));
    }

    #[test]
    fn test_error_falls_back_to_error_field() {
        let err = error_from_body(StatusCode::BAD_REQUEST, r#"{"error":"Phone is required"}"#);
        assert_eq!(err.backend_message(), Some("Phone is required"));
    }

    #[test]
    fn test_error_without_json_body() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.backend_message(), Some("HTTP 502"));
    }

    #[test]
    fn test_auth_statuses_map_to_unauthorized() {
        let err = error_from_body(StatusCode::UNAUTHORIZED, r#"{"message":"Please Login"}"#);
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Please Login"));

        let err = error_from_body(StatusCode::FORBIDDEN, "");
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = error_from_body(StatusCode::NOT_FOUND, r#"{"message":"No Order"}"#);
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_query_is_form_encoded() {
        let url = backend()
            .endpoint_with_query("/api/product/autocomplete", &[("q", "pather panchali"), ("lang", "bn")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.boighor.test/api/product/autocomplete?q=pather+panchali&lang=bn"
        );
    }

    #[test]
    fn test_download_resolves_relative_and_absolute_urls() {
        let backend = backend();
        assert_eq!(
            backend.endpoint("/uploads/cat.pdf").unwrap().as_str(),
            "https://api.boighor.test/uploads/cat.pdf"
        );
        assert_eq!(
            backend
                .endpoint("https://cdn.boighor.test/cat.pdf")
                .unwrap()
                .as_str(),
            "https://cdn.boighor.test/cat.pdf"
        );
    }

    #[test]
    fn test_base_path_is_kept_as_prefix() {
        for base in ["https://host.test/backend", "https://host.test/backend/"] {
            let backend =
                HttpBackend::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap();
            assert_eq!(backend.base_url().as_str(), "https://host.test/backend/");
            assert_eq!(
                backend.endpoint("/api/user/login").unwrap().as_str(),
                "https://host.test/backend/api/user/login"
            );
            assert_eq!(
                backend.endpoint("/uploads/cat.pdf").unwrap().as_str(),
                "https://host.test/backend/uploads/cat.pdf"
            );
            assert_eq!(
                backend
                    .endpoint("https://cdn.boighor.test/cat.pdf")
                    .unwrap()
                    .as_str(),
                "https://cdn.boighor.test/cat.pdf"
            );
        }
    }

    #[tokio::test]
    async fn test_set_token_installs_and_clears() {
        let backend = backend();
        assert!(!backend.has_token().await);

        backend
            .set_token(Some(SecretString::from("session-token")))
            .await;
        assert!(backend.has_token().await);

        backend.set_token(None).await;
        assert!(!backend.has_token().await);
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", backend());
        assert!(debug.contains("REDACTED"));
    }
}
