//! In-memory stand-in for the bookstore backend.
//!
//! Behaves like the real service for the flows the controllers exercise:
//! OTP login with a fixed code, a server-held cart, a small catalogue,
//! orders with a "last update" timestamp. Every call is logged so tests can
//! assert on what was (and was not) requested. Endpoints can be made to
//! fail or to answer late.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use boighor_core::{
    AddressId, CartItemId, CatalogueId, Email, Language, Localized, OrderId, OrderStatus,
    OtpCode, PaymentMethod, ProductId, Role, UserId,
};
use boighor_storefront::api::{
    Address, AddressInput, ApiError, Backend, CancelOrderResponse, CartAction, CartLine,
    CartResponse, Catalogue, CatalogueUpload, FileUpload, LastUpdate, MessageResponse,
    NewOrderRequest, Order, OrderCustomer, OrderItem, OrderListResponse, PaymentSessionResponse,
    PaymentVerification, Product, ProductDetailResponse, ProductDraft, ProductListParams,
    ProductListResponse, SalesStats, Suggestion, User, VerifyResponse,
};

/// The code every emailed OTP has.
pub const OTP_CODE: u32 = 123_456;

/// Orders per page of the admin order list, newest first.
pub const ADMIN_ORDERS_PER_PAGE: usize = 2;

/// A failure an endpoint is told to return.
#[derive(Debug, Clone)]
struct Failure {
    status: u16,
    message: String,
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self.status {
            401 | 403 => ApiError::Unauthorized(self.message.clone()),
            404 => ApiError::NotFound(self.message.clone()),
            429 => ApiError::RateLimited(60),
            status => ApiError::Rejected {
                status,
                message: self.message.clone(),
            },
        }
    }
}

#[derive(Default)]
struct FakeState {
    token: Option<String>,
    sessions: HashMap<String, User>,
    admins: HashSet<String>,
    sent_otps: Vec<Email>,
    products: Vec<Product>,
    cart: Vec<CartLine>,
    next_line: u32,
    addresses: Vec<Address>,
    orders: Vec<Order>,
    last_update: Option<DateTime<Utc>>,
    payment_sessions: HashSet<String>,
    catalogues: Vec<Catalogue>,
    files: HashMap<String, Vec<u8>>,
    stats: SalesStats,
    placed: Vec<NewOrderRequest>,
    created_products: Vec<(ProductDraft, usize)>,
    last_listing: Option<ProductListParams>,
}

/// Scriptable in-memory backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, Failure>>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Make `endpoint` fail with `status` until [`Self::recover`] is called.
    pub async fn fail(&self, endpoint: &str, status: u16, message: &str) {
        self.failures.lock().await.insert(
            endpoint.to_string(),
            Failure {
                status,
                message: message.to_string(),
            },
        );
    }

    pub async fn recover(&self, endpoint: &str) {
        self.failures.lock().await.remove(endpoint);
    }

    /// Delay the next response of `endpoint`. Queued delays apply to
    /// successive calls in order.
    pub async fn delay_next(&self, endpoint: &str, delay: Duration) {
        self.delays
            .lock()
            .await
            .entry(endpoint.to_string())
            .or_default()
            .push_back(delay);
    }

    /// Sign-ins with this email get the admin role.
    pub async fn add_admin(&self, email: &str) {
        self.state.lock().await.admins.insert(email.to_lowercase());
    }

    pub async fn add_product(&self, product: Product) {
        self.state.lock().await.products.push(product);
    }

    pub async fn add_address(&self, address: Address) {
        self.state.lock().await.addresses.push(address);
    }

    /// Add an order and move the "last update" timestamp to it.
    pub async fn add_order(&self, order: Order) {
        let mut state = self.state.lock().await;
        state.last_update = state.last_update.max(Some(order.updated_at));
        state.orders.push(order);
    }

    /// Simulate another admin editing an order at `at`.
    pub async fn touch_order(&self, id: &OrderId, at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if let Some(order) = state.orders.iter_mut().find(|order| &order.id == id) {
            order.updated_at = at;
        }
        state.last_update = state.last_update.max(Some(at));
    }

    pub async fn open_payment_session(&self, session_id: &str) {
        self.state
            .lock()
            .await
            .payment_sessions
            .insert(session_id.to_string());
    }

    pub async fn add_catalogue(&self, catalogue: Catalogue, bytes: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.files.insert(catalogue.file_url.clone(), bytes);
        state.catalogues.push(catalogue);
    }

    pub async fn set_stats(&self, stats: SalesStats) {
        self.state.lock().await.stats = stats;
    }

    /// Put a line in the cart behind the client's back.
    pub async fn put_in_cart(&self, product: &ProductId, quantity: u32) {
        let mut state = self.state.lock().await;
        if let Some(product) = state.products.iter().find(|p| &p.id == product).cloned() {
            state.next_line += 1;
            let id = CartItemId::new(format!("line-{}", state.next_line));
            state.cart.push(CartLine {
                id,
                quantity,
                product,
            });
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// How many times `endpoint` was called.
    pub async fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.as_str() == endpoint)
            .count()
    }

    /// Every call so far, in order.
    pub async fn call_log(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn sent_otps(&self) -> Vec<Email> {
        self.state.lock().await.sent_otps.clone()
    }

    pub async fn current_token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    pub async fn placed_orders(&self) -> Vec<NewOrderRequest> {
        self.state.lock().await.placed.clone()
    }

    pub async fn order_status(&self, id: &OrderId) -> Option<OrderStatus> {
        self.state
            .lock()
            .await
            .orders
            .iter()
            .find(|order| &order.id == id)
            .map(|order| order.status)
    }

    pub async fn last_listing(&self) -> Option<ProductListParams> {
        self.state.lock().await.last_listing.clone()
    }

    pub async fn created_products(&self) -> usize {
        self.state.lock().await.created_products.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Log the call and apply any scripted failure.
    async fn enter(&self, endpoint: &str) -> Result<(), ApiError> {
        self.calls.lock().await.push(endpoint.to_string());
        match self.failures.lock().await.get(endpoint) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    /// Wait out any delay queued for `endpoint`.
    async fn respond(&self, endpoint: &str) {
        let delay = self
            .delays
            .lock()
            .await
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn signed_in(&self) -> Result<User, ApiError> {
        let state = self.state.lock().await;
        state
            .token
            .as_ref()
            .and_then(|token| state.sessions.get(token))
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Please Login".to_string()))
    }

    async fn admin(&self) -> Result<User, ApiError> {
        let user = self.signed_in().await?;
        if user.role.is_admin() {
            Ok(user)
        } else {
            Err(ApiError::Unauthorized("You are not admin".to_string()))
        }
    }
}

fn cart_response(lines: &[CartLine]) -> CartResponse {
    CartResponse {
        cart: lines.to_vec(),
        sum_of_quantities: lines.iter().map(|line| line.quantity).sum(),
        sub_total: lines
            .iter()
            .map(|line| line.product.price * Decimal::from(line.quantity))
            .sum(),
    }
}

fn matches(text: &Localized, needle: &str) -> bool {
    needle.is_empty()
        || text.en.to_lowercase().contains(needle)
        || text
            .bn
            .as_deref()
            .is_some_and(|bn| bn.to_lowercase().contains(needle))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn set_token(&self, token: Option<SecretString>) {
        self.state.lock().await.token = token.map(|t| t.expose_secret().to_string());
    }

    async fn send_otp(&self, email: &Email) -> Result<MessageResponse, ApiError> {
        self.enter("send_otp").await?;
        self.state.lock().await.sent_otps.push(email.clone());
        self.respond("send_otp").await;
        Ok(MessageResponse::new("OTP sent to your mail"))
    }

    async fn verify_otp(&self, email: &Email, otp: OtpCode) -> Result<VerifyResponse, ApiError> {
        self.enter("verify_otp").await?;
        self.respond("verify_otp").await;

        let mut state = self.state.lock().await;
        if !state.sent_otps.contains(email) {
            return Err(ApiError::Rejected {
                status: 400,
                message: "OTP expired".to_string(),
            });
        }
        if otp.value() != OTP_CODE {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Wrong OTP".to_string(),
            });
        }

        let role = if state.admins.contains(&email.as_str().to_lowercase()) {
            Role::Admin
        } else {
            Role::User
        };
        let user = User {
            id: UserId::new(format!("user-{}", email.as_str())),
            email: email.clone(),
            role,
        };
        let token = format!("token-{}", state.sessions.len() + 1);
        state.sessions.insert(token.clone(), user.clone());

        Ok(VerifyResponse {
            message: "Logged in".to_string(),
            token: SecretString::from(token),
            user,
        })
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.enter("me").await?;
        self.respond("me").await;
        self.signed_in().await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.enter("logout").await?;
        let mut state = self.state.lock().await;
        if let Some(token) = state.token.take() {
            state.sessions.remove(&token);
        }
        Ok(())
    }

    async fn cart(&self) -> Result<CartResponse, ApiError> {
        self.enter("cart").await?;
        self.signed_in().await?;
        // The response reflects the cart when the request arrived
        let response = cart_response(&self.state.lock().await.cart);
        self.respond("cart").await;
        Ok(response)
    }

    async fn add_to_cart(&self, product: &ProductId) -> Result<MessageResponse, ApiError> {
        self.enter("add_to_cart").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;

        let Some(found) = state.products.iter().find(|p| &p.id == product).cloned() else {
            return Err(ApiError::NotFound("No product with this id".to_string()));
        };
        if let Some(line) = state.cart.iter_mut().find(|line| &line.product.id == product) {
            if line.quantity >= found.stock {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: "Out of stock".to_string(),
                });
            }
            line.quantity += 1;
            return Ok(MessageResponse::new("Cart updated"));
        }
        if found.stock == 0 {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Out of stock".to_string(),
            });
        }

        state.next_line += 1;
        let id = CartItemId::new(format!("line-{}", state.next_line));
        state.cart.push(CartLine {
            id,
            quantity: 1,
            product: found,
        });
        Ok(MessageResponse::new("Added to cart"))
    }

    async fn update_cart(
        &self,
        action: CartAction,
        item: &CartItemId,
    ) -> Result<MessageResponse, ApiError> {
        self.enter("update_cart").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;

        let Some(line) = state.cart.iter_mut().find(|line| &line.id == item) else {
            return Err(ApiError::NotFound("Cart item not found".to_string()));
        };
        match action {
            CartAction::Increment if line.quantity >= line.product.stock => {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: "Out of stock".to_string(),
                });
            }
            CartAction::Increment => line.quantity += 1,
            CartAction::Decrement if line.quantity <= 1 => {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: "You already have only one item".to_string(),
                });
            }
            CartAction::Decrement => line.quantity -= 1,
        }
        Ok(MessageResponse::new("Cart updated"))
    }

    async fn remove_from_cart(&self, item: &CartItemId) -> Result<MessageResponse, ApiError> {
        self.enter("remove_from_cart").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|line| &line.id != item);
        if state.cart.len() == before {
            return Err(ApiError::NotFound("Cart item not found".to_string()));
        }
        Ok(MessageResponse::new("Removed from cart"))
    }

    async fn products(&self, params: &ProductListParams) -> Result<ProductListResponse, ApiError> {
        self.enter("products").await?;
        let response = {
            let mut state = self.state.lock().await;
            state.last_listing = Some(params.clone());

            let search = params.search.to_lowercase();
            let mut products: Vec<Product> = state
                .products
                .iter()
                .filter(|p| matches(&p.title, &search) || matches(&p.author, &search))
                .filter(|p| params.category.is_empty() || p.category.en == params.category)
                .filter(|p| params.author.is_empty() || p.author.en == params.author)
                .cloned()
                .collect();
            match params.sort_by_price.as_str() {
                "lowToHigh" => products.sort_by(|a, b| a.price.cmp(&b.price)),
                "highToLow" => products.sort_by(|a, b| b.price.cmp(&a.price)),
                _ => {}
            }

            let mut categories: Vec<String> =
                state.products.iter().map(|p| p.category.en.clone()).collect();
            categories.sort();
            categories.dedup();

            ProductListResponse {
                new_products: state.products.iter().rev().take(4).cloned().collect(),
                products,
                categories,
                total_pages: 1,
            }
        };
        self.respond("products").await;
        Ok(response)
    }

    async fn autocomplete(&self, query: &str, _lang: Language) -> Result<Vec<Suggestion>, ApiError> {
        self.enter("autocomplete").await?;
        let needle = query.to_lowercase();
        let suggestions: Vec<Suggestion> = self
            .state
            .lock()
            .await
            .products
            .iter()
            .filter(|p| matches(&p.title, &needle))
            .map(|p| Suggestion {
                id: p.id.clone(),
                title: p.title.clone(),
                author: Some(p.author.clone()),
            })
            .collect();
        self.respond("autocomplete").await;
        Ok(suggestions)
    }

    async fn product(&self, id: &ProductId) -> Result<ProductDetailResponse, ApiError> {
        self.enter("product").await?;
        let state = self.state.lock().await;
        let product = state
            .products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("No product with this id".to_string()))?;
        let related = state
            .products
            .iter()
            .filter(|p| p.id != product.id && p.category == product.category)
            .cloned()
            .collect();
        Ok(ProductDetailResponse { product, related })
    }

    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.enter("addresses").await?;
        self.signed_in().await?;
        Ok(self.state.lock().await.addresses.clone())
    }

    async fn address(&self, id: &AddressId) -> Result<Address, ApiError> {
        self.enter("address").await?;
        self.signed_in().await?;
        self.state
            .lock()
            .await
            .addresses
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Address not found".to_string()))
    }

    async fn create_address(&self, input: &AddressInput) -> Result<MessageResponse, ApiError> {
        self.enter("create_address").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;
        let id = AddressId::new(format!("addr-{}", state.addresses.len() + 1));
        state.addresses.push(Address {
            id,
            fields: input.clone(),
        });
        Ok(MessageResponse::new("Address created"))
    }

    async fn delete_address(&self, id: &AddressId) -> Result<MessageResponse, ApiError> {
        self.enter("delete_address").await?;
        self.signed_in().await?;
        self.state.lock().await.addresses.retain(|a| &a.id != id);
        Ok(MessageResponse::new("Address deleted"))
    }

    async fn place_cod_order(&self, order: &NewOrderRequest) -> Result<MessageResponse, ApiError> {
        self.enter("place_cod_order").await?;
        let user = self.signed_in().await?;
        let mut state = self.state.lock().await;
        if state.cart.is_empty() {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Cart is empty".to_string(),
            });
        }

        let now = Utc::now();
        let cart = cart_response(&state.cart);
        let items = state
            .cart
            .iter()
            .map(|line| OrderItem {
                product: line.product.clone(),
                quantity: line.quantity,
            })
            .collect();
        let placed = Order {
            id: OrderId::new(format!("order-{}", state.orders.len() + 1)),
            items,
            user: Some(OrderCustomer {
                id: user.id,
                email: user.email.into_inner(),
            }),
            sub_total: cart.sub_total,
            status: OrderStatus::Pending,
            method: PaymentMethod::Cod,
            phone: order.phone.clone(),
            address: order.address.clone(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(placed);
        state.last_update = Some(now);
        state.cart.clear();
        state.placed.push(order.clone());
        Ok(MessageResponse::new("Order placed successfully"))
    }

    async fn start_online_payment(
        &self,
        order: &NewOrderRequest,
    ) -> Result<PaymentSessionResponse, ApiError> {
        self.enter("start_online_payment").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;
        let session = format!("cs_test_{}", state.payment_sessions.len() + 1);
        state.payment_sessions.insert(session.clone());
        state.placed.push(order.clone());
        Ok(PaymentSessionResponse {
            url: Some(format!("https://pay.example.com/{session}")),
        })
    }

    async fn verify_payment(&self, session_id: &str) -> Result<PaymentVerification, ApiError> {
        self.enter("verify_payment").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;
        if state.payment_sessions.remove(session_id) {
            state.cart.clear();
            Ok(PaymentVerification {
                success: true,
                message: "Order placed".to_string(),
            })
        } else {
            Ok(PaymentVerification {
                success: false,
                message: "Payment not completed".to_string(),
            })
        }
    }

    async fn my_orders(&self) -> Result<OrderListResponse, ApiError> {
        self.enter("my_orders").await?;
        let user = self.signed_in().await?;
        let orders = self
            .state
            .lock()
            .await
            .orders
            .iter()
            .filter(|order| order.user.as_ref().is_some_and(|u| u.id == user.id))
            .cloned()
            .collect();
        Ok(OrderListResponse { orders })
    }

    async fn order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.enter("order").await?;
        self.signed_in().await?;
        self.state
            .lock()
            .await
            .orders
            .iter()
            .find(|order| &order.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<CancelOrderResponse, ApiError> {
        self.enter("cancel_order").await?;
        self.signed_in().await?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let Some(order) = state.orders.iter_mut().find(|order| &order.id == id) else {
            return Err(ApiError::NotFound("Order not found".to_string()));
        };
        if !order.status.is_cancellable() {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Order cannot be cancelled".to_string(),
            });
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        let order = order.clone();
        state.last_update = Some(now);
        Ok(CancelOrderResponse {
            message: "Order cancelled".to_string(),
            order,
        })
    }

    async fn admin_orders(&self, page: u32) -> Result<Vec<Order>, ApiError> {
        self.enter("admin_orders").await?;
        self.admin().await?;
        let mut orders = self.state.lock().await.orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let skip = (page.max(1) as usize - 1) * ADMIN_ORDERS_PER_PAGE;
        Ok(orders
            .into_iter()
            .skip(skip)
            .take(ADMIN_ORDERS_PER_PAGE)
            .collect())
    }

    async fn orders_last_update(&self) -> Result<LastUpdate, ApiError> {
        self.enter("orders_last_update").await?;
        self.admin().await?;
        let last_update = self.state.lock().await.last_update;
        self.respond("orders_last_update").await;
        Ok(LastUpdate { last_update })
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<MessageResponse, ApiError> {
        self.enter("update_order_status").await?;
        self.admin().await?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let Some(order) = state.orders.iter_mut().find(|order| &order.id == id) else {
            return Err(ApiError::NotFound("Order not found".to_string()));
        };
        order.status = status;
        order.updated_at = now;
        state.last_update = Some(now);
        Ok(MessageResponse::new("Order status updated"))
    }

    async fn stats(&self) -> Result<SalesStats, ApiError> {
        self.enter("stats").await?;
        self.admin().await?;
        Ok(self.state.lock().await.stats.clone())
    }

    async fn create_product(
        &self,
        draft: &ProductDraft,
        images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError> {
        self.enter("create_product").await?;
        self.admin().await?;
        let mut state = self.state.lock().await;
        let id = ProductId::new(format!("product-{}", state.products.len() + 1));
        state.products.push(Product {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            author: draft.author.clone(),
            price: draft.price,
            old_price: draft.old_price,
            stock: draft.stock,
            sold: 0,
            images: Vec::new(),
            created_at: Some(Utc::now()),
        });
        state.created_products.push((draft.clone(), images.len()));
        Ok(MessageResponse::new("Product Created"))
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<MessageResponse, ApiError> {
        self.enter("update_product").await?;
        self.admin().await?;
        let mut state = self.state.lock().await;
        let Some(product) = state.products.iter_mut().find(|p| &p.id == id) else {
            return Err(ApiError::NotFound("No product with this id".to_string()));
        };
        product.title = draft.title.clone();
        product.price = draft.price;
        product.old_price = draft.old_price;
        product.stock = draft.stock;
        Ok(MessageResponse::new("Product Updated"))
    }

    async fn replace_product_images(
        &self,
        id: &ProductId,
        _images: &[FileUpload],
    ) -> Result<MessageResponse, ApiError> {
        self.enter("replace_product_images").await?;
        self.admin().await?;
        if self.state.lock().await.products.iter().any(|p| &p.id == id) {
            Ok(MessageResponse::new("Images updated"))
        } else {
            Err(ApiError::NotFound("No product with this id".to_string()))
        }
    }

    async fn catalogues(&self) -> Result<Vec<Catalogue>, ApiError> {
        self.enter("catalogues").await?;
        Ok(self.state.lock().await.catalogues.clone())
    }

    async fn upload_catalogue(
        &self,
        upload: &CatalogueUpload,
    ) -> Result<MessageResponse, ApiError> {
        self.enter("upload_catalogue").await?;
        self.admin().await?;
        let mut state = self.state.lock().await;
        let id = CatalogueId::new(format!("catalogue-{}", state.catalogues.len() + 1));
        let file_url = format!("/uploads/{}", upload.file.file_name);
        state.files.insert(file_url.clone(), upload.file.bytes.clone());
        state.catalogues.push(Catalogue {
            id,
            title: upload.title.clone(),
            description: Some(upload.description.clone()),
            file_url,
        });
        Ok(MessageResponse::new("Catalogue uploaded"))
    }

    async fn delete_catalogue(&self, id: &CatalogueId) -> Result<MessageResponse, ApiError> {
        self.enter("delete_catalogue").await?;
        self.admin().await?;
        self.state.lock().await.catalogues.retain(|c| &c.id != id);
        Ok(MessageResponse::new("Catalogue deleted"))
    }

    async fn download(&self, file_url: &str) -> Result<Vec<u8>, ApiError> {
        self.enter("download").await?;
        self.state
            .lock()
            .await
            .files
            .get(file_url)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("File not found".to_string()))
    }
}
