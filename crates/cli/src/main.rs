//! Boighor CLI - Drive the storefront and admin controllers from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a one-time code
//! bg-cli login reader@example.com
//! bg-cli verify 123456
//!
//! # Browse and buy
//! bg-cli products list --category Novel --sort highToLow
//! bg-cli cart add 66f0c2a1e4
//! bg-cli checkout cod 66f0c7b3d9
//!
//! # Watch orders as an admin
//! bg-cli admin orders watch
//! ```
//!
//! The session is kept in `BOIGHOR_STATE_DIR` (default `.boighor`) between
//! invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boighor_core::{CartItemId, Language, OrderId, OrderStatus, PriceSort, ProductId};
use boighor_storefront::config::StorefrontConfig;
use boighor_storefront::{Notice, Storefront};
use tokio::sync::broadcast;

mod commands;

use commands::CliError;

/// Session directory used when `BOIGHOR_STATE_DIR` is unset.
const DEFAULT_STATE_DIR: &str = ".boighor";

#[derive(Parser)]
#[command(name = "bg-cli")]
#[command(author, version, about = "Boighor bookstore CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Email a one-time code
    Login {
        email: String,
    },
    /// Sign in with the emailed code
    Verify {
        code: String,
    },
    /// Send the code again once the countdown has finished
    Resend,
    /// Show who is signed in
    Whoami,
    /// Sign out
    Logout,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Browse the catalogue
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Saved shipping addresses
    Addresses,
    /// Your orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Place an order for the cart
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Downloadable catalogues
    Catalogues {
        #[command(subcommand)]
        action: CatalogueAction,
    },
    /// Back-office commands (admin role required)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product: String },
    /// Increase a line's quantity
    Inc { item: String },
    /// Decrease a line's quantity
    Dec { item: String },
    /// Remove a line
    Remove { item: String },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// `lowToHigh` or `highToLow`
        #[arg(long)]
        sort: Option<PriceSort>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// `en` or `bn`
        #[arg(long)]
        lang: Option<Language>,
    },
    /// Show a product and related titles
    Show { id: String },
    /// Search suggestions for partial text
    Suggest { text: String },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: String },
    /// Cancel a pending order
    Cancel { id: String },
}

#[derive(Subcommand)]
enum CheckoutAction {
    /// Pay cash on delivery
    Cod { address: String },
    /// Start an online payment and print the payment page URL
    Online { address: String },
    /// Confirm an online payment after returning from the payment page
    Verify { session_id: String },
}

#[derive(Subcommand)]
enum CatalogueAction {
    /// List catalogues
    List,
    /// Download a catalogue
    Download {
        id: String,
        /// Where to write the file
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: AdminOrderAction,
    },
    /// Payment split and best sellers
    Stats,
}

#[derive(Subcommand)]
enum AdminOrderAction {
    /// List orders
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Filter by customer email or order id
        #[arg(long)]
        search: Option<String>,
    },
    /// Poll for changes and say when the list is out of date
    Watch,
    /// Change an order's status
    Status { id: String, status: OrderStatus },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            commands::output::failure(&e);
            std::process::exit(2);
        }
    };
    config
        .state_dir
        .get_or_insert_with(|| PathBuf::from(DEFAULT_STATE_DIR));

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Quiet by default so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,boighor_storefront=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::debug!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let storefront = Storefront::new(config)?;
    let mut notices = storefront.notifier().subscribe();
    storefront.init().await;

    let result = dispatch(&storefront, cli.command, &mut notices).await;

    storefront.shutdown();
    commands::output::drain_notices(&mut notices);
    result
}

async fn dispatch(
    storefront: &Storefront,
    command: Commands,
    notices: &mut broadcast::Receiver<Notice>,
) -> Result<(), CliError> {
    match command {
        Commands::Login { email } => commands::auth::login(storefront, &email).await,
        Commands::Verify { code } => commands::auth::verify(storefront, &code).await,
        Commands::Resend => commands::auth::resend(storefront).await,
        Commands::Whoami => commands::auth::whoami(storefront),
        Commands::Logout => {
            commands::auth::logout(storefront).await;
            Ok(())
        }
        Commands::Cart { action } => {
            let cart = storefront.cart();
            let snapshot = match action.unwrap_or(CartAction::Show) {
                CartAction::Show => cart.fetch_cart().await?,
                CartAction::Add { product } => cart.add_item(&ProductId::new(product)).await?,
                CartAction::Inc { item } => {
                    cart.update_quantity(
                        boighor_storefront::api::CartAction::Increment,
                        &CartItemId::new(item),
                    )
                    .await?
                }
                CartAction::Dec { item } => {
                    cart.update_quantity(
                        boighor_storefront::api::CartAction::Decrement,
                        &CartItemId::new(item),
                    )
                    .await?
                }
                CartAction::Remove { item } => cart.remove_item(&CartItemId::new(item)).await?,
            };
            commands::output::cart(&snapshot, storefront.config().language);
            Ok(())
        }
        Commands::Products { action } => match action {
            ProductAction::List {
                search,
                category,
                author,
                sort,
                page,
                lang,
            } => {
                let filters = commands::shop::ListFilters {
                    search,
                    category,
                    author,
                    sort,
                    page,
                    lang,
                };
                commands::shop::list_products(storefront, filters).await
            }
            ProductAction::Show { id } => {
                commands::shop::show_product(storefront, &ProductId::new(id)).await
            }
            ProductAction::Suggest { text } => commands::shop::suggest(storefront, &text).await,
        },
        Commands::Addresses => commands::shop::addresses(storefront).await,
        Commands::Orders { action } => match action {
            OrderAction::List => commands::shop::list_orders(storefront).await,
            OrderAction::Show { id } => {
                commands::shop::show_order(storefront, &OrderId::new(id)).await
            }
            OrderAction::Cancel { id } => {
                commands::shop::cancel_order(storefront, &OrderId::new(id)).await
            }
        },
        Commands::Checkout { action } => match action {
            CheckoutAction::Cod { address } => {
                commands::shop::checkout_cod(storefront, &address).await
            }
            CheckoutAction::Online { address } => {
                commands::shop::checkout_online(storefront, &address).await
            }
            CheckoutAction::Verify { session_id } => {
                commands::shop::verify_payment(storefront, &session_id).await
            }
        },
        Commands::Catalogues { action } => match action {
            CatalogueAction::List => commands::shop::list_catalogues(storefront).await,
            CatalogueAction::Download { id, out } => {
                commands::shop::download_catalogue(storefront, &id, &out).await
            }
        },
        Commands::Admin { action } => {
            let console = boighor_admin::AdminConsole::new(storefront);
            match action {
                AdminAction::Orders { action } => match action {
                    AdminOrderAction::List { page, search } => {
                        commands::admin::list_orders(&console, page, search.as_deref()).await
                    }
                    AdminOrderAction::Watch => {
                        commands::admin::watch_orders(&console, notices).await
                    }
                    AdminOrderAction::Status { id, status } => {
                        commands::admin::set_status(&console, &OrderId::new(id), status).await
                    }
                },
                AdminAction::Stats => {
                    commands::admin::stats(&console, storefront.config().language).await
                }
            }
        }
    }
}
