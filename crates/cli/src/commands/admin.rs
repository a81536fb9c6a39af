//! Back-office commands.

use boighor_admin::AdminConsole;
use boighor_admin::services::{PaymentSplit, best_sellers};
use boighor_core::{Language, OrderId, OrderStatus};
use boighor_storefront::Notice;
use tokio::sync::broadcast;

use super::CliError;
use super::output;

pub async fn list_orders(
    console: &AdminConsole,
    page: u32,
    search: Option<&str>,
) -> Result<(), CliError> {
    let poller = console.orders();
    poller.load_page(page).await?;
    output::orders(&poller.filter(search.unwrap_or_default()));
    Ok(())
}

/// Load the list, then poll until interrupted, printing a banner whenever
/// the server reports changes.
pub async fn watch_orders(
    console: &AdminConsole,
    notices: &mut broadcast::Receiver<Notice>,
) -> Result<(), CliError> {
    let poller = console.orders();
    let state = poller.load().await?;
    output::orders(&state.orders);
    output::line("Watching for changes (Ctrl-C to stop)...");

    output::drain_notices(notices);
    let mut updates = poller.subscribe();
    let _polling = poller.spawn();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if updates.borrow_and_update().is_stale {
                    output::stale_banner();
                }
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    output::notice(&notice);
                }
            }
        }
    }

    Ok(())
}

pub async fn set_status(
    console: &AdminConsole,
    id: &OrderId,
    status: OrderStatus,
) -> Result<(), CliError> {
    let poller = console.orders();
    let state = poller.update_status(id, status).await?;
    if let Some(order) = state.orders.iter().find(|order| &order.id == id) {
        output::line(format!("{} is now {}", order.id, order.status));
    }
    Ok(())
}

pub async fn stats(console: &AdminConsole, language: Language) -> Result<(), CliError> {
    let stats = console.stats().fetch().await?;

    match PaymentSplit::of(&stats) {
        Some(split) => output::line(format!(
            "Orders: {} cash on delivery ({:.0}%), {} online ({:.0}%)",
            stats.cod, split.cod, stats.online, split.online
        )),
        None => output::line("No orders yet."),
    }

    let sellers = best_sellers(&stats, language);
    if !sellers.is_empty() {
        output::line("Units sold:");
        for (title, sold) in sellers {
            output::line(format!("  {sold:>5}  {title}"));
        }
    }
    Ok(())
}
