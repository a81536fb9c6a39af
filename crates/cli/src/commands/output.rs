//! Terminal rendering.
//!
//! Data goes to stdout, notices and failures to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;

use tokio::sync::broadcast::{self, error::TryRecvError};

use boighor_core::{Language, Price};
use boighor_storefront::api::{Address, Catalogue, Order, Product, ProductDetailResponse, Suggestion};
use boighor_storefront::services::{CartSnapshot, ProductListing};
use boighor_storefront::{Notice, NoticeLevel};

pub fn failure(err: &impl Display) {
    eprintln!("error: {err}");
}

pub fn notice(notice: &Notice) {
    let marker = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Error => "error",
    };
    eprintln!("{marker}: {}", notice.message);
}

/// Print every notice published so far.
pub fn drain_notices(notices: &mut broadcast::Receiver<Notice>) {
    loop {
        match notices.try_recv() {
            Ok(received) => notice(&received),
            Err(TryRecvError::Lagged(skipped)) => {
                eprintln!("({skipped} earlier messages dropped)");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

pub fn line(text: impl Display) {
    println!("{text}");
}

pub fn cart(snapshot: &CartSnapshot, language: Language) {
    if snapshot.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in &snapshot.lines {
        println!(
            "{:<26} {:>3} x {:>10}  {}",
            line.id,
            line.quantity,
            Price::inr(line.product.price).to_string(),
            line.product.title.get(language)
        );
    }
    println!(
        "{} item(s), subtotal {}",
        snapshot.total_items, snapshot.sub_total
    );
}

fn product_row(product: &Product, language: Language) {
    let stock = if product.stock == 0 {
        " (out of stock)"
    } else {
        ""
    };
    println!(
        "{:<26} {:>10}  {} / {}{stock}",
        product.id,
        Price::inr(product.price).to_string(),
        product.title.get(language),
        product.author.get(language)
    );
}

pub fn listing(listing: &ProductListing, page: u32, language: Language) {
    if listing.products.is_empty() {
        println!("No products found.");
    }
    for product in &listing.products {
        product_row(product, language);
    }
    println!("Page {page} of {}", listing.total_pages.max(1));
    if !listing.categories.is_empty() {
        println!("Categories: {}", listing.categories.join(", "));
    }
}

pub fn product_detail(detail: &ProductDetailResponse, language: Language) {
    let product = &detail.product;
    println!("{}", product.title.get(language));
    println!("by {}", product.author.get(language));
    match product.old_price {
        Some(old) if old > product.price => println!(
            "{} (was {})",
            Price::inr(product.price),
            Price::inr(old)
        ),
        _ => println!("{}", Price::inr(product.price)),
    }
    println!("In stock: {}", product.stock);
    let description = product.description.get(language);
    if !description.is_empty() {
        println!();
        println!("{description}");
    }
    if !detail.related.is_empty() {
        println!();
        println!("Related:");
        for related in &detail.related {
            product_row(related, language);
        }
    }
}

pub fn suggestions(suggestions: &[Suggestion], language: Language) {
    if suggestions.is_empty() {
        println!("No suggestions.");
    }
    for suggestion in suggestions {
        match &suggestion.author {
            Some(author) => println!(
                "{:<26} {} / {}",
                suggestion.id,
                suggestion.title.get(language),
                author.get(language)
            ),
            None => println!("{:<26} {}", suggestion.id, suggestion.title.get(language)),
        }
    }
}

pub fn addresses(addresses: &[Address]) {
    if addresses.is_empty() {
        println!("No saved addresses.");
    }
    for address in addresses {
        println!("{:<26} {} ({})", address.id, address.formatted(), address.fields.phone);
    }
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders.");
    }
    for order in orders {
        let customer = order.user.as_ref().map_or("", |user| user.email.as_str());
        println!(
            "{:<26} {:<10} {:<7} {:>10}  {}  {customer}",
            order.id,
            order.status,
            order.method,
            Price::inr(order.sub_total).to_string(),
            order.created_at.format("%d %m %Y"),
        );
    }
}

pub fn order(order: &Order, language: Language) {
    println!("Order {}", order.id);
    println!("Status: {}", order.status);
    println!("Payment: {}", order.method);
    if let Some(paid_at) = order.paid_at {
        println!("Paid: {}", paid_at.format("%d %m %Y %H:%M"));
    }
    println!("Ship to: {} ({})", order.address, order.phone);
    for item in &order.items {
        println!(
            "  {:>3} x {}",
            item.quantity,
            item.product.title.get(language)
        );
    }
    println!("Subtotal: {}", Price::inr(order.sub_total));
    if order.status.is_cancellable() {
        println!("This order can still be cancelled.");
    }
}

pub fn catalogues(catalogues: &[Catalogue]) {
    if catalogues.is_empty() {
        println!("No catalogues.");
    }
    for catalogue in catalogues {
        match &catalogue.description {
            Some(description) if !description.is_empty() => {
                println!("{:<26} {} - {description}", catalogue.id, catalogue.title);
            }
            _ => println!("{:<26} {}", catalogue.id, catalogue.title),
        }
    }
}

pub fn stale_banner() {
    eprintln!("Orders have changed. Run `bg-cli admin orders list` to refresh.");
}
