//! Plain-text rendering on stdout.

#![allow(clippy::print_stdout)]

use std::fmt::Display;

use np_commerce_core::{Cart, Wishlist, format_price};
use np_commerce_sync::{Category, StoreTier, SyncReport};

const fn tier_label(tier: StoreTier) -> &'static str {
    match tier {
        StoreTier::Remote => "remote",
        StoreTier::LocalCache => "local cache",
    }
}

pub fn cart(cart: &Cart, tier: StoreTier) {
    if cart.is_empty() {
        println!("Cart is empty ({})", tier_label(tier));
        return;
    }

    for line in cart.lines() {
        let options = line
            .selected_options
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        let total = line
            .line_total()
            .map_or_else(|| "-".to_string(), format_price);
        println!(
            "{}  #{} {} x{} [{}]  {}",
            line.line_id, line.product_id, line.snapshot.name, line.quantity, options, total
        );
        if let Some(text) = line.attachments.as_ref().and_then(|a| a.text.as_deref()) {
            println!("    note: {text}");
        }
    }
    println!(
        "{} items, subtotal {} ({})",
        cart.total_quantity(),
        format_price(cart.subtotal()),
        tier_label(tier)
    );
}

pub fn wishlist(wishlist: &Wishlist, tier: StoreTier) {
    for product_id in wishlist.product_ids() {
        println!("#{product_id}");
    }
    println!("{} products ({})", wishlist.len(), tier_label(tier));
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        match category.parent {
            Some(parent) => println!("{}  {} (in {parent})", category.id, category.name),
            None => println!("{}  {}", category.id, category.name),
        }
    }
}

/// Summarize a mutation: where it landed and what was recovered.
pub fn report<E: Display>(action: &str, report: &SyncReport<E>) {
    match &report.line_id {
        Some(line_id) => println!("{action}: line {line_id} ({})", tier_label(report.tier)),
        None => println!("{action} ({})", tier_label(report.tier)),
    }
    for notice in &report.notices {
        println!("  note: {notice}");
    }
}

pub fn notices<E: Display>(notices: &[E]) {
    for notice in notices {
        println!("  note: {notice}");
    }
}

pub fn flag(value: bool) {
    println!("{}", if value { "yes" } else { "no" });
}
