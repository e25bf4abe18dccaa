//! Cart and wishlist commands.

use std::str::FromStr;

use farm_connect_client::{ClientError, FarmConnect};
use farm_connect_core::{CartItem, Price, ProductId, ProductSummary, WishlistItem};
use rust_decimal::Decimal;

use super::CommandError;

fn parse_price(raw: &str) -> Result<Price, CommandError> {
    let amount = Decimal::from_str(raw.trim().trim_start_matches('$'))
        .map_err(|_| CommandError::InvalidPrice(raw.to_owned()))?;
    if amount.is_sign_negative() {
        return Err(CommandError::InvalidPrice(raw.to_owned()));
    }
    Ok(Price::new(amount))
}

pub fn add(
    app: &FarmConnect,
    id: &str,
    name: &str,
    price: &str,
    qty: u32,
) -> Result<(), CommandError> {
    let product = ProductSummary::new(id, name, parse_price(price)?);
    let line = app
        .cart()
        .add_to_cart(&product, qty)
        .map_err(ClientError::from)?;
    tracing::info!("{} x {} in cart ({})", line.quantity, line.name, line_total(&line));
    Ok(())
}

pub fn remove(app: &FarmConnect, id: &str) -> Result<(), CommandError> {
    app.cart()
        .remove_from_cart(&ProductId::from(id))
        .map_err(ClientError::from)?;
    tracing::info!("Removed {id} from cart");
    Ok(())
}

pub fn update(app: &FarmConnect, id: &str, qty: u32) -> Result<(), CommandError> {
    app.cart()
        .update_quantity(&ProductId::from(id), qty)
        .map_err(ClientError::from)?;
    tracing::info!("Set {id} quantity to {qty}");
    Ok(())
}

pub fn clear(app: &FarmConnect) -> Result<(), CommandError> {
    app.cart().clear_cart().map_err(ClientError::from)?;
    tracing::info!("Cart cleared");
    Ok(())
}

fn line_total(item: &CartItem) -> String {
    item.line_total()
        .map_or_else(|| "overflow".to_string(), |total| total.to_string())
}

#[allow(clippy::print_stdout)]
pub fn show(app: &FarmConnect) {
    let cart = app.cart();
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in cart.items() {
        println!(
            "{:<12} {:<30} {:>4} x {:>9} = {:>10}",
            item.product_id,
            item.name,
            item.quantity,
            item.price,
            line_total(&item)
        );
    }
    println!("{} item(s), total {}", cart.item_count(), cart.total());
}

pub fn toggle_wishlist(app: &FarmConnect, id: &str, name: Option<&str>) -> Result<(), CommandError> {
    let mut item = WishlistItem::new(id);
    if let Some(name) = name {
        item = item.with_field("name", name.into());
    }
    let saved = app
        .wishlist()
        .toggle_wishlist(item)
        .map_err(ClientError::from)?;
    if saved {
        tracing::info!("Saved {id} to wishlist");
    } else {
        tracing::info!("Removed {id} from wishlist");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn show_wishlist(app: &FarmConnect) {
    let items = app.wishlist().items();
    if items.is_empty() {
        println!("Wishlist is empty");
        return;
    }
    for item in items {
        let name = item
            .fields
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        println!("{:<12} {name}", item.product_id);
    }
}
