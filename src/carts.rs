//! Shopping carts for guests and users.
//!
//! A cart is created lazily the first time its owner adds something. When a
//! guest logs in, their session cart is folded into the user's cart by
//! [`merge_guest_cart`] and then deleted.

use std::collections::HashMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ShopError;
use crate::insertables::{NewCart, NewCartItem};
use crate::models::{Cart, CartItem, Product};
use crate::schema::{cart_items, carts, products};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(i32),
    Guest(String),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl CartLine {
    fn new(item: &CartItem, product: &Product) -> Self {
        CartLine {
            id: item.id,
            product_id: product.id,
            product_name: product.name.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            quantity: item.quantity,
            subtotal: product.price * Decimal::from(item.quantity),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub cart_id: Option<i32>,
    pub items: Vec<CartLine>,
    /// Sum of quantities.
    pub total_items: i64,
    /// Number of distinct lines.
    pub item_count: usize,
    pub subtotal: Decimal,
}

impl CartSummary {
    pub fn empty() -> Self {
        CartSummary {
            cart_id: None,
            items: Vec::new(),
            total_items: 0,
            item_count: 0,
            subtotal: Decimal::ZERO,
        }
    }

    pub fn from_lines(cart_id: i32, lines: &[(CartItem, Product)]) -> Self {
        let items: Vec<CartLine> = lines
            .iter()
            .map(|(item, product)| CartLine::new(item, product))
            .collect();
        CartSummary {
            cart_id: Some(cart_id),
            total_items: items.iter().map(|l| i64::from(l.quantity)).sum(),
            item_count: items.len(),
            subtotal: items.iter().map(|l| l.subtotal).sum(),
            items,
        }
    }
}

pub fn validate_stock(product: &Product, requested: i32) -> Result<(), ShopError> {
    if product.stock < requested {
        return Err(ShopError::validation(format!(
            "Only {} items available in stock.",
            product.stock
        )));
    }
    Ok(())
}

pub fn find_cart(conn: &mut PgConnection, owner: &CartOwner) -> QueryResult<Option<Cart>> {
    match owner {
        CartOwner::User(user_id) => carts::table
            .filter(carts::user_id.eq(*user_id))
            .select(Cart::as_select())
            .first(conn)
            .optional(),
        CartOwner::Guest(session_key) => carts::table
            .filter(carts::session_key.eq(session_key.as_str()))
            .select(Cart::as_select())
            .first(conn)
            .optional(),
    }
}

pub fn get_or_create_cart(conn: &mut PgConnection, owner: &CartOwner) -> Result<Cart, ShopError> {
    if let Some(cart) = find_cart(conn, owner)? {
        return Ok(cart);
    }
    let new_cart = match owner {
        CartOwner::User(user_id) => NewCart {
            user_id: Some(*user_id),
            session_key: None,
        },
        CartOwner::Guest(session_key) => NewCart {
            user_id: None,
            session_key: Some(session_key.as_str()),
        },
    };
    // A concurrent request may have created it in between; the partial unique
    // indexes turn that into a no-op and the re-read below finds the winner.
    diesel::insert_into(carts::table)
        .values(&new_cart)
        .on_conflict_do_nothing()
        .execute(conn)?;
    find_cart(conn, owner)?.ok_or(ShopError::NotFound("Cart"))
}

pub fn cart_items_of(conn: &mut PgConnection, cart_id: i32) -> QueryResult<Vec<CartItem>> {
    cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .order(cart_items::id.asc())
        .select(CartItem::as_select())
        .load(conn)
}

pub fn load_lines(conn: &mut PgConnection, cart_id: i32) -> QueryResult<Vec<(CartItem, Product)>> {
    cart_items::table
        .inner_join(products::table)
        .filter(cart_items::cart_id.eq(cart_id))
        .order(cart_items::id.asc())
        .select((CartItem::as_select(), Product::as_select()))
        .load(conn)
}

fn summarize(conn: &mut PgConnection, cart_id: i32) -> Result<CartSummary, ShopError> {
    let lines = load_lines(conn, cart_id)?;
    Ok(CartSummary::from_lines(cart_id, &lines))
}

pub fn get_summary(conn: &mut PgConnection, owner: &CartOwner) -> Result<CartSummary, ShopError> {
    match find_cart(conn, owner)? {
        Some(cart) => summarize(conn, cart.id),
        None => Ok(CartSummary::empty()),
    }
}

pub fn count_items(conn: &mut PgConnection, owner: &CartOwner) -> Result<i64, ShopError> {
    let Some(cart) = find_cart(conn, owner)? else {
        return Ok(0);
    };
    let total: Option<i64> = cart_items::table
        .filter(cart_items::cart_id.eq(cart.id))
        .select(diesel::dsl::sum(cart_items::quantity))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

fn touch(conn: &mut PgConnection, cart_id: i32) -> QueryResult<usize> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(Utc::now()))
        .execute(conn)
}

pub fn add_item(
    conn: &mut PgConnection,
    owner: &CartOwner,
    product_id: i32,
    quantity: i32,
) -> Result<CartSummary, ShopError> {
    if quantity < 1 {
        return Err(ShopError::validation("Quantity must be at least 1."));
    }
    conn.transaction(|conn| {
        let product = products::table
            .find(product_id)
            .select(Product::as_select())
            .first(conn)
            .optional()?
            .ok_or(ShopError::NotFound("Product"))?;
        let cart = get_or_create_cart(conn, owner)?;

        let existing = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .filter(cart_items::product_id.eq(product.id))
            .select(CartItem::as_select())
            .first(conn)
            .optional()?;

        let requested = existing
            .as_ref()
            .map_or(0, |item| item.quantity)
            .checked_add(quantity)
            .ok_or_else(|| ShopError::validation("Quantity is too large."))?;
        validate_stock(&product, requested)?;

        match existing {
            Some(item) => {
                diesel::update(cart_items::table.find(item.id))
                    .set((
                        cart_items::quantity.eq(requested),
                        cart_items::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }
            None => {
                diesel::insert_into(cart_items::table)
                    .values(&NewCartItem {
                        cart_id: cart.id,
                        product_id: product.id,
                        quantity,
                    })
                    .execute(conn)?;
            }
        }
        touch(conn, cart.id)?;
        summarize(conn, cart.id)
    })
}

fn owned_item(
    conn: &mut PgConnection,
    owner: &CartOwner,
    item_id: i32,
) -> Result<(Cart, CartItem), ShopError> {
    let cart = find_cart(conn, owner)?.ok_or(ShopError::NotFound("Cart item"))?;
    let item = cart_items::table
        .filter(cart_items::id.eq(item_id))
        .filter(cart_items::cart_id.eq(cart.id))
        .select(CartItem::as_select())
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("Cart item"))?;
    Ok((cart, item))
}

/// Sets a line's quantity. Zero or less removes the line.
pub fn update_item(
    conn: &mut PgConnection,
    owner: &CartOwner,
    item_id: i32,
    quantity: i32,
) -> Result<CartSummary, ShopError> {
    conn.transaction(|conn| {
        let (cart, item) = owned_item(conn, owner, item_id)?;
        if quantity <= 0 {
            diesel::delete(cart_items::table.find(item.id)).execute(conn)?;
        } else {
            let product = products::table
                .find(item.product_id)
                .select(Product::as_select())
                .first(conn)?;
            validate_stock(&product, quantity)?;
            diesel::update(cart_items::table.find(item.id))
                .set((
                    cart_items::quantity.eq(quantity),
                    cart_items::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }
        touch(conn, cart.id)?;
        summarize(conn, cart.id)
    })
}

pub fn remove_item(
    conn: &mut PgConnection,
    owner: &CartOwner,
    item_id: i32,
) -> Result<CartSummary, ShopError> {
    update_item(conn, owner, item_id, 0)
}

pub fn clear(conn: &mut PgConnection, owner: &CartOwner) -> Result<CartSummary, ShopError> {
    let Some(cart) = find_cart(conn, owner)? else {
        return Ok(CartSummary::empty());
    };
    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id))).execute(conn)?;
    touch(conn, cart.id)?;
    Ok(CartSummary::from_lines(cart.id, &[]))
}

/// What folding a guest cart into a user cart changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// User cart lines that gain the guest quantity: (line id, new quantity).
    pub increments: Vec<(i32, i32)>,
    /// Guest lines for products the user cart does not hold yet.
    pub moves: Vec<i32>,
}

pub fn plan_merge(user_items: &[CartItem], guest_items: &[CartItem]) -> MergePlan {
    let mut by_product: HashMap<i32, (i32, i32)> = user_items
        .iter()
        .map(|item| (item.product_id, (item.id, item.quantity)))
        .collect();

    let mut plan = MergePlan::default();
    for guest in guest_items {
        match by_product.get_mut(&guest.product_id) {
            Some((line_id, quantity)) => {
                *quantity = quantity.saturating_add(guest.quantity);
                match plan.increments.iter_mut().find(|entry| entry.0 == *line_id) {
                    Some(entry) => entry.1 = *quantity,
                    None => plan.increments.push((*line_id, *quantity)),
                }
            }
            None => plan.moves.push(guest.id),
        }
    }
    plan
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub guest_cart_id: i32,
    pub user_cart_id: i32,
    pub merged: usize,
    pub moved: usize,
}

/// Folds the cart of `session_key` into the cart of `user_id` and deletes
/// the guest cart. Returns `None` when the session had no cart.
pub fn merge_guest_cart(
    conn: &mut PgConnection,
    session_key: &str,
    user_id: i32,
) -> Result<Option<MergeOutcome>, ShopError> {
    conn.transaction(|conn| {
        let Some(guest_cart) = find_cart(conn, &CartOwner::Guest(session_key.to_owned()))? else {
            return Ok(None);
        };
        let user_cart = get_or_create_cart(conn, &CartOwner::User(user_id))?;

        let user_items = cart_items_of(conn, user_cart.id)?;
        let guest_items = cart_items_of(conn, guest_cart.id)?;
        let plan = plan_merge(&user_items, &guest_items);

        let now = Utc::now();
        for (line_id, quantity) in &plan.increments {
            diesel::update(cart_items::table.find(*line_id))
                .set((cart_items::quantity.eq(*quantity), cart_items::updated_at.eq(now)))
                .execute(conn)?;
        }
        if !plan.moves.is_empty() {
            diesel::update(cart_items::table.filter(cart_items::id.eq_any(&plan.moves)))
                .set((cart_items::cart_id.eq(user_cart.id), cart_items::updated_at.eq(now)))
                .execute(conn)?;
        }
        // Lines that were summed into the user cart go with the guest cart.
        diesel::delete(carts::table.find(guest_cart.id)).execute(conn)?;
        touch(conn, user_cart.id)?;

        let outcome = MergeOutcome {
            guest_cart_id: guest_cart.id,
            user_cart_id: user_cart.id,
            merged: plan.increments.len(),
            moved: plan.moves.len(),
        };
        tracing::info!(
            guest_cart_id = outcome.guest_cart_id,
            user_cart_id = outcome.user_cart_id,
            merged = outcome.merged,
            moved = outcome.moved,
            "merged guest cart"
        );
        Ok(Some(outcome))
    })
}
