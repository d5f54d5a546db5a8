//! Checkout and order history.
//!
//! [`create_order_from_cart`] is the only place stock is decremented. It locks
//! the affected product rows (`SELECT ... FOR UPDATE`, in id order so two
//! checkouts cannot deadlock), checks every line before writing anything and
//! copies each product's current price onto the order line.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::carts::cart_items_of;
use crate::delivery::{DeliveryProgress, DeliveryTimeline};
use crate::error::ShopError;
use crate::insertables::{NewOrder, NewOrderItem, NewPayment, NewShippingAddress};
use crate::models::{
    Cart, CartItem, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus, Product,
    ShippingAddress,
};
use crate::schema::{carts, order_items, orders, payments, products, shipping_addresses};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub address: NewShippingAddress,
    #[serde(default)]
    pub payment_method: Option<String>,
}

pub fn validate_address(address: &NewShippingAddress) -> Result<(), ShopError> {
    let required = [
        ("full_name", &address.full_name),
        ("phone_number", &address.phone_number),
        ("address_line1", &address.address_line1),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ShopError::validation(format!(
            "Missing required fields: {}.",
            missing.join(", ")
        )));
    }

    let limits = [
        ("full_name", &address.full_name, 100),
        ("phone_number", &address.phone_number, 20),
        ("address_line1", &address.address_line1, 255),
        ("address_line2", &address.address_line2, 255),
        ("city", &address.city, 100),
        ("state", &address.state, 100),
        ("postal_code", &address.postal_code, 20),
        ("country", &address.country, 100),
    ];
    if let Some((name, _, max)) = limits
        .iter()
        .find(|(_, value, max)| value.chars().count() > *max)
    {
        return Err(ShopError::validation(format!(
            "{name} must be at most {max} characters."
        )));
    }
    Ok(())
}

pub fn parse_payment_method(raw: Option<&str>) -> Result<PaymentMethod, ShopError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(PaymentMethod::CreditCard),
        Some(raw) => raw
            .parse()
            .map_err(|_| ShopError::validation("Invalid payment method.")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: i32,
    pub quantity: i32,
    /// Unit price snapshot.
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Decimal,
}

/// Checks stock for every cart line against the (locked) product rows and
/// prices the order. Nothing is written; any shortage rejects the whole cart.
pub fn plan_order(lines: &[(CartItem, Product)]) -> Result<OrderPlan, ShopError> {
    if lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }
    let mut planned = Vec::with_capacity(lines.len());
    for (item, product) in lines {
        if product.stock < item.quantity {
            tracing::warn!(
                product_id = product.id,
                requested = item.quantity,
                available = product.stock,
                "insufficient stock at checkout"
            );
            return Err(ShopError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }
        planned.push(PlannedLine {
            product_id: product.id,
            quantity: item.quantity,
            price: product.price,
            subtotal: product.price * Decimal::from(item.quantity),
        });
    }
    let total = planned.iter().map(|line| line.subtotal).sum();
    Ok(OrderPlan {
        lines: planned,
        total,
    })
}

/// Locks the cart row so one cart converts into at most one order. A cart
/// deleted by a concurrent checkout is gone once the lock is granted.
fn lock_cart(conn: &mut PgConnection, cart_id: i32) -> QueryResult<Option<Cart>> {
    carts::table
        .find(cart_id)
        .select(Cart::as_select())
        .for_update()
        .first(conn)
        .optional()
}

fn lock_user_cart(conn: &mut PgConnection, user_id: i32) -> QueryResult<Option<Cart>> {
    carts::table
        .filter(carts::user_id.eq(user_id))
        .select(Cart::as_select())
        .for_update()
        .first(conn)
        .optional()
}

fn lock_products(conn: &mut PgConnection, product_ids: &[i32]) -> QueryResult<Vec<Product>> {
    products::table
        .filter(products::id.eq_any(product_ids))
        .order(products::id.asc())
        .select(Product::as_select())
        .for_update()
        .load(conn)
}

/// Turns `cart` into a `PENDING` order and deletes the cart. Runs in its own
/// transaction (a savepoint when the caller already holds one).
pub fn create_order_from_cart(
    conn: &mut PgConnection,
    cart: &Cart,
    shipping_address_id: Option<i32>,
) -> Result<(Order, Vec<OrderItem>), ShopError> {
    conn.transaction(|conn| {
        let cart = lock_cart(conn, cart.id)?.ok_or(ShopError::EmptyCart)?;
        let items = cart_items_of(conn, cart.id)?;
        if items.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let mut product_ids: Vec<i32> = items.iter().map(|item| item.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let mut locked: HashMap<i32, Product> = lock_products(conn, &product_ids)?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = locked
                .remove(&item.product_id)
                .ok_or(ShopError::NotFound("Product"))?;
            lines.push((item, product));
        }
        let plan = plan_order(&lines)?;

        let now = Utc::now();
        for line in &plan.lines {
            diesel::update(products::table.find(line.product_id))
                .set((
                    products::stock.eq(products::stock - line.quantity),
                    products::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        let order: Order = diesel::insert_into(orders::table)
            .values(&NewOrder {
                user_id: cart.user_id,
                shipping_address_id,
                status: OrderStatus::Pending.as_str(),
                total_price: plan.total,
                delivery_started_at: None,
            })
            .returning(Order::as_returning())
            .get_result(conn)?;

        let new_items: Vec<NewOrderItem> = plan
            .lines
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                subtotal: line.subtotal,
            })
            .collect();
        let created_items: Vec<OrderItem> = diesel::insert_into(order_items::table)
            .values(&new_items)
            .returning(OrderItem::as_returning())
            .get_results(conn)?;

        let deleted = diesel::delete(carts::table.find(cart.id)).execute(conn)?;
        if deleted != 1 {
            return Err(ShopError::EmptyCart);
        }

        Ok((order, created_items))
    })
}

/// Marks the order paid and starts its delivery clock.
pub fn start_delivery_tracking(
    conn: &mut PgConnection,
    order_id: i32,
    now: DateTime<Utc>,
) -> QueryResult<Order> {
    diesel::update(orders::table.find(order_id))
        .set((
            orders::status.eq(OrderStatus::Paid.as_str()),
            orders::delivery_started_at.eq(Some(now)),
            orders::updated_at.eq(now),
        ))
        .returning(Order::as_returning())
        .get_result(conn)
}

fn transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Full checkout for a logged-in user: address, order, mock payment and
/// delivery tracking, all or nothing.
pub fn checkout(
    conn: &mut PgConnection,
    user_id: i32,
    request: CheckoutRequest,
    timeline: &DeliveryTimeline,
) -> Result<OrderDetail, ShopError> {
    validate_address(&request.address)?;
    let method = parse_payment_method(request.payment_method.as_deref())?;

    let order_id = conn.transaction(|conn| {
        let cart = lock_user_cart(conn, user_id)?.ok_or(ShopError::EmptyCart)?;

        let address: ShippingAddress = diesel::insert_into(shipping_addresses::table)
            .values(&NewShippingAddress {
                user_id: Some(user_id),
                ..request.address
            })
            .returning(ShippingAddress::as_returning())
            .get_result(conn)?;

        let (order, _) = create_order_from_cart(conn, &cart, Some(address.id))?;

        let now = Utc::now();
        diesel::insert_into(payments::table)
            .values(&NewPayment {
                order_id: order.id,
                method: method.as_str(),
                status: PaymentStatus::Success.as_str(),
                transaction_id: transaction_id(),
                amount: order.total_price,
                paid_at: Some(now),
            })
            .execute(conn)?;
        let order = start_delivery_tracking(conn, order.id, now)?;

        tracing::info!(
            order_id = order.id,
            user_id,
            total = %order.total_price,
            payment_method = method.as_str(),
            "order created"
        );
        Ok::<_, ShopError>(order.id)
    })?;

    order_detail(conn, user_id, order_id, timeline, Utc::now())
}

#[derive(Serialize, Debug, Clone)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub total_items: i64,
    pub item_count: usize,
    pub delivery: DeliveryProgress,
}

#[derive(Serialize, Debug, Clone)]
pub struct OrderLine {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Serialize, Debug, Clone)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub total_items: i64,
    pub shipping_address: Option<ShippingAddress>,
    pub payment: Option<Payment>,
    pub delivery: DeliveryProgress,
}

pub fn list_orders(
    conn: &mut PgConnection,
    user_id: i32,
    timeline: &DeliveryTimeline,
    now: DateTime<Utc>,
) -> Result<Vec<OrderSummary>, ShopError> {
    let user_orders = orders::table
        .filter(orders::user_id.eq(user_id))
        .order((orders::created_at.desc(), orders::id.desc()))
        .select(Order::as_select())
        .load(conn)?;
    let items = OrderItem::belonging_to(&user_orders)
        .select(OrderItem::as_select())
        .load(conn)?;

    let summaries = items
        .grouped_by(&user_orders)
        .into_iter()
        .zip(user_orders)
        .map(|(items, order)| OrderSummary {
            total_items: items.iter().map(|i| i64::from(i.quantity)).sum(),
            item_count: items.len(),
            delivery: timeline.progress(order.delivery_started_at, now),
            order,
        })
        .collect();
    Ok(summaries)
}

fn owned_order(conn: &mut PgConnection, user_id: i32, order_id: i32) -> Result<Order, ShopError> {
    orders::table
        .find(order_id)
        .filter(orders::user_id.eq(user_id))
        .select(Order::as_select())
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("Order"))
}

pub fn order_detail(
    conn: &mut PgConnection,
    user_id: i32,
    order_id: i32,
    timeline: &DeliveryTimeline,
    now: DateTime<Utc>,
) -> Result<OrderDetail, ShopError> {
    let order = owned_order(conn, user_id, order_id)?;

    let lines: Vec<(OrderItem, String)> = order_items::table
        .inner_join(products::table)
        .filter(order_items::order_id.eq(order.id))
        .order(order_items::id.asc())
        .select((OrderItem::as_select(), products::name))
        .load(conn)?;
    let items: Vec<OrderLine> = lines
        .into_iter()
        .map(|(item, product_name)| OrderLine {
            id: item.id,
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
        })
        .collect();

    let shipping_address = match order.shipping_address_id {
        Some(address_id) => shipping_addresses::table
            .find(address_id)
            .select(ShippingAddress::as_select())
            .first(conn)
            .optional()?,
        None => None,
    };
    let payment = Payment::belonging_to(&order)
        .select(Payment::as_select())
        .first(conn)
        .optional()?;

    Ok(OrderDetail {
        total_items: items.iter().map(|i| i64::from(i.quantity)).sum(),
        items,
        shipping_address,
        payment,
        delivery: timeline.progress(order.delivery_started_at, now),
        order,
    })
}

pub fn delivery_status(
    conn: &mut PgConnection,
    user_id: i32,
    order_id: i32,
    timeline: &DeliveryTimeline,
    now: DateTime<Utc>,
) -> Result<DeliveryProgress, ShopError> {
    let order = owned_order(conn, user_id, order_id)?;
    Ok(timeline.progress(order.delivery_started_at, now))
}
