use chrono::{DateTime, Utc};
use diesel::Insertable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::schema::{
    cart_items, carts, customers, order_items, orders, payments, product_ratings, products,
    shipping_addresses, users,
};

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub user_id: i32,
}

#[derive(Insertable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub product_type_id: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(skip_deserializing)]
    pub created_by: i32,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = carts)]
pub struct NewCart<'a> {
    pub user_id: Option<i32>,
    pub session_key: Option<&'a str>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = cart_items)]
pub struct NewCartItem {
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}

/// Checkout form. Required fields arrive as empty strings when the client
/// leaves them out, so validation can report every missing field at once.
#[derive(Insertable, Serialize, Deserialize, Clone, Debug, Default)]
#[diesel(table_name = shipping_addresses)]
pub struct NewShippingAddress {
    #[serde(skip_deserializing)]
    pub user_id: Option<i32>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "Indonesia".to_owned()
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = orders)]
pub struct NewOrder<'a> {
    pub user_id: Option<i32>,
    pub shipping_address_id: Option<i32>,
    pub status: &'a str,
    pub total_price: Decimal,
    pub delivery_started_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = payments)]
pub struct NewPayment<'a> {
    pub order_id: i32,
    pub method: &'a str,
    pub status: &'a str,
    pub transaction_id: String,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = product_ratings)]
pub struct NewProductRating<'a> {
    pub user_id: i32,
    pub product_id: i32,
    pub order_item_id: i32,
    pub rating: i16,
    pub review: &'a str,
}
