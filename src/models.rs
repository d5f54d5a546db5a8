use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::schema::{
    cart_items, carts, customers, order_items, orders, payments, product_ratings, product_types,
    products, shipping_addresses, stores, users,
};

#[derive(Queryable, Selectable, Identifiable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Customer {
    pub id: i32,
    pub user_id: i32,
    pub phone_number: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = product_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductType {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(ProductType))]
#[diesel(belongs_to(User, foreign_key = created_by))]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub product_type_id: i32,
    pub image_url: Option<String>,
    pub stock: i32,
    pub rating: Decimal,
    pub rating_count: i32,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A cart is owned by exactly one of `user_id` or `session_key`.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Cart {
    pub id: i32,
    pub user_id: Option<i32>,
    #[serde(skip_serializing)]
    pub session_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Cart))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItem {
    pub id: i32,
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = shipping_addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingAddress {
    pub id: i32,
    pub user_id: Option<i32>,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(ShippingAddress))]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: i32,
    pub user_id: Option<i32>,
    pub shipping_address_id: Option<i32>,
    pub status: String,
    pub total_price: Decimal,
    pub delivery_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line. `price` is the unit price copied from the product when the
/// order was placed and is never refreshed from the catalog.
#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Payment {
    pub id: i32,
    pub order_id: i32,
    pub method: String,
    pub status: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Clone, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Product))]
#[diesel(belongs_to(OrderItem))]
#[diesel(table_name = product_ratings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRating {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub order_item_id: i32,
    pub rating: i16,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = stores)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Store {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub store_hours: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_owned())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Lifecycle of an order, stored in `orders.status`.
    OrderStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Shipped => "SHIPPED",
        Completed => "COMPLETED",
        Canceled => "CANCELED",
    }
);

string_enum!(
    PaymentMethod {
        CreditCard => "CREDIT_CARD",
        BankTransfer => "BANK_TRANSFER",
        EWallet => "E_WALLET",
        CashOnDelivery => "COD",
    }
);

string_enum!(
    PaymentStatus {
        Pending => "PENDING",
        Success => "SUCCESS",
        Failed => "FAILED",
        Refunded => "REFUNDED",
    }
);
