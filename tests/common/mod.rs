#![allow(dead_code)]

use becathlon::db::run_migrations;
use becathlon::insertables::{NewProduct, NewUser};
use becathlon::models::{Product, ProductType, User};
use becathlon::schema::{product_types, products, users};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use std::env;

/// Connection inside a transaction that is never committed. `None` when
/// `TEST_DATABASE_URL` is not set, in which case the test is skipped.
pub fn connection() -> Option<PgConnection> {
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let mut conn = PgConnection::establish(&url).expect("connect to test database");
    run_migrations(&mut conn).expect("run migrations");
    conn.begin_test_transaction().expect("begin test transaction");
    Some(conn)
}

/// Database URL for tests that commit, with migrations applied. `None`
/// skips the test like [`connection`].
pub fn committed_database_url() -> Option<String> {
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let mut conn = PgConnection::establish(&url).expect("connect to test database");
    run_migrations(&mut conn).expect("run migrations");
    Some(url)
}

/// Autocommit connection. Rows written here are visible to other
/// connections and must be cleaned up by the test.
pub fn committed_connection(url: &str) -> PgConnection {
    PgConnection::establish(url).expect("connect to test database")
}

pub fn user(conn: &mut PgConnection, username: &str) -> User {
    diesel::insert_into(users::table)
        .values(&NewUser {
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password_hash: "unused".to_owned(),
        })
        .returning(User::as_returning())
        .get_result(conn)
        .expect("insert user")
}

pub fn product_type(conn: &mut PgConnection, name: &str) -> ProductType {
    diesel::insert_into(product_types::table)
        .values((product_types::name.eq(name), product_types::description.eq("")))
        .returning(ProductType::as_returning())
        .get_result(conn)
        .expect("insert product type")
}

pub fn product(
    conn: &mut PgConnection,
    product_type: &ProductType,
    creator: &User,
    name: &str,
    price: Decimal,
    stock: i32,
) -> Product {
    diesel::insert_into(products::table)
        .values(&NewProduct {
            name: name.to_owned(),
            description: format!("{name} description"),
            price,
            product_type_id: product_type.id,
            image_url: None,
            stock,
            created_by: creator.id,
        })
        .returning(Product::as_returning())
        .get_result(conn)
        .expect("insert product")
}

pub fn stock_of(conn: &mut PgConnection, product_id: i32) -> i32 {
    products::table
        .find(product_id)
        .select(products::stock)
        .first(conn)
        .expect("product stock")
}

pub fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
