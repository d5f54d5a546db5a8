use becathlon::accounts::hash_password;
use becathlon::db::{establish_connection, run_migrations};
use becathlon::insertables::{NewCustomer, NewProduct, NewUser};
use becathlon::schema::{customers, product_types, products, stores, users};
use diesel::insert_into;
use diesel::prelude::*;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::error::Error;
use std::{env, fs};

const DEMO_USERNAME: &str = "testuser";
const DEMO_PASSWORD: &str = "testpass123";

#[derive(Deserialize, Insertable)]
#[diesel(table_name = product_types)]
struct ProductType {
    name: String,
    description: String,
}

#[derive(Deserialize)]
struct Product {
    name: String,
    description: String,
    price: Decimal,
    product_type: String,
    stock: i32,
}

#[derive(Deserialize, Insertable)]
#[diesel(table_name = stores)]
struct Store {
    name: String,
    address: String,
    city: String,
    country: String,
    latitude: f64,
    longitude: f64,
    store_hours: String,
}

fn read_fixture<T: for<'de> Deserialize<'de>>(name: &str) -> Result<Vec<T>, Box<dyn Error>> {
    let raw = fs::read_to_string(format!("src/bin/{name}.json"))?;
    Ok(serde_json::from_str(&raw)?)
}

fn demo_user(conn: &mut PgConnection) -> Result<i32, Box<dyn Error>> {
    let existing: Option<i32> = users::table
        .filter(users::username.eq(DEMO_USERNAME))
        .select(users::id)
        .first(conn)
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = insert_into(users::table)
        .values(&NewUser {
            username: DEMO_USERNAME.to_owned(),
            email: "testuser@example.com".to_owned(),
            password_hash: hash_password(DEMO_PASSWORD)?,
        })
        .returning(users::id)
        .get_result(conn)?;
    insert_into(customers::table)
        .values(&NewCustomer { user_id: id })
        .execute(conn)?;
    println!("created demo user {DEMO_USERNAME} / {DEMO_PASSWORD}");
    Ok(id)
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")?;
    let connection = &mut establish_connection(&database_url)?;
    run_migrations(connection).map_err(|err| err.to_string())?;

    let types: Vec<ProductType> = read_fixture("product_types")?;
    let added = insert_into(product_types::table)
        .values(&types)
        .on_conflict(product_types::name)
        .do_nothing()
        .execute(connection)?;
    println!("product types: {added} added");

    let user_id = demo_user(connection)?;

    let product_count: i64 = products::table.count().get_result(connection)?;
    if product_count == 0 {
        let type_ids: Vec<(i32, String)> = product_types::table
            .select((product_types::id, product_types::name))
            .load(connection)?;
        let fixtures: Vec<Product> = read_fixture("products")?;
        let mut new_products = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            let Some((type_id, _)) = type_ids.iter().find(|(_, name)| *name == fixture.product_type)
            else {
                return Err(format!("unknown product type `{}`", fixture.product_type).into());
            };
            new_products.push(NewProduct {
                name: fixture.name,
                description: fixture.description,
                price: fixture.price,
                product_type_id: *type_id,
                image_url: None,
                stock: fixture.stock,
                created_by: user_id,
            });
        }
        let added = insert_into(products::table)
            .values(&new_products)
            .execute(connection)?;
        println!("products: {added} added");
    }

    let store_count: i64 = stores::table.count().get_result(connection)?;
    if store_count == 0 {
        let fixtures: Vec<Store> = read_fixture("stores")?;
        let added = insert_into(stores::table)
            .values(&fixtures)
            .execute(connection)?;
        println!("stores: {added} added");
    }
    Ok(())
}
