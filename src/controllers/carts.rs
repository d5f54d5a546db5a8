use actix_web::{delete, get, post, web, HttpResponse, Responder, Result};
use becathlon::carts;
use becathlon::db::DbPool;
use becathlon::error::ShopError;
use becathlon::response::ApiResponse;
use becathlon::session::Visitor;
use serde::{Deserialize, Serialize};

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize)]
struct AddItemDto {
    product_id: i32,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

#[derive(Deserialize)]
struct UpdateItemDto {
    quantity: i32,
}

#[derive(Serialize)]
struct CartCount {
    count: i64,
}

#[get("/cart")]
async fn get_cart(pool: web::Data<DbPool>, visitor: Visitor) -> Result<impl Responder> {
    let owner = visitor.cart_owner();
    let summary = web::block(move || {
        let mut conn = pool.get()?;
        carts::get_summary(&mut conn, &owner)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::ok(summary)))
}

#[get("/cart/count")]
async fn get_cart_count(pool: web::Data<DbPool>, visitor: Visitor) -> Result<impl Responder> {
    let owner = visitor.cart_owner();
    let count = web::block(move || {
        let mut conn = pool.get()?;
        carts::count_items(&mut conn, &owner)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::ok(CartCount { count })))
}

#[post("/cart/items")]
async fn add_to_cart(
    pool: web::Data<DbPool>,
    visitor: Visitor,
    form: web::Json<AddItemDto>,
) -> Result<impl Responder> {
    if form.quantity < 1 {
        return Err(ShopError::validation("Quantity must be at least 1.").into());
    }
    let owner = visitor.cart_owner();
    let summary = web::block(move || {
        let mut conn = pool.get()?;
        carts::add_item(&mut conn, &owner, form.product_id, form.quantity)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::with_message("Item added to cart.", summary)))
}

#[post("/cart/items/{item_id}")]
async fn update_cart_item(
    pool: web::Data<DbPool>,
    visitor: Visitor,
    item_id: web::Path<i32>,
    form: web::Json<UpdateItemDto>,
) -> Result<impl Responder> {
    let owner = visitor.cart_owner();
    let summary = web::block(move || {
        let mut conn = pool.get()?;
        carts::update_item(&mut conn, &owner, *item_id, form.quantity)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::with_message("Cart updated.", summary)))
}

#[delete("/cart/items/{item_id}")]
async fn remove_cart_item(
    pool: web::Data<DbPool>,
    visitor: Visitor,
    item_id: web::Path<i32>,
) -> Result<impl Responder> {
    let owner = visitor.cart_owner();
    let summary = web::block(move || {
        let mut conn = pool.get()?;
        carts::remove_item(&mut conn, &owner, *item_id)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::with_message("Item removed from cart.", summary)))
}

#[post("/cart/clear")]
async fn clear_cart(pool: web::Data<DbPool>, visitor: Visitor) -> Result<impl Responder> {
    let owner = visitor.cart_owner();
    let summary = web::block(move || {
        let mut conn = pool.get()?;
        carts::clear(&mut conn, &owner)
    })
    .await??;
    Ok(visitor
        .attach(&mut HttpResponse::Ok())
        .json(ApiResponse::with_message("Cart cleared.", summary)))
}
