use actix_web::{get, post, web, HttpResponse, Responder, Result};
use becathlon::config::Settings;
use becathlon::db::DbPool;
use becathlon::orders::{self, CheckoutRequest};
use becathlon::ratings::{self, RatingRequest};
use becathlon::response::ApiResponse;
use becathlon::session::Visitor;
use chrono::Utc;

#[post("/checkout")]
async fn checkout(
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
    visitor: Visitor,
    form: web::Json<CheckoutRequest>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    orders::validate_address(&form.address)?;
    orders::parse_payment_method(form.payment_method.as_deref())?;
    let timeline = settings.delivery;
    let detail = web::block(move || {
        let mut conn = pool.get()?;
        orders::checkout(&mut conn, user_id, form.into_inner(), &timeline)
    })
    .await??;
    let message = format!("Order #{} placed successfully!", detail.order.id);
    Ok(HttpResponse::Created().json(ApiResponse::with_message(message, detail)))
}

#[get("/orders")]
async fn get_orders(
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
    visitor: Visitor,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    let timeline = settings.delivery;
    let list = web::block(move || {
        let mut conn = pool.get()?;
        orders::list_orders(&mut conn, user_id, &timeline, Utc::now())
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[get("/orders/{order_id}")]
async fn get_order(
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
    visitor: Visitor,
    order_id: web::Path<i32>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    let timeline = settings.delivery;
    let detail = web::block(move || {
        let mut conn = pool.get()?;
        orders::order_detail(&mut conn, user_id, *order_id, &timeline, Utc::now())
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(detail)))
}

#[get("/orders/{order_id}/status")]
async fn get_delivery_status(
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
    visitor: Visitor,
    order_id: web::Path<i32>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    let timeline = settings.delivery;
    let progress = web::block(move || {
        let mut conn = pool.get()?;
        orders::delivery_status(&mut conn, user_id, *order_id, &timeline, Utc::now())
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(progress)))
}

#[post("/orders/{order_id}/rate")]
async fn rate_product(
    pool: web::Data<DbPool>,
    settings: web::Data<Settings>,
    visitor: Visitor,
    order_id: web::Path<i32>,
    form: web::Json<RatingRequest>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    let timeline = settings.delivery;
    let rating = web::block(move || {
        let mut conn = pool.get()?;
        ratings::submit_rating(&mut conn, user_id, *order_id, &form, &timeline, Utc::now())
    })
    .await??;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "Rating submitted successfully!",
        rating,
    )))
}
