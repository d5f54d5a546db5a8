use actix_web::{delete, get, post, web, HttpResponse, Responder, Result};
use becathlon::catalog::{self, ProductFilter, ProductFilterParams};
use becathlon::db::DbPool;
use becathlon::insertables::NewProduct;
use becathlon::ratings;
use becathlon::response::ApiResponse;
use becathlon::session::Visitor;

#[get("/product-types")]
async fn get_product_types(pool: web::Data<DbPool>) -> Result<impl Responder> {
    let types = web::block(move || {
        let mut conn = pool.get()?;
        catalog::list_product_types(&mut conn)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(types)))
}

#[get("/products")]
async fn get_products(
    pool: web::Data<DbPool>,
    params: web::Query<ProductFilterParams>,
) -> Result<impl Responder> {
    let filter = ProductFilter::from(params.into_inner());
    let page = web::block(move || {
        let mut conn = pool.get()?;
        catalog::list_products(&mut conn, &filter)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

#[get("/products/{product_id}")]
async fn get_product(pool: web::Data<DbPool>, product_id: web::Path<i32>) -> Result<impl Responder> {
    let detail = web::block(move || {
        let mut conn = pool.get()?;
        catalog::product_detail(&mut conn, *product_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(detail)))
}

#[get("/products/{product_id}/quick-view")]
async fn quick_view(pool: web::Data<DbPool>, product_id: web::Path<i32>) -> Result<impl Responder> {
    let view = web::block(move || {
        let mut conn = pool.get()?;
        catalog::quick_view(&mut conn, *product_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

#[get("/products/{product_id}/ratings")]
async fn get_product_ratings(
    pool: web::Data<DbPool>,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    let list = web::block(move || {
        let mut conn = pool.get()?;
        ratings::list_ratings(&mut conn, *product_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[post("/products")]
async fn create_product(
    pool: web::Data<DbPool>,
    visitor: Visitor,
    form: web::Json<NewProduct>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    catalog::validate_new_product(&form)?;
    let product = web::block(move || {
        let mut conn = pool.get()?;
        catalog::create_product(&mut conn, user_id, form.into_inner())
    })
    .await??;
    Ok(HttpResponse::Created().json(ApiResponse::with_message("Product created.", product)))
}

#[delete("/products/{product_id}")]
async fn delete_product(
    pool: web::Data<DbPool>,
    visitor: Visitor,
    product_id: web::Path<i32>,
) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    web::block(move || {
        let mut conn = pool.get()?;
        catalog::delete_product(&mut conn, user_id, *product_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Product deleted.")))
}
