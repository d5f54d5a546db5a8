use actix_web::{get, web, HttpResponse, Responder, Result};
use becathlon::db::DbPool;
use becathlon::response::ApiResponse;
use becathlon::stores::{self, StoreQuery, StoreQueryParams};

#[get("/stores")]
async fn get_stores(
    pool: web::Data<DbPool>,
    params: web::Query<StoreQueryParams>,
) -> Result<impl Responder> {
    let query = StoreQuery::from(params.into_inner());
    let found = web::block(move || {
        let mut conn = pool.get()?;
        stores::search_stores(&mut conn, &query)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(found)))
}

#[get("/stores/{store_id}")]
async fn get_store(pool: web::Data<DbPool>, store_id: web::Path<i32>) -> Result<impl Responder> {
    let store = web::block(move || {
        let mut conn = pool.get()?;
        stores::get_store(&mut conn, *store_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(store)))
}
