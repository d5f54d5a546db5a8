mod controllers {
    pub mod carts;
    pub mod orders;
    pub mod products;
    pub mod stores;
    pub mod users;
    #[cfg(test)]
    pub mod testing;
}
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use becathlon::config::Settings;
use becathlon::db::{initialize_db_pool, run_migrations};
use becathlon::error::ShopError;
use becathlon::logging::setup_tracing;
use becathlon::session::{
    initialize_redis_pool, MemorySessionStore, RedisSessionStore, SessionStore,
};
use controllers::{carts, orders, products, stores, users};
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;

/// Every endpoint, relative to its mount point.
fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users::signup)
        .service(users::login)
        .service(users::logout)
        .service(users::me)
        .service(products::get_product_types)
        .service(products::get_products)
        .service(products::create_product)
        .service(products::get_product)
        .service(products::quick_view)
        .service(products::get_product_ratings)
        .service(products::delete_product)
        .service(carts::get_cart)
        .service(carts::get_cart_count)
        .service(carts::add_to_cart)
        .service(carts::update_cart_item)
        .service(carts::remove_cart_item)
        .service(carts::clear_cart)
        .service(orders::checkout)
        .service(orders::get_orders)
        .service(orders::get_order)
        .service(orders::get_delivery_status)
        .service(orders::rate_product)
        .service(stores::get_stores)
        .service(stores::get_store);
}

/// Browser clients use `/api`, the mobile app `/mobile/api`; both see the
/// same handlers and the same JSON envelope.
pub(crate) fn api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ShopError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ShopError::validation(err.to_string()).into()),
    )
    .service(web::scope("/api").configure(routes))
    .service(web::scope("/mobile/api").configure(routes));
}

fn session_store(settings: &Settings) -> Result<Arc<dyn SessionStore>, ShopError> {
    match &settings.redis_url {
        Some(url) => {
            let pool = initialize_redis_pool(url)?;
            tracing::info!("sessions stored in redis");
            Ok(Arc::new(RedisSessionStore::new(pool, settings.session_ttl)))
        }
        None => {
            tracing::warn!("REDIS_URL not set, sessions kept in process memory");
            Ok(Arc::new(MemorySessionStore::new(settings.session_ttl)))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    setup_tracing();

    let settings = Settings::from_env().map_err(io::Error::other)?;
    let db_pool = initialize_db_pool(&settings.database_url, settings.db_pool_size)
        .map_err(io::Error::other)?;
    {
        let mut conn = db_pool.get().map_err(io::Error::other)?;
        let applied = run_migrations(&mut conn).map_err(io::Error::other)?;
        tracing::info!(applied, "database migrations checked");
    }
    let store = web::Data::from(session_store(&settings).map_err(io::Error::other)?);

    let bind = (settings.host.clone(), settings.port);
    let settings = web::Data::new(settings);
    let db_pool = web::Data::new(db_pool);
    tracing::info!(host = %bind.0, port = bind.1, "starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db_pool.clone())
            .app_data(store.clone())
            .app_data(settings.clone())
            .configure(api)
    })
    .bind(bind)?
    .run()
    .await
}
