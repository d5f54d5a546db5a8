//! App state for handler tests. The pool is never connected, so only paths
//! that answer before touching the database can be exercised here.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use becathlon::config::Settings;
use becathlon::db::DbPool;
use becathlon::delivery::DeliveryTimeline;
use becathlon::session::{MemorySessionStore, SessionStore};
use diesel::pg::PgConnection;
use diesel::r2d2;

pub fn state() -> (web::Data<DbPool>, web::Data<dyn SessionStore>, web::Data<Settings>) {
    let manager = r2d2::ConnectionManager::<PgConnection>::new("postgres://localhost:1/unused");
    let pool = r2d2::Pool::builder()
        .connection_timeout(Duration::from_millis(200))
        .build_unchecked(manager);
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
    let settings = Settings {
        database_url: "postgres://localhost:1/unused".to_owned(),
        redis_url: None,
        host: "127.0.0.1".to_owned(),
        port: 0,
        db_pool_size: 1,
        session_ttl: Duration::from_secs(60),
        delivery: DeliveryTimeline::default(),
    };
    (
        web::Data::new(pool),
        web::Data::from(store),
        web::Data::new(settings),
    )
}
