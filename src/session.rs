//! Visitor sessions.
//!
//! Every client holds an opaque session key, sent either as the `sessionid`
//! cookie (browser) or the `X-Session-Key` header (mobile). The key maps to
//! a [`SessionData`] record in a [`SessionStore`]; guests own a cart through
//! their key, logged-in users through their user id.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponseBuilder};
use futures::future::LocalBoxFuture;
use r2d2_redis::{r2d2 as redis_r2d2, redis, RedisConnectionManager};
use uuid::Uuid;

use crate::carts::CartOwner;
use crate::error::ShopError;

pub const SESSION_COOKIE: &str = "sessionid";
pub const SESSION_HEADER: &str = "X-Session-Key";
const MAX_KEY_LEN: usize = 40;

pub type RedisPool = redis_r2d2::Pool<RedisConnectionManager>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionData {
    Guest,
    User(i32),
}

impl SessionData {
    fn encode(self) -> String {
        match self {
            SessionData::Guest => "guest".to_owned(),
            SessionData::User(id) => format!("user:{id}"),
        }
    }

    fn decode(raw: &str) -> Option<Self> {
        match raw {
            "guest" => Some(SessionData::Guest),
            _ => raw
                .strip_prefix("user:")
                .and_then(|id| id.parse().ok())
                .map(SessionData::User),
        }
    }

    pub fn user_id(self) -> Option<i32> {
        match self {
            SessionData::Guest => None,
            SessionData::User(id) => Some(id),
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<SessionData>, ShopError>;
    fn save(&self, key: &str, data: SessionData) -> Result<(), ShopError>;
    fn destroy(&self, key: &str) -> Result<(), ShopError>;
}

pub fn new_session_key() -> String {
    Uuid::new_v4().simple().to_string()
}

fn is_well_formed(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_LEN && key.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn initialize_redis_pool(redis_url: &str) -> Result<RedisPool, ShopError> {
    let manager = RedisConnectionManager::new(redis_url)?;
    redis_r2d2::Pool::builder()
        .build(manager)
        .map_err(|err| ShopError::Session(err.to_string()))
}

pub struct RedisSessionStore {
    pool: RedisPool,
    ttl: Duration,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool, ttl: Duration) -> Self {
        RedisSessionStore { pool, ttl }
    }

    fn connection(&self) -> Result<redis_r2d2::PooledConnection<RedisConnectionManager>, ShopError> {
        self.pool
            .get()
            .map_err(|err| ShopError::Session(err.to_string()))
    }
}

fn redis_key(key: &str) -> String {
    format!("session:{key}")
}

impl SessionStore for RedisSessionStore {
    fn load(&self, key: &str) -> Result<Option<SessionData>, ShopError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = redis::cmd("GET").arg(redis_key(key)).query(&mut *conn)?;
        Ok(raw.as_deref().and_then(SessionData::decode))
    }

    fn save(&self, key: &str, data: SessionData) -> Result<(), ShopError> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(redis_key(key))
            .arg(data.encode())
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    fn destroy(&self, key: &str) -> Result<(), ShopError> {
        let mut conn = self.connection()?;
        redis::cmd("DEL").arg(redis_key(key)).query::<()>(&mut *conn)?;
        Ok(())
    }
}

/// In-process store used when no Redis is configured. Sessions do not
/// survive a restart and are not shared between server processes.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, (SessionData, Instant)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        MemorySessionStore {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (SessionData, Instant)>>, ShopError> {
        self.entries
            .lock()
            .map_err(|_| ShopError::Session("memory session store poisoned".to_owned()))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<SessionData>, ShopError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((data, expires)) if *expires > Instant::now() => Ok(Some(*data)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, data: SessionData) -> Result<(), ShopError> {
        self.lock()?
            .insert(key.to_owned(), (data, Instant::now() + self.ttl));
        Ok(())
    }

    fn destroy(&self, key: &str) -> Result<(), ShopError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// The caller of a request: its session key and, once logged in, its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub session_key: String,
    pub user_id: Option<i32>,
    /// The session was created for this request and the client does not
    /// know its key yet.
    pub fresh: bool,
}

impl Visitor {
    pub fn require_user(&self) -> Result<i32, ShopError> {
        self.user_id.ok_or(ShopError::Unauthorized)
    }

    pub fn cart_owner(&self) -> CartOwner {
        match self.user_id {
            Some(id) => CartOwner::User(id),
            None => CartOwner::Guest(self.session_key.clone()),
        }
    }

    /// Hands a freshly created session key to the client.
    pub fn attach<'b>(&self, builder: &'b mut HttpResponseBuilder) -> &'b mut HttpResponseBuilder {
        if self.fresh {
            issue(builder, &self.session_key);
        }
        builder
    }
}

pub fn issue<'b>(builder: &'b mut HttpResponseBuilder, key: &str) -> &'b mut HttpResponseBuilder {
    builder
        .cookie(
            Cookie::build(SESSION_COOKIE, key.to_owned())
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish(),
        )
        .insert_header((SESSION_HEADER, key.to_owned()))
}

pub fn expire(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    builder.cookie(cookie)
}

fn presented_key(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    from_header
        .or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned()))
        .filter(|key| is_well_formed(key))
}

pub fn resolve(store: &dyn SessionStore, presented: Option<String>) -> Result<Visitor, ShopError> {
    if let Some(key) = presented {
        if let Some(data) = store.load(&key)? {
            return Ok(Visitor {
                session_key: key,
                user_id: data.user_id(),
                fresh: false,
            });
        }
    }
    let session_key = new_session_key();
    store.save(&session_key, SessionData::Guest)?;
    Ok(Visitor {
        session_key,
        user_id: None,
        fresh: true,
    })
}

impl FromRequest for Visitor {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let store = req.app_data::<web::Data<dyn SessionStore>>().cloned();
        let presented = presented_key(req);
        Box::pin(async move {
            let store = store
                .ok_or_else(|| ShopError::Session("no session store registered".to_owned()))?;
            let visitor = web::block(move || resolve(store.get_ref(), presented)).await??;
            Ok(visitor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemorySessionStore {
        MemorySessionStore::new(Duration::from_secs(60))
    }

    #[test]
    fn session_data_encoding_is_stable() {
        assert_eq!(SessionData::decode("guest"), Some(SessionData::Guest));
        assert_eq!(SessionData::decode("user:42"), Some(SessionData::User(42)));
        assert_eq!(SessionData::User(42).encode(), "user:42");
        assert_eq!(SessionData::decode("user:abc"), None);
        assert_eq!(SessionData::decode(""), None);
    }

    #[test]
    fn unknown_key_gets_a_fresh_guest_session() {
        let store = store();
        let visitor = resolve(&store, Some("doesnotexist".to_owned())).unwrap();
        assert!(visitor.fresh);
        assert_eq!(visitor.user_id, None);
        assert_ne!(visitor.session_key, "doesnotexist");
        assert_eq!(store.load(&visitor.session_key).unwrap(), Some(SessionData::Guest));
    }

    #[test]
    fn known_key_resolves_to_its_user() {
        let store = store();
        store.save("abc123", SessionData::User(7)).unwrap();
        let visitor = resolve(&store, Some("abc123".to_owned())).unwrap();
        assert!(!visitor.fresh);
        assert_eq!(visitor.require_user().unwrap(), 7);
        assert_eq!(visitor.cart_owner(), CartOwner::User(7));
    }

    #[test]
    fn guest_visitor_owns_cart_by_session_key() {
        let store = store();
        let visitor = resolve(&store, None).unwrap();
        assert!(matches!(visitor.require_user(), Err(ShopError::Unauthorized)));
        assert_eq!(visitor.cart_owner(), CartOwner::Guest(visitor.session_key.clone()));
    }

    #[test]
    fn expired_memory_sessions_vanish() {
        let store = MemorySessionStore::new(Duration::ZERO);
        store.save("k", SessionData::User(1)).unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn destroy_removes_session() {
        let store = store();
        store.save("k", SessionData::Guest).unwrap();
        store.destroy("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn malformed_keys_are_ignored() {
        assert!(is_well_formed(&new_session_key()));
        assert!(!is_well_formed("has spaces"));
        assert!(!is_well_formed(&"a".repeat(41)));
        assert!(!is_well_formed(""));
    }
}
