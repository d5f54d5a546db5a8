pub mod accounts;
pub mod carts;
pub mod catalog;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod insertables;
pub mod logging;
pub mod models;
pub mod orders;
pub mod ratings;
pub mod response;
pub mod schema;
pub mod session;
pub mod stores;
