//! Error type shared by the services and the HTTP handlers.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::r2d2::PoolError;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Insufficient stock for {product}: only {available} available.")]
    InsufficientStock { product: String, available: i32 },

    #[error("Authentication required.")]
    Unauthorized,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("This account has been disabled.")]
    AccountDisabled,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("session store error: {0}")]
    Session(String),

    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl ShopError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ShopError::Validation(msg.into())
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ShopError::Database(_)
                | ShopError::Pool(_)
                | ShopError::Session(_)
                | ShopError::PasswordHash(_)
        )
    }
}

impl From<diesel::result::Error> for ShopError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => ShopError::NotFound("Record"),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let message = match info.constraint_name() {
                    Some("unique_user_product_rating") => "You have already rated this product.",
                    Some("users_username_key") => "A user with that username already exists.",
                    Some("unique_cart_product") => "This product is already in your cart.",
                    _ => "Record already exists.",
                };
                ShopError::Conflict(message.to_owned())
            }
            other => ShopError::Database(other),
        }
    }
}

impl From<r2d2_redis::redis::RedisError> for ShopError {
    fn from(err: r2d2_redis::redis::RedisError) -> Self {
        ShopError::Session(err.to_string())
    }
}

impl ResponseError for ShopError {
    fn status_code(&self) -> StatusCode {
        match self {
            ShopError::Validation(_) | ShopError::EmptyCart | ShopError::InsufficientStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            ShopError::Unauthorized | ShopError::InvalidCredentials | ShopError::AccountDisabled => {
                StatusCode::UNAUTHORIZED
            }
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::Database(_)
            | ShopError::Pool(_)
            | ShopError::Session(_)
            | ShopError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            "Internal server error.".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn row_not_found_becomes_404() {
        let err = ShopError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unique_violation_becomes_409() {
        use diesel::result::{DatabaseErrorKind, Error};
        let err = ShopError::from(Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key value violates unique constraint")),
        ));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Record already exists.");

        let other = ShopError::from(Error::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new(String::from("violates foreign key constraint")),
        ));
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn business_errors_map_to_client_statuses() {
        let stock = ShopError::InsufficientStock {
            product: "Kiprun KS900".to_owned(),
            available: 1,
        };
        assert_eq!(stock.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            stock.to_string(),
            "Insufficient stock for Kiprun KS900: only 1 available."
        );
        assert_eq!(ShopError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ShopError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ShopError::Conflict("dup".into()).status_code(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn internal_errors_do_not_leak_detail() {
        let err = ShopError::Session("connection refused (os error 111)".to_owned());
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Internal server error.");
    }
}
