//! Sign-up, credential checks and user lookups.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::insertables::{NewCustomer, NewUser};
use crate::models::User;
use crate::schema::{customers, users};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;
const MAX_EMAIL_LEN: usize = 254;

#[derive(Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ShopError> {
    let username = req.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ShopError::validation(
            "Username must be between 1 and 150 characters.",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        return Err(ShopError::validation(
            "Username may contain only letters, digits and @/./+/-/_ characters.",
        ));
    }
    let email = req.email.trim();
    if !email.is_empty() && !email.contains('@') {
        return Err(ShopError::validation("Enter a valid email address."));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ShopError::validation(
            "Email must be at most 254 characters.",
        ));
    }
    if req.password1 != req.password2 {
        return Err(ShopError::validation("The two password fields didn't match."));
    }
    if req.password1.chars().count() < MIN_PASSWORD_LEN {
        return Err(ShopError::validation(
            "Password must be at least 8 characters.",
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ShopError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ShopError::PasswordHash(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, ShopError> {
    let parsed = PasswordHash::new(stored).map_err(|err| ShopError::PasswordHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Creates the user together with an empty customer profile.
pub fn register(conn: &mut PgConnection, req: &SignupRequest) -> Result<User, ShopError> {
    validate_signup(req)?;
    let password_hash = hash_password(&req.password1)?;
    let username = req.username.trim().to_owned();

    conn.transaction(|conn| {
        let taken: i64 = users::table
            .filter(users::username.eq(&username))
            .count()
            .get_result(conn)?;
        if taken > 0 {
            return Err(ShopError::Conflict(
                "A user with that username already exists.".to_owned(),
            ));
        }

        let user = diesel::insert_into(users::table)
            .values(&NewUser {
                username: username.clone(),
                email: req.email.trim().to_owned(),
                password_hash,
            })
            .returning(User::as_returning())
            .get_result(conn)?;
        diesel::insert_into(customers::table)
            .values(&NewCustomer { user_id: user.id })
            .execute(conn)?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    })
}

pub fn authenticate(conn: &mut PgConnection, req: &LoginRequest) -> Result<User, ShopError> {
    let user = users::table
        .filter(users::username.eq(req.username.trim()))
        .select(User::as_select())
        .first(conn)
        .optional()?;
    let Some(user) = user else {
        tracing::warn!(username = %req.username, "login failed: unknown user");
        return Err(ShopError::InvalidCredentials);
    };
    if !verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "login failed: wrong password");
        return Err(ShopError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(ShopError::AccountDisabled);
    }
    Ok(user)
}

pub fn get_user(conn: &mut PgConnection, user_id: i32) -> Result<User, ShopError> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or(ShopError::NotFound("User"))
}
