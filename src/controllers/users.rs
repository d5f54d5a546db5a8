use actix_web::{get, post, web, HttpResponse, Responder, Result};
use becathlon::accounts::{self, LoginRequest, SignupRequest, UserView};
use becathlon::carts::merge_guest_cart;
use becathlon::db::DbPool;
use becathlon::error::ShopError;
use becathlon::response::ApiResponse;
use becathlon::session::{self, new_session_key, SessionData, SessionStore, Visitor};
use serde::Serialize;

#[derive(Serialize)]
struct LoginView {
    user: UserView,
    session_key: String,
}

#[post("/signup")]
async fn signup(pool: web::Data<DbPool>, form: web::Json<SignupRequest>) -> Result<impl Responder> {
    accounts::validate_signup(&form)?;
    let user = web::block(move || {
        let mut conn = pool.get()?;
        accounts::register(&mut conn, &form)
    })
    .await??;
    let message = format!("Account created for {}! You can now log in.", user.username);
    Ok(HttpResponse::Created().json(ApiResponse::with_message(message, UserView::from(user))))
}

/// Verifies credentials, folds the session's guest cart into the user's
/// cart and swaps the session key.
#[post("/login")]
async fn login(
    pool: web::Data<DbPool>,
    store: web::Data<dyn SessionStore>,
    visitor: Visitor,
    form: web::Json<LoginRequest>,
) -> Result<impl Responder> {
    let (user, session_key) = web::block(move || {
        let mut conn = pool.get()?;
        let user = accounts::authenticate(&mut conn, &form)?;
        if visitor.user_id.is_none() {
            merge_guest_cart(&mut conn, &visitor.session_key, user.id)?;
        }
        let session_key = new_session_key();
        store.save(&session_key, SessionData::User(user.id))?;
        store.destroy(&visitor.session_key)?;
        Ok::<_, ShopError>((user, session_key))
    })
    .await??;
    tracing::info!(user_id = user.id, "user logged in");

    let message = format!("Welcome back, {}!", user.username);
    let body = ApiResponse::with_message(
        message,
        LoginView {
            user: UserView::from(user),
            session_key: session_key.clone(),
        },
    );
    Ok(session::issue(&mut HttpResponse::Ok(), &session_key).json(body))
}

#[post("/logout")]
async fn logout(store: web::Data<dyn SessionStore>, visitor: Visitor) -> Result<impl Responder> {
    let user_id = visitor.user_id;
    web::block(move || store.destroy(&visitor.session_key)).await??;
    if let Some(user_id) = user_id {
        tracing::info!(user_id, "user logged out");
    }
    Ok(session::expire(&mut HttpResponse::Ok())
        .json(ApiResponse::message("You have been logged out successfully.")))
}

#[get("/me")]
async fn me(pool: web::Data<DbPool>, visitor: Visitor) -> Result<impl Responder> {
    let user_id = visitor.require_user()?;
    let user = web::block(move || {
        let mut conn = pool.get()?;
        accounts::get_user(&mut conn, user_id)
    })
    .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(UserView::from(user))))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::controllers::testing;

    #[actix_web::test]
    async fn me_requires_login() {
        let (pool, store, settings) = testing::state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(store)
                .app_data(settings)
                .configure(crate::api),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Authentication required.");
    }

    #[actix_web::test]
    async fn signup_with_mismatched_passwords_is_rejected() {
        let (pool, store, settings) = testing::state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(store)
                .app_data(settings)
                .configure(crate::api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/mobile/api/signup")
            .set_json(json!({
                "username": "newuser",
                "email": "new@example.com",
                "password1": "secretpass1",
                "password2": "secretpass2"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "The two password fields didn't match.");
    }

    #[actix_web::test]
    async fn logout_clears_the_session_cookie() {
        let (pool, store, settings) = testing::state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(store)
                .app_data(settings)
                .configure(crate::api),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == becathlon::session::SESSION_COOKIE)
            .expect("removal cookie");
        assert_eq!(cookie.value(), "");
    }
}
