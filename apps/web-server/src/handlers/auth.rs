//! Account handlers: signup, login and logout.

use actix_web::{
    HttpResponse,
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    http::header,
    web,
};
use serde::Serialize;

use postboard_core::forms::{FormErrors, LoginForm, SignupForm, safe_next};
use postboard_core::services::SignupOutcome;
use postboard_shared::dto::{AuthResponse, NextQuery};

use super::redirect;
use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const SIGNUP_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "username",
    "email",
    "password1",
    "password2",
];
const LOGIN_FIELDS: &[&str] = &["username", "password"];
const BAD_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Submitted signup values, passwords left out.
#[derive(Serialize)]
struct SignupEcho {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
}

#[derive(Serialize)]
struct SignupFormView {
    fields: &'static [&'static str],
    errors: FormErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<SignupEcho>,
}

#[derive(Serialize)]
struct LoginFormView {
    fields: &'static [&'static str],
    errors: FormErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

/// GET /auth/signup/
pub async fn signup_form() -> HttpResponse {
    HttpResponse::Ok().json(SignupFormView {
        fields: SIGNUP_FIELDS,
        errors: FormErrors::default(),
        form: None,
    })
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match state.accounts.signup(&form).await? {
        SignupOutcome::Created(_) => Ok(redirect("/")),
        SignupOutcome::Invalid(errors) => {
            Ok(HttpResponse::UnprocessableEntity().json(SignupFormView {
                fields: SIGNUP_FIELDS,
                errors,
                form: Some(SignupEcho {
                    first_name: form.first_name,
                    last_name: form.last_name,
                    username: form.username,
                    email: form.email,
                }),
            }))
        }
    }
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> HttpResponse {
    HttpResponse::Ok().json(LoginFormView {
        fields: LOGIN_FIELDS,
        errors: FormErrors::default(),
        next: safe_next(query.next.as_deref()),
        username: None,
    })
}

/// POST /auth/login/
///
/// Issues a session token, both in the body and as an HTTP-only cookie, and
/// redirects to `next` (or `/`).
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref());

    let Some(user) = state
        .accounts
        .authenticate(&form.username, &form.password)
        .await?
    else {
        tracing::info!(username = %form.username, "Failed login");
        let mut errors = FormErrors::default();
        errors.add("__all__", BAD_LOGIN);
        return Ok(HttpResponse::UnprocessableEntity().json(LoginFormView {
            fields: LOGIN_FIELDS,
            errors,
            next,
            username: Some(form.username),
        }));
    };

    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let expires_in = state.tokens.expiration_seconds();
    let redirect_to = next.unwrap_or_else(|| "/".to_string());

    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(expires_in))
        .finish();

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, redirect_to.as_str()))
        .cookie(cookie)
        .json(AuthResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in,
            redirect_to,
        }))
}

/// GET /auth/logout/
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "status": "logged_out" }))
}
