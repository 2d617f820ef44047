//! Authentication extractors.
//!
//! The session token is read from `Authorization: Bearer <token>` or from the
//! `access_token` cookie set at login. Routes that take [`Identity`] send
//! guests to the login page with a `next` parameter pointing back.

use actix_web::{
    FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, http::StatusCode,
    http::header, web,
};
use std::future::Future;
use std::pin::Pin;

use postboard_core::domain::User;
use postboard_core::ports::{AuthError, BaseRepository};

use crate::state::AppState;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "access_token";

/// The signed-in user.
///
/// ```ignore
/// async fn post_create(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn user_id(&self) -> uuid::Uuid {
        self.user.id
    }
}

/// Sends the client to the login page, remembering where it was going.
#[derive(Debug, thiserror::Error)]
#[error("login required: {reason}")]
pub struct LoginRedirect {
    login_url: String,
    next: String,
    reason: AuthError,
}

impl LoginRedirect {
    pub fn location(&self) -> String {
        format!("{}?next={}", self.login_url, encode_next(&self.next))
    }
}

impl ResponseError for LoginRedirect {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, self.location()))
            .finish()
    }
}

/// Percent-encode a local path for use as a query value. `/` stays readable.
fn encode_next(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn bearer_or_cookie(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;
        return value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()));
    }

    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingAuth)
}

impl FromRequest for Identity {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
            tracing::error!("AppState not found in app data");
            return Box::pin(async {
                Err::<Self, _>(actix_web::error::ErrorInternalServerError(
                    "Server configuration error",
                ))
            });
        };

        let next = match req.uri().path_and_query() {
            Some(pq) => pq.as_str().to_string(),
            None => req.path().to_string(),
        };
        let redirect = {
            let login_url = state.site.login_url.clone();
            move |reason: AuthError| -> actix_web::Error {
                tracing::debug!(%next, %reason, "Redirecting guest to login");
                LoginRedirect {
                    login_url,
                    next,
                    reason,
                }
                .into()
            }
        };

        let claims = bearer_or_cookie(req).and_then(|token| state.tokens.validate_token(&token));

        Box::pin(async move {
            let claims = match claims {
                Ok(claims) => claims,
                Err(reason) => return Err(redirect(reason)),
            };

            match state.users.find_by_id(claims.user_id).await {
                Ok(Some(user)) => Ok(Identity { user }),
                Ok(None) => Err(redirect(AuthError::InvalidToken(
                    "Account no longer exists".to_string(),
                ))),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load session user");
                    Err(actix_web::error::ErrorInternalServerError("Database error"))
                }
            }
        })
    }
}

/// Optional identity extractor - guests get `None` instead of a redirect.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(Identity::user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let identity = Identity::from_request(req, payload);
        Box::pin(async move { Ok(OptionalIdentity(identity.await.ok())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_location_keeps_path_readable() {
        let redirect = LoginRedirect {
            login_url: "/auth/login/".to_string(),
            next: "/create/".to_string(),
            reason: AuthError::MissingAuth,
        };

        assert_eq!(redirect.location(), "/auth/login/?next=/create/");
    }

    #[test]
    fn test_query_in_next_is_encoded() {
        assert_eq!(encode_next("/follow/?page=2"), "/follow/%3Fpage%3D2");
    }
}
