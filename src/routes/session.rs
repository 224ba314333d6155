use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::error::AppError;
use crate::models::User;
use crate::routes::AppState;
use crate::services::auth::SESSION_TTL_SECS;

/// Name of the cookie holding the signed session token
pub const SESSION_COOKIE: &str = "session";

/// Builds the Set-Cookie value issued at login
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

/// Builds the Set-Cookie value that ends a session
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax",
        SESSION_COOKIE
    )
}

/// Pulls the session token out of the Cookie header, if present
fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;

    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Extractor for handlers that require a signed-in account
///
/// The account row is reloaded from the store on every request so
/// privilege changes and deletions take effect immediately.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let user_id = state
            .sessions
            .verify(&token)
            .ok_or_else(|| AppError::Unauthorized("Session is invalid or expired".to_string()))?;

        let user = state
            .store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session is invalid or expired".to_string()))?;

        Ok(CurrentUser(user))
    }
}

/// Extractor for handlers that adapt to an optional session
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id =
            session_token(&parts.headers).and_then(|token| state.sessions.verify(&token));

        match user_id {
            Some(user_id) => Ok(MaybeUser(state.store.user_by_id(user_id).await?)),
            None => Ok(MaybeUser(None)),
        }
    }
}

/// Extractor for moderation handlers
///
/// The admin flag comes from the freshly loaded account row, never from
/// the token, so a revoked admin loses access on their next request.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_token_found_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; session=abc.def.ghi; lang=en");

        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_session_token_absent() {
        let headers = headers_with_cookie("theme=dark");

        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok");

        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_clear_session_cookie_expires_immediately() {
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
