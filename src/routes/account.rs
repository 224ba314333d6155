use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::routes::session::{clear_session_cookie, session_cookie, MaybeUser};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Handler for the registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Response> {
    let user = state
        .accounts
        .register(&request.username, &request.email, &request.password)
        .await?;

    let body = Json(json!({
        "message": format!("Account {} created", user.username),
    }));

    Ok((StatusCode::CREATED, body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Handler for the login endpoint; sets the session cookie
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Response> {
    let user = state
        .accounts
        .login(&request.username, &request.password)
        .await?;
    let token = state.sessions.issue(user.id)?;

    let body = Json(json!({ "id": user.id, "username": user.username }));

    Ok(([(header::SET_COOKIE, session_cookie(&token))], body).into_response())
}

/// Handler for the logout endpoint; expires the session cookie
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

/// Handler for the session probe endpoint
///
/// Anonymous callers get `{"username": null}` with status 200 so the
/// front end can render the signed-out shell without error handling.
pub async fn current_user(MaybeUser(user): MaybeUser) -> Json<serde_json::Value> {
    match user {
        Some(user) => Json(json!({
            "id": user.id,
            "username": user.username,
            "is_admin": user.is_admin,
        })),
        None => Json(json!({ "username": null })),
    }
}
