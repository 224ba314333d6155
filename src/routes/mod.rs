use axum::{
    http::{header, Method, StatusCode},
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{propagate_request_id, request_span};

pub mod account;
pub mod admin;
pub mod community;
pub mod movies;
pub mod session;
pub mod state;

pub use state::AppState;

/// Creates the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    // Credentialed CORS forbids the wildcard origin, so the browser
    // origin is pinned to the configured front end.
    let cors = CorsLayer::new()
        .allow_origin(state.cors_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(propagate_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(cors),
        )
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog and recommendations
        .route("/recommend", get(movies::recommend))
        .route("/genres", get(movies::genres))
        .route("/chatbot", post(movies::chatbot))
        // Accounts and sessions
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/logout", post(account::logout))
        .route("/current_user", get(account::current_user))
        // Community
        .route(
            "/comments/:id",
            get(community::comments_for_movie).delete(community::delete_comment),
        )
        .route("/comments", post(community::create_comment))
        .route("/rate", post(community::rate))
        // Moderation
        .route("/admin/stats", get(admin::stats))
        .route("/admin/comments", get(admin::recent_comments))
        .route("/admin/comments/:id", delete(admin::delete_comment))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", delete(admin::delete_user))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
