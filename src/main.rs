use std::sync::Arc;

use axum::http::HeaderValue;
use tracing_subscriber::EnvFilter;

use cinematch_api::config::Config;
use cinematch_api::db;
use cinematch_api::routes::{create_router, AppState};
use cinematch_api::services::{
    auth, GeminiSuggestions, PgCommunityStore, SessionKeys, TmdbCatalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinematch_api=info,tower_http=info")),
        )
        .init();

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let store = Arc::new(PgCommunityStore::new(pool));

    // Seed the moderation account when one is configured.
    if let (Some(username), Some(email), Some(password)) = (
        config.admin_username.as_deref(),
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
    ) {
        auth::ensure_admin(store.as_ref(), username, email, password).await?;
    }

    let catalog = Arc::new(TmdbCatalog::new(&config)?);
    let suggestions = Arc::new(GeminiSuggestions::new(&config)?);
    let sessions = SessionKeys::new(&config.session_secret);
    let cors_origin: HeaderValue = config
        .allowed_origin
        .parse()
        .map_err(|_| anyhow::anyhow!("ALLOWED_ORIGIN is not a valid header value"))?;

    let state = AppState::new(catalog, suggestions, store, sessions, cors_origin);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "cinematch API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
