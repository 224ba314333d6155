use std::sync::Arc;

use axum::http::HeaderValue;

use crate::services::{
    AccountService, CommunityStore, MovieCatalog, Recommender, SessionKeys, SuggestionEngine,
};

/// Shared application state
///
/// External clients and the store sit behind trait objects so tests can
/// swap them without touching the router.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn MovieCatalog>,
    pub store: Arc<dyn CommunityStore>,
    pub recommender: Recommender,
    pub accounts: AccountService,
    pub sessions: Arc<SessionKeys>,
    pub cors_origin: HeaderValue,
}

impl AppState {
    /// Wires the shared services into one cloneable state
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        suggestions: Arc<dyn SuggestionEngine>,
        store: Arc<dyn CommunityStore>,
        sessions: SessionKeys,
        cors_origin: HeaderValue,
    ) -> Self {
        Self {
            recommender: Recommender::new(Arc::clone(&catalog), suggestions, Arc::clone(&store)),
            accounts: AccountService::new(Arc::clone(&store)),
            catalog,
            store,
            sessions: Arc::new(sessions),
            cors_origin,
        }
    }
}
