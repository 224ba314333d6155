use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{Movie, MoviePage},
    services::{
        catalog::{ListFilter, MovieCatalog},
        community::CommunityStore,
        suggestions::{Suggestion, SuggestionEngine, PICKED_MESSAGE},
    },
};

/// How many community favorites make up the community_top listing
const COMMUNITY_TOP_LIMIT: i64 = 20;

/// Message shown when titles were suggested but none matched the catalog
pub const NO_MATCHES_MESSAGE: &str =
    "I couldn't find those movies in the catalog, please try again.";

/// Listing variants a client can ask the aggregator for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseFilter {
    #[default]
    Popular,
    TopRated,
    CommunityTop,
}

/// A normalized listing request
#[derive(Debug, Clone)]
pub struct BrowseRequest {
    pub query: Option<String>,
    pub genre_id: Option<i32>,
    pub page: u32,
    pub filter: BrowseFilter,
}

/// Resolved chat recommendations plus the conversational message
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub recommendations: Vec<Movie>,
    pub message: String,
}

/// Recommendation aggregator
///
/// Combines the catalog, the suggestion engine, and community ratings into
/// the two read paths the API exposes: browsable listings and chat replies.
/// Single-movie lookups fan out as parallel tasks; a failed lookup drops
/// that movie from the result instead of failing the request.
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn MovieCatalog>,
    suggestions: Arc<dyn SuggestionEngine>,
    store: Arc<dyn CommunityStore>,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        suggestions: Arc<dyn SuggestionEngine>,
        store: Arc<dyn CommunityStore>,
    ) -> Self {
        Self {
            catalog,
            suggestions,
            store,
        }
    }

    /// Serves one listing page for the requested mode
    ///
    /// The community_top filter wins over every other parameter; otherwise
    /// the catalog applies its own query-over-genre-over-filter precedence.
    pub async fn browse(&self, request: BrowseRequest) -> AppResult<MoviePage> {
        let listing = match request.filter {
            BrowseFilter::CommunityTop => return self.community_top().await,
            BrowseFilter::Popular => ListFilter::Popular,
            BrowseFilter::TopRated => ListFilter::TopRated,
        };

        self.catalog
            .get_movies(
                request.query.as_deref(),
                request.genre_id,
                request.page,
                listing,
            )
            .await
    }

    /// Resolves the community's best-rated movies against the catalog
    async fn community_top(&self) -> AppResult<MoviePage> {
        let movie_ids = self.store.top_rated_movie_ids(COMMUNITY_TOP_LIMIT).await?;

        if movie_ids.is_empty() {
            tracing::debug!("No community ratings yet");
            return Ok(MoviePage {
                results: Vec::new(),
                total_pages: 0,
            });
        }

        let mut tasks = Vec::with_capacity(movie_ids.len());
        for movie_id in &movie_ids {
            let catalog = Arc::clone(&self.catalog);
            let movie_id = *movie_id;
            tasks.push(tokio::spawn(async move {
                catalog.movie_by_id(movie_id).await
            }));
        }

        // Await in spawn order so the store's ranking survives
        let mut results = Vec::new();
        for (movie_id, task) in movie_ids.iter().zip(tasks) {
            match task.await {
                Ok(Ok(Some(movie))) => results.push(movie),
                Ok(Ok(None)) => {
                    tracing::warn!(movie_id = *movie_id, "Rated movie missing from catalog");
                }
                Ok(Err(e)) => {
                    tracing::warn!(movie_id = *movie_id, error = %e, "Favorite lookup failed");
                }
                Err(e) => {
                    tracing::warn!(movie_id = *movie_id, error = %e, "Favorite lookup task failed");
                }
            }
        }

        tracing::info!(
            rated = movie_ids.len(),
            resolved = results.len(),
            "Community favorites resolved"
        );

        Ok(MoviePage {
            results,
            total_pages: 1,
        })
    }

    /// Turns a chat message into catalog-backed recommendations
    pub async fn chat(&self, user_message: &str) -> AppResult<ChatReply> {
        let Suggestion { titles, message } = self.suggestions.suggest_titles(user_message).await?;

        if titles.is_empty() {
            return Ok(ChatReply {
                recommendations: Vec::new(),
                message,
            });
        }

        tracing::info!(titles = titles.len(), "Resolving suggested titles");

        let mut tasks = Vec::with_capacity(titles.len());
        for title in &titles {
            let catalog = Arc::clone(&self.catalog);
            let title = title.clone();
            tasks.push(tokio::spawn(
                async move { catalog.search_first(&title).await },
            ));
        }

        // Await in spawn order so replies keep the model's ordering
        let mut recommendations = Vec::new();
        for (title, task) in titles.iter().zip(tasks) {
            match task.await {
                Ok(Ok(Some(movie))) => recommendations.push(movie),
                Ok(Ok(None)) => {
                    tracing::debug!(title = %title, "Suggested title not in catalog");
                }
                Ok(Err(e)) => {
                    tracing::warn!(title = %title, error = %e, "Suggested title lookup failed");
                }
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "Title lookup task failed");
                }
            }
        }

        let message = if recommendations.is_empty() && message == PICKED_MESSAGE {
            NO_MATCHES_MESSAGE.to_string()
        } else {
            message
        };

        Ok(ChatReply {
            recommendations,
            message,
        })
    }
}
