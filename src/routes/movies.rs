use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Genre, MoviePage};
use crate::routes::AppState;
use crate::services::{BrowseFilter, BrowseRequest, ChatReply};

/// Query parameters accepted by the listing endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    query: Option<String>,
    genre_id: Option<i32>,
    page: Option<u32>,
    filter_type: Option<BrowseFilter>,
}

/// Handler for the movie listing endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> AppResult<Json<MoviePage>> {
    let request = BrowseRequest {
        query: params.query.filter(|q| !q.trim().is_empty()),
        genre_id: params.genre_id,
        page: params.page.unwrap_or(1).max(1),
        filter: params.filter_type.unwrap_or_default(),
    };

    let page = state.recommender.browse(request).await?;

    Ok(Json(page))
}

/// Handler for the genre index endpoint
pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.catalog.genre_list().await?;

    Ok(Json(genres))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    message: Option<String>,
}

/// Handler for the conversational recommendation endpoint
pub async fn chatbot(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Message is required".to_string()))?
        .to_string();

    let reply = match state.recommender.chat(&message).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "Chat recommendation failed");
            return Err(AppError::AiServiceUnavailable);
        }
    };

    Ok(Json(reply))
}
