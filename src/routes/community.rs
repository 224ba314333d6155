use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::CommentView;
use crate::routes::session::CurrentUser;
use crate::routes::AppState;

/// Longest accepted comment body, matching the column width
const MAX_COMMENT_LEN: usize = 500;

const MIN_SCORE: i32 = 1;
const MAX_SCORE: i32 = 10;

/// Handler for listing a movie's comments, newest first
pub async fn comments_for_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Vec<CommentView>>> {
    let comments = state.store.comments_for_movie(movie_id).await?;

    Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    movie_id: Option<i64>,
    content: Option<String>,
    parent_id: Option<i64>,
}

/// Handler for posting a comment or a reply
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let movie_id = request
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("Movie id is required".to_string()))?;

    let body = request
        .content
        .as_deref()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Comment text is required".to_string()))?;

    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::InvalidInput("Comment is too long".to_string()));
    }

    let view = state
        .store
        .add_comment(user.id, movie_id, body, request.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Handler for deleting one's own comment
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .store
        .delete_comment_as_author(comment_id, user.id)
        .await?;

    Ok(Json(json!({ "message": "Comment deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    movie_id: Option<i64>,
    score: Option<i32>,
}

/// Handler for saving a rating; rating a movie again replaces the score
pub async fn rate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let movie_id = request
        .movie_id
        .ok_or_else(|| AppError::InvalidInput("Movie id is required".to_string()))?;

    let score = request
        .score
        .filter(|score| (MIN_SCORE..=MAX_SCORE).contains(score))
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Score must be between {} and {}",
                MIN_SCORE, MAX_SCORE
            ))
        })?;

    state.store.rate_movie(user.id, movie_id, score).await?;

    Ok(Json(json!({ "message": "Rating saved" })))
}
