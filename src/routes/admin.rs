use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{AdminCommentView, CommunityStats, UserView};
use crate::routes::session::AdminUser;
use crate::routes::AppState;

/// How many comments the moderation dashboard shows
const RECENT_COMMENT_LIMIT: i64 = 50;

/// Handler for the dashboard stats endpoint
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<CommunityStats>> {
    let stats = state.store.stats().await?;

    Ok(Json(stats))
}

/// Handler for the recent comments endpoint
pub async fn recent_comments(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<AdminCommentView>>> {
    let comments = state.store.recent_comments(RECENT_COMMENT_LIMIT).await?;

    Ok(Json(comments))
}

/// Handler for the account list endpoint
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<UserView>>> {
    let users = state.store.list_users().await?;

    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// Handler for removing any comment
pub async fn delete_comment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    if !state.store.delete_comment(comment_id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    tracing::info!(
        comment_id = comment_id,
        admin_id = admin.id,
        "Comment removed by admin"
    );

    Ok(Json(json!({ "message": "Comment deleted" })))
}

/// Handler for removing an account along with its comments and ratings
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    if user_id == admin.id {
        return Err(AppError::InvalidInput(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !state.store.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(
        user_id = user_id,
        admin_id = admin.id,
        "User removed by admin"
    );

    Ok(Json(json!({ "message": "User deleted" })))
}
