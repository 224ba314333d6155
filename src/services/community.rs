use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{AdminCommentView, CommentView, CommunityStats, User},
};

/// Community data store abstraction
///
/// Owns every read and write against locally persisted community data:
/// accounts, comments, and ratings. Catalog data never lives here; movies
/// are referenced by their external catalog id only.
///
/// Writes are single statements (or short statement sequences) and rely on
/// the database for atomicity; there are no cross-request transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Inserts a new account and returns the stored row
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> AppResult<User>;

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn user_by_id(&self, user_id: i64) -> AppResult<Option<User>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Deletes an account and, via cascades, its comments and ratings.
    /// Returns false when the id does not exist.
    async fn delete_user(&self, user_id: i64) -> AppResult<bool>;

    /// Stores a comment and returns it in display shape
    ///
    /// A `parent_id` must reference an existing comment on any movie;
    /// a dangling reference is rejected as invalid input.
    async fn add_comment(
        &self,
        user_id: i64,
        movie_id: i64,
        body: &str,
        parent_id: Option<i64>,
    ) -> AppResult<CommentView>;

    /// Lists a movie's comments, newest first
    async fn comments_for_movie(&self, movie_id: i64) -> AppResult<Vec<CommentView>>;

    /// Deletes a comment after verifying the requester wrote it
    async fn delete_comment_as_author(&self, comment_id: i64, requester_id: i64)
        -> AppResult<()>;

    /// Deletes a comment unconditionally. Returns false when the id does
    /// not exist.
    async fn delete_comment(&self, comment_id: i64) -> AppResult<bool>;

    /// Lists the most recent comments across all movies, newest first
    async fn recent_comments(&self, limit: i64) -> AppResult<Vec<AdminCommentView>>;

    /// Saves a score, replacing the user's previous score for that movie
    async fn rate_movie(&self, user_id: i64, movie_id: i64, score: i32) -> AppResult<()>;

    /// Returns movie ids ordered by mean score descending
    ///
    /// Ties break on ascending movie id so the ordering is deterministic.
    async fn top_rated_movie_ids(&self, limit: i64) -> AppResult<Vec<i64>>;

    /// Row counts for the moderation dashboard
    async fn stats(&self) -> AppResult<CommunityStats>;
}

/// PostgreSQL-backed community store
pub struct PgCommunityStore {
    pool: PgPool,
}

impl PgCommunityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn comment_view(&self, comment_id: i64) -> AppResult<CommentView> {
        let view = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.body, u.username AS author, c.user_id, c.parent_id, c.created_at,
                   COALESCE(r.score, 0) AS user_score
            FROM comments c
            JOIN users u ON u.id = c.user_id
            LEFT JOIN ratings r ON r.user_id = c.user_id AND r.movie_id = c.movie_id
            WHERE c.id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(view)
    }
}

#[async_trait]
impl CommunityStore for PgCommunityStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, is_admin
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User created");

        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn user_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, is_admin FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(user_id = user_id, "User deleted");
        }

        Ok(deleted)
    }

    async fn add_comment(
        &self,
        user_id: i64,
        movie_id: i64,
        body: &str,
        parent_id: Option<i64>,
    ) -> AppResult<CommentView> {
        if let Some(parent_id) = parent_id {
            let parent_exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)")
                    .bind(parent_id)
                    .fetch_one(&self.pool)
                    .await?;

            if !parent_exists {
                return Err(AppError::InvalidInput(
                    "Parent comment does not exist".to_string(),
                ));
            }
        }

        let comment_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments (user_id, movie_id, body, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(body)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            comment_id = comment_id,
            movie_id = movie_id,
            user_id = user_id,
            "Comment stored"
        );

        self.comment_view(comment_id).await
    }

    async fn comments_for_movie(&self, movie_id: i64) -> AppResult<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.body, u.username AS author, c.user_id, c.parent_id, c.created_at,
                   COALESCE(r.score, 0) AS user_score
            FROM comments c
            JOIN users u ON u.id = c.user_id
            LEFT JOIN ratings r ON r.user_id = c.user_id AND r.movie_id = c.movie_id
            WHERE c.movie_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn delete_comment_as_author(
        &self,
        comment_id: i64,
        requester_id: i64,
    ) -> AppResult<()> {
        let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;

        match owner {
            None => Err(AppError::NotFound("Comment not found".to_string())),
            Some(owner_id) if owner_id != requester_id => Err(AppError::Forbidden(
                "Only the author can delete this comment".to_string(),
            )),
            Some(_) => {
                sqlx::query("DELETE FROM comments WHERE id = $1")
                    .bind(comment_id)
                    .execute(&self.pool)
                    .await?;

                tracing::info!(comment_id = comment_id, "Comment deleted by author");

                Ok(())
            }
        }
    }

    async fn delete_comment(&self, comment_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recent_comments(&self, limit: i64) -> AppResult<Vec<AdminCommentView>> {
        let comments = sqlx::query_as::<_, AdminCommentView>(
            r#"
            SELECT c.id, c.body, u.username AS author, c.movie_id, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn rate_movie(&self, user_id: i64, movie_id: i64, score: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, movie_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, movie_id) DO UPDATE SET score = EXCLUDED.score
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(score)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = user_id,
            movie_id = movie_id,
            score = score,
            "Rating saved"
        );

        Ok(())
    }

    async fn top_rated_movie_ids(&self, limit: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT movie_id
            FROM ratings
            GROUP BY movie_id
            ORDER BY AVG(score) DESC, movie_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn stats(&self) -> AppResult<CommunityStats> {
        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        let ratings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ratings")
            .fetch_one(&self.pool)
            .await?;

        Ok(CommunityStats {
            users,
            comments,
            ratings,
        })
    }
}
