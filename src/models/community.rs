use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A registered account row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Account shape exposed to administrators, without credentials
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// A comment joined with its author and the author's rating for the movie
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub body: String,
    pub author: String,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    #[serde(rename = "timestamp", serialize_with = "serialize_minute")]
    pub created_at: DateTime<Utc>,
    /// Author's score for this movie, 0 when unrated
    pub user_score: i32,
}

/// Comment shape for the moderation dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminCommentView {
    pub id: i64,
    pub body: String,
    pub author: String,
    pub movie_id: i64,
    #[serde(rename = "timestamp", serialize_with = "serialize_minute")]
    pub created_at: DateTime<Utc>,
}

/// Row counts shown on the moderation dashboard
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommunityStats {
    pub users: i64,
    pub comments: i64,
    pub ratings: i64,
}

// Timestamps are rendered minute-precise for display rather than as RFC 3339.
fn serialize_minute<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_comment_view_serializes_minute_precision_timestamp() {
        let view = CommentView {
            id: 7,
            body: "Great pacing".to_string(),
            author: "kim".to_string(),
            user_id: 3,
            parent_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 17, 9, 5, 42).unwrap(),
            user_score: 8,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["timestamp"], "2024-05-17 09:05");
        assert!(json.get("created_at").is_none());
        assert_eq!(json["user_score"], 8);
    }

    #[test]
    fn test_user_view_drops_password_hash() {
        let user = User {
            id: 1,
            username: "kim".to_string(),
            email: "kim@example.com".to_string(),
            password_hash: "argon2-hash".to_string(),
            is_admin: true,
        };

        let view: UserView = user.into();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["username"], "kim");
        assert_eq!(json["is_admin"], true);
        assert!(json.get("password_hash").is_none());
    }
}
