use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::ValidateEmail;

use crate::{
    error::{AppError, AppResult},
    models::User,
    services::community::CommunityStore,
};

/// Sessions stay valid for one week
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// Column widths in the users table; VARCHAR counts characters, not bytes.
const MAX_USERNAME_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 120;

// Login failures share one message so responses cannot confirm which
// accounts exist.
const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Registrations from throwaway inboxes are rejected outright
const EMAIL_DENYLIST: &[&str] = &[
    "mailinator",
    "tempmail",
    "10minutemail",
    "guerrillamail",
    "sharklasers",
];

/// Hashes a password with Argon2 and a fresh random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash; malformed hashes never match
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Lowercases and trims an email address for storage and comparison
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validates registration input and returns the normalized email
fn validate_registration(username: &str, email: &str, password: &str) -> AppResult<String> {
    if username.is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username, email and password are required".to_string(),
        ));
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidInput("Username is too long".to_string()));
    }

    let email = normalize_email(email);

    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::InvalidInput(
            "Email address is too long".to_string(),
        ));
    }

    if !email.validate_email() {
        return Err(AppError::InvalidInput(
            "Email address is not valid".to_string(),
        ));
    }

    if EMAIL_DENYLIST.iter().any(|provider| email.contains(provider)) {
        return Err(AppError::InvalidInput(
            "Disposable email addresses are not allowed".to_string(),
        ));
    }

    Ok(email)
}

/// Registration and login flows on top of the community store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CommunityStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn CommunityStore>) -> Self {
        Self { store }
    }

    /// Validates input and creates a new non-admin account
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        let email = validate_registration(username, email, password)?;

        if self.store.user_by_username(username).await?.is_some() {
            return Err(AppError::InvalidInput(
                "Username is already taken".to_string(),
            ));
        }

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(AppError::InvalidInput(
                "Email address is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;

        self.store
            .create_user(username, &email, &password_hash, false)
            .await
    }

    /// Checks credentials, returning one uniform error on any mismatch
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self.store.user_by_username(username.trim()).await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash) => {
                tracing::info!(user_id = user.id, "Login succeeded");
                Ok(user)
            }
            _ => Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string())),
        }
    }
}

/// Creates the configured admin account when it does not exist yet
pub async fn ensure_admin(
    store: &dyn CommunityStore,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<()> {
    if store.user_by_username(username).await?.is_some() {
        tracing::debug!(username = %username, "Admin account already present");
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let user = store
        .create_user(username, &normalize_email(email), &password_hash, true)
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Admin account seeded");

    Ok(())
}

/// Signing and verification keys for session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: i64,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a signed token for the account
    pub fn issue(&self, user_id: i64) -> AppResult<String> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: Utc::now().timestamp() + SESSION_TTL_SECS,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Returns the account id for a valid, unexpired token
    pub fn verify(&self, token: &str) -> Option<i64> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default()).ok()?;
        data.claims.sub.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::community::MockCommunityStore;

    fn test_user(id: i64, username: &str, password: &str) -> User {
        User {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(password).unwrap(),
            is_admin: false,
        }
    }

    #[test]
    fn test_hash_and_verify_password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();

        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Kim@Example.COM "), "kim@example.com");
    }

    #[test]
    fn test_validate_registration_requires_all_fields() {
        assert!(validate_registration("", "kim@example.com", "pw").is_err());
        assert!(validate_registration("kim", "", "pw").is_err());
        assert!(validate_registration("kim", "kim@example.com", "").is_err());
    }

    #[test]
    fn test_validate_registration_rejects_bad_format() {
        let result = validate_registration("kim", "not-an-email", "pw");

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("not valid")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_registration_rejects_disposable_domains() {
        let result = validate_registration("kim", "kim@mailinator.com", "pw");

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("Disposable")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_registration_rejects_overlong_username() {
        let username = "k".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_registration(&username, "kim@example.com", "pw").is_err());
    }

    #[test]
    fn test_validate_registration_counts_characters_not_bytes() {
        let username = "ü".repeat(MAX_USERNAME_LEN);
        assert!(validate_registration(&username, "kim@example.com", "pw").is_ok());

        let username = "ü".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_registration(&username, "kim@example.com", "pw").is_err());
    }

    #[test]
    fn test_validate_registration_rejects_overlong_email() {
        let email = format!("{}@example.com", "k".repeat(MAX_EMAIL_LEN));
        let result = validate_registration("kim", &email, "pw");

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("too long")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_registration_normalizes_email() {
        let email = validate_registration("kim", "  Kim@Example.COM ", "pw").unwrap();
        assert_eq!(email, "kim@example.com");
    }

    #[test]
    fn test_session_token_roundtrip() {
        let keys = SessionKeys::new("test-secret");
        let token = keys.issue(42).unwrap();

        assert_eq!(keys.verify(&token), Some(42));
    }

    #[test]
    fn test_session_token_rejects_other_key() {
        let keys = SessionKeys::new("test-secret");
        let other = SessionKeys::new("other-secret");
        let token = keys.issue(42).unwrap();

        assert_eq!(other.verify(&token), None);
    }

    #[test]
    fn test_session_token_rejects_garbage() {
        let keys = SessionKeys::new("test-secret");
        assert_eq!(keys.verify("definitely.not.ajwt"), None);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let mut store = MockCommunityStore::new();
        store
            .expect_user_by_username()
            .returning(|_| Ok(Some(test_user(1, "kim", "pw"))));

        let accounts = AccountService::new(Arc::new(store));
        let result = accounts.register("kim", "kim@example.com", "pw").await;

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("Username")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_registered_email() {
        let mut store = MockCommunityStore::new();
        store.expect_user_by_username().returning(|_| Ok(None));
        store
            .expect_user_by_email()
            .returning(|_| Ok(Some(test_user(1, "someone", "pw"))));

        let accounts = AccountService::new(Arc::new(store));
        let result = accounts.register("kim", "kim@example.com", "pw").await;

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("Email")),
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let mut store = MockCommunityStore::new();
        store.expect_user_by_username().returning(|_| Ok(None));
        store.expect_user_by_email().returning(|_| Ok(None));
        store
            .expect_create_user()
            .withf(|username, email, password_hash, is_admin| {
                username == "kim"
                    && email == "kim@example.com"
                    && password_hash != "hunter2"
                    && verify_password("hunter2", password_hash)
                    && !is_admin
            })
            .returning(|username, email, password_hash, is_admin| {
                Ok(User {
                    id: 1,
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    is_admin,
                })
            });

        let accounts = AccountService::new(Arc::new(store));
        let user = accounts
            .register("kim", "Kim@Example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(user.username, "kim");
        assert_eq!(user.email, "kim@example.com");
    }

    #[tokio::test]
    async fn test_login_uses_one_error_for_unknown_user_and_wrong_password() {
        let mut store = MockCommunityStore::new();
        store.expect_user_by_username().returning(|username| {
            Ok(if username == "kim" {
                Some(test_user(1, "kim", "right-password"))
            } else {
                None
            })
        });

        let accounts = AccountService::new(Arc::new(store));

        let unknown = accounts.login("ghost", "whatever").await.unwrap_err();
        let wrong = accounts.login("kim", "wrong-password").await.unwrap_err();

        let unknown_msg = match unknown {
            AppError::Unauthorized(msg) => msg,
            other => panic!("expected unauthorized, got {:?}", other),
        };
        let wrong_msg = match wrong {
            AppError::Unauthorized(msg) => msg,
            other => panic!("expected unauthorized, got {:?}", other),
        };

        assert_eq!(unknown_msg, wrong_msg);
    }

    #[tokio::test]
    async fn test_login_accepts_correct_password() {
        let mut store = MockCommunityStore::new();
        store
            .expect_user_by_username()
            .returning(|_| Ok(Some(test_user(7, "kim", "right-password"))));

        let accounts = AccountService::new(Arc::new(store));
        let user = accounts.login("kim", "right-password").await.unwrap();

        assert_eq!(user.id, 7);
    }
}
