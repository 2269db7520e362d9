use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{LoginRequest, LoginResponse, RegisterRequest, Session, User},
};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 80;
const MAX_EMAIL_LEN: usize = 120;

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Argon2 is deliberately slow, keep it off the async workers
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

/// Creates an account and returns the new user id
pub async fn register(pool: &SqlitePool, request: RegisterRequest) -> AppResult<i64> {
    let (Some(username), Some(email), Some(password)) =
        (request.username, request.email, request.password)
    else {
        return Err(AppError::InvalidInput("Missing required fields".to_string()));
    };

    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();

    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !email.contains('@') || email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(&username)
            .fetch_one(pool)
            .await?;
    if username_taken {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let email_taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(&email)
        .fetch_one(pool)
        .await?;
    if email_taken {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = run_blocking(move || hash_password(&password)).await?;

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await;

    let user_id = match result {
        Ok(done) => done.last_insert_rowid(),
        // Lost a race with a concurrent registration
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id, username = %username, "User registered");
    Ok(user_id)
}

/// Verifies credentials and issues a session token
pub async fn login(
    pool: &SqlitePool,
    request: LoginRequest,
    session_ttl_secs: i64,
) -> AppResult<LoginResponse> {
    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(AppError::InvalidInput(
            "Missing username or password".to_string(),
        ));
    };

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
    )
    .bind(username.trim())
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        tracing::debug!(username = %username, "Login for unknown user");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let hash = user.password_hash.clone();
    let valid = run_blocking(move || Ok(verify_password(&password, &hash))).await?;
    if !valid {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = session_expiry(Utc::now(), session_ttl_secs)?;

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user.id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: session_ttl_secs,
        user_id: user.id,
    })
}

/// Expiry instant for a session issued at `now`
fn session_expiry(now: DateTime<Utc>, ttl_secs: i64) -> AppResult<DateTime<Utc>> {
    Duration::try_seconds(ttl_secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(format!("Session TTL {}s is out of range", ttl_secs)))
}

/// Resolves a bearer token to its user id
pub async fn authenticate(pool: &SqlitePool, token: &str) -> AppResult<i64> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT token, user_id, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    if session.is_expired(Utc::now()) {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;
        return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
    }

    Ok(session.user_id)
}

/// Revokes a session token
pub async fn logout(pool: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn pool() -> SqlitePool {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        pool
    }

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let pool = pool().await;
        register(&pool, register_request("alice", "alice@example.com", "password1"))
            .await
            .unwrap();

        let err = register(&pool, register_request("alice", "other@example.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Username already exists");

        let err = register(&pool, register_request("bob", "ALICE@example.com", "password1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Email already registered");
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let pool = pool().await;

        let missing = RegisterRequest {
            username: Some("carol".to_string()),
            email: None,
            password: Some("password1".to_string()),
        };
        assert!(matches!(
            register(&pool, missing).await,
            Err(AppError::InvalidInput(_))
        ));

        assert!(matches!(
            register(&pool, register_request("carol", "carol@example.com", "short")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&pool, register_request("carol", "not-an-email", "password1")).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_authenticate_logout() {
        let pool = pool().await;
        let user_id = register(&pool, register_request("dave", "dave@example.com", "password1"))
            .await
            .unwrap();

        assert!(matches!(
            login(&pool, login_request("dave", "wrong-password"), 3600).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            login(&pool, login_request("nobody", "password1"), 3600).await,
            Err(AppError::Unauthorized(_))
        ));

        let session = login(&pool, login_request("dave", "password1"), 3600)
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.token_type, "Bearer");

        assert_eq!(
            authenticate(&pool, &session.access_token).await.unwrap(),
            user_id
        );

        logout(&pool, &session.access_token).await.unwrap();
        assert!(matches!(
            authenticate(&pool, &session.access_token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let pool = pool().await;
        register(&pool, register_request("erin", "erin@example.com", "password1"))
            .await
            .unwrap();

        let session = login(&pool, login_request("erin", "password1"), -1)
            .await
            .unwrap();

        assert!(matches!(
            authenticate(&pool, &session.access_token).await,
            Err(AppError::Unauthorized(_))
        ));

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_session_expiry_rejects_out_of_range_ttl() {
        let now = Utc::now();
        assert_eq!(
            session_expiry(now, 3600).unwrap(),
            now + Duration::seconds(3600)
        );
        assert!(matches!(
            session_expiry(now, i64::MAX),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            session_expiry(now, i64::MIN),
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_ttl_fails_cleanly() {
        let pool = pool().await;
        register(&pool, register_request("frank", "frank@example.com", "password1"))
            .await
            .unwrap();

        assert!(matches!(
            login(&pool, login_request("frank", "password1"), i64::MAX).await,
            Err(AppError::Internal(_))
        ));
    }
}
