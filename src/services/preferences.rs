use sqlx::SqlitePool;

use crate::{
    error::AppResult,
    models::{Preference, PreferenceKind, UserPreferences},
};

#[derive(sqlx::FromRow)]
struct PreferenceRow {
    kind: String,
    value: String,
    weight: f64,
}

impl TryFrom<PreferenceRow> for Preference {
    type Error = crate::error::AppError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(Preference {
            kind: row.kind.parse::<PreferenceKind>()?,
            value: row.value,
            weight: row.weight,
        })
    }
}

/// Loads a user's stored preferences
pub async fn get_preferences(pool: &SqlitePool, user_id: i64) -> AppResult<UserPreferences> {
    let rows = sqlx::query_as::<_, PreferenceRow>(
        "SELECT kind, value, weight FROM preferences WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let preferences = rows
        .into_iter()
        .map(Preference::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(UserPreferences::from_rows(preferences))
}

/// Replaces the whole preference set of a user atomically
pub async fn replace_preferences(
    pool: &SqlitePool,
    user_id: i64,
    preferences: UserPreferences,
) -> AppResult<UserPreferences> {
    let preferences = preferences.validated()?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM preferences WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for row in preferences.to_rows() {
        sqlx::query("INSERT INTO preferences (user_id, kind, value, weight) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(row.kind.as_str())
            .bind(&row.value)
            .bind(row.weight)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        user_id,
        genres = preferences.genres.len(),
        authors = preferences.authors.len(),
        "Preferences replaced"
    );

    Ok(preferences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::AppError;

    async fn pool_with_user() -> SqlitePool {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (1, 'u', 'u@example.com', 'x', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_replace_then_get() {
        let pool = pool_with_user().await;

        let mut prefs = UserPreferences::new();
        prefs.genres.insert("Science Fiction".to_string(), 2.5);
        prefs.authors.insert("Ursula K. Le Guin".to_string(), 1.0);

        let stored = replace_preferences(&pool, 1, prefs).await.unwrap();
        assert_eq!(stored.genres["science fiction"], 2.5);

        let loaded = get_preferences(&pool, 1).await.unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_set() {
        let pool = pool_with_user().await;

        let mut first = UserPreferences::new();
        first.set_genre("horror", 1.0);
        replace_preferences(&pool, 1, first).await.unwrap();

        let mut second = UserPreferences::new();
        second.set_author("austen", 2.0);
        replace_preferences(&pool, 1, second).await.unwrap();

        let loaded = get_preferences(&pool, 1).await.unwrap();
        assert!(loaded.genres.is_empty());
        assert_eq!(loaded.authors["austen"], 2.0);
    }

    #[tokio::test]
    async fn test_invalid_preferences_leave_existing_untouched() {
        let pool = pool_with_user().await;

        let mut valid = UserPreferences::new();
        valid.set_genre("classic", 1.0);
        replace_preferences(&pool, 1, valid).await.unwrap();

        let mut invalid = UserPreferences::new();
        invalid.genres.insert("classic".to_string(), -3.0);
        let result = replace_preferences(&pool, 1, invalid).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let loaded = get_preferences(&pool, 1).await.unwrap();
        assert_eq!(loaded.genres["classic"], 1.0);
    }
}
