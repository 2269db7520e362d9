use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::Rating,
    services::books,
};

/// Adds a rating or replaces the user's existing score for the book
pub async fn rate_book(pool: &SqlitePool, user_id: i64, book_id: i64, score: i64) -> AppResult<()> {
    if books::find_book(pool, book_id).await?.is_none() {
        return Err(AppError::NotFound("Book not found".to_string()));
    }

    sqlx::query(
        "INSERT INTO ratings (user_id, book_id, score, created_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT (user_id, book_id) DO UPDATE SET score = excluded.score",
    )
    .bind(user_id)
    .bind(book_id)
    .bind(score)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    tracing::info!(user_id, book_id, score, "Rating saved");
    Ok(())
}

/// Lists a user's ratings, newest first
pub async fn list_ratings(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<Rating>> {
    let ratings = sqlx::query_as::<_, Rating>(
        "SELECT id, user_id, book_id, score, created_at FROM ratings WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ratings)
}
