use axum::{extract::State, Json};

use crate::{
    api::{AppJson, AppState},
    error::AppResult,
    middleware::AuthUser,
    models::{MessageResponse, Rating, RatingRequest},
    services::ratings,
};

/// Adds or updates the caller's rating for a book
pub async fn rate(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<RatingRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (book_id, score) = request.validated()?;
    ratings::rate_book(&state.pool, user.user_id, book_id, score).await?;
    state.invalidate_recommendations(user.user_id).await;
    Ok(Json(MessageResponse::new("Rating saved successfully")))
}

/// The caller's own ratings
pub async fn list(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Vec<Rating>>> {
    let ratings = ratings::list_ratings(&state.pool, user.user_id).await?;
    Ok(Json(ratings))
}
