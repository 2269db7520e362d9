use axum::{extract::State, Json};

use crate::{
    api::{AppJson, AppState},
    error::AppResult,
    middleware::AuthUser,
    models::UserPreferences,
    services::preferences,
};

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UserPreferences>> {
    let prefs = preferences::get_preferences(&state.pool, user.user_id).await?;
    Ok(Json(prefs))
}

/// Replaces the caller's preference maps wholesale
pub async fn replace(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(prefs): AppJson<UserPreferences>,
) -> AppResult<Json<UserPreferences>> {
    let stored = preferences::replace_preferences(&state.pool, user.user_id, prefs).await?;
    state.invalidate_recommendations(user.user_id).await;
    Ok(Json(stored))
}
