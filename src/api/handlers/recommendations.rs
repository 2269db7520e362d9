use axum::{
    extract::State,
    Extension, Json,
};

use crate::{
    api::{AppPath, AppState},
    cached,
    error::{AppError, AppResult},
    middleware::{AuthUser, RequestId},
    models::{Recommendation, RecommendationResponse},
    services::{recommendations, SqliteRecommendationData},
};

/// Handler for the recommendations endpoint
///
/// Users may only read their own recommendations.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: AuthUser,
    AppPath(user_id): AppPath<i64>,
) -> AppResult<Json<RecommendationResponse>> {
    if user.user_id != user_id {
        return Err(AppError::Forbidden(
            "Cannot read another user's recommendations".to_string(),
        ));
    }

    tracing::info!(request_id = %request_id, user_id, "Processing recommendation request");

    let data = SqliteRecommendationData::new(state.pool.clone());
    let settings = state.recommendation_settings.clone();
    let compute = async move { recommendations::recommend(&data, user_id, &settings).await };

    let key = match &state.cache {
        Some(cache) => match cache.recommendations_key(user_id).await {
            Ok(key) => Some((cache, key)),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Cache unavailable, computing uncached");
                None
            }
        },
        None => None,
    };

    let recs: AppResult<Vec<Recommendation>> = match key {
        Some((cache, key)) => {
            cached!(cache, key, state.config.recommendation_cache_ttl_secs, compute)
        }
        None => compute.await,
    };
    let recommendations = recs?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        count = recommendations.len(),
        "Recommendations served"
    );

    Ok(Json(RecommendationResponse {
        user_id,
        recommendations,
    }))
}
