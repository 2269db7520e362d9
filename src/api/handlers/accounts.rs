use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::{AppJson, AppState},
    error::AppResult,
    middleware::AuthUser,
    models::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse},
    services::accounts,
};

pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user_id = accounts::register(&state.pool, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = accounts::login(&state.pool, request, state.config.session_ttl_secs).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    accounts::logout(&state.pool, &user.token).await?;
    tracing::info!(user_id = user.user_id, "User logged out");
    Ok(Json(MessageResponse::new("Logged out")))
}
