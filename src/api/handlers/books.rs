use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppPath, AppQuery, AppState},
    error::AppResult,
    middleware::AuthUser,
    models::{BookDetail, BookPage, BookSummary, BookUpdate, MessageResponse, NewBook},
    services::books::{self, BookQuery},
};

#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RandomBooksResponse {
    pub books: Vec<BookSummary>,
}

/// Paginated catalog listing with optional genre/author filters
pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BookQuery>,
) -> AppResult<Json<BookPage>> {
    let page = books::list_books(&state.pool, &query).await?;
    Ok(Json(page))
}

pub async fn detail(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<BookDetail>> {
    let book = books::get_book(&state.pool, id).await?;
    Ok(Json(book))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(new_book): AppJson<NewBook>,
) -> AppResult<(StatusCode, Json<BookDetail>)> {
    tracing::info!(user_id = user.user_id, "Creating book");
    let book = books::create_book(&state.pool, new_book).await?;
    state.invalidate_all_recommendations().await;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<BookUpdate>,
) -> AppResult<Json<MessageResponse>> {
    tracing::info!(user_id = user.user_id, book_id = id, "Updating book");
    books::update_book(&state.pool, id, update).await?;
    state.invalidate_all_recommendations().await;
    Ok(Json(MessageResponse::new("Book updated successfully")))
}

pub async fn random(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RandomQuery>,
) -> AppResult<Json<RandomBooksResponse>> {
    let books = books::random_books(&state.pool, query.count).await?;
    Ok(Json(RandomBooksResponse { books }))
}
