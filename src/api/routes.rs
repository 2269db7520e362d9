use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{self, accounts, books, preferences, ratings, recommendations};
use super::AppState;
use crate::middleware::{make_span_with_request_id, rate_limit, request_id_middleware};

/// Creates the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes(&state))
        .fallback(handlers::not_found)
        // Outermost first: the request id must exist before the trace span is built
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(middleware::from_fn_with_state(
                    state.rate_limiter.clone(),
                    rate_limit::enforce,
                )),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes(state: &AppState) -> Router<AppState> {
    let registration = Router::new()
        .route("/register", post(accounts::register))
        .route_layer(middleware::from_fn_with_state(
            state.register_limiter.clone(),
            rate_limit::enforce,
        ));

    Router::new()
        // Catalog
        .route("/books", get(books::list).post(books::create))
        .route("/books/random", get(books::random))
        .route("/books/:id", get(books::detail).put(books::update))
        // Accounts
        .merge(registration)
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        // Ratings & preferences
        .route("/ratings", get(ratings::list).post(ratings::rate))
        .route("/preferences", get(preferences::get).put(preferences::replace))
        // Recommendations
        .route("/recommend/:user_id", get(recommendations::recommend))
}
