use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{health, optimize};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .merge(optimize::router())
        .nest("/health", health::router())
        .layer(cors)
        .with_state(state)
}
