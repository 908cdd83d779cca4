use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{health, lots, portfolio, tax, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/lots", lots::router())
        .nest("/api/transactions", transactions::router())
        .nest("/api/tax", tax::router())
        .nest("/api", portfolio::router())
        .layer(cors)
        .with_state(state)
}
