use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::OwnerContext;
use crate::errors::AppError;
use crate::models::Transaction;
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub lot_id: Option<Uuid>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    owner: OwnerContext,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /api/transactions - Listing transactions (lot: {:?})", query.lot_id);

    let transactions = services::lot_service::list_transactions(&state.pool, &owner, query.lot_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch transactions: {}", e);
            e
        })?;

    Ok(Json(transactions))
}
