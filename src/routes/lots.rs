use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::OwnerContext;
use crate::errors::AppError;
use crate::models::{BuyLotRequest, Lot, LotFilter, SellLotRequest};
use crate::services;
use crate::services::lot_service::BuyOutcome;
use crate::services::sell_engine::SellOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(buy_lot).get(list_lots))
        .route("/:id", get(get_lot))
        .route("/:id/refresh", post(refresh_lot))
        .route("/:id/sell", post(sell_lot))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLotsQuery {
    #[serde(default)]
    pub status: LotFilter,
    #[serde(default)]
    pub refresh: bool,
}

pub async fn buy_lot(
    State(state): State<AppState>,
    owner: OwnerContext,
    Json(input): Json<BuyLotRequest>,
) -> Result<(StatusCode, Json<BuyOutcome>), AppError> {
    info!("POST /api/lots - Buying lot for {}", owner.user_id);
    let outcome = services::lot_service::buy(&state.pool, state.price_provider.as_ref(), &owner, input)
        .await
        .map_err(|e| {
            error!("Failed to buy lot: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_lots(
    State(state): State<AppState>,
    owner: OwnerContext,
    Query(query): Query<ListLotsQuery>,
) -> Result<Json<Vec<Lot>>, AppError> {
    info!("GET /api/lots - Listing {:?} lots (refresh: {})", query.status, query.refresh);

    if query.refresh && query.status != LotFilter::Sold {
        services::price_history::refresh_all(
            &state.pool,
            state.price_provider.as_ref(),
            &state.failure_cache,
            &state.quote_limiter,
            &owner,
        )
        .await
        .map_err(|e| {
            error!("Failed to refresh lots: {}", e);
            e
        })?;
    }

    let lots = services::lot_service::list_lots(&state.pool, &owner, query.status)
        .await
        .map_err(|e| {
            error!("Failed to list lots: {}", e);
            e
        })?;
    Ok(Json(lots))
}

pub async fn get_lot(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(lot_id): Path<Uuid>,
) -> Result<Json<Lot>, AppError> {
    info!("GET /api/lots/{} - Getting lot", lot_id);
    let lot = services::lot_service::get_lot(&state.pool, &owner, lot_id)
        .await
        .map_err(|e| {
            error!("Failed to get lot {}: {}", lot_id, e);
            e
        })?;
    Ok(Json(lot))
}

pub async fn refresh_lot(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(lot_id): Path<Uuid>,
) -> Result<Json<Lot>, AppError> {
    info!("POST /api/lots/{}/refresh - Refreshing price", lot_id);
    let lot = services::price_history::refresh(
        &state.pool,
        state.price_provider.as_ref(),
        &state.failure_cache,
        &state.quote_limiter,
        &owner,
        lot_id,
    )
    .await
    .map_err(|e| {
        error!("Failed to refresh lot {}: {}", lot_id, e);
        e
    })?;
    Ok(Json(lot))
}

pub async fn sell_lot(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<SellLotRequest>,
) -> Result<Json<SellOutcome>, AppError> {
    info!("POST /api/lots/{}/sell - Selling lot", lot_id);
    let outcome = services::sell_engine::sell(&state.pool, state.price_provider.as_ref(), &owner, lot_id, input)
        .await
        .map_err(|e| {
            error!("Failed to sell lot {}: {}", lot_id, e);
            e
        })?;
    Ok(Json(outcome))
}
