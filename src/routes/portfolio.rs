use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::OwnerContext;
use crate::errors::AppError;
use crate::models::{validate_year, GainsSummary, ValuationResponse};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolio/history", get(get_history))
        .route("/gains/summary", get(get_gains_summary))
}

#[derive(Debug, Deserialize)]
pub struct GainsQuery {
    pub year: Option<i32>,
}

pub async fn get_history(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<ValuationResponse>, AppError> {
    info!("GET /api/portfolio/history - Building valuation series for {}", owner.user_id);

    let response = services::valuation_service::history(&state.pool, &owner)
        .await
        .map_err(|e| {
            error!("Failed to build valuation series: {}", e);
            e
        })?;

    info!("✓ Valuation series has {} points", response.meta.points);
    Ok(Json(response))
}

pub async fn get_gains_summary(
    State(state): State<AppState>,
    owner: OwnerContext,
    Query(query): Query<GainsQuery>,
) -> Result<Json<GainsSummary>, AppError> {
    info!("GET /api/gains/summary - year {:?}", query.year);

    let year = query.year.map(validate_year).transpose()?;
    let summary = services::gains_summary_service::gains_summary(&state.pool, &owner, year)
        .await
        .map_err(|e| {
            error!("Failed to summarize gains: {}", e);
            e
        })?;

    Ok(Json(summary))
}
