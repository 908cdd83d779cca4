use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::auth::OwnerContext;
use crate::errors::AppError;
use crate::models::{CalculateTaxRequest, TaxBreakdown, TaxRecord, TaxRequest};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tax_records))
        .route("/calculate", post(calculate_tax))
        .route("/:year", get(get_tax_record).put(save_tax_record))
}

/// Computes without persisting.
pub async fn calculate_tax(
    _owner: OwnerContext,
    Json(input): Json<CalculateTaxRequest>,
) -> Result<Json<TaxBreakdown>, AppError> {
    info!("POST /api/tax/calculate - year {}", input.year);
    let breakdown = services::tax_service::calculate(input.year, input.inputs).map_err(|e| {
        error!("Failed to calculate tax: {}", e);
        e
    })?;
    Ok(Json(breakdown))
}

pub async fn list_tax_records(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<TaxRecord>>, AppError> {
    info!("GET /api/tax - Listing tax records for {}", owner.user_id);
    let records = services::tax_service::list_tax_records(&state.pool, &owner)
        .await
        .map_err(|e| {
            error!("Failed to list tax records: {}", e);
            e
        })?;
    Ok(Json(records))
}

pub async fn get_tax_record(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(year): Path<i32>,
) -> Result<Json<TaxRecord>, AppError> {
    info!("GET /api/tax/{} - Getting tax record", year);
    let record = services::tax_service::get_tax_record(&state.pool, &owner, year)
        .await
        .map_err(|e| {
            error!("Failed to get tax record for {}: {}", year, e);
            e
        })?;
    Ok(Json(record))
}

pub async fn save_tax_record(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(year): Path<i32>,
    Json(input): Json<TaxRequest>,
) -> Result<Json<TaxRecord>, AppError> {
    info!("PUT /api/tax/{} - Saving tax record", year);
    let record = services::tax_service::create_or_update_tax(&state.pool, &owner, year, input)
        .await
        .map_err(|e| {
            error!("Failed to save tax record for {}: {}", year, e);
            e
        })?;
    Ok(Json(record))
}
