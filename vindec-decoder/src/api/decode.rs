//! Decode endpoint
//!
//! POST /api/decode `{"vin": "..."}`

use crate::services::format_record;
use crate::types::VehicleRecord;
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    pub vin: String,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub success: bool,
    /// Normalized VIN
    pub vin: String,
    pub vin_data: VehicleRecord,
    pub formatted_text: String,
    pub cached: bool,
}

/// POST /api/decode
///
/// **Errors:**
/// - 400 INVALID_VIN: VIN failed validation (no upstream calls made)
/// - 502 DECODE_UNAVAILABLE: no source returned data
pub async fn decode_vin(
    State(state): State<AppState>,
    payload: Result<Json<DecodeRequest>, JsonRejection>,
) -> ApiResult<Json<DecodeResponse>> {
    let Json(request) = payload?;
    let outcome = state.orchestrator.decode(&request.vin).await?;
    let formatted_text = format_record(&outcome.record);

    Ok(Json(DecodeResponse {
        success: true,
        vin: outcome.vin.to_string(),
        vin_data: outcome.record,
        formatted_text,
        cached: outcome.cached,
    }))
}

pub fn decode_routes() -> Router<AppState> {
    Router::new().route("/api/decode", post(decode_vin))
}
