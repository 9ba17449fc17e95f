//! Admin endpoints over stored decodes
//!
//! Listing with filters, lookup by VIN, deletion, per-decode submissions,
//! filter values and dashboard stats.

use crate::db::decodes::{
    self, DecodeFilter, DecodeStats, FilterField, SortColumn, SortOrder, StoredDecode,
};
use crate::db::submissions::{self, Submission};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::vin::Vin;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Query parameters for the listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
    /// Rows per page, clamped to 1-100
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    pub search: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<StoredDecode>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// GET /api/decodes
pub async fn list_decodes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let filter = DecodeFilter {
        search: query.search,
        make: query.make,
        model: query.model,
        year: query.year,
        order_by: SortColumn::parse_or_default(query.order_by.as_deref()),
        order: SortOrder::parse_or_default(query.order.as_deref()),
    };

    let page = decodes::list(&state.db, &filter, query.page, query.per_page).await?;

    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        pages: page.pagination.total_pages,
        current_page: page.pagination.page,
        per_page: page.pagination.page_size,
    }))
}

/// GET /api/decodes/vin/:vin
pub async fn get_decode_by_vin(
    State(state): State<AppState>,
    Path(raw_vin): Path<String>,
) -> ApiResult<Json<StoredDecode>> {
    let vin = Vin::parse(&raw_vin).map_err(|e| ApiError::InvalidVin(e.to_string()))?;

    decodes::get_by_vin(&state.db, vin.as_str())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No decode stored for VIN {}", vin)))
}

/// DELETE /api/decodes/:id
///
/// Submissions linked to the decode are removed with it.
pub async fn delete_decode(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !decodes::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Decode {} not found", id)));
    }

    tracing::info!(id, "Decode deleted");

    Ok(Json(json!({ "success": true, "deleted": id })))
}

/// GET /api/decodes/:id/submissions
pub async fn list_decode_submissions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Submission>>> {
    if decodes::get_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Decode {} not found", id)));
    }

    Ok(Json(submissions::list_for_decode(&state.db, id).await?))
}

#[derive(Debug, Serialize)]
pub struct FilterValuesResponse {
    pub field: String,
    pub values: Vec<String>,
}

/// GET /api/filters/:field
///
/// `field` is one of make, model, year, vehicle_type, fuel_type (400 otherwise).
pub async fn filter_values(
    State(state): State<AppState>,
    Path(field): Path<String>,
) -> ApiResult<Json<FilterValuesResponse>> {
    let filter_field: FilterField = field.parse()?;
    let values = decodes::distinct_values(&state.db, filter_field).await?;

    Ok(Json(FilterValuesResponse { field, values }))
}

/// GET /api/stats
pub async fn decode_stats(State(state): State<AppState>) -> ApiResult<Json<DecodeStats>> {
    Ok(Json(decodes::stats(&state.db).await?))
}

pub fn decodes_routes() -> Router<AppState> {
    Router::new()
        .route("/api/decodes", get(list_decodes))
        .route("/api/decodes/vin/:vin", get(get_decode_by_vin))
        .route("/api/decodes/:id", axum::routing::delete(delete_decode))
        .route("/api/decodes/:id/submissions", get(list_decode_submissions))
        .route("/api/filters/:field", get(filter_values))
        .route("/api/stats", get(decode_stats))
}
