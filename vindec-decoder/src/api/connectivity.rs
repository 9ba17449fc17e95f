//! Upstream connectivity check
//!
//! GET /api/connectivity `{"success": true, "nhtsa": bool, "vindecoder": bool | "disabled"}`

use crate::services::{check_connectivity, ConnectivityReport};
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ConnectivityReport,
}

/// GET /api/connectivity
pub async fn connectivity(State(state): State<AppState>) -> Json<ConnectivityResponse> {
    let report = check_connectivity(&state.orchestrator).await;
    Json(ConnectivityResponse {
        success: true,
        report,
    })
}

pub fn connectivity_routes() -> Router<AppState> {
    Router::new().route("/api/connectivity", get(connectivity))
}
