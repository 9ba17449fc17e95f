//! Contact form submission endpoint
//!
//! POST /api/submissions `{"form_id": "...", "fields": {...}}`
//!
//! The form always goes through: a missing or undecodable VIN only means the
//! response carries no vehicle data.

use crate::services::{FormSubmission, SubmissionReceipt};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub vin_decoded: bool,
    #[serde(flatten)]
    pub receipt: Option<SubmissionReceipt>,
}

/// Client address: `Client-IP` header, else the first `X-Forwarded-For`
/// entry, else the socket peer
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header_value("client-ip") {
        return ip.to_string();
    }

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|list| list.split(',').map(str::trim).find(|ip| !ip.is_empty()))
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// POST /api/submissions
pub async fn submit_form(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let Json(request) = payload?;
    let form = FormSubmission {
        form_id: request.form_id,
        fields: request.fields,
        user_ip: resolve_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };

    let receipt = state.recorder.record(&form).await;

    Ok(Json(SubmissionResponse {
        success: true,
        vin_decoded: receipt.is_some(),
        receipt,
    }))
}

pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/api/submissions", post(submit_form))
}
