//! Settings API endpoints
//!
//! GET returns the effective settings (the API key is never echoed, only
//! whether one is configured). POST applies a partial update.

use crate::config::{self, SettingsUpdate};
use crate::{ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub api_timeout_secs: u64,
    pub enable_secondary_api: bool,
    pub secondary_api_key_configured: bool,
}

/// Request payload; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub api_timeout_secs: Option<u64>,
    pub enable_secondary_api: Option<bool>,
    /// Empty string clears the key
    pub secondary_api_key: Option<String>,
}

fn to_response(settings: &config::DecoderSettings) -> SettingsResponse {
    SettingsResponse {
        success: true,
        api_timeout_secs: settings.api_timeout_secs,
        enable_secondary_api: settings.enable_secondary_api,
        secondary_api_key_configured: settings.secondary_key().is_some(),
    }
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state.settings.read().await;
    Json(to_response(&settings))
}

/// POST /api/settings
///
/// **Behavior:**
/// 1. Clamp the timeout to 5-30 s
/// 2. Write to database (authoritative)
/// 3. Swap the in-memory snapshot used by new decodes
/// 4. Sync to TOML (best-effort backup)
pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<UpdateSettingsRequest>, JsonRejection>,
) -> ApiResult<Json<SettingsResponse>> {
    let Json(payload) = body?;
    let update = SettingsUpdate {
        api_timeout_secs: payload.api_timeout_secs,
        enable_secondary_api: payload.enable_secondary_api,
        secondary_api_key: payload.secondary_api_key,
    };

    let mut settings = state.settings.write().await;
    let next = config::apply_update(&state.db, &settings, update).await?;
    *settings = next.clone();
    drop(settings);

    info!(
        api_timeout_secs = next.api_timeout_secs,
        enable_secondary_api = next.enable_secondary_api,
        "Settings updated"
    );

    if let Some(toml_path) = &state.toml_path {
        if let Err(e) = config::sync_settings_to_toml(&next, toml_path) {
            warn!("TOML sync failed (database write succeeded): {}", e);
        }
    }

    Ok(Json(to_response(&next)))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).post(update_settings))
}
