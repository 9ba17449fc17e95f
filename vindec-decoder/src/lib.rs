//! vindec-decoder library interface
//!
//! Exposes the decode pipeline and the HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod pagination;
pub mod services;
pub mod types;
pub mod vin;

pub use crate::error::{ApiError, ApiResult};

use crate::config::{DecoderSettings, SharedSettings};
use crate::extractors::{NhtsaClient, VinDecoderClient};
use crate::services::{DecodeOrchestrator, SubmissionRecorder};
use crate::types::{DecodeSource, SourceError};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Effective settings, swapped in place by POST /api/settings
    pub settings: SharedSettings,
    pub orchestrator: Arc<DecodeOrchestrator>,
    pub recorder: Arc<SubmissionRecorder>,
    /// Bootstrap TOML to mirror settings into (`None` disables write-back)
    pub toml_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build state around explicit decode sources
    pub fn new(
        db: SqlitePool,
        settings: DecoderSettings,
        primary: Arc<dyn DecodeSource>,
        secondary: Arc<dyn DecodeSource>,
        toml_path: Option<PathBuf>,
    ) -> Self {
        let settings: SharedSettings = Arc::new(RwLock::new(settings));
        let orchestrator = Arc::new(DecodeOrchestrator::new(
            db.clone(),
            settings.clone(),
            primary,
            secondary,
        ));
        let recorder = Arc::new(SubmissionRecorder::new(db.clone(), orchestrator.clone()));

        Self {
            db,
            settings,
            orchestrator,
            recorder,
            toml_path,
            startup_time: Utc::now(),
        }
    }

    /// Build state with the public NHTSA and VinDecoder.eu clients
    pub fn with_default_sources(
        db: SqlitePool,
        settings: DecoderSettings,
        toml_path: Option<PathBuf>,
    ) -> Result<Self, SourceError> {
        let primary: Arc<dyn DecodeSource> = Arc::new(NhtsaClient::new()?);
        let secondary: Arc<dyn DecodeSource> = Arc::new(VinDecoderClient::new()?);
        Ok(Self::new(db, settings, primary, secondary, toml_path))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::decode_routes())
        .merge(api::decodes_routes())
        .merge(api::submission_routes())
        .merge(api::settings_routes())
        .merge(api::connectivity_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
