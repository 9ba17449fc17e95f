//! Decode Orchestrator
//!
//! Single entry point for decoding a VIN, shared by the decode endpoint, the
//! submission recorder and the CLI.
//!
//! **Algorithm:**
//! 1. Validate the VIN (no upstream calls on failure)
//! 2. Store lookup; a hit is returned as-is (`cached = true`, no TTL)
//! 3. Primary source, then the secondary source if enabled (sequential)
//! 4. Merge; nothing from either source is `DecodeError::Unavailable`
//! 5. Upsert; a persistence failure is logged and the decode still succeeds

use crate::config::SharedSettings;
use crate::db::decodes;
use crate::fusion::{contributing_source, merge};
use crate::types::{DecodeSource, SourceDecodeResult, VehicleRecord};
use crate::vin::{Vin, VinError};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Decode failure visible to callers
#[derive(Debug, Error)]
pub enum DecodeError {
    /// User-correctable input error
    #[error(transparent)]
    InvalidVin(#[from] VinError),

    /// No source produced any field
    #[error("Unable to decode VIN. Please try again.")]
    Unavailable,
}

/// Successful decode
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub vin: Vin,
    pub record: VehicleRecord,
    /// True when served from the store without upstream calls
    pub cached: bool,
    /// Stored row id; `None` only if persisting a fresh decode failed
    pub decode_id: Option<i64>,
    /// Source credited for the record
    pub api_source: String,
}

/// Decode Orchestrator
pub struct DecodeOrchestrator {
    db: SqlitePool,
    settings: SharedSettings,
    primary: Arc<dyn DecodeSource>,
    secondary: Arc<dyn DecodeSource>,
}

impl DecodeOrchestrator {
    pub fn new(
        db: SqlitePool,
        settings: SharedSettings,
        primary: Arc<dyn DecodeSource>,
        secondary: Arc<dyn DecodeSource>,
    ) -> Self {
        Self {
            db,
            settings,
            primary,
            secondary,
        }
    }

    pub fn primary(&self) -> &dyn DecodeSource {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> &dyn DecodeSource {
        self.secondary.as_ref()
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Decode a raw VIN string
    pub async fn decode(&self, raw_vin: &str) -> Result<DecodeOutcome, DecodeError> {
        let vin = Vin::parse(raw_vin)?;

        match decodes::get_by_vin(&self.db, vin.as_str()).await {
            Ok(Some(stored)) => {
                debug!(vin = %vin, id = stored.id, "Decode served from cache");
                return Ok(DecodeOutcome {
                    vin,
                    record: stored.vin_data,
                    cached: true,
                    decode_id: Some(stored.id),
                    api_source: stored.api_source,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(vin = %vin, error = %e, "Cache lookup failed, decoding from upstream");
            }
        }

        let settings = self.settings.read().await.clone();
        let timeout = settings.api_timeout();

        let primary = fetch_logged(self.primary.as_ref(), &vin, timeout, None).await;
        let secondary = if settings.enable_secondary_api {
            fetch_logged(
                self.secondary.as_ref(),
                &vin,
                timeout,
                settings.secondary_key(),
            )
            .await
        } else {
            None
        };

        let record = merge(primary.as_ref(), secondary.as_ref());
        let Some(api_source) = contributing_source(primary.as_ref(), secondary.as_ref()) else {
            warn!(vin = %vin, "No source returned any vehicle data");
            return Err(DecodeError::Unavailable);
        };

        let decode_id = match decodes::upsert(&self.db, vin.as_str(), &record, api_source).await {
            Ok(stored) => Some(stored.id),
            Err(e) => {
                error!(vin = %vin, error = %e, "Failed to persist decode");
                None
            }
        };

        info!(
            vin = %vin,
            api_source,
            field_count = record.len(),
            "VIN decoded"
        );

        Ok(DecodeOutcome {
            vin,
            record,
            cached: false,
            decode_id,
            api_source: api_source.to_string(),
        })
    }
}

/// Call one source; failures are logged and contribute nothing
async fn fetch_logged(
    source: &dyn DecodeSource,
    vin: &Vin,
    timeout: Duration,
    api_key: Option<&str>,
) -> Option<SourceDecodeResult> {
    match source.fetch(vin, timeout, api_key).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(source = source.name(), vin = %vin, error = %e, "Decode source failed");
            None
        }
    }
}
