//! Connectivity probe
//!
//! Test-decodes a known VIN against each source so operators can check
//! reachability from the settings page.

use super::decode_orchestrator::DecodeOrchestrator;
use crate::types::DecodeSource;
use crate::vin::Vin;
use serde::{Serialize, Serializer};
use std::time::Duration;
use tracing::{info, warn};

/// Sample VIN used for probing (2003 Honda Accord)
pub const PROBE_VIN: &str = "1HGCM82633A123456";

/// Per-source probe timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe result for one source
///
/// Serializes as `true`, `false` or `"disabled"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Reachable,
    Unreachable,
    Disabled,
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeStatus::Reachable => serializer.serialize_bool(true),
            ProbeStatus::Unreachable => serializer.serialize_bool(false),
            ProbeStatus::Disabled => serializer.serialize_str("disabled"),
        }
    }
}

/// Probe results keyed by source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub nhtsa: ProbeStatus,
    pub vindecoder: ProbeStatus,
}

async fn probe(source: &dyn DecodeSource, vin: &Vin, api_key: Option<&str>) -> ProbeStatus {
    match source.fetch(vin, PROBE_TIMEOUT, api_key).await {
        Ok(_) => ProbeStatus::Reachable,
        Err(e) => {
            warn!(source = source.name(), error = %e, "Connectivity probe failed");
            ProbeStatus::Unreachable
        }
    }
}

/// Probe the primary source, and the secondary source when enabled
pub async fn check_connectivity(orchestrator: &DecodeOrchestrator) -> ConnectivityReport {
    let vin = match Vin::parse(PROBE_VIN) {
        Ok(vin) => vin,
        Err(e) => {
            warn!(error = %e, "Probe VIN rejected");
            return ConnectivityReport {
                nhtsa: ProbeStatus::Unreachable,
                vindecoder: ProbeStatus::Unreachable,
            };
        }
    };
    let settings = orchestrator.settings().read().await.clone();

    let nhtsa = probe(orchestrator.primary(), &vin, None).await;
    let vindecoder = if settings.enable_secondary_api {
        probe(orchestrator.secondary(), &vin, settings.secondary_key()).await
    } else {
        ProbeStatus::Disabled
    };

    info!(?nhtsa, ?vindecoder, "Connectivity probe complete");

    ConnectivityReport { nhtsa, vindecoder }
}
