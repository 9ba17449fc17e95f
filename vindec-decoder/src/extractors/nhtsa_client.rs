//! NHTSA vPIC Client (primary source)
//!
//! Free public decoder, no API key.
//!
//! # API Reference
//! - Endpoint: https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVin/{vin}?format=json
//! - Response: `{"Results": [{"Variable": "...", "Value": "..."}, ...]}`

use super::field_map::{self, NHTSA_FIELDS};
use crate::types::{DecodeSource, SourceDecodeResult, SourceError, VehicleRecord};
use crate::vin::Vin;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// NHTSA vPIC base URL
pub const NHTSA_API_URL: &str = "https://vpic.nhtsa.dot.gov/api/vehicles";

/// Source name recorded as `api_source`
pub const SOURCE_NAME: &str = "nhtsa";

/// NHTSA vPIC client
pub struct NhtsaClient {
    http_client: Client,
    base_url: String,
}

impl NhtsaClient {
    /// Create a client against the public endpoint
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(NHTSA_API_URL)
    }

    /// Create a client against another endpoint (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: super::build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn decode_url(&self, vin: &Vin) -> String {
        format!("{}/DecodeVin/{}?format=json", self.base_url, vin)
    }
}

/// Map a vPIC payload into canonical fields
///
/// Rows whose `Variable` is not in the field map, or whose `Value` is null,
/// empty or "Not Applicable", are dropped.
pub fn parse_results(payload: &Value) -> Result<VehicleRecord, SourceError> {
    let rows = payload
        .get("Results")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::UnexpectedSchema("missing 'Results' array".to_string()))?;

    let mut record = VehicleRecord::new();
    for row in rows {
        let Some(variable) = row.get("Variable").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = row.get("Value").and_then(Value::as_str) else {
            continue;
        };
        if let Some(field) = field_map::lookup(NHTSA_FIELDS, variable) {
            record.insert(field, value);
        }
    }

    Ok(record)
}

#[async_trait]
impl DecodeSource for NhtsaClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        vin: &Vin,
        timeout: Duration,
        _api_key: Option<&str>,
    ) -> Result<SourceDecodeResult, SourceError> {
        let url = self.decode_url(vin);
        debug!(vin = %vin, url = %url, "Querying NHTSA vPIC");

        let response = self
            .http_client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SourceError::NetworkFailure(format!("NHTSA request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::NetworkFailure(format!(
                "NHTSA returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::NetworkFailure(format!("NHTSA body read failed: {}", e)))?;

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| SourceError::MalformedResponse(format!("NHTSA: {}", e)))?;

        let fields = parse_results(&payload)?;

        debug!(
            vin = %vin,
            field_count = fields.len(),
            "NHTSA decode complete"
        );

        Ok(SourceDecodeResult {
            source: SOURCE_NAME,
            fields,
            raw: payload,
        })
    }
}
