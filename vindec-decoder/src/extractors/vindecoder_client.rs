//! VinDecoder.eu Client (secondary source)
//!
//! Optional enrichment source. Only consulted when enabled in settings;
//! the API key is sent as a bearer token when configured.
//!
//! # API Reference
//! - Endpoint: https://api.vindecoder.eu/3.2/{vin}/decode/json
//! - Response: `{"decode": [{"msrp": 25000, "category": "...", ...}]}`

use super::field_map::{self, VINDECODER_FIELDS};
use crate::types::{DecodeSource, SourceDecodeResult, SourceError, VehicleRecord};
use crate::vin::Vin;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// VinDecoder.eu base URL
pub const VINDECODER_API_URL: &str = "https://api.vindecoder.eu/3.2";

/// Source name recorded as `api_source`
pub const SOURCE_NAME: &str = "vindecoder";

/// VinDecoder.eu client
pub struct VinDecoderClient {
    http_client: Client,
    base_url: String,
}

impl VinDecoderClient {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(VINDECODER_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: super::build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn decode_url(&self, vin: &Vin) -> String {
        format!("{}/{}/decode/json", self.base_url, vin)
    }
}

/// Render a secondary value as text
///
/// Numbers become decimal strings. Zero (numeric or `"0"`), null, booleans,
/// arrays and objects yield `None`.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim() == "0" => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Map a VinDecoder.eu payload into canonical fields
///
/// Only the first element of `decode` is read; an empty array yields an
/// empty record.
pub fn parse_decode(payload: &Value) -> Result<VehicleRecord, SourceError> {
    let entries = payload
        .get("decode")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::UnexpectedSchema("missing 'decode' array".to_string()))?;

    let mut record = VehicleRecord::new();
    let Some(Value::Object(first)) = entries.first() else {
        return Ok(record);
    };

    for (key, value) in first {
        let Some(field) = field_map::lookup(VINDECODER_FIELDS, key) else {
            continue;
        };
        if let Some(text) = render_value(value) {
            record.insert(field, &text);
        }
    }

    Ok(record)
}

#[async_trait]
impl DecodeSource for VinDecoderClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        vin: &Vin,
        timeout: Duration,
        api_key: Option<&str>,
    ) -> Result<SourceDecodeResult, SourceError> {
        let url = self.decode_url(vin);
        debug!(vin = %vin, url = %url, has_key = api_key.is_some(), "Querying VinDecoder.eu");

        let mut request = self.http_client.get(&url).timeout(timeout);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            SourceError::NetworkFailure(format!("VinDecoder.eu request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::NetworkFailure(format!(
                "VinDecoder.eu returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| {
            SourceError::NetworkFailure(format!("VinDecoder.eu body read failed: {}", e))
        })?;

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| SourceError::MalformedResponse(format!("VinDecoder.eu: {}", e)))?;

        let fields = parse_decode(&payload)?;

        debug!(vin = %vin, field_count = fields.len(), "VinDecoder.eu decode complete");

        Ok(SourceDecodeResult {
            source: SOURCE_NAME,
            fields,
            raw: payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VehicleField;
    use axum::{http::HeaderMap, routing::get, Json, Router};
    use serde_json::json;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_decode_renders_values() {
        let payload = json!({
            "decode": [{
                "msrp": 25000,
                "price": 19999.5,
                "category": "  Sedan ",
                "engine": "2.4L I4",
                "make": "Honda"
            }]
        });

        let record = parse_decode(&payload).unwrap();
        assert_eq!(record.get(VehicleField::Msrp), Some("25000"));
        assert_eq!(record.get(VehicleField::Price), Some("19999.5"));
        assert_eq!(record.get(VehicleField::Category), Some("Sedan"));
        assert_eq!(record.get(VehicleField::EngineInfo), Some("2.4L I4"));
        // "make" is not a secondary field
        assert!(!record.has_value(VehicleField::Make));
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn test_parse_decode_skips_empty_like_values() {
        let payload = json!({
            "decode": [{
                "msrp": 0,
                "price": null,
                "category": true,
                "engine": {"code": "K24"}
            }]
        });
        assert!(parse_decode(&payload).unwrap().is_empty());

        let payload = json!({"decode": [{"msrp": "0", "category": [], "engine": ""}]});
        assert!(parse_decode(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_parse_decode_reads_first_entry_only() {
        let payload = json!({
            "decode": [
                {"category": "Coupe"},
                {"msrp": 30000}
            ]
        });
        let record = parse_decode(&payload).unwrap();
        assert_eq!(record.get(VehicleField::Category), Some("Coupe"));
        assert!(!record.has_value(VehicleField::Msrp));
    }

    #[test]
    fn test_parse_decode_empty_and_missing() {
        assert!(parse_decode(&json!({"decode": []})).unwrap().is_empty());

        let err = parse_decode(&json!({"error": "bad key"})).unwrap_err();
        assert!(matches!(err, SourceError::UnexpectedSchema(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_key() {
        let app = Router::new().route(
            "/:vin/decode/json",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"decode": [{"category": auth, "engine": agent}]}))
            }),
        );
        let base = spawn_server(app).await;

        let client = VinDecoderClient::with_base_url(base).unwrap();
        let vin = Vin::parse("1HGCM82633A123456").unwrap();
        let result = client
            .fetch(&vin, Duration::from_secs(5), Some("secret"))
            .await
            .unwrap();

        assert_eq!(result.source, "vindecoder");
        assert_eq!(result.fields.get(VehicleField::Category), Some("Bearer secret"));
        assert!(result
            .fields
            .get(VehicleField::EngineInfo)
            .unwrap()
            .starts_with("vindec/"));
    }

    #[tokio::test]
    async fn test_fetch_without_key_sends_no_auth() {
        let app = Router::new().route(
            "/:vin/decode/json",
            get(|headers: HeaderMap| async move {
                let category = if headers.contains_key("authorization") {
                    "auth"
                } else {
                    "anonymous"
                };
                Json(json!({"decode": [{"category": category}]}))
            }),
        );
        let base = spawn_server(app).await;

        let client = VinDecoderClient::with_base_url(base).unwrap();
        let vin = Vin::parse("1HGCM82633A123456").unwrap();
        let result = client.fetch(&vin, Duration::from_secs(5), None).await.unwrap();

        assert_eq!(result.fields.get(VehicleField::Category), Some("anonymous"));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_failure() {
        // Port 9 (discard) on loopback is not served in test environments
        let client = VinDecoderClient::with_base_url("http://127.0.0.1:9").unwrap();
        let vin = Vin::parse("1HGCM82633A123456").unwrap();
        let err = client
            .fetch(&vin, Duration::from_secs(2), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NetworkFailure(_)));
    }
}
