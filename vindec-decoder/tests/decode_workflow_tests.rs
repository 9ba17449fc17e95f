//! End-to-end decode workflow against fake upstream HTTP services
//!
//! Both real clients are pointed at local axum servers, so these tests cover
//! URL building, auth headers, payload mapping, merging and persistence in
//! one pass.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use vindec_decoder::config::DecoderSettings;
use vindec_decoder::db::decodes;
use vindec_decoder::extractors::{NhtsaClient, VinDecoderClient};
use vindec_decoder::services::{DecodeError, DecodeOrchestrator};
use vindec_decoder::types::{VehicleField, NOT_APPLICABLE};

const VIN: &str = "1HGCM82633A004352";

#[derive(Default)]
struct Upstream {
    nhtsa_hits: AtomicUsize,
    vindecoder_hits: AtomicUsize,
    nhtsa_down: AtomicBool,
    last_auth: std::sync::Mutex<Option<String>>,
}

fn nhtsa_payload(model: &str) -> Value {
    json!({
        "Count": 9,
        "Message": "Results returned successfully",
        "SearchCriteria": format!("VIN:{}", VIN),
        "Results": [
            {"Variable": "Make", "Value": "HONDA", "VariableId": 26},
            {"Variable": "Model", "Value": model, "VariableId": 28},
            {"Variable": "Model Year", "Value": "2003", "VariableId": 29},
            {"Variable": "Trim", "Value": NOT_APPLICABLE, "VariableId": 38},
            {"Variable": "Series", "Value": "  ", "VariableId": 34},
            {"Variable": "Engine HP", "Value": "240", "VariableId": 71},
            {"Variable": "Plant City", "Value": "MARYSVILLE", "VariableId": 31},
            {"Variable": "Plant State", "Value": "OHIO", "VariableId": 77},
            {"Variable": "Error Code", "Value": "0", "VariableId": 143},
            {"Variable": "Suggested VIN", "Value": "", "VariableId": 142},
            {"Variable": "Turbo", "Value": null, "VariableId": 135}
        ]
    })
}

async fn nhtsa_handler(
    State(upstream): State<Arc<Upstream>>,
    Path(vin): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    upstream.nhtsa_hits.fetch_add(1, Ordering::SeqCst);
    if upstream.nhtsa_down.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let model = if upstream.nhtsa_hits.load(Ordering::SeqCst) > 1 {
        "Accord EX"
    } else {
        "Accord"
    };
    assert_eq!(vin, VIN);
    Ok(Json(nhtsa_payload(model)))
}

async fn vindecoder_handler(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    Path(vin): Path<String>,
) -> Json<Value> {
    upstream.vindecoder_hits.fetch_add(1, Ordering::SeqCst);
    *upstream.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(vin, VIN);

    Json(json!({
        "decode": [
            {
                "make": "Acura",
                "msrp": 21000,
                "price": 0,
                "category": "Sedan",
                "engine": "2.4L I4",
                "colour": "Silver"
            },
            {"make": "Ignored", "msrp": 1}
        ]
    }))
}

async fn spawn_upstreams(upstream: Arc<Upstream>) -> (String, String) {
    let nhtsa = Router::new()
        .route("/DecodeVin/:vin", get(nhtsa_handler))
        .with_state(upstream.clone());
    let vindecoder = Router::new()
        .route("/:vin/decode/json", get(vindecoder_handler))
        .with_state(upstream);

    (spawn_server(nhtsa).await, spawn_server(vindecoder).await)
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn setup(settings: DecoderSettings) -> (DecodeOrchestrator, sqlx::SqlitePool, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    let (nhtsa_url, vindecoder_url) = spawn_upstreams(upstream.clone()).await;

    let pool = vindec_common::db::init_memory_database().await.unwrap();
    let orchestrator = DecodeOrchestrator::new(
        pool.clone(),
        Arc::new(RwLock::new(settings)),
        Arc::new(NhtsaClient::with_base_url(nhtsa_url).unwrap()),
        Arc::new(VinDecoderClient::with_base_url(vindecoder_url).unwrap()),
    );

    (orchestrator, pool, upstream)
}

fn with_secondary(key: &str) -> DecoderSettings {
    DecoderSettings {
        enable_secondary_api: true,
        secondary_api_key: Some(key.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_primary_only_decode_filters_sentinels() {
    let (orchestrator, pool, upstream) = setup(DecoderSettings::default()).await;

    let outcome = orchestrator.decode(VIN).await.unwrap();

    assert!(!outcome.cached);
    assert_eq!(outcome.api_source, "nhtsa");
    let record = &outcome.record;
    assert_eq!(record.get(VehicleField::Make), Some("HONDA"));
    assert_eq!(record.get(VehicleField::Horsepower), Some("240"));
    assert!(!record.has_value(VehicleField::Trim));
    assert!(!record.has_value(VehicleField::Series));
    assert!(!record.has_value(VehicleField::Turbo));
    assert_eq!(record.len(), 6);

    assert_eq!(upstream.vindecoder_hits.load(Ordering::SeqCst), 0);

    let stored = decodes::get_by_vin(&pool, VIN).await.unwrap().unwrap();
    assert_eq!(stored.make, "HONDA");
    assert_eq!(stored.model, "Accord");
    assert_eq!(stored.year, "2003");
    assert_eq!(stored.vin_data, outcome.record);
    assert!(!serde_json::to_string(&stored.vin_data)
        .unwrap()
        .contains(NOT_APPLICABLE));
}

#[tokio::test]
async fn test_secondary_fills_gaps_without_overriding() {
    let (orchestrator, _pool, upstream) = setup(with_secondary("eu-key")).await;

    let outcome = orchestrator.decode(VIN).await.unwrap();
    let record = &outcome.record;

    assert_eq!(record.get(VehicleField::Make), Some("HONDA"));
    assert_eq!(record.get(VehicleField::Msrp), Some("21000"));
    assert_eq!(record.get(VehicleField::Category), Some("Sedan"));
    assert_eq!(record.get(VehicleField::EngineInfo), Some("2.4L I4"));
    assert!(!record.has_value(VehicleField::Price));
    assert_eq!(outcome.api_source, "nhtsa");

    assert_eq!(
        upstream.last_auth.lock().unwrap().as_deref(),
        Some("Bearer eu-key")
    );
}

#[tokio::test]
async fn test_secondary_carries_decode_when_primary_down() {
    let (orchestrator, _pool, upstream) = setup(with_secondary("eu-key")).await;
    upstream.nhtsa_down.store(true, Ordering::SeqCst);

    let outcome = orchestrator.decode(VIN).await.unwrap();

    assert_eq!(outcome.api_source, "vindecoder");
    assert_eq!(outcome.record.get(VehicleField::Msrp), Some("21000"));
    assert!(!outcome.record.has_value(VehicleField::Make));
}

#[tokio::test]
async fn test_all_sources_down_is_unavailable() {
    let (orchestrator, pool, upstream) = setup(DecoderSettings::default()).await;
    upstream.nhtsa_down.store(true, Ordering::SeqCst);

    let err = orchestrator.decode(VIN).await.unwrap_err();

    assert!(matches!(err, DecodeError::Unavailable));
    assert!(decodes::get_by_vin(&pool, VIN).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cache_hit_skips_upstream() {
    let (orchestrator, _pool, upstream) = setup(with_secondary("eu-key")).await;

    let first = orchestrator.decode(VIN).await.unwrap();
    let second = orchestrator.decode(&VIN.to_lowercase()).await.unwrap();

    assert!(second.cached);
    assert_eq!(second.record, first.record);
    assert_eq!(second.decode_id, first.decode_id);
    assert_eq!(upstream.nhtsa_hits.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.vindecoder_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_redecode_after_delete_replaces_row() {
    let (orchestrator, pool, upstream) = setup(DecoderSettings::default()).await;

    let first = orchestrator.decode(VIN).await.unwrap();
    let first_id = first.decode_id.unwrap();
    assert!(decodes::delete(&pool, first_id).await.unwrap());

    let second = orchestrator.decode(VIN).await.unwrap();

    assert!(!second.cached);
    assert_eq!(second.record.get(VehicleField::Model), Some("Accord EX"));
    assert_eq!(upstream.nhtsa_hits.load(Ordering::SeqCst), 2);

    let stored = decodes::get_by_vin(&pool, VIN).await.unwrap().unwrap();
    assert_eq!(stored.model, "Accord EX");
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vin_decodes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
