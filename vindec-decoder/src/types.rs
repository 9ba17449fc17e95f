//! Core Types and Trait Definitions for vindec-decoder
//!
//! Defines the closed canonical field set, the canonical record, and the
//! `DecodeSource` trait every upstream adapter implements.
//!
//! # Pipeline
//! - VIN validation (`crate::vin`)
//! - Source adapters (`crate::extractors`) produce `SourceDecodeResult`
//! - Merge (`crate::fusion`) produces a `VehicleRecord`
//! - Orchestration and caching (`crate::services::decode_orchestrator`)

use crate::vin::Vin;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Literal upstream value meaning "no data"
pub const NOT_APPLICABLE: &str = "Not Applicable";

// ============================================================================
// Canonical fields
// ============================================================================

/// Canonical vehicle field
///
/// The set is closed: upstream fields that do not map to one of these are
/// dropped. Declaration order is the serialization order of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VehicleField {
    // Basic
    Make,
    Model,
    Year,
    Trim,
    Series,
    // Body
    BodyClass,
    VehicleType,
    Descriptor,
    Doors,
    Seats,
    SeatRows,
    // Engine
    Cylinders,
    Displacement,
    #[serde(rename = "displacementCI")]
    DisplacementCi,
    EngineModel,
    Horsepower,
    HorsepowerTo,
    EngineConfig,
    // Fuel
    FuelType,
    FuelTypeSecondary,
    FuelInjection,
    Turbo,
    Supercharger,
    // Drivetrain
    Transmission,
    TransmissionSpeeds,
    DriveType,
    Axles,
    AxleConfig,
    // Dimensions & weight
    GvwrFrom,
    GvwrTo,
    CurbWeight,
    Wheelbase,
    TrackWidth,
    // Safety
    Airbags,
    Abs,
    Esc,
    Tcs,
    // Manufacturing
    Manufacturer,
    PlantCity,
    PlantState,
    PlantCountry,
    PlantCompany,
    // Secondary source only
    Msrp,
    Category,
    Price,
    EngineInfo,
}

impl VehicleField {
    /// Every canonical field in declaration order
    pub const ALL: [VehicleField; 46] = [
        VehicleField::Make,
        VehicleField::Model,
        VehicleField::Year,
        VehicleField::Trim,
        VehicleField::Series,
        VehicleField::BodyClass,
        VehicleField::VehicleType,
        VehicleField::Descriptor,
        VehicleField::Doors,
        VehicleField::Seats,
        VehicleField::SeatRows,
        VehicleField::Cylinders,
        VehicleField::Displacement,
        VehicleField::DisplacementCi,
        VehicleField::EngineModel,
        VehicleField::Horsepower,
        VehicleField::HorsepowerTo,
        VehicleField::EngineConfig,
        VehicleField::FuelType,
        VehicleField::FuelTypeSecondary,
        VehicleField::FuelInjection,
        VehicleField::Turbo,
        VehicleField::Supercharger,
        VehicleField::Transmission,
        VehicleField::TransmissionSpeeds,
        VehicleField::DriveType,
        VehicleField::Axles,
        VehicleField::AxleConfig,
        VehicleField::GvwrFrom,
        VehicleField::GvwrTo,
        VehicleField::CurbWeight,
        VehicleField::Wheelbase,
        VehicleField::TrackWidth,
        VehicleField::Airbags,
        VehicleField::Abs,
        VehicleField::Esc,
        VehicleField::Tcs,
        VehicleField::Manufacturer,
        VehicleField::PlantCity,
        VehicleField::PlantState,
        VehicleField::PlantCountry,
        VehicleField::PlantCompany,
        VehicleField::Msrp,
        VehicleField::Category,
        VehicleField::Price,
        VehicleField::EngineInfo,
    ];

    /// Canonical key (matches the serde representation)
    pub fn key(self) -> &'static str {
        match self {
            VehicleField::Make => "make",
            VehicleField::Model => "model",
            VehicleField::Year => "year",
            VehicleField::Trim => "trim",
            VehicleField::Series => "series",
            VehicleField::BodyClass => "bodyClass",
            VehicleField::VehicleType => "vehicleType",
            VehicleField::Descriptor => "descriptor",
            VehicleField::Doors => "doors",
            VehicleField::Seats => "seats",
            VehicleField::SeatRows => "seatRows",
            VehicleField::Cylinders => "cylinders",
            VehicleField::Displacement => "displacement",
            VehicleField::DisplacementCi => "displacementCI",
            VehicleField::EngineModel => "engineModel",
            VehicleField::Horsepower => "horsepower",
            VehicleField::HorsepowerTo => "horsepowerTo",
            VehicleField::EngineConfig => "engineConfig",
            VehicleField::FuelType => "fuelType",
            VehicleField::FuelTypeSecondary => "fuelTypeSecondary",
            VehicleField::FuelInjection => "fuelInjection",
            VehicleField::Turbo => "turbo",
            VehicleField::Supercharger => "supercharger",
            VehicleField::Transmission => "transmission",
            VehicleField::TransmissionSpeeds => "transmissionSpeeds",
            VehicleField::DriveType => "driveType",
            VehicleField::Axles => "axles",
            VehicleField::AxleConfig => "axleConfig",
            VehicleField::GvwrFrom => "gvwrFrom",
            VehicleField::GvwrTo => "gvwrTo",
            VehicleField::CurbWeight => "curbWeight",
            VehicleField::Wheelbase => "wheelbase",
            VehicleField::TrackWidth => "trackWidth",
            VehicleField::Airbags => "airbags",
            VehicleField::Abs => "abs",
            VehicleField::Esc => "esc",
            VehicleField::Tcs => "tcs",
            VehicleField::Manufacturer => "manufacturer",
            VehicleField::PlantCity => "plantCity",
            VehicleField::PlantState => "plantState",
            VehicleField::PlantCountry => "plantCountry",
            VehicleField::PlantCompany => "plantCompany",
            VehicleField::Msrp => "msrp",
            VehicleField::Category => "category",
            VehicleField::Price => "price",
            VehicleField::EngineInfo => "engineInfo",
        }
    }
}

impl fmt::Display for VehicleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for VehicleField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleField::ALL
            .iter()
            .copied()
            .find(|field| field.key() == s)
            .ok_or_else(|| format!("Unknown vehicle field: {}", s))
    }
}

/// Normalize an upstream value
///
/// Returns `None` for empty (after trimming) and `"Not Applicable"` values,
/// which never enter a canonical record.
pub fn normalize_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value == NOT_APPLICABLE {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// Canonical record
// ============================================================================

/// Canonical vehicle record
///
/// Every stored value is non-empty and never the `"Not Applicable"`
/// sentinel. Serializes as a flat JSON object keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleRecord {
    fields: BTreeMap<VehicleField, String>,
}

impl VehicleRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, if populated
    pub fn get(&self, field: VehicleField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// True if the field holds a non-empty value
    pub fn has_value(&self, field: VehicleField) -> bool {
        self.get(field).is_some_and(|v| !v.is_empty())
    }

    /// Set a field, replacing any previous value
    ///
    /// Empty and sentinel values are ignored. Returns whether the value
    /// was stored.
    pub fn insert(&mut self, field: VehicleField, raw: &str) -> bool {
        match normalize_value(raw) {
            Some(value) => {
                self.fields.insert(field, value);
                true
            }
            None => false,
        }
    }

    /// Set a field only if it has no value yet
    pub fn fill_gap(&mut self, field: VehicleField, raw: &str) -> bool {
        if self.has_value(field) {
            return false;
        }
        self.insert(field, raw)
    }

    /// Number of populated fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field is populated
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Populated fields in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (VehicleField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

impl<'a> FromIterator<(VehicleField, &'a str)> for VehicleRecord {
    fn from_iter<I: IntoIterator<Item = (VehicleField, &'a str)>>(iter: I) -> Self {
        let mut record = VehicleRecord::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

// ============================================================================
// Source adapters
// ============================================================================

/// Output of one decode source
#[derive(Debug, Clone)]
pub struct SourceDecodeResult {
    /// Source name ("nhtsa", "vindecoder")
    pub source: &'static str,
    /// Canonical fields the source could populate
    pub fields: VehicleRecord,
    /// Raw upstream payload, kept for diagnostics only
    pub raw: serde_json::Value,
}

/// Per-source failure
///
/// Never fatal to a decode: a failing source contributes nothing to the
/// merge. Messages are for logs, not for end users.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection failure, timeout, or non-success HTTP status
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Body is not valid JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// JSON parsed but the expected top-level key is missing
    #[error("Unexpected schema: {0}")]
    UnexpectedSchema(String),
}

/// Upstream VIN decode source
///
/// Implementations issue exactly one request per `fetch`, enforce `timeout`
/// as a hard deadline for that request, and never retry.
///
/// # Example
/// ```rust,ignore
/// use vindec_decoder::extractors::NhtsaClient;
/// use vindec_decoder::types::DecodeSource;
///
/// let client = NhtsaClient::new()?;
/// let result = client.fetch(&vin, Duration::from_secs(10), None).await?;
/// println!("{} fields from {}", result.fields.len(), client.name());
/// ```
#[async_trait]
pub trait DecodeSource: Send + Sync {
    /// Source name recorded as `api_source`
    fn name(&self) -> &'static str;

    /// Decode one VIN
    async fn fetch(
        &self,
        vin: &Vin,
        timeout: Duration,
        api_key: Option<&str>,
    ) -> Result<SourceDecodeResult, SourceError>;
}
