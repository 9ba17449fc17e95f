//! Record merger
//!
//! Merge strategy: start from the primary's fields, then add each secondary
//! field only where the primary has no non-empty value. Precedence is total,
//! so the result never depends on the order fields arrive in.

use crate::types::{SourceDecodeResult, VehicleRecord};

/// Merge primary and secondary results into one canonical record
///
/// Both absent yields an empty record; the caller decides whether that is
/// an error.
pub fn merge(
    primary: Option<&SourceDecodeResult>,
    secondary: Option<&SourceDecodeResult>,
) -> VehicleRecord {
    let mut merged = primary
        .map(|result| result.fields.clone())
        .unwrap_or_default();

    if let Some(secondary) = secondary {
        for (field, value) in secondary.fields.iter() {
            merged.fill_gap(field, value);
        }
    }

    merged
}

/// Name of the first source (primary before secondary) with at least one field
pub fn contributing_source(
    primary: Option<&SourceDecodeResult>,
    secondary: Option<&SourceDecodeResult>,
) -> Option<&'static str> {
    [primary, secondary]
        .into_iter()
        .flatten()
        .find(|result| !result.fields.is_empty())
        .map(|result| result.source)
}
