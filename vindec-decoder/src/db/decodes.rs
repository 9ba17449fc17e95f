//! Decode store
//!
//! One row per VIN in `vin_decodes`. A decode is replace-or-insert only: a
//! fresh decode rewrites every column of the existing row and keeps its id.

use crate::pagination::{calculate_pagination, Pagination};
use crate::types::{VehicleField, VehicleRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use vindec_common::{Error, Result};

/// Flat indexed columns and the canonical field each one mirrors
pub const FLAT_COLUMNS: &[(&str, VehicleField)] = &[
    ("make", VehicleField::Make),
    ("model", VehicleField::Model),
    ("year", VehicleField::Year),
    ("trim", VehicleField::Trim),
    ("body_class", VehicleField::BodyClass),
    ("vehicle_type", VehicleField::VehicleType),
    ("engine_cylinders", VehicleField::Cylinders),
    ("engine_displacement", VehicleField::Displacement),
    ("engine_hp", VehicleField::Horsepower),
    ("fuel_type", VehicleField::FuelType),
    ("transmission", VehicleField::Transmission),
    ("drive_type", VehicleField::DriveType),
    ("manufacturer", VehicleField::Manufacturer),
    ("plant_city", VehicleField::PlantCity),
    ("plant_state", VehicleField::PlantState),
    ("plant_country", VehicleField::PlantCountry),
    ("gvwr", VehicleField::GvwrFrom),
    ("curb_weight", VehicleField::CurbWeight),
    ("airbags", VehicleField::Airbags),
    ("abs", VehicleField::Abs),
];

const SELECT_COLUMNS: &str = "id, vin, make, model, year, raw_data, api_source, decoded_at";

/// Persisted decode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDecode {
    pub id: i64,
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: String,
    /// Full canonical record (the `raw_data` column)
    pub vin_data: VehicleRecord,
    pub api_source: String,
    pub decoded_at: DateTime<Utc>,
}

/// Timestamp format for every stored time (lexically sortable)
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", raw, e)))
}

fn row_to_decode(row: &SqliteRow) -> Result<StoredDecode> {
    let raw_data: String = row.try_get("raw_data")?;
    let decoded_at: String = row.try_get("decoded_at")?;

    Ok(StoredDecode {
        id: row.try_get("id")?,
        vin: row.try_get("vin")?,
        make: row.try_get("make")?,
        model: row.try_get("model")?,
        year: row.try_get("year")?,
        vin_data: serde_json::from_str(&raw_data)?,
        api_source: row.try_get("api_source")?,
        decoded_at: parse_timestamp(&decoded_at)?,
    })
}

/// Load the stored decode for a VIN
pub async fn get_by_vin(pool: &SqlitePool, vin: &str) -> Result<Option<StoredDecode>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM vin_decodes WHERE vin = ?",
        SELECT_COLUMNS
    ))
    .bind(vin)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_decode).transpose()
}

/// Load a stored decode by id
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<StoredDecode>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM vin_decodes WHERE id = ?",
        SELECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_decode).transpose()
}

/// Insert or fully replace the decode for a VIN
///
/// Every column is rewritten on conflict, so fields missing from `record`
/// are cleared rather than left stale. The row id is preserved.
pub async fn upsert(
    pool: &SqlitePool,
    vin: &str,
    record: &VehicleRecord,
    api_source: &str,
) -> Result<StoredDecode> {
    let decoded_at = Utc::now();
    let raw_data = serde_json::to_string(record)?;

    let columns: Vec<&str> = FLAT_COLUMNS.iter().map(|(column, _)| *column).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .chain(["raw_data", "api_source", "decoded_at"].iter())
        .map(|column| format!("{0} = excluded.{0}", column))
        .collect();

    let sql = format!(
        "INSERT INTO vin_decodes (vin, {}, raw_data, api_source, decoded_at)
         VALUES (?, {}, ?, ?, ?)
         ON CONFLICT(vin) DO UPDATE SET {}
         RETURNING id",
        columns.join(", "),
        placeholders,
        updates.join(", ")
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(vin);
    for (_, field) in FLAT_COLUMNS {
        query = query.bind(record.get(*field).unwrap_or_default().to_string());
    }
    let id = query
        .bind(&raw_data)
        .bind(api_source)
        .bind(format_timestamp(decoded_at))
        .fetch_one(pool)
        .await?;

    tracing::debug!(id, vin = %vin, api_source = %api_source, "Stored decode");

    Ok(StoredDecode {
        id,
        vin: vin.to_string(),
        make: record.get(VehicleField::Make).unwrap_or_default().to_string(),
        model: record.get(VehicleField::Model).unwrap_or_default().to_string(),
        year: record.get(VehicleField::Year).unwrap_or_default().to_string(),
        vin_data: record.clone(),
        api_source: api_source.to_string(),
        decoded_at,
    })
}

/// Delete a decode (and, by cascade, its submissions)
///
/// Returns whether a row was deleted.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vin_decodes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Listing
// ============================================================================

/// Sortable columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortColumn {
    #[default]
    DecodedAt,
    Vin,
    Make,
    Model,
    Year,
}

impl SortColumn {
    /// Parse a client value; anything unknown falls back to `decoded_at`
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("vin") => SortColumn::Vin,
            Some("make") => SortColumn::Make,
            Some("model") => SortColumn::Model,
            Some("year") => SortColumn::Year,
            _ => SortColumn::DecodedAt,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortColumn::DecodedAt => "decoded_at",
            SortColumn::Vin => "vin",
            SortColumn::Make => "make",
            SortColumn::Model => "model",
            SortColumn::Year => "year",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a client value (case-insensitive); anything unknown is `Desc`
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Admin listing filter
///
/// Exact-match filters and the substring search are combined with AND.
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct DecodeFilter {
    /// Substring over vin OR make OR model
    pub search: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub order_by: SortColumn,
    pub order: SortOrder,
}

/// One page of decodes
#[derive(Debug, Clone)]
pub struct DecodePage {
    pub items: Vec<StoredDecode>,
    pub total: i64,
    pub pagination: Pagination,
}

/// Escape LIKE metacharacters (`\`, `%`, `_`) for use with `ESCAPE '\'`
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn push_where<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a DecodeFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(search) = non_empty(&filter.search) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (vin LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR make LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR model LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(make) = non_empty(&filter.make) {
        builder.push(" AND make = ").push_bind(make);
    }
    if let Some(model) = non_empty(&filter.model) {
        builder.push(" AND model = ").push_bind(model);
    }
    if let Some(year) = non_empty(&filter.year) {
        builder.push(" AND year = ").push_bind(year);
    }
}

/// List decodes matching a filter, one page at a time
pub async fn list(
    pool: &SqlitePool,
    filter: &DecodeFilter,
    page: i64,
    page_size: i64,
) -> Result<DecodePage> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM vin_decodes");
    push_where(&mut count_query, filter);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let pagination = calculate_pagination(total, page, page_size);

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM vin_decodes", SELECT_COLUMNS));
    push_where(&mut select, filter);
    // Column and direction come from closed enums, never from client text
    select
        .push(format!(
            " ORDER BY {} {}, id {}",
            filter.order_by.column(),
            filter.order.keyword(),
            filter.order.keyword()
        ))
        .push(" LIMIT ")
        .push_bind(pagination.page_size)
        .push(" OFFSET ")
        .push_bind(pagination.offset);

    let rows = select.build().fetch_all(pool).await?;
    let items = rows.iter().map(row_to_decode).collect::<Result<Vec<_>>>()?;

    Ok(DecodePage {
        items,
        total,
        pagination,
    })
}

// ============================================================================
// Filter values
// ============================================================================

/// Columns that may be queried for distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Make,
    Model,
    Year,
    VehicleType,
    FuelType,
}

impl FilterField {
    pub fn column(self) -> &'static str {
        match self {
            FilterField::Make => "make",
            FilterField::Model => "model",
            FilterField::Year => "year",
            FilterField::VehicleType => "vehicle_type",
            FilterField::FuelType => "fuel_type",
        }
    }
}

impl std::str::FromStr for FilterField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "make" => Ok(FilterField::Make),
            "model" => Ok(FilterField::Model),
            "year" => Ok(FilterField::Year),
            "vehicle_type" => Ok(FilterField::VehicleType),
            "fuel_type" => Ok(FilterField::FuelType),
            other => Err(Error::InvalidInput(format!("Unknown filter field: {}", other))),
        }
    }
}

/// Sorted distinct non-empty values of one filter column
pub async fn distinct_values(pool: &SqlitePool, field: FilterField) -> Result<Vec<String>> {
    let column = field.column();
    let values: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT DISTINCT {0} FROM vin_decodes WHERE {0} != '' ORDER BY {0} ASC",
        column
    ))
    .fetch_all(pool)
    .await?;

    Ok(values)
}

// ============================================================================
// Stats
// ============================================================================

/// Number of decodes for one make
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakeCount {
    pub make: String,
    pub count: i64,
}

/// Dashboard totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub total_decodes: i64,
    pub total_submissions: i64,
    pub decodes_today: i64,
    pub submissions_today: i64,
    pub top_makes: Vec<MakeCount>,
}

/// Collect dashboard totals (today is the current UTC day)
pub async fn stats(pool: &SqlitePool) -> Result<DecodeStats> {
    let today_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| format_timestamp(naive.and_utc()))
        .ok_or_else(|| Error::Internal("Midnight out of range".to_string()))?;

    let total_decodes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vin_decodes")
        .fetch_one(pool)
        .await?;
    let total_submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vin_submissions")
        .fetch_one(pool)
        .await?;
    let decodes_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM vin_decodes WHERE decoded_at >= ?")
            .bind(&today_start)
            .fetch_one(pool)
            .await?;
    let submissions_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM vin_submissions WHERE submitted_at >= ?")
            .bind(&today_start)
            .fetch_one(pool)
            .await?;

    let top_makes = sqlx::query_as::<_, (String, i64)>(
        "SELECT make, COUNT(*) AS count FROM vin_decodes
         WHERE make != ''
         GROUP BY make
         ORDER BY count DESC, make ASC
         LIMIT 10",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(make, count)| MakeCount { make, count })
    .collect();

    Ok(DecodeStats {
        total_decodes,
        total_submissions,
        decodes_today,
        submissions_today,
        top_makes,
    })
}
