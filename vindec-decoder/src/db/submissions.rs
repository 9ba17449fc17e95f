//! Form submission records
//!
//! Rows are never updated; they disappear with their decode (cascade) or
//! through the retention purge.

use super::decodes::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use vindec_common::Result;

/// Status written for every recorded submission
pub const STATUS_COMPLETED: &str = "completed";

/// Submission to insert
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub vin_id: i64,
    pub form_id: String,
    pub submission_data: serde_json::Value,
    pub user_ip: String,
    pub user_agent: String,
}

/// Stored submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: i64,
    pub vin_id: i64,
    pub form_id: String,
    pub submission_data: serde_json::Value,
    pub user_ip: String,
    pub user_agent: String,
    pub submitted_at: DateTime<Utc>,
    pub status: String,
}

fn row_to_submission(row: &SqliteRow) -> Result<Submission> {
    let data: String = row.try_get("submission_data")?;
    let submitted_at: String = row.try_get("submitted_at")?;

    Ok(Submission {
        id: row.try_get("id")?,
        vin_id: row.try_get("vin_id")?,
        form_id: row.try_get("form_id")?,
        submission_data: serde_json::from_str(&data)?,
        user_ip: row.try_get("user_ip")?,
        user_agent: row.try_get("user_agent")?,
        submitted_at: parse_timestamp(&submitted_at)?,
        status: row.try_get("status")?,
    })
}

/// Insert a submission, returning its id
pub async fn insert(pool: &SqlitePool, submission: &NewSubmission) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO vin_submissions
            (vin_id, form_id, submission_data, user_ip, user_agent, submitted_at, status)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(submission.vin_id)
    .bind(&submission.form_id)
    .bind(serde_json::to_string(&submission.submission_data)?)
    .bind(&submission.user_ip)
    .bind(&submission.user_agent)
    .bind(format_timestamp(Utc::now()))
    .bind(STATUS_COMPLETED)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Submissions for one decode, newest first
pub async fn list_for_decode(pool: &SqlitePool, vin_id: i64) -> Result<Vec<Submission>> {
    let rows = sqlx::query(
        "SELECT id, vin_id, form_id, submission_data, user_ip, user_agent, submitted_at, status
         FROM vin_submissions
         WHERE vin_id = ?
         ORDER BY submitted_at DESC, id DESC",
    )
    .bind(vin_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_submission).collect()
}

/// Delete submissions older than `days` days; decodes are kept
///
/// Returns the number of deleted rows. A cutoff before the earliest
/// representable date matches nothing.
pub async fn purge_older_than(pool: &SqlitePool, days: u32) -> Result<u64> {
    let Some(cutoff) = Utc::now().checked_sub_signed(Duration::days(i64::from(days))) else {
        tracing::info!(days, "Retention cutoff out of range, nothing to purge");
        return Ok(0);
    };

    let result = sqlx::query("DELETE FROM vin_submissions WHERE submitted_at < ?")
        .bind(format_timestamp(cutoff))
        .execute(pool)
        .await?;

    tracing::info!(
        days,
        deleted = result.rows_affected(),
        "Purged old submissions"
    );

    Ok(result.rows_affected())
}
