//! Settings database operations
//!
//! Key-value accessors over the `settings` table.

use sqlx::{Pool, Sqlite};
use vindec_common::{Error, Result};

pub const KEY_API_TIMEOUT_SECS: &str = "api_timeout_secs";
pub const KEY_ENABLE_SECONDARY_API: &str = "enable_secondary_api";
pub const KEY_SECONDARY_API_KEY: &str = "secondary_api_key";

/// Per-call upstream timeout in seconds, if stored
pub async fn get_api_timeout_secs(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, KEY_API_TIMEOUT_SECS).await
}

pub async fn set_api_timeout_secs(db: &Pool<Sqlite>, secs: u64) -> Result<()> {
    set_setting(db, KEY_API_TIMEOUT_SECS, secs).await
}

/// Whether the secondary source is consulted, if stored
pub async fn get_enable_secondary_api(db: &Pool<Sqlite>) -> Result<Option<bool>> {
    get_setting(db, KEY_ENABLE_SECONDARY_API).await
}

pub async fn set_enable_secondary_api(db: &Pool<Sqlite>, enabled: bool) -> Result<()> {
    set_setting(db, KEY_ENABLE_SECONDARY_API, enabled).await
}

/// Secondary source API key, if stored
pub async fn get_secondary_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, KEY_SECONDARY_API_KEY).await
}

pub async fn set_secondary_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, KEY_SECONDARY_API_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
