//! Database initialization
//!
//! Opens (or creates) the SQLite database and makes sure every table the
//! decoder needs exists. All statements are idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Uses a single connection that never expires, since every SQLite
/// `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_vin_decodes_table(pool).await?;
    create_vin_submissions_table(pool).await?;

    info!("Database tables initialized (settings, vin_decodes, vin_submissions)");
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per decoded VIN
///
/// The flat columns back the admin filters; `raw_data` holds the full
/// canonical record as JSON.
async fn create_vin_decodes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vin_decodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vin TEXT NOT NULL UNIQUE,
            make TEXT NOT NULL DEFAULT '',
            model TEXT NOT NULL DEFAULT '',
            year TEXT NOT NULL DEFAULT '',
            trim TEXT NOT NULL DEFAULT '',
            body_class TEXT NOT NULL DEFAULT '',
            vehicle_type TEXT NOT NULL DEFAULT '',
            engine_cylinders TEXT NOT NULL DEFAULT '',
            engine_displacement TEXT NOT NULL DEFAULT '',
            engine_hp TEXT NOT NULL DEFAULT '',
            fuel_type TEXT NOT NULL DEFAULT '',
            transmission TEXT NOT NULL DEFAULT '',
            drive_type TEXT NOT NULL DEFAULT '',
            manufacturer TEXT NOT NULL DEFAULT '',
            plant_city TEXT NOT NULL DEFAULT '',
            plant_state TEXT NOT NULL DEFAULT '',
            plant_country TEXT NOT NULL DEFAULT '',
            gvwr TEXT NOT NULL DEFAULT '',
            curb_weight TEXT NOT NULL DEFAULT '',
            airbags TEXT NOT NULL DEFAULT '',
            abs TEXT NOT NULL DEFAULT '',
            raw_data TEXT NOT NULL DEFAULT '{}',
            api_source TEXT NOT NULL DEFAULT 'nhtsa',
            decoded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vin_decodes_make_model ON vin_decodes(make, model)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vin_decodes_decoded_at ON vin_decodes(decoded_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Form submissions linked to a decoded VIN (cascade-deleted with it)
async fn create_vin_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vin_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vin_id INTEGER NOT NULL REFERENCES vin_decodes(id) ON DELETE CASCADE,
            form_id TEXT NOT NULL DEFAULT '',
            submission_data TEXT NOT NULL DEFAULT '{}',
            user_ip TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            submitted_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vin_submissions_vin_id ON vin_submissions(vin_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vin_submissions_submitted_at ON vin_submissions(submitted_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
