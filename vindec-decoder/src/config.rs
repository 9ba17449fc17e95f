//! Runtime settings resolution for vindec-decoder
//!
//! Settings live in the database `settings` table. Values missing there fall
//! back to the bootstrap TOML, then to defaults. The secondary API key also
//! honours an environment variable: Database → ENV → TOML.

use crate::db::settings as db_settings;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use vindec_common::config::{load_toml_config, write_toml_config, TomlConfig};
use vindec_common::Result;

/// Environment variable carrying the secondary API key
pub const SECONDARY_API_KEY_ENV: &str = "VINDEC_SECONDARY_API_KEY";

pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
pub const MIN_API_TIMEOUT_SECS: u64 = 5;
pub const MAX_API_TIMEOUT_SECS: u64 = 30;

/// Settings snapshot shared by the router and the orchestrator
pub type SharedSettings = Arc<RwLock<DecoderSettings>>;

/// Effective decoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoderSettings {
    /// Per-call upstream timeout, always within 5-30 s
    pub api_timeout_secs: u64,
    pub enable_secondary_api: bool,
    #[serde(skip_serializing)]
    pub secondary_api_key: Option<String>,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            enable_secondary_api: false,
            secondary_api_key: None,
        }
    }
}

impl DecoderSettings {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Key to send to the secondary source, if any
    pub fn secondary_key(&self) -> Option<&str> {
        self.secondary_api_key.as_deref().filter(|k| is_valid_key(k))
    }
}

/// Clamp a timeout to the allowed 5-30 s range
pub fn clamp_timeout_secs(secs: u64) -> u64 {
    secs.clamp(MIN_API_TIMEOUT_SECS, MAX_API_TIMEOUT_SECS)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the secondary API key
///
/// **Priority:** Database → ENV → TOML. `None` when no source has a valid
/// key; the secondary source is then called without one.
pub async fn resolve_secondary_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = db_settings::get_secondary_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(SECONDARY_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .secondary_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        (db_key.is_some(), "database"),
        (env_key.is_some(), "environment"),
        (toml_key.is_some(), "TOML"),
    ]
    .into_iter()
    .filter_map(|(present, name)| present.then_some(name))
    .collect();

    if sources.len() > 1 {
        warn!(
            "Secondary API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("Secondary API key loaded from {}", source);
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Load effective settings at startup
pub async fn load_settings(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<DecoderSettings> {
    let raw_timeout = match db_settings::get_api_timeout_secs(db).await? {
        Some(secs) => secs,
        None => toml_config
            .api_timeout_secs
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS),
    };
    let api_timeout_secs = clamp_timeout_secs(raw_timeout);
    if api_timeout_secs != raw_timeout {
        warn!(
            requested = raw_timeout,
            effective = api_timeout_secs,
            "API timeout outside {}-{} s, clamped",
            MIN_API_TIMEOUT_SECS,
            MAX_API_TIMEOUT_SECS
        );
    }

    let enable_secondary_api = match db_settings::get_enable_secondary_api(db).await? {
        Some(enabled) => enabled,
        None => toml_config.enable_secondary_api.unwrap_or(false),
    };

    let secondary_api_key = resolve_secondary_api_key(db, toml_config).await?;

    Ok(DecoderSettings {
        api_timeout_secs,
        enable_secondary_api,
        secondary_api_key,
    })
}

/// Partial settings update (fields left `None` are unchanged)
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub api_timeout_secs: Option<u64>,
    pub enable_secondary_api: Option<bool>,
    /// An empty string clears the stored key
    pub secondary_api_key: Option<String>,
}

/// Apply an update to the database and return the new effective settings
pub async fn apply_update(
    db: &Pool<Sqlite>,
    current: &DecoderSettings,
    update: SettingsUpdate,
) -> Result<DecoderSettings> {
    let mut next = current.clone();

    if let Some(secs) = update.api_timeout_secs {
        next.api_timeout_secs = clamp_timeout_secs(secs);
        db_settings::set_api_timeout_secs(db, next.api_timeout_secs).await?;
    }
    if let Some(enabled) = update.enable_secondary_api {
        next.enable_secondary_api = enabled;
        db_settings::set_enable_secondary_api(db, enabled).await?;
    }
    if let Some(key) = update.secondary_api_key {
        let key = key.trim().to_string();
        db_settings::set_secondary_api_key(db, key.clone()).await?;
        next.secondary_api_key = Some(key).filter(|k| is_valid_key(k));
    }

    Ok(next)
}

// ============================================================================
// Settings Sync and Write-Back
// ============================================================================

/// Mirror settings into the bootstrap TOML file
///
/// Best effort: the database write already succeeded, so a TOML failure is
/// logged and swallowed.
pub fn sync_settings_to_toml(settings: &DecoderSettings, toml_path: &Path) -> Result<()> {
    let mut config = load_toml_config(toml_path)?;

    config.api_timeout_secs = Some(settings.api_timeout_secs);
    config.enable_secondary_api = Some(settings.enable_secondary_api);
    config.secondary_api_key = settings.secondary_api_key.clone();

    match write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
            Ok(())
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use vindec_common::db::init_memory_database;

    #[test]
    fn test_clamp_timeout() {
        assert_eq!(clamp_timeout_secs(0), 5);
        assert_eq!(clamp_timeout_secs(5), 5);
        assert_eq!(clamp_timeout_secs(12), 12);
        assert_eq!(clamp_timeout_secs(300), 30);
    }

    #[tokio::test]
    #[serial]
    async fn test_defaults_when_nothing_configured() {
        std::env::remove_var(SECONDARY_API_KEY_ENV);
        let pool = init_memory_database().await.unwrap();

        let settings = load_settings(&pool, &TomlConfig::default()).await.unwrap();
        assert_eq!(settings, DecoderSettings::default());
        assert_eq!(settings.api_timeout(), Duration::from_secs(10));
        assert!(!settings.enable_secondary_api);
    }

    #[tokio::test]
    #[serial]
    async fn test_toml_values_used_and_clamped() {
        std::env::remove_var(SECONDARY_API_KEY_ENV);
        let pool = init_memory_database().await.unwrap();
        let toml = TomlConfig {
            api_timeout_secs: Some(90),
            enable_secondary_api: Some(true),
            secondary_api_key: Some("toml-key".to_string()),
            ..Default::default()
        };

        let settings = load_settings(&pool, &toml).await.unwrap();
        assert_eq!(settings.api_timeout_secs, 30);
        assert!(settings.enable_secondary_api);
        assert_eq!(settings.secondary_key(), Some("toml-key"));
    }

    #[tokio::test]
    #[serial]
    async fn test_key_priority_database_env_toml() {
        let pool = init_memory_database().await.unwrap();
        let toml = TomlConfig {
            secondary_api_key: Some("toml-key".to_string()),
            ..Default::default()
        };

        std::env::set_var(SECONDARY_API_KEY_ENV, "env-key");
        assert_eq!(
            resolve_secondary_api_key(&pool, &toml).await.unwrap(),
            Some("env-key".to_string())
        );

        db_settings::set_secondary_api_key(&pool, "db-key".to_string())
            .await
            .unwrap();
        assert_eq!(
            resolve_secondary_api_key(&pool, &toml).await.unwrap(),
            Some("db-key".to_string())
        );

        std::env::remove_var(SECONDARY_API_KEY_ENV);
    }

    #[tokio::test]
    #[serial]
    async fn test_blank_keys_are_ignored() {
        std::env::set_var(SECONDARY_API_KEY_ENV, "   ");
        let pool = init_memory_database().await.unwrap();
        db_settings::set_secondary_api_key(&pool, "".to_string())
            .await
            .unwrap();

        let key = resolve_secondary_api_key(&pool, &TomlConfig::default())
            .await
            .unwrap();
        assert_eq!(key, None);

        std::env::remove_var(SECONDARY_API_KEY_ENV);
    }

    #[tokio::test]
    async fn test_apply_update_persists_and_clamps() {
        let pool = init_memory_database().await.unwrap();
        let update = SettingsUpdate {
            api_timeout_secs: Some(2),
            enable_secondary_api: Some(true),
            secondary_api_key: Some(" abc ".to_string()),
        };

        let next = apply_update(&pool, &DecoderSettings::default(), update)
            .await
            .unwrap();

        assert_eq!(next.api_timeout_secs, 5);
        assert!(next.enable_secondary_api);
        assert_eq!(next.secondary_key(), Some("abc"));
        assert_eq!(db_settings::get_api_timeout_secs(&pool).await.unwrap(), Some(5));
        assert_eq!(
            db_settings::get_enable_secondary_api(&pool).await.unwrap(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_apply_update_empty_key_clears() {
        let pool = init_memory_database().await.unwrap();
        let current = DecoderSettings {
            secondary_api_key: Some("old".to_string()),
            ..Default::default()
        };
        let update = SettingsUpdate {
            secondary_api_key: Some(String::new()),
            ..Default::default()
        };

        let next = apply_update(&pool, &current, update).await.unwrap();
        assert_eq!(next.secondary_api_key, None);
    }

    #[test]
    fn test_sync_settings_to_toml_preserves_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let existing = TomlConfig {
            port: Some(8080),
            ..Default::default()
        };
        write_toml_config(&existing, &path).unwrap();

        let settings = DecoderSettings {
            api_timeout_secs: 20,
            enable_secondary_api: true,
            secondary_api_key: Some("k".to_string()),
        };
        sync_settings_to_toml(&settings, &path).unwrap();

        let reloaded = load_toml_config(&path).unwrap();
        assert_eq!(reloaded.port, Some(8080));
        assert_eq!(reloaded.api_timeout_secs, Some(20));
        assert_eq!(reloaded.enable_secondary_api, Some(true));
        assert_eq!(reloaded.secondary_api_key, Some("k".to_string()));
    }
}
