//! CLI configuration: where the durable/cache databases live, loaded
//! from a TOML file (default-path search, explicit `--config` override).

use anyhow::Context;
use memory_core::MemoryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk location of the two storage backends plus the engine's
/// component thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub database: DatabaseConfig,
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL (embedded SQLite-compatible) durable store.
    pub sql_path: String,
    /// Path to the redb hot-read cache.
    pub cache_path: String,
}

fn default_user_id() -> String {
    "default_user".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                sql_path: "memory.db".to_string(),
                cache_path: "memory-cache.redb".to_string(),
            },
            default_user_id: default_user_id(),
        }
    }
}

impl CliConfig {
    /// Loads from `path`, or the first of a handful of default
    /// locations, falling back to [`CliConfig::default`] when none
    /// exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("failed to parse TOML config: {}", path.display()))
            }
            None => {
                for candidate in ["memory-cli.toml", ".memory-cli.toml"] {
                    let candidate_path = Path::new(candidate);
                    if candidate_path.exists() {
                        return Self::load(Some(candidate_path));
                    }
                }
                Ok(Self::default())
            }
        }
    }

    /// The engine-wide component defaults; the
    /// CLI does not currently expose overrides for these, matching its
    /// "thin" scope (SPEC_FULL §0).
    #[must_use]
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_files() {
        let config = CliConfig::default();
        assert_eq!(config.database.sql_path, "memory.db");
        assert_eq!(config.database.cache_path, "memory-cache.redb");
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn load_parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            default_user_id = "alice"

            [database]
            sql_path = "custom.db"
            cache_path = "custom.redb"
            "#,
        )
        .unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_user_id, "alice");
        assert_eq!(config.database.sql_path, "custom.db");
    }
}
