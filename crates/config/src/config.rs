//! Application configuration and artifact storage.
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file). Fitted artifacts are read through an `object_store` rooted at
//! the artifact base path.

use core::time::Duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use tracing::debug;

/// Default model hosted behind the generator API.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Default per-request timeout for the text generator.
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 60;

/// Relative locations of every artifact inside the artifact store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Model weights (Burn named `MessagePack` record).
    pub model_record: String,
    /// Model hyper-parameters (Burn config JSON).
    pub model_config: String,
    /// Fitted feature scaler.
    pub feature_scaler: String,
    /// Fitted target scaler.
    pub target_scaler: String,
    /// Nutrition reference table (CSV).
    pub nutrition_db: String,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model_record: "multimodal_model.mpk".to_owned(),
            model_config: "multimodal_model.config.json".to_owned(),
            feature_scaler: "feature_scaler.json".to_owned(),
            target_scaler: "target_scaler.json".to_owned(),
            nutrition_db: "nutrition_db.csv".to_owned(),
        }
    }
}

/// Settings for the hosted text generator.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// API key, only required by commands that generate text.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl core::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the artifact store.
    pub artifact_base_path: PathBuf,
    /// Artifact locations relative to `artifact_base_path`.
    pub artifacts: ArtifactPaths,
    /// Text generator settings.
    pub generator: GeneratorConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `ARTIFACT_BASE_PATH`: artifact store root (default: `./models`)
    /// - `MODEL_RECORD_PATH`, `MODEL_CONFIG_PATH`, `FEATURE_SCALER_PATH`,
    ///   `TARGET_SCALER_PATH`, `NUTRITION_DB_PATH`: artifact locations
    /// - `GEMINI_API_KEY`: key for the hosted generator
    /// - `GEMINI_MODEL`: generator model (default: `gemini-pro`)
    /// - `GENERATOR_TIMEOUT_SECS`: generator timeout (default: 60)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = ArtifactPaths::default();
        let or_default = |key: &str, default: String| lookup(key).unwrap_or(default);

        let artifacts = ArtifactPaths {
            model_record: or_default("MODEL_RECORD_PATH", defaults.model_record),
            model_config: or_default("MODEL_CONFIG_PATH", defaults.model_config),
            feature_scaler: or_default("FEATURE_SCALER_PATH", defaults.feature_scaler),
            target_scaler: or_default("TARGET_SCALER_PATH", defaults.target_scaler),
            nutrition_db: or_default("NUTRITION_DB_PATH", defaults.nutrition_db),
        };

        let timeout_secs = match lookup("GENERATOR_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("GENERATOR_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_GENERATOR_TIMEOUT_SECS,
        };

        let generator = GeneratorConfig {
            api_key: lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty()),
            model: or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL.to_owned()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            artifact_base_path: lookup("ARTIFACT_BASE_PATH")
                .map_or_else(|| PathBuf::from("./models"), PathBuf::from),
            artifacts,
            generator,
        })
    }
}

/// Errors raised while reading artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The artifact (or the store root) does not exist.
    #[error("artifact not found: {path}")]
    Missing { path: String },

    /// Any other storage failure.
    #[error("failed to read artifact {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: object_store::Error,
    },
}

/// Read-only access to fitted artifacts on the local filesystem.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    base_path: PathBuf,
}

impl ArtifactStore {
    /// Opens the store rooted at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Missing`] if the directory does not exist.
    pub fn open(base_path: &Path) -> Result<Self, ArtifactError> {
        if !base_path.is_dir() {
            return Err(ArtifactError::Missing {
                path: base_path.display().to_string(),
            });
        }

        let store = LocalFileSystem::new_with_prefix(base_path).map_err(|source| {
            ArtifactError::Store {
                path: base_path.display().to_string(),
                source,
            }
        })?;

        Ok(Self {
            store: Arc::new(store),
            base_path: base_path.to_path_buf(),
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Reads an artifact and returns its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Missing`] if the artifact does not exist.
    pub async fn read(&self, relative_path: &str) -> Result<Bytes, ArtifactError> {
        let object_path = ObjectStorePath::from(relative_path);
        let full_path = || self.base_path.join(relative_path).display().to_string();

        debug!(path = %full_path(), "Reading artifact");

        let result = match self.store.get(&object_path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(ArtifactError::Missing { path: full_path() });
            }
            Err(source) => {
                return Err(ArtifactError::Store {
                    path: full_path(),
                    source,
                });
            }
        };

        result.bytes().await.map_err(|source| ArtifactError::Store {
            path: full_path(),
            source,
        })
    }
}
