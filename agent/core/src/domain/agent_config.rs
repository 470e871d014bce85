// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing one
// agent deployment:
// - Interaction dataset location
// - Storage backend selection
// - Scheduler cadence and backoff
// - Reassessment window and initial learning threshold
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "interactrack.io/v1";
pub const KIND: &str = "AgentConfig";
pub const CONFIG_PATH_ENV: &str = "INTERACTRACK_CONFIG_PATH";

/// Top-level agent configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfigManifest {
    /// API version (must be "interactrack.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AgentConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: AgentConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigSpec {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub assessment: AssessmentConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// CSV with drug1_id, drug2_id, interaction_type, risk_score, risk_category
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackendKind,

    /// Required when backend is postgres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    /// JSON list of therapies loaded into the in-memory backend at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,

    /// Sleep after a failed tick
    #[serde(default = "default_error_backoff")]
    pub error_backoff_seconds: u64,

    /// Number of has-work tick reports kept in memory
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// A therapy is due again once this much time has passed since its last
    /// assessment
    #[serde(default = "default_reassessment_interval")]
    pub reassessment_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Used only when no learning state has been persisted yet
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/DDI_with_scores.csv")
}

fn default_backend() -> StorageBackendKind {
    StorageBackendKind::InMemory
}

fn default_tick_interval() -> u64 {
    5
}

fn default_error_backoff() -> u64 {
    10
}

fn default_history_limit() -> usize {
    50
}

fn default_reassessment_interval() -> u64 {
    3600
}

fn default_initial_threshold() -> f64 {
    crate::domain::learning::DEFAULT_ADAPTIVE_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connection_string: None,
            seed_path: None,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            error_backoff_seconds: default_error_backoff(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            reassessment_interval_seconds: default_reassessment_interval(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            initial_threshold: default_initial_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AgentConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "interactrack-agent".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: AgentConfigSpec::default(),
        }
    }
}

impl StorageConfig {
    pub fn to_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.backend {
            StorageBackendKind::InMemory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let connection_string = self.connection_string.clone().ok_or_else(|| {
                    anyhow::anyhow!("storage.connection_string is required for the postgres backend")
                })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig { connection_string }))
            }
        }
    }
}

impl AgentConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. INTERACTRACK_CONFIG_PATH environment variable
    /// 2. ./interactrack-config.yaml (working directory)
    /// 3. ~/.interactrack/config.yaml (user home)
    /// 4. /etc/interactrack/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./interactrack-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".interactrack").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/interactrack/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as `apply_env_overrides` with an explicit variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("INTERACTRACK_DATASET_PATH") {
            tracing::info!("Environment override: INTERACTRACK_DATASET_PATH={}", path);
            self.spec.dataset.path = PathBuf::from(path);
        }

        if let Some(url) = lookup("INTERACTRACK_DATABASE_URL") {
            tracing::info!("Environment override: INTERACTRACK_DATABASE_URL set, using postgres backend");
            self.spec.storage.backend = StorageBackendKind::Postgres;
            self.spec.storage.connection_string = Some(url);
        }

        if let Some(path) = lookup("INTERACTRACK_SEED_PATH") {
            tracing::info!("Environment override: INTERACTRACK_SEED_PATH={}", path);
            self.spec.storage.seed_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("INTERACTRACK_TICK_INTERVAL_SECONDS") {
            match val.trim().parse::<u64>() {
                Ok(seconds) => {
                    tracing::info!("Environment override: INTERACTRACK_TICK_INTERVAL_SECONDS={}", seconds);
                    self.spec.scheduler.tick_interval_seconds = seconds;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for INTERACTRACK_TICK_INTERVAL_SECONDS: '{}'. Expected an integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.trim().is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.scheduler.tick_interval_seconds == 0 {
            anyhow::bail!("spec.scheduler.tick_interval_seconds must be greater than zero");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres
            && self
                .spec
                .storage
                .connection_string
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }

        if self.spec.storage.seed_path.is_some()
            && self.spec.storage.backend != StorageBackendKind::InMemory
        {
            anyhow::bail!("spec.storage.seed_path is only supported by the in_memory backend");
        }

        if !(self.spec.learning.initial_threshold > 0.0) {
            anyhow::bail!(
                "spec.learning.initial_threshold must be positive, got {}",
                self.spec.learning.initial_threshold
            );
        }

        Ok(())
    }
}
