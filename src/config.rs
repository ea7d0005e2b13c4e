//! Configuration types for immunespace-provider

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Where downloads live on the provider's filesystem
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root under which one directory per download is created (default: "./data")
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

/// Data storage and state management
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./immunespace-provider.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Container runtime and tool images used for the two download stages
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to docker executable (auto-detected if None)
    #[serde(default)]
    pub docker_path: Option<PathBuf>,

    /// Whether to search PATH for docker if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Image that fetches the matrices from ImmunoSpace
    #[serde(default = "default_groups_image")]
    pub groups_image: String,

    /// Image that maps the fetched matrices in place
    #[serde(default = "default_mapper_image")]
    pub mapper_image: String,

    /// Volume (or host directory) holding the data root, mounted into each stage
    #[serde(default = "default_data_volume")]
    pub data_volume: String,

    /// Mount point of the data volume inside the stage containers (default: "/data")
    #[serde(default = "default_container_data_dir")]
    pub container_data_dir: String,

    /// Output text that marks a failed stage
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    /// Per-stage timeout in seconds (default: 3600)
    #[serde(default = "default_stage_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub stage_timeout: Duration,

    /// Treat mapper failures as fatal (default: false, mapper output is only recorded)
    #[serde(default)]
    pub strict_mapper: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            docker_path: None,
            search_path: true,
            groups_image: default_groups_image(),
            mapper_image: default_mapper_image(),
            data_volume: default_data_volume(),
            container_data_dir: default_container_data_dir(),
            failure_marker: default_failure_marker(),
            stage_timeout: default_stage_timeout(),
            strict_mapper: false,
        }
    }
}

/// How submissions run their tool stages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run both stages inside the submit request
    #[default]
    Sync,
    /// Queue the stages and return immediately
    Async,
}

impl std::str::FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(ExecutionMode::Sync),
            "async" => Ok(ExecutionMode::Async),
            other => Err(Error::Config {
                message: format!("unknown execution mode '{}'", other),
                key: Some("queue.mode".to_string()),
            }),
        }
    }
}

/// Background job queue settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueConfig {
    /// Execution mode (default: sync)
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Number of long-lived workers draining the queue in async mode (default: 2)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Upper bound on a whole job in seconds (default: 3600)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub job_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            workers: default_workers(),
            job_timeout: default_job_timeout(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8083)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Base URL used in `self_uri` and `drs_uri` (default: "http://localhost:8083")
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_base_url: default_public_base_url(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// GA4GH service-info type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServiceType {
    /// Namespace of the artifact (must be "org.ga4gh" for DRS)
    pub group: String,
    /// Artifact name (must be "drs")
    pub artifact: String,
    /// Artifact version
    pub version: String,
}

/// Organization running the service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Organization {
    /// Organization name
    pub name: String,
    /// Organization URL
    pub url: String,
}

/// Static GA4GH service-info descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// Reverse-domain service identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Short description
    pub description: String,
    /// Service type
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    /// Operating organization
    pub organization: Organization,
    /// Service version
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            id: "fuse-provider-immunespace".to_string(),
            name: "ImmunoSpace provider".to_string(),
            description: "Serves ImmunoSpace gene expression datasets according to the DRS specification"
                .to_string(),
            service_type: ServiceType {
                group: "org.ga4gh".to_string(),
                artifact: "drs".to_string(),
                version: "1.2.0".to_string(),
            },
            organization: Organization {
                name: "RENCI".to_string(),
                url: "https://renci.org".to_string(),
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Main configuration for the provider
///
/// Fields are organized into sub-configs:
/// - [`storage`](StorageConfig) — data root
/// - [`persistence`](PersistenceConfig) — metadata database
/// - [`tools`](ToolsConfig) — container runtime and stage images
/// - [`queue`](QueueConfig) — execution mode and workers
/// - [`server`](ServerIntegrationConfig) — REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Data storage and state management
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Job queue settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,

    /// Descriptor returned by `/service-info`
    #[serde(default)]
    pub service_info: ServiceInfo,
}

impl Config {
    /// Data root directory
    pub fn data_root(&self) -> &PathBuf {
        &self.storage.data_root
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Apply overrides from environment variables
    ///
    /// Recognized: `DATA_ROOT`, `DATABASE_PATH`, `BIND_ADDRESS`, `PUBLIC_BASE_URL`,
    /// `EXECUTION_MODE`, `QUEUE_WORKERS`, `DATA_VOLUME`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("DATA_ROOT") {
            self.storage.data_root = PathBuf::from(root);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.persistence.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.server.api.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid BIND_ADDRESS '{}': {}", addr, e),
                key: Some("server.api.bind_address".to_string()),
            })?;
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            self.server.api.public_base_url = url;
        }
        if let Some(mode) = lookup("EXECUTION_MODE") {
            self.queue.mode = mode.parse()?;
        }
        if let Some(workers) = lookup("QUEUE_WORKERS") {
            self.queue.workers = workers.parse().map_err(|e| Error::Config {
                message: format!("invalid QUEUE_WORKERS '{}': {}", workers, e),
                key: Some("queue.workers".to_string()),
            })?;
        }
        if let Some(volume) = lookup("DATA_VOLUME") {
            self.tools.data_volume = volume;
        }
        Ok(())
    }

    /// Reject settings the provider cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| Error::Config {
            message: message.to_string(),
            key: Some(key.to_string()),
        };

        if self.queue.mode == ExecutionMode::Async && self.queue.workers == 0 {
            return Err(invalid(
                "queue.workers",
                "async mode needs at least one worker",
            ));
        }
        if self.queue.job_timeout.is_zero() {
            return Err(invalid("queue.job_timeout", "job timeout must be positive"));
        }
        if self.tools.stage_timeout.is_zero() {
            return Err(invalid(
                "tools.stage_timeout",
                "stage timeout must be positive",
            ));
        }
        if self.tools.groups_image.trim().is_empty() || self.tools.mapper_image.trim().is_empty() {
            return Err(invalid("tools", "both stage images must be set"));
        }
        if self.tools.failure_marker.is_empty() {
            return Err(invalid(
                "tools.failure_marker",
                "failure marker must not be empty",
            ));
        }
        if !self.tools.container_data_dir.starts_with('/') {
            return Err(invalid(
                "tools.container_data_dir",
                "container data dir must be absolute",
            ));
        }
        Ok(())
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./immunespace-provider.db")
}

fn default_true() -> bool {
    true
}

fn default_groups_image() -> String {
    "txscience/tx-immunespace-groups:0.3".to_string()
}

fn default_mapper_image() -> String {
    "txscience/fuse-mapper-immunespace:0.1".to_string()
}

fn default_data_volume() -> String {
    "immunespace-download-data".to_string()
}

fn default_container_data_dir() -> String {
    "/data".to_string()
}

fn default_failure_marker() -> String {
    "returned non-zero exit status".to_string()
}

fn default_stage_timeout() -> Duration {
    Duration::from_secs(3600)
}

fn default_workers() -> usize {
    2
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(3600)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8083))
}

fn default_public_base_url() -> String {
    "http://localhost:8083".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
