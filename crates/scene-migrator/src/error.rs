//! Error types for the migrator
//!
//! Only listing failures escape a run. Update failures are recovered per
//! object and end up in the run report instead.

use scene_api::{RequestError, ResourceId};
use std::path::PathBuf;

/// Errors that abort a migration run
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Scene listing failed; nothing was visited
    #[error("failed to list scenes")]
    ListScenes(#[source] RequestError),

    /// Object listing for one scene failed; later scenes were not visited
    #[error("failed to list objects of scene {scene_id}")]
    ListSceneObjects {
        scene_id: ResourceId,
        #[source]
        source: RequestError,
    },

    /// HTTP client could not be created
    #[error("failed to create scene api client")]
    Client(#[source] RequestError),

    /// Configuration rejected before any request
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl MigrateError {
    /// The request error underneath, if any
    #[must_use]
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::ListScenes(source) | Self::Client(source) => Some(source),
            Self::ListSceneObjects { source, .. } => Some(source),
            Self::Config(_) => None,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys
    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    /// No credential from any source
    #[error("no API credential configured (use --token, SCENE_MIGRATE_TOKEN or `credential` in the config file)")]
    MissingCredential,

    /// Base URL is empty
    #[error("base url must not be empty")]
    EmptyBaseUrl,

    /// Fallback has a NaN or infinite component
    #[error("fallback position {0} must have finite components")]
    NonFiniteFallback(String),

    /// A zero timeout would fail every request
    #[error("request timeout must be at least one second")]
    ZeroTimeout,

    /// Fallback given on the command line does not parse
    #[error("invalid position '{0}': expected three comma-separated numbers")]
    PositionSyntax(String),
}
