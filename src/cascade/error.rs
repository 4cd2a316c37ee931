//! Cascade Error Taxonomy
//!
//! Collaborator calls fail with `anyhow::Error`; everything the engine itself
//! can reject is described here.

use std::path::PathBuf;

/// Result alias used across the cascade engine
pub type CascadeResult<T> = Result<T, CascadeError>;

/// Problems with a cascade configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Malformed cascade configuration at '{location}': {reason}")]
    Malformed { location: String, reason: String },

    #[error("Failed to read cascade configuration from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cascade configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse cascade configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Cascade configuration references unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A form or catalog call rejected. Fields filtered before the failure stay filtered.
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}
