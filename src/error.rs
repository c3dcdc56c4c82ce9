//! Error types for topology evaluation

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for explorer operations
pub type Result<T> = std::result::Result<T, NoiError>;

/// Errors raised while building, classifying or scoring a topology
#[derive(Debug, Error)]
pub enum NoiError {
    /// Topology family name not in the recognised set
    #[error("Unknown topology '{name}' (expected one of: mesh, cmesh, dbutterfly, ftorus, bdonut)")]
    InvalidTopology {
        /// Name as given by the caller
        name: String,
    },

    /// Two nodes that must exchange traffic are not connected
    #[error("No path between node {src} and node {dst}")]
    NoPath {
        /// Source node id
        src: usize,
        /// Destination node id
        dst: usize,
    },

    /// Layout produced no TSV sites, so the traffic model is undefined
    #[error("Invalid TSV layout {layout}: {reason}")]
    InvalidLayout {
        /// Layout as rendered for display
        layout: String,
        /// Reason for rejection
        reason: String,
    },

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },

    /// I/O error while reading or writing a file
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {source}")]
    ConfigParse {
        /// Underlying TOML error
        #[from]
        source: toml::de::Error,
    },

    /// Configuration could not be serialised
    #[error("Failed to serialise configuration: {source}")]
    ConfigSerialize {
        /// Underlying TOML error
        #[from]
        source: toml::ser::Error,
    },
}

impl NoiError {
    /// Create an invalid topology error
    pub fn invalid_topology(name: impl Into<String>) -> Self {
        Self::InvalidTopology { name: name.into() }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only invalidates a single sweep sample
    pub fn is_sample_failure(&self) -> bool {
        matches!(self, Self::NoPath { .. } | Self::InvalidLayout { .. })
    }
}
