//! RMP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Top-level error type for the room monitor panel.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("[RMP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RMP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RMP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    /// An edited value is absent from its own candidate set. This indicates a
    /// corrupted settings snapshot upstream and must never be silently
    /// repaired by clamping.
    #[error("[RMP-1101] value {value:?} not in candidate set for {path}")]
    ValueNotInCandidateSet { path: String, value: String },

    #[error("[RMP-1102] settings snapshot mismatch at {path}: {details}")]
    SnapshotMismatch { path: String, details: String },

    #[error("[RMP-2001] sensor snapshot read failure for {path}: {details}")]
    SensorRead { path: PathBuf, details: String },

    #[error("[RMP-2002] suppression channel write failure for {path}: {source}")]
    SuppressionWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RMP-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[RMP-3001] display write failure: {details}")]
    DisplayWrite { details: String },

    #[error("[RMP-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RMP-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[RMP-3201] audio process failure: {details}")]
    AudioProcess { details: String },

    #[error("[RMP-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl PanelError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RMP-1001",
            Self::MissingConfig { .. } => "RMP-1002",
            Self::ConfigParse { .. } => "RMP-1003",
            Self::ValueNotInCandidateSet { .. } => "RMP-1101",
            Self::SnapshotMismatch { .. } => "RMP-1102",
            Self::SensorRead { .. } => "RMP-2001",
            Self::SuppressionWrite { .. } => "RMP-2002",
            Self::Serialization { .. } => "RMP-2101",
            Self::DisplayWrite { .. } => "RMP-3001",
            Self::Io { .. } => "RMP-3002",
            Self::ChannelClosed { .. } => "RMP-3003",
            Self::AudioProcess { .. } => "RMP-3201",
            Self::Runtime { .. } => "RMP-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Transient I/O degrades to a stale screen; invariant violations and
    /// external-process failures never benefit from a retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SensorRead { .. }
                | Self::SuppressionWrite { .. }
                | Self::DisplayWrite { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PanelError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PanelError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
