//! Error types for Parasuite

use thiserror::Error;

use crate::types::{ContextId, ContextState};

/// Result type alias using Parasuite Error
pub type Result<T> = std::result::Result<T, Error>;

/// Parasuite error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Context {context} already has a session bound")]
    DuplicateBinding { context: ContextId },

    #[error("No session bound for context {context}")]
    NoResourceBound { context: ContextId },

    #[error("Session teardown failed for context {context}: {reason}")]
    ResourceTeardown { context: ContextId, reason: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: ContextState, to: ContextState },

    #[error("Invalid concurrency degree {0}: must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("No execution context in scope")]
    NoAmbientContext,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Short stable label for logs and reports.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::DuplicateBinding { .. } => "duplicate_binding",
            Error::NoResourceBound { .. } => "no_resource_bound",
            Error::ResourceTeardown { .. } => "resource_teardown",
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::InvalidConcurrency(_) => "invalid_concurrency",
            Error::Session(_) => "session",
            Error::Artifact(_) => "artifact",
            Error::NoAmbientContext => "no_ambient_context",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Toml(_) | Error::TomlSer(_) => "config",
        }
    }
}
