//! Error types for the Playwright integration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("{step}: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Harness(#[from] parasuite_common::Error),
}

impl E2eError {
    pub fn as_label(&self) -> &'static str {
        match self {
            E2eError::PlaywrightNotFound => "playwright_not_found",
            E2eError::Playwright(_) => "playwright",
            E2eError::SpecParse(_) => "spec_parse",
            E2eError::StepFailed { .. } => "step_failed",
            E2eError::SessionClosed => "session_closed",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
            E2eError::Yaml(_) => "yaml",
            E2eError::Toml(_) | E2eError::TomlSer(_) => "config",
            E2eError::Harness(e) => e.as_label(),
        }
    }
}

/// Sessions report driver failures to the engine as session errors.
impl From<E2eError> for parasuite_common::Error {
    fn from(e: E2eError) -> Self {
        match e {
            E2eError::Harness(inner) => inner,
            other => parasuite_common::Error::Session(other.to_string()),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
