//! Parasuite Common Library
//!
//! Engine for running independent test units concurrently, each in its own
//! execution context with an exclusively owned browser session, while
//! lifecycle observers (logging, failure capture) see every event.

pub mod ambient;
pub mod artifact;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod log;
pub mod observers;
pub mod registry;
pub mod session;
pub mod suite;
pub mod types;
pub mod unit;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactStore, FsArtifactStore, SavedArtifact};
pub use config::HarnessConfig;
pub use context::{ContextEnv, ContextReport, ExecutionContext};
pub use dispatch::{LifecycleDispatcher, Observer, ObserverError, ObserverFailure};
pub use error::{Error, Result};
pub use events::{EventKind, EventResult, LifecycleEvent, SuiteCounts};
pub use log::{LogLevel, LogRecord, LogSink, MemorySink, TracingSink};
pub use observers::{FailureCaptureObserver, LogObserver, RecordingObserver};
pub use registry::ResourceRegistry;
pub use session::{Session, SessionFactory, SessionRef};
pub use suite::{SuiteReport, SuiteRunner, SuiteRunnerBuilder};
pub use types::*;
pub use unit::{TestUnit, TestUnitRef, UnitContext, UnitError, UnitFn};

/// Parasuite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "parasuite.toml";
