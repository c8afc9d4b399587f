//! Session capability boundary
//!
//! A session is the exclusive, non-shareable resource an execution context
//! owns for its whole run (typically one browser). The engine only ever
//! touches it through [`Session`] and obtains it through [`SessionFactory`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::SessionConfig;
use crate::Result;

/// Browser automation session owned by one execution context.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Load `url` in the session's page.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Capture the current page as an image.
    async fn snapshot(&self) -> Result<Vec<u8>>;

    /// Run a driver-native script fragment against the current page.
    async fn evaluate(&self, script: &str) -> Result<()>;

    /// Release the underlying driver resources.
    async fn close(&self) -> Result<()>;

    /// Short description for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Shared handle to a session.
pub type SessionRef = Arc<dyn Session>;

/// Opens new sessions for execution contexts.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    async fn open(&self, config: &SessionConfig) -> Result<SessionRef>;
}
