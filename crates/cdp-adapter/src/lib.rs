//! Browser capability boundary.
//!
//! Higher layers only see [`PageDriver`]: navigate, inject cookies, wait for
//! the network to go quiet or for the URL to match, evaluate a script, click
//! and fill by CSS selector. [`ChromiumLauncher`] provides the real
//! implementation over the DevTools protocol.

pub mod chromium;
pub mod config;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};

pub use chromium::{ChromiumLauncher, ChromiumPage};
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};

/// Cookie injected before the first navigation.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieParam {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieParam {
    /// Secure, http-only cookie valid for the whole domain.
    pub fn session(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
        }
    }
}

impl std::fmt::Debug for CookieParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieParam")
            .field("name", &self.name)
            .field("value", &"***")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish()
    }
}

/// One exclusively owned page inside a browser session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn set_cookies(&self, cookies: &[CookieParam]) -> Result<(), AdapterError>;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError>;

    /// Resolve once no resource has finished loading for `quiet`.
    async fn wait_for_network_idle(
        &self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError>;

    async fn click(&self, selector: &str) -> Result<(), AdapterError>;

    /// Replace the content of an input, textarea or editable region.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), AdapterError>;

    async fn close(&self) -> Result<(), AdapterError>;

    /// Poll the location until `predicate` holds or `timeout` elapses.
    async fn wait_for_url(
        &self,
        predicate: &(dyn for<'s> Fn(&'s str) -> bool + Send + Sync),
        timeout: Duration,
        poll: Duration,
    ) -> Result<String, AdapterError> {
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.current_url().await?;
            if predicate(&url) {
                return Ok(url);
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::timeout(format!(
                    "url did not reach expected location, last seen {url}"
                )));
            }
            sleep(poll.max(Duration::from_millis(1))).await;
        }
    }
}

/// Acquires a fresh, exclusively owned page. Callers close it when done.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError>;
}
