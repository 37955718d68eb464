use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam as CdpCookie, EnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout as with_timeout, Instant};
use tracing::{debug, info, warn};

use crate::{AdapterError, AdapterErrorKind, BrowserLauncher, CdpConfig, CookieParam, PageDriver};

/// In-flight request bookkeeping fed by the page's network events.
#[derive(Debug)]
struct NetworkTap {
    inflight: HashSet<String>,
    last_activity: Instant,
}

impl NetworkTap {
    fn new(now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            last_activity: now,
        }
    }

    /// Redirects reuse the request id, so a repeat start is a no-op on the count.
    fn request_started(&mut self, id: &str, now: Instant) {
        self.inflight.insert(id.to_string());
        self.last_activity = now;
    }

    /// Finished and failed requests both leave the in-flight set.
    fn request_done(&mut self, id: &str, now: Instant) {
        if self.inflight.remove(id) {
            self.last_activity = now;
        }
    }

    fn inflight(&self) -> usize {
        self.inflight.len()
    }

    fn is_quiet(&self, now: Instant, window: Duration) -> bool {
        self.inflight.is_empty() && now.saturating_duration_since(self.last_activity) >= window
    }
}

/// Subscribes to request lifecycle events and keeps `tap` current until the
/// page's event streams close.
async fn spawn_network_tap(
    page: &Page,
    tap: Arc<Mutex<NetworkTap>>,
) -> Result<JoinHandle<()>, AdapterError> {
    let mut started = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await?;
    page.execute(EnableParams::default()).await?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = started.next() => {
                    tap.lock().await.request_started(event.request_id.inner(), Instant::now());
                }
                Some(event) = finished.next() => {
                    tap.lock().await.request_done(event.request_id.inner(), Instant::now());
                }
                Some(event) = failed.next() => {
                    tap.lock().await.request_done(event.request_id.inner(), Instant::now());
                }
                else => break,
            }
        }
        debug!("network tap finished");
    }))
}

/// Launches a Chromium instance per session.
pub struct ChromiumLauncher {
    config: CdpConfig,
}

impl ChromiumLauncher {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, AdapterError> {
        let cfg = &self.config;
        let mut builder = BrowserConfig::builder()
            .window_size(cfg.viewport_width, cfg.viewport_height)
            .request_timeout(Duration::from_millis(cfg.request_timeout_ms));
        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = cfg.resolved_executable() {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = cfg.user_data_dir.as_ref() {
            builder = builder.user_data_dir(dir);
        }
        if let Some(agent) = cfg.user_agent.as_ref() {
            builder = builder.arg(format!("--user-agent={agent}"));
        }
        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(err.to_string())
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint(err.to_string())
        })?;

        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
            debug!("browser event handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(format!("failed to open page: {err}")));
            }
        };

        let network = Arc::new(Mutex::new(NetworkTap::new(Instant::now())));
        let tap_task = match spawn_network_tap(&page, Arc::clone(&network)).await {
            Ok(task) => task,
            Err(err) => {
                handler_task.abort();
                return Err(err);
            }
        };

        info!(headless = self.config.headless, "browser session started");
        Ok(Arc::new(ChromiumPage {
            page,
            network,
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            tap_task: Mutex::new(Some(tap_task)),
        }))
    }
}

/// A page plus the browser process backing it. Dropping the browser kills
/// the child process, so an abandoned session does not outlive its owner.
pub struct ChromiumPage {
    page: Page,
    network: Arc<Mutex<NetworkTap>>,
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    tap_task: Mutex<Option<JoinHandle<()>>>,
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn set_cookies(&self, cookies: &[CookieParam]) -> Result<(), AdapterError> {
        if cookies.is_empty() {
            return Ok(());
        }
        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            let param = CdpCookie::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .secure(cookie.secure)
                .http_only(cookie.http_only)
                .build()
                .map_err(|err| {
                    AdapterError::new(AdapterErrorKind::Internal)
                        .with_hint(format!("invalid cookie {}: {err}", cookie.name))
                })?;
            params.push(param);
        }
        self.page.set_cookies(params).await?;
        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError> {
        debug!(url, "navigate");
        match with_timeout(timeout, self.page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(AdapterError::timeout(format!("navigation to {url} timed out"))),
        }
    }

    async fn wait_for_network_idle(
        &self,
        quiet: Duration,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self.evaluate("document.readyState").await?;
            let inflight = {
                let tap = self.network.lock().await;
                if ready.as_str() == Some("complete") && tap.is_quiet(Instant::now(), quiet) {
                    return Ok(());
                }
                tap.inflight()
            };
            if Instant::now() >= deadline {
                return Err(AdapterError::timeout(format!(
                    "network did not go idle ({inflight} requests in flight)"
                )));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        let result = self.page.evaluate(expression).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::ScriptFailed).with_hint(err.to_string())
        })?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<(), AdapterError> {
        let element = self.page.find_element(selector).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{selector}: {err}"))
        })?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), AdapterError> {
        let prepare = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.focus();
                if (el.isContentEditable) {{
                    el.textContent = '';
                }} else if ('value' in el) {{
                    el.value = '';
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_string(selector)
        );
        let focused = self.evaluate(&prepare).await?;
        if focused != Value::Bool(true) {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(selector));
        }
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        let browser = self.browser.lock().await.take();
        let mut result = Ok(());
        if let Some(mut browser) = browser {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "browser close failed");
                result = Err(AdapterError::from(err));
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.tap_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        debug!("browser session closed");
        result
    }
}
