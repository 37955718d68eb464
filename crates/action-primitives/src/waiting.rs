//! Bounded waiting used between UI steps.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Every wait a run performs, each with a fixed upper bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitTimings {
    pub navigation_timeout: Duration,
    pub login_timeout: Duration,
    pub network_idle_quiet: Duration,
    pub poll_interval: Duration,
    /// Bound after opening a control that renders a modal or panel.
    pub click_settle: Duration,
    /// Bound after intermediate steps (add-note, fill).
    pub step_settle: Duration,
    /// Pause after the final submit so the request registers.
    pub submit_settle: Duration,
}

impl Default for WaitTimings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(30),
            network_idle_quiet: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            click_settle: Duration::from_millis(2000),
            step_settle: Duration::from_millis(1000),
            submit_settle: Duration::from_millis(3000),
        }
    }
}

impl WaitTimings {
    /// No pauses at all; polling collapses to a single probe.
    pub fn immediate() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(50),
            login_timeout: Duration::from_millis(50),
            network_idle_quiet: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            click_settle: Duration::ZERO,
            step_settle: Duration::ZERO,
            submit_settle: Duration::ZERO,
        }
    }
}

/// Run `probe` until it yields `Some`, an error, or `bound` elapses. The
/// probe always runs at least once.
pub async fn poll_until<T, E, F, Fut>(
    bound: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + bound;
    loop {
        if let Some(found) = probe().await? {
            return Ok(Some(found));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(interval.max(Duration::from_millis(1)).min(deadline - now)).await;
    }
}
