use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{CookieParam, PageDriver};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    locator::{AnchorResolver, ScriptAnchorResolver},
    types::{AnchorDescriptor, ResolvedSelector},
    waiting::{poll_until, WaitTimings},
};

/// Navigation, location and interaction against one page, with the wait
/// bounds of a run applied uniformly.
pub struct ActionPrimitives {
    page: Arc<dyn PageDriver>,
    resolver: Arc<dyn AnchorResolver>,
    timings: WaitTimings,
}

impl ActionPrimitives {
    pub fn new(page: Arc<dyn PageDriver>, timings: WaitTimings) -> Self {
        Self {
            page,
            resolver: Arc::new(ScriptAnchorResolver),
            timings,
        }
    }

    pub fn with_anchor_resolver(mut self, resolver: Arc<dyn AnchorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn timings(&self) -> &WaitTimings {
        &self.timings
    }

    pub async fn set_cookies(&self, cookies: &[CookieParam]) -> Result<(), ActionError> {
        self.page.set_cookies(cookies).await?;
        Ok(())
    }

    /// Navigate, then block until the network has been quiet. Element queries
    /// before this point routinely miss controls that have not rendered yet.
    pub async fn navigate(&self, url: &str) -> Result<(), ActionError> {
        info!(url, "navigating");
        self.page
            .navigate(url, self.timings.navigation_timeout)
            .await?;
        self.wait_idle().await
    }

    pub async fn wait_idle(&self) -> Result<(), ActionError> {
        self.page
            .wait_for_network_idle(
                self.timings.network_idle_quiet,
                self.timings.navigation_timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, ActionError> {
        Ok(self.page.current_url().await?)
    }

    /// Poll the location until `predicate` holds; `None` when `bound` elapses.
    pub async fn wait_for_url(
        &self,
        predicate: &(dyn Fn(&str) -> bool + Send + Sync),
        bound: Duration,
    ) -> Result<Option<String>, ActionError> {
        match self
            .page
            .wait_for_url(predicate, bound, self.timings.poll_interval)
            .await
        {
            Ok(url) => Ok(Some(url)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Single probe for the first visible match.
    pub async fn locate(
        &self,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ResolvedSelector>, ActionError> {
        self.resolver.resolve(self.page.as_ref(), anchor).await
    }

    /// First descriptor, in order, that has a visible match right now.
    pub async fn locate_any(
        &self,
        anchors: &[AnchorDescriptor],
    ) -> Result<Option<ResolvedSelector>, ActionError> {
        for anchor in anchors {
            if let Some(found) = self.locate(anchor).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Keep probing `anchors` until one matches or `bound` elapses.
    pub async fn wait_for_any(
        &self,
        anchors: &[AnchorDescriptor],
        bound: Duration,
    ) -> Result<Option<ResolvedSelector>, ActionError> {
        poll_until(bound, self.timings.poll_interval, || self.locate_any(anchors)).await
    }

    pub async fn click(&self, target: &ResolvedSelector) -> Result<(), ActionError> {
        debug!(anchor = %target.anchor, "click");
        self.page.click(&target.selector).await?;
        Ok(())
    }

    pub async fn fill(&self, target: &ResolvedSelector, text: &str) -> Result<(), ActionError> {
        debug!(anchor = %target.anchor, chars = text.chars().count(), "fill");
        self.page.fill(&target.selector, text).await?;
        Ok(())
    }

    /// Fixed pause, used only where no observable condition exists.
    pub async fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cdp_adapter::AdapterError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPage {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageDriver for RecordingPage {
        async fn set_cookies(&self, cookies: &[CookieParam]) -> Result<(), AdapterError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("cookies:{}", cookies.len()));
            Ok(())
        }
        async fn navigate(&self, url: &str, _: Duration) -> Result<(), AdapterError> {
            self.calls.lock().unwrap().push(format!("goto:{url}"));
            Ok(())
        }
        async fn wait_for_network_idle(&self, _: Duration, _: Duration) -> Result<(), AdapterError> {
            self.calls.lock().unwrap().push("idle".into());
            Ok(())
        }
        async fn current_url(&self) -> Result<String, AdapterError> {
            Ok("https://site.example/feed/".into())
        }
        async fn evaluate(&self, _: &str) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }
        async fn click(&self, selector: &str) -> Result<(), AdapterError> {
            self.calls.lock().unwrap().push(format!("click:{selector}"));
            Ok(())
        }
        async fn fill(&self, selector: &str, text: &str) -> Result<(), AdapterError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("fill:{selector}:{text}"));
            Ok(())
        }
        async fn close(&self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    /// Matches only the descriptor named `visible`, after `delay` probes.
    struct DelayedResolver {
        visible: AnchorDescriptor,
        delay: usize,
        probes: AtomicUsize,
    }

    #[async_trait]
    impl AnchorResolver for DelayedResolver {
        async fn resolve(
            &self,
            _page: &dyn PageDriver,
            anchor: &AnchorDescriptor,
        ) -> Result<Option<ResolvedSelector>, ActionError> {
            if anchor != &self.visible {
                return Ok(None);
            }
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            Ok((n >= self.delay).then(|| ResolvedSelector {
                selector: "#hit".into(),
                anchor: anchor.to_string(),
            }))
        }
    }

    fn primitives(resolver: DelayedResolver) -> (ActionPrimitives, Arc<RecordingPage>) {
        let page = Arc::new(RecordingPage::default());
        let prims = ActionPrimitives::new(page.clone(), WaitTimings::immediate())
            .with_anchor_resolver(Arc::new(resolver));
        (prims, page)
    }

    #[tokio::test]
    async fn navigate_always_waits_for_idle() {
        let (prims, page) = primitives(DelayedResolver {
            visible: AnchorDescriptor::css("#x"),
            delay: 0,
            probes: AtomicUsize::new(0),
        });
        prims.navigate("https://site.example/in/a").await.unwrap();
        assert_eq!(
            *page.calls.lock().unwrap(),
            vec!["goto:https://site.example/in/a".to_string(), "idle".to_string()]
        );
    }

    #[tokio::test]
    async fn locate_any_respects_order() {
        let second = AnchorDescriptor::tag_with_text("button", "Send");
        let (prims, _) = primitives(DelayedResolver {
            visible: second.clone(),
            delay: 0,
            probes: AtomicUsize::new(0),
        });
        let found = prims
            .locate_any(&[AnchorDescriptor::css("button[aria-label*=\"Send\"]"), second])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.anchor, "button:has-text('Send')");
    }

    #[tokio::test]
    async fn wait_for_any_polls_until_rendered() {
        let anchor = AnchorDescriptor::css("textarea[name=\"message\"]");
        let (mut prims, _) = primitives(DelayedResolver {
            visible: anchor.clone(),
            delay: 3,
            probes: AtomicUsize::new(0),
        });
        prims.timings.step_settle = Duration::from_secs(1);
        let found = prims
            .wait_for_any(std::slice::from_ref(&anchor), prims.timings.step_settle)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn wait_for_url_timeout_is_none() {
        let (prims, _) = primitives(DelayedResolver {
            visible: AnchorDescriptor::css("#x"),
            delay: 0,
            probes: AtomicUsize::new(0),
        });
        let seen = prims
            .wait_for_url(&|u: &str| u.contains("/checkpoint"), Duration::from_millis(5))
            .await
            .unwrap();
        assert!(seen.is_none());
    }
}
