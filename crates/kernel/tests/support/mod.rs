#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_primitives::{
    ActionError, ActionPrimitives, AnchorDescriptor, AnchorResolver, ResolvedSelector,
    WaitTimings,
};
use agent_core::{LlmSettings, MockCompletion, Personalizer, ProviderRegistry, TextCompletion};
use async_trait::async_trait;
use cdp_adapter::{AdapterError, BrowserLauncher, CookieParam, PageDriver};
use linkpilot_kernel::{ActionEngine, Config, SelectorCatalog};
use serde_json::Value;

pub const BASE: &str = "https://site.example";
pub const FEED: &str = "https://site.example/feed/";
pub const LOGIN: &str = "https://site.example/login";
pub const PROFILE: &str = "https://site.example/in/jane-doe";

/// What happens when a control is clicked.
#[derive(Clone, Default)]
pub struct Reaction {
    pub reveal: Vec<AnchorDescriptor>,
    pub goto: Option<String>,
}

/// Scripted page: controls are visible by descriptor, clicks reveal more
/// controls or change the location. Every driver call is recorded.
#[derive(Default)]
pub struct FakeSite {
    url: Mutex<String>,
    calls: Mutex<Vec<String>>,
    visible: Mutex<HashSet<String>>,
    redirects: Mutex<HashMap<String, String>>,
    reactions: Mutex<HashMap<String, Reaction>>,
    nav_timeout: AtomicBool,
    closed: AtomicBool,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new("about:blank".to_string()),
            ..Self::default()
        })
    }

    pub fn show(&self, anchor: &AnchorDescriptor) {
        self.visible.lock().unwrap().insert(anchor.to_string());
    }

    pub fn redirect(&self, from: &str, to: &str) {
        self.redirects
            .lock()
            .unwrap()
            .insert(from.to_string(), to.to_string());
    }

    pub fn on_click(&self, anchor: &AnchorDescriptor, reaction: Reaction) {
        self.reactions
            .lock()
            .unwrap()
            .insert(anchor.to_string(), reaction);
    }

    pub fn time_out_navigation(&self) {
        self.nav_timeout.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls_with("click:")
    }

    pub fn fills(&self) -> Vec<String> {
        self.calls_with("fill:")
    }

    pub fn gotos(&self) -> Vec<String> {
        self.calls_with("goto:")
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_visible(&self, label: &str) -> bool {
        self.visible.lock().unwrap().contains(label)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PageDriver for FakeSite {
    async fn set_cookies(&self, cookies: &[CookieParam]) -> Result<(), AdapterError> {
        for cookie in cookies {
            self.record(format!(
                "cookie:{}={}@{}",
                cookie.name, cookie.value, cookie.domain
            ));
        }
        Ok(())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), AdapterError> {
        self.record(format!("goto:{url}"));
        if self.nav_timeout.load(Ordering::SeqCst) {
            return Err(AdapterError::timeout(format!("navigation to {url}")));
        }
        let landed = self
            .redirects
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        *self.url.lock().unwrap() = landed;
        Ok(())
    }

    async fn wait_for_network_idle(
        &self,
        _quiet: Duration,
        _timeout: Duration,
    ) -> Result<(), AdapterError> {
        self.record("idle".to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, AdapterError> {
        Ok(Value::Null)
    }

    async fn click(&self, selector: &str) -> Result<(), AdapterError> {
        self.record(format!("click:{selector}"));
        let reaction = self.reactions.lock().unwrap().get(selector).cloned();
        if let Some(reaction) = reaction {
            for anchor in &reaction.reveal {
                self.show(anchor);
            }
            if let Some(url) = reaction.goto {
                *self.url.lock().unwrap() = url;
            }
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), AdapterError> {
        self.record(format!("fill:{selector}={text}"));
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.record("close".to_string());
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Resolves a descriptor when the fake site shows it. The selector handed
/// back is the descriptor's display form, which is what `click` receives.
pub struct FakeResolver {
    pub site: Arc<FakeSite>,
}

#[async_trait]
impl AnchorResolver for FakeResolver {
    async fn resolve(
        &self,
        _page: &dyn PageDriver,
        anchor: &AnchorDescriptor,
    ) -> Result<Option<ResolvedSelector>, ActionError> {
        let label = anchor.to_string();
        Ok(self.site.is_visible(&label).then(|| ResolvedSelector {
            selector: label.clone(),
            anchor: label,
        }))
    }
}

pub struct FakeLauncher {
    pub site: Arc<FakeSite>,
    pub launches: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self {
            site,
            launches: AtomicUsize::new(0),
        })
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn PageDriver>, AdapterError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(self.site.clone() as Arc<dyn PageDriver>)
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.site.base_url = BASE.to_string();
    config.site.domain = "site.example".to_string();
    config.site.cookie_domain = ".site.example".to_string();
    config
}

pub fn engine(site: &Arc<FakeSite>, config: &Config) -> ActionEngine {
    ActionEngine::new(config)
        .with_timings(WaitTimings::immediate())
        .with_anchor_resolver(Arc::new(FakeResolver { site: site.clone() }))
}

pub fn primitives(site: &Arc<FakeSite>) -> ActionPrimitives {
    ActionPrimitives::new(site.clone(), WaitTimings::immediate())
        .with_anchor_resolver(Arc::new(FakeResolver { site: site.clone() }))
}

/// Profile with a Connect button whose modal offers "Add a note" and Send.
pub fn connectable_profile(site: &FakeSite, catalog: &SelectorCatalog) {
    site.show(&catalog.connect[0]);
    site.on_click(
        &catalog.connect[0],
        Reaction {
            reveal: vec![catalog.add_note[0].clone(), catalog.connect_submit[0].clone()],
            goto: None,
        },
    );
    site.on_click(
        &catalog.add_note[0],
        Reaction {
            reveal: vec![catalog.note_field[0].clone()],
            goto: None,
        },
    );
}

/// Profile of an existing connection: Message opens an editor with Send.
pub fn messageable_profile(site: &FakeSite, catalog: &SelectorCatalog) {
    site.show(&catalog.message[0]);
    site.on_click(
        &catalog.message[0],
        Reaction {
            reveal: vec![catalog.message_field[0].clone(), catalog.message_submit[0].clone()],
            goto: None,
        },
    );
}

/// Personalizer whose "mock" provider always answers `reply`.
pub fn mock_personalizer(reply: &str) -> Arc<Personalizer> {
    let mut registry = ProviderRegistry::with_builtin();
    let reply = reply.to_string();
    registry.register("mock", "mock-1", move |_| {
        Ok(Arc::new(MockCompletion {
            reply: Some(reply.clone()),
        }) as Arc<dyn TextCompletion>)
    });
    Arc::new(Personalizer::new(Arc::new(registry), LlmSettings::default()))
}
