use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use action_primitives::{ActionError, ActionPrimitives, AnchorResolver, WaitTimings};
use cdp_adapter::BrowserLauncher;
use futures::FutureExt;
use linkpilot_core_types::{
    truncate_note, ActionKind, ActionOutcome, ActionRequest, EngineState, FailureKind,
    SkippedStep,
};
use tracing::{debug, info, warn};

use crate::app_settings::Config;
use crate::auth::{AuthResolver, AuthStrategy};
use crate::selectors::SelectorCatalog;

/// Timeouts end the run as `Timeout`; anything else is unclassified.
pub fn classify_action_error(err: &ActionError) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::UnknownAutomationError(err.to_string())
    }
}

/// Why a flow stopped before `Success`.
enum Stop {
    Fail(FailureKind),
    Error(ActionError),
}

impl From<ActionError> for Stop {
    fn from(err: ActionError) -> Self {
        Self::Error(err)
    }
}

/// States entered and optional steps skipped during one run.
struct RunTrace {
    states: Vec<EngineState>,
    skipped: Vec<SkippedStep>,
}

impl RunTrace {
    fn new() -> Self {
        Self {
            states: vec![EngineState::Idle],
            skipped: Vec::new(),
        }
    }

    fn enter(&mut self, state: EngineState) {
        debug!(?state, "engine transition");
        self.states.push(state);
    }

    fn skip(&mut self, step: SkippedStep) {
        info!(?step, "optional step skipped");
        self.skipped.push(step);
    }

    fn succeed(mut self) -> ActionOutcome {
        self.enter(EngineState::Success);
        ActionOutcome::succeeded(self.states, self.skipped)
    }

    fn fail(mut self, kind: FailureKind) -> ActionOutcome {
        warn!(failure = ?kind, "run failed");
        self.enter(EngineState::Failed);
        ActionOutcome::failed(kind, self.states, self.skipped)
    }
}

/// One-shot connect/message automation against a single profile. Exactly one
/// attempt per call; nothing is retried.
#[derive(Clone)]
pub struct ActionEngine {
    auth: AuthResolver,
    selectors: SelectorCatalog,
    timings: WaitTimings,
    anchor_resolver: Option<Arc<dyn AnchorResolver>>,
}

impl ActionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            auth: AuthResolver::new(config.site.clone(), config.selectors.clone()),
            selectors: config.selectors.clone(),
            timings: config.timings.to_wait_timings(),
            anchor_resolver: None,
        }
    }

    pub fn with_timings(mut self, timings: WaitTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replace the in-page locator, e.g. with a scripted one in tests.
    pub fn with_anchor_resolver(mut self, resolver: Arc<dyn AnchorResolver>) -> Self {
        self.anchor_resolver = Some(resolver);
        self
    }

    /// Acquire a session from `launcher`, run, and close the session on every
    /// exit path.
    pub async fn execute(
        &self,
        launcher: &dyn BrowserLauncher,
        strategy: &AuthStrategy,
        request: &ActionRequest,
    ) -> ActionOutcome {
        let page = match launcher.launch().await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "browser launch failed");
                let trace = RunTrace::new();
                return trace.fail(classify_action_error(&ActionError::from(err)));
            }
        };

        let mut prims = ActionPrimitives::new(page.clone(), self.timings.clone());
        if let Some(resolver) = &self.anchor_resolver {
            prims = prims.with_anchor_resolver(resolver.clone());
        }

        let outcome = match AssertUnwindSafe(self.run(&prims, strategy, request))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => RunTrace::new().fail(FailureKind::UnknownAutomationError(
                "automation task panicked".to_string(),
            )),
        };

        if let Err(err) = page.close().await {
            warn!(error = %err, "failed to close browser session");
        }
        outcome
    }

    /// Drive an already acquired page. The caller owns the session.
    pub async fn run(
        &self,
        prims: &ActionPrimitives,
        strategy: &AuthStrategy,
        request: &ActionRequest,
    ) -> ActionOutcome {
        let mut trace = RunTrace::new();
        info!(
            action = request.kind.as_str(),
            profile_url = %request.profile_url,
            strategy = strategy.name(),
            "engine run started"
        );

        trace.enter(EngineState::Authenticating);
        if let Some(kind) = self.auth.authenticate(prims, strategy).await.failure() {
            return trace.fail(kind);
        }

        let flow = match request.kind {
            ActionKind::Connect => self.connect(prims, request, &mut trace).await,
            ActionKind::Message => self.message(prims, request, &mut trace).await,
        };
        match flow {
            Ok(()) => trace.succeed(),
            Err(Stop::Fail(kind)) => trace.fail(kind),
            Err(Stop::Error(err)) => trace.fail(classify_action_error(&err)),
        }
    }

    async fn connect(
        &self,
        prims: &ActionPrimitives,
        request: &ActionRequest,
        trace: &mut RunTrace,
    ) -> Result<(), Stop> {
        let timings = prims.timings();
        prims.navigate(&request.profile_url).await?;
        trace.enter(EngineState::Navigated);

        let Some(connect) = prims.locate_any(&self.selectors.connect).await? else {
            return Err(Stop::Fail(self.explain_missing_connect(prims).await?));
        };
        trace.enter(EngineState::ButtonLocated);
        prims.click(&connect).await?;
        // The invite modal renders asynchronously; anything matched before
        // this pause may belong to the page behind it.
        prims.settle(timings.click_settle).await;

        if let Some(note) = request.note() {
            trace.enter(EngineState::NotePending);
            self.attach_note(prims, note, trace).await?;
        }

        let Some(submit) = prims
            .wait_for_any(&self.selectors.connect_submit, timings.step_settle)
            .await?
        else {
            return Err(Stop::Fail(FailureKind::SubmitControlNotFound));
        };
        prims.click(&submit).await?;
        trace.enter(EngineState::Submitted);
        prims.settle(timings.submit_settle).await;
        Ok(())
    }

    /// Alternate controls, checked in priority order.
    async fn explain_missing_connect(
        &self,
        prims: &ActionPrimitives,
    ) -> Result<FailureKind, ActionError> {
        if prims.locate_any(&self.selectors.pending).await?.is_some() {
            return Ok(FailureKind::AlreadyRequested);
        }
        if prims.locate_any(&self.selectors.message).await?.is_some() {
            return Ok(FailureKind::AlreadyConnected);
        }
        Ok(FailureKind::ControlNotFound)
    }

    /// Best effort. A missing affordance or field is recorded, never fatal.
    async fn attach_note(
        &self,
        prims: &ActionPrimitives,
        note: &str,
        trace: &mut RunTrace,
    ) -> Result<(), ActionError> {
        let timings = prims.timings();
        let Some(add_note) = prims
            .wait_for_any(&self.selectors.add_note, timings.step_settle)
            .await?
        else {
            trace.skip(SkippedStep::NoteAffordanceMissing);
            return Ok(());
        };
        prims.click(&add_note).await?;
        prims.settle(timings.step_settle).await;

        let Some(field) = prims
            .wait_for_any(&self.selectors.note_field, timings.step_settle)
            .await?
        else {
            trace.skip(SkippedStep::NoteFieldMissing);
            return Ok(());
        };
        prims.fill(&field, &truncate_note(note)).await?;
        prims.settle(timings.step_settle).await;
        Ok(())
    }

    async fn message(
        &self,
        prims: &ActionPrimitives,
        request: &ActionRequest,
        trace: &mut RunTrace,
    ) -> Result<(), Stop> {
        let timings = prims.timings();
        let text = request
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Stop::Fail(FailureKind::UnknownAutomationError(
                    "message text missing".to_string(),
                ))
            })?;

        prims.navigate(&request.profile_url).await?;
        trace.enter(EngineState::Navigated);

        let Some(button) = prims.locate_any(&self.selectors.message).await? else {
            return Err(Stop::Fail(FailureKind::NotConnected));
        };
        trace.enter(EngineState::ButtonLocated);
        prims.click(&button).await?;
        prims.settle(timings.click_settle).await;

        let Some(field) = prims
            .wait_for_any(&self.selectors.message_field, timings.step_settle)
            .await?
        else {
            return Err(Stop::Fail(FailureKind::InputFieldNotFound));
        };
        prims.fill(&field, text).await?;
        prims.settle(timings.step_settle).await;

        let Some(submit) = prims
            .wait_for_any(&self.selectors.message_submit, timings.step_settle)
            .await?
        else {
            return Err(Stop::Fail(FailureKind::SubmitControlNotFound));
        };
        prims.click(&submit).await?;
        trace.enter(EngineState::Submitted);
        prims.settle(timings.submit_settle).await;
        Ok(())
    }
}
