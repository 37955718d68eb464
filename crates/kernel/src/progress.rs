use linkpilot_core_types::ProgressEvent;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Message emitted when a reporter is dropped before reaching a terminal event.
pub const ABANDONED_RUN: &str = "Run ended without a result";

/// Ordered progress log for one run. `result` and `error` consume the
/// reporter, so at most one terminal event can be sent and nothing follows it.
/// Dropping an unfinished reporter emits an error so consumers always see one
/// terminal event.
pub struct ProgressReporter {
    tx: UnboundedSender<ProgressEvent>,
    finished: bool,
}

/// Reporter plus the receiving half of its log.
pub fn progress_channel() -> (ProgressReporter, UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter::new(tx), rx)
}

impl ProgressReporter {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx,
            finished: false,
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        let text = text.into();
        debug!(status = %text, "progress");
        self.send(ProgressEvent::Status(text));
    }

    pub fn result(mut self, payload: Value) {
        self.finished = true;
        self.send(ProgressEvent::Result(payload));
    }

    pub fn error(mut self, message: impl Into<String>) {
        self.finished = true;
        self.send(ProgressEvent::Error(message.into()));
    }

    fn send(&self, event: ProgressEvent) {
        // A consumer that went away only loses the log; the run still finishes.
        if self.tx.send(event).is_err() {
            debug!("progress receiver dropped");
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.finished {
            warn!("progress reporter dropped without a terminal event");
            self.send(ProgressEvent::Error(ABANDONED_RUN.to_string()));
        }
    }
}

/// Drain a finished log.
pub async fn collect_events(mut rx: UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn result_is_last_and_closes_log() {
        let (reporter, rx) = progress_channel();
        reporter.status("one");
        reporter.status("two");
        reporter.result(json!({"success": true}));
        let events = collect_events(rx).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ProgressEvent::Status("one".into()));
        assert!(events[2].is_terminal());
    }

    #[tokio::test]
    async fn dropped_reporter_still_terminates() {
        let (reporter, rx) = progress_channel();
        reporter.status("working");
        drop(reporter);
        let events = collect_events(rx).await;
        assert_eq!(events.last(), Some(&ProgressEvent::Error(ABANDONED_RUN.into())));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn error_does_not_double_terminate() {
        let (reporter, rx) = progress_channel();
        reporter.error("boom");
        let events = collect_events(rx).await;
        assert_eq!(events, vec![ProgressEvent::Error("boom".into())]);
    }
}
