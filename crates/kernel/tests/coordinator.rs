mod support;

use std::sync::Arc;

use linkpilot_core_types::{ProgressEvent, NOTE_LIMIT};
use linkpilot_kernel::coordinator::{
    EMAIL_KEY, LLM_API_KEY, LLM_PROVIDER_KEY, MISSING_AUTH, MISSING_PROFILE_URL, PASSWORD_KEY,
    PASSWORD_AUTH_WARNING, SESSION_COOKIE_KEY,
};
use linkpilot_kernel::{
    Config, Coordinator, ExecutionMode, InvocationOptions, InvocationRequest, SecretKeys,
};
use support::{
    connectable_profile, engine, messageable_profile, mock_personalizer, test_config,
    FakeLauncher, FakeSite, PROFILE,
};

const PROMPT: &str = "Connect with Jane Doe: https://site.example/in/jane-doe";

struct Harness {
    coordinator: Coordinator,
    site: Arc<FakeSite>,
    launcher: Arc<FakeLauncher>,
}

fn harness(config: Config, reply: &str) -> Harness {
    let site = FakeSite::new();
    let launcher = FakeLauncher::new(site.clone());
    let coordinator = Coordinator::new(Arc::new(config.clone()), launcher.clone())
        .unwrap()
        .with_personalizer(mock_personalizer(reply))
        .with_engine(engine(&site, &config));
    Harness {
        coordinator,
        site,
        launcher,
    }
}

fn full_keys() -> SecretKeys {
    SecretKeys::new()
        .with(SESSION_COOKIE_KEY, "AQEDAT")
        .with(LLM_API_KEY, "sk-test")
        .with(LLM_PROVIDER_KEY, "mock")
}

fn request(prompt: &str, options: InvocationOptions) -> InvocationRequest {
    InvocationRequest {
        options,
        ..InvocationRequest::new(prompt)
    }
}

fn statuses(events: &[ProgressEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Status(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn assert_single_terminal_last(events: &[ProgressEvent]) {
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().map(ProgressEvent::is_terminal).unwrap_or(false));
}

fn only_error(events: &[ProgressEvent]) -> String {
    assert_eq!(events.len(), 1, "{events:?}");
    match &events[0] {
        ProgressEvent::Error(message) => message.clone(),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn personalized_connect_reports_in_order() {
    let h = harness(test_config(), &"x".repeat(450));
    connectable_profile(&h.site, &h.coordinator.config().selectors);

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, InvocationOptions::default()), &full_keys())
        .await;

    assert_single_terminal_last(&events);
    let status = statuses(&events);
    assert!(status.len() >= 3);
    assert_eq!(status[0], format!("Found LinkedIn profile: {PROFILE}"));
    assert_eq!(status[1], "Generating personalized connection note...");
    assert!(status[2].starts_with("Generated note: \""));
    assert_eq!(status.last().unwrap(), "Sending LinkedIn connection request...");

    let ProgressEvent::Result(result) = events.last().unwrap() else {
        panic!("expected result");
    };
    assert_eq!(result["success"], true);
    assert_eq!(result["action"], "connect");
    assert_eq!(result["linkedin_url"], PROFILE);
    let note = result["personalized_note"].as_str().unwrap();
    assert_eq!(note.chars().count(), NOTE_LIMIT);
    assert_eq!(result["message"], "Connection request sent to Jane Doe");
    assert!(h.site.is_closed());
}

#[tokio::test]
async fn missing_api_key_fails_before_anything_happens() {
    let h = harness(test_config(), "unused");
    let keys = SecretKeys::new().with(SESSION_COOKIE_KEY, "AQEDAT");

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, InvocationOptions::default()), &keys)
        .await;

    assert_eq!(only_error(&events), "LLM API key missing (LLM_API_KEY)");
    assert_eq!(h.launcher.launch_count(), 0);
    assert!(h.site.calls().is_empty());
}

#[tokio::test]
async fn api_key_is_not_needed_without_personalization() {
    let h = harness(test_config(), "unused");
    connectable_profile(&h.site, &h.coordinator.config().selectors);
    let keys = SecretKeys::new().with(SESSION_COOKIE_KEY, "AQEDAT");
    let options = InvocationOptions {
        personalize: Some(false),
        ..InvocationOptions::default()
    };

    let events = h.coordinator.execute_collect(request(PROMPT, options), &keys).await;

    assert_single_terminal_last(&events);
    assert!(matches!(events.last(), Some(ProgressEvent::Result(r)) if r["personalized_note"].is_null()));
    assert!(!statuses(&events).iter().any(|s| s.contains("Generating")));
}

#[tokio::test]
async fn empty_message_text_is_rejected_up_front() {
    let h = harness(test_config(), "unused");
    let options = InvocationOptions {
        action: Some("message".into()),
        personalize: Some(false),
        message_text: Some("   ".into()),
        ..InvocationOptions::default()
    };

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, options), &full_keys())
        .await;

    assert!(only_error(&events).starts_with("Message text required"));
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test]
async fn input_errors_are_single_error_events() {
    let h = harness(test_config(), "unused");

    let no_auth = h
        .coordinator
        .execute_collect(
            request(PROMPT, InvocationOptions::default()),
            &SecretKeys::new().with(LLM_API_KEY, "sk"),
        )
        .await;
    assert_eq!(only_error(&no_auth), MISSING_AUTH);

    let unknown = h
        .coordinator
        .execute_collect(
            request(
                PROMPT,
                InvocationOptions {
                    action: Some("follow".into()),
                    ..InvocationOptions::default()
                },
            ),
            &full_keys(),
        )
        .await;
    assert_eq!(
        only_error(&unknown),
        "Unknown action: follow. Use 'connect' or 'message'"
    );

    let no_url = h
        .coordinator
        .execute_collect(
            request("Connect with Jane Doe", InvocationOptions::default()),
            &full_keys(),
        )
        .await;
    assert_eq!(only_error(&no_url), MISSING_PROFILE_URL);

    let bad_provider = h
        .coordinator
        .execute_collect(
            request(PROMPT, InvocationOptions::default()),
            &full_keys().with(LLM_PROVIDER_KEY, "cohere"),
        )
        .await;
    assert!(only_error(&bad_provider).starts_with("Unknown LLM provider: cohere"));

    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test]
async fn password_auth_warns_first() {
    let h = harness(test_config(), "Hello");
    let keys = SecretKeys::new()
        .with(EMAIL_KEY, "ada@example.com")
        .with(PASSWORD_KEY, "hunter2")
        .with(LLM_API_KEY, "sk")
        .with(LLM_PROVIDER_KEY, "mock");
    let options = InvocationOptions {
        personalize: Some(false),
        ..InvocationOptions::default()
    };

    let events = h.coordinator.execute_collect(request(PROMPT, options), &keys).await;

    assert_eq!(statuses(&events)[0], PASSWORD_AUTH_WARNING);
    // Login form is absent on the fake site.
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Error(m)) if m == "Failed to send connection: Login form fields not found on the sign-in page"
    ));
}

#[tokio::test]
async fn already_pending_is_a_failure_by_default() {
    let h = harness(test_config(), "Hello");
    h.site.show(&h.coordinator.config().selectors.pending[0]);

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, InvocationOptions::default()), &full_keys())
        .await;

    assert_single_terminal_last(&events);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Error(
            "Failed to send connection: Connection request already sent".into()
        ))
    );
}

#[tokio::test]
async fn already_pending_can_count_as_success() {
    let mut config = test_config();
    config.policy.treat_satisfied_as_success = true;
    let h = harness(config, "Hello");
    h.site.show(&h.coordinator.config().selectors.pending[0]);

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, InvocationOptions::default()), &full_keys())
        .await;

    let Some(ProgressEvent::Result(result)) = events.last() else {
        panic!("expected result, got {events:?}");
    };
    assert_eq!(result["already_satisfied"], true);
    assert_eq!(result["message"], "Connection request already sent");
}

#[tokio::test]
async fn split_mode_returns_a_command_without_a_browser() {
    let mut config = test_config();
    config.mode = ExecutionMode::Split;
    let h = harness(config, "Loved your compiler work.");
    let keys = SecretKeys::new()
        .with(LLM_API_KEY, "sk")
        .with(LLM_PROVIDER_KEY, "mock");

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, InvocationOptions::default()), &keys)
        .await;

    assert_single_terminal_last(&events);
    assert_eq!(h.launcher.launch_count(), 0);
    let Some(ProgressEvent::Result(result)) = events.last() else {
        panic!("expected result, got {events:?}");
    };
    assert_eq!(result["command"]["type"], "linkedin_automation");
    assert_eq!(result["command"]["action"], "connect");
    assert_eq!(result["command"]["profile_url"], PROFILE);
    assert_eq!(result["command"]["note"], "Loved your compiler work.");
    assert_eq!(result["command"]["full_name"], "Jane Doe");
    assert_eq!(result["personalized_note"], "Loved your compiler work.");
}

#[tokio::test]
async fn personalized_message_replaces_draft() {
    let h = harness(test_config(), "Jane, quick question about Rust tooling.");
    messageable_profile(&h.site, &h.coordinator.config().selectors);
    let options = InvocationOptions {
        action: Some("message".into()),
        message_text: Some("ask about tooling".into()),
        ..InvocationOptions::default()
    };

    let events = h
        .coordinator
        .execute_collect(request(PROMPT, options), &full_keys())
        .await;

    let status = statuses(&events);
    assert!(status.contains(&"Personalizing message with AI...".to_string()));
    assert_eq!(status.last().unwrap(), "Sending LinkedIn message...");
    let Some(ProgressEvent::Result(result)) = events.last() else {
        panic!("expected result, got {events:?}");
    };
    assert_eq!(result["action"], "message");
    assert_eq!(result["message"], "Jane, quick question about Rust tooling.");
    assert_eq!(result["status"], "Message sent to Jane Doe");
    assert!(h.site.fills()[0].ends_with("=Jane, quick question about Rust tooling."));
}
