mod support;

use linkpilot_core_types::{ActionRequest, AuthFailure, Credentials, FailureKind};
use linkpilot_kernel::{AuthResolver, AuthResult, AuthStrategy, Config};
use support::{
    engine, primitives, test_config, FakeLauncher, FakeSite, Reaction, FEED, LOGIN, PROFILE,
};

fn resolver(config: &Config) -> AuthResolver {
    AuthResolver::new(config.site.clone(), config.selectors.clone())
}

fn password() -> AuthStrategy {
    AuthStrategy::Credentials(Credentials::Password {
        email: "ada@example.com".into(),
        password: "hunter2".into(),
    })
}

fn login_form(site: &FakeSite, config: &Config, after_submit: &str) {
    let catalog = &config.selectors;
    site.show(&catalog.login_email[0]);
    site.show(&catalog.login_password[0]);
    site.show(&catalog.login_submit[0]);
    site.on_click(
        &catalog.login_submit[0],
        Reaction {
            reveal: Vec::new(),
            goto: Some(after_submit.to_string()),
        },
    );
}

#[tokio::test]
async fn cookie_is_scoped_to_site_then_feed_is_opened() {
    let config = test_config();
    let site = FakeSite::new();
    let strategy = AuthStrategy::Credentials(Credentials::Cookie {
        token: "AQEDAT".into(),
    });

    let result = resolver(&config)
        .authenticate(&primitives(&site), &strategy)
        .await;

    assert_eq!(result, AuthResult::Authenticated);
    let calls = site.calls();
    assert_eq!(calls[0], "cookie:li_at=AQEDAT@.site.example");
    assert_eq!(calls[1], format!("goto:{FEED}"));
}

#[tokio::test]
async fn stale_cookie_lands_on_login_and_stops_the_run() {
    let config = test_config();
    let site = FakeSite::new();
    site.redirect(FEED, "https://site.example/login?session_redirect=feed");
    let launcher = FakeLauncher::new(site.clone());
    let strategy = AuthStrategy::Credentials(Credentials::Cookie {
        token: "expired".into(),
    });

    let outcome = engine(&site, &config)
        .execute(launcher.as_ref(), &strategy, &ActionRequest::connect(PROFILE, None))
        .await;

    assert_eq!(
        outcome.error_kind(),
        Some(&FailureKind::AuthFailure(AuthFailure::ExpiredOrInvalidSession))
    );
    assert!(!site.gotos().contains(&PROFILE.to_string()));
    assert!(site.is_closed());
}

#[tokio::test]
async fn password_login_reaches_feed() {
    let config = test_config();
    let site = FakeSite::new();
    login_form(&site, &config, FEED);

    let result = resolver(&config)
        .authenticate(&primitives(&site), &password())
        .await;

    assert_eq!(result, AuthResult::Authenticated);
    assert_eq!(site.gotos(), vec![LOGIN.to_string()]);
    assert_eq!(site.fills().len(), 2);
    assert!(site.fills()[0].ends_with("=ada@example.com"));
}

#[tokio::test]
async fn password_login_into_checkpoint_is_terminal() {
    let config = test_config();
    let site = FakeSite::new();
    login_form(&site, &config, "https://site.example/checkpoint/challenge/abc");

    let result = resolver(&config)
        .authenticate(&primitives(&site), &password())
        .await;

    assert_eq!(result, AuthResult::Rejected(AuthFailure::SecurityCheckpoint));
    assert!(result
        .failure()
        .unwrap()
        .message()
        .contains("session cookie"));
}

#[tokio::test]
async fn password_login_stuck_elsewhere_is_a_timeout() {
    let config = test_config();
    let site = FakeSite::new();
    login_form(&site, &config, "https://site.example/uas/login-submit");

    let result = resolver(&config)
        .authenticate(&primitives(&site), &password())
        .await;

    assert_eq!(result, AuthResult::Errored(FailureKind::Timeout));
}

#[tokio::test]
async fn login_page_without_fields_is_reported() {
    let config = test_config();
    let site = FakeSite::new();
    site.show(&config.selectors.login_email[0]);

    let result = resolver(&config)
        .authenticate(&primitives(&site), &password())
        .await;

    assert_eq!(
        result,
        AuthResult::Rejected(AuthFailure::MissingCredentialFields)
    );
    assert!(site.fills().is_empty());
}

#[tokio::test]
async fn existing_profile_must_already_be_signed_in() {
    let config = test_config();
    let site = FakeSite::new();
    site.redirect(FEED, LOGIN);

    let result = resolver(&config)
        .authenticate(&primitives(&site), &AuthStrategy::ExistingProfile)
        .await;

    assert_eq!(result, AuthResult::Rejected(AuthFailure::NotLoggedIn));
}
