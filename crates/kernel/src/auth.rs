use action_primitives::{ActionError, ActionPrimitives};
use cdp_adapter::CookieParam;
use linkpilot_core_types::{AuthFailure, Credentials, FailureKind};
use tracing::{info, warn};

use crate::app_settings::SiteConfig;
use crate::engine::classify_action_error;
use crate::selectors::SelectorCatalog;

/// How a run obtains its authenticated session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStrategy {
    Credentials(Credentials),
    /// Reuse a browser profile the user already signed into.
    ExistingProfile,
}

impl AuthStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Credentials(creds) => creds.strategy(),
            Self::ExistingProfile => "existing_profile",
        }
    }
}

/// Classified outcome of authentication. Never an error value: the caller
/// inspects it and decides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated,
    /// The site refused the session; the message carries the remedy.
    Rejected(AuthFailure),
    /// Something other than the site's verdict stopped authentication.
    Errored(FailureKind),
}

impl AuthResult {
    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Authenticated => None,
            Self::Rejected(reason) => Some(FailureKind::AuthFailure(*reason)),
            Self::Errored(kind) => Some(kind.clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthResolver {
    site: SiteConfig,
    selectors: SelectorCatalog,
}

impl AuthResolver {
    pub fn new(site: SiteConfig, selectors: SelectorCatalog) -> Self {
        Self { site, selectors }
    }

    pub async fn authenticate(&self, prims: &ActionPrimitives, strategy: &AuthStrategy) -> AuthResult {
        let attempt = match strategy {
            AuthStrategy::Credentials(Credentials::Cookie { token }) => {
                self.with_cookie(prims, token).await
            }
            AuthStrategy::Credentials(Credentials::Password { email, password }) => {
                self.with_password(prims, email, password).await
            }
            AuthStrategy::ExistingProfile => self.with_existing_profile(prims).await,
        };
        match attempt {
            Ok(result) => {
                match &result {
                    AuthResult::Authenticated => {
                        info!(strategy = strategy.name(), "authenticated")
                    }
                    other => warn!(strategy = strategy.name(), outcome = ?other, "authentication failed"),
                }
                result
            }
            Err(err) => {
                warn!(strategy = strategy.name(), error = %err, "authentication aborted");
                AuthResult::Errored(classify_action_error(&err))
            }
        }
    }

    async fn with_cookie(
        &self,
        prims: &ActionPrimitives,
        token: &str,
    ) -> Result<AuthResult, ActionError> {
        let cookie = CookieParam::session(
            self.site.cookie_name.as_str(),
            token,
            self.site.cookie_domain.as_str(),
        );
        prims.set_cookies(std::slice::from_ref(&cookie)).await?;
        prims.navigate(&self.site.feed_url()).await?;
        let url = prims.current_url().await?;
        if self.site.is_login(&url) || self.site.is_checkpoint(&url) {
            return Ok(AuthResult::Rejected(AuthFailure::ExpiredOrInvalidSession));
        }
        Ok(AuthResult::Authenticated)
    }

    async fn with_password(
        &self,
        prims: &ActionPrimitives,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, ActionError> {
        prims.navigate(&self.site.login_url()).await?;

        let email_field = prims.locate_any(&self.selectors.login_email).await?;
        let password_field = prims.locate_any(&self.selectors.login_password).await?;
        let submit = prims.locate_any(&self.selectors.login_submit).await?;
        let (Some(email_field), Some(password_field), Some(submit)) =
            (email_field, password_field, submit)
        else {
            return Ok(AuthResult::Rejected(AuthFailure::MissingCredentialFields));
        };

        prims.fill(&email_field, email).await?;
        prims.fill(&password_field, password).await?;
        prims.click(&submit).await?;

        let site = &self.site;
        let reached = prims
            .wait_for_url(&|url: &str| site.is_feed(url), prims.timings().login_timeout)
            .await?;
        if reached.is_some() {
            return Ok(AuthResult::Authenticated);
        }

        let url = prims.current_url().await?;
        if site.is_checkpoint(&url) {
            Ok(AuthResult::Rejected(AuthFailure::SecurityCheckpoint))
        } else {
            Ok(AuthResult::Errored(FailureKind::Timeout))
        }
    }

    async fn with_existing_profile(
        &self,
        prims: &ActionPrimitives,
    ) -> Result<AuthResult, ActionError> {
        prims.navigate(&self.site.feed_url()).await?;
        let url = prims.current_url().await?;
        if self.site.is_login(&url) || self.site.is_checkpoint(&url) {
            return Ok(AuthResult::Rejected(AuthFailure::NotLoggedIn));
        }
        Ok(AuthResult::Authenticated)
    }
}
