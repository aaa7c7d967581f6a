//! Application façade wiring the session manager and the parse controller.

use std::sync::Arc;

use anyhow::Result;

use crate::api::BackendClient;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::parse::{FailureKind, ParseController, ParseRequest, SubmitOutcome};
use crate::session::{AuthError, Session, SessionManager};

/// One NaijaCal client: a session plus the food-log submission it gates.
pub struct NaijaCal {
    session: SessionManager,
    parser: ParseController,
}

impl NaijaCal {
    pub fn new(api: BackendClient, store: Arc<dyn CredentialStore>) -> Self {
        let session = SessionManager::new(api.clone(), store);
        let parser = ParseController::new(api, session.subscribe());
        Self { session, parser }
    }

    /// Builds a client from loaded configuration with the on-disk credential store.
    ///
    /// # Errors
    /// Returns an error if the backend URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.resolve_api_url()?;
        tracing::debug!(%base_url, "using backend");
        let api = BackendClient::new(base_url, config.request_timeout())?;
        Ok(Self::new(api, Arc::new(FileCredentialStore::default_location())))
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    pub fn parser(&self) -> &ParseController {
        &self.parser
    }

    pub fn session(&self) -> Session {
        self.session.session()
    }

    pub fn whoami(&self) -> Option<String> {
        self.session.whoami()
    }

    pub async fn restore(&self) -> Session {
        self.session.restore().await
    }

    /// # Errors
    /// Returns the surfaced [`AuthError`].
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.session.login(username, password).await
    }

    /// # Errors
    /// Returns the surfaced [`AuthError`].
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        self.session.register(username, password, email).await
    }

    pub fn logout(&self) -> bool {
        self.session.logout()
    }

    /// Submits a food log. A token rejected by `/parse-log` ends the session.
    pub async fn submit(&self, raw_text: &str) -> SubmitOutcome {
        let token = self.session.session().bearer_token().map(str::to_string);
        let outcome = self.parser.submit(raw_text).await;

        if let (Some(token), Some(failure)) = (token, outcome.failure())
            && failure.kind == FailureKind::TokenRejected
        {
            self.session.invalidate(&token);
        }
        outcome
    }

    pub fn current_request(&self) -> ParseRequest {
        self.parser.current()
    }
}
