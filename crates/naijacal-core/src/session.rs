//! Session state and the manager that owns it.
//!
//! The [`SessionManager`] is the only writer of the current [`Session`]. It
//! publishes every transition on a `watch` channel so consumers (the parse
//! controller, the CLI) read the latest value instead of ambient globals.
//!
//! Transitions:
//! - `restore`: UNAUTHENTICATED → AUTHENTICATING (stored token) → AUTHENTICATED or UNAUTHENTICATED
//! - `login` / `register`: UNAUTHENTICATED → AUTHENTICATED on success, unchanged on failure
//! - `logout` / `invalidate`: any → UNAUTHENTICATED, credential store cleared

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::api::{ApiError, ApiErrorKind, BackendClient, Profile, TokenResponse};
use crate::credentials::{CredentialStore, mask_token};

/// Shown when the backend could not be reached.
pub const CONNECT_ERROR_MESSAGE: &str = "Could not connect to backend.";
/// Shown when a request exceeded the configured timeout.
pub const TIMEOUT_ERROR_MESSAGE: &str = "Request timed out. Please try again.";
/// Shown after the backend rejected the current token.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
const MISSING_CREDENTIALS_MESSAGE: &str = "Username and password required";
const ALREADY_AUTHENTICATED_MESSAGE: &str = "Already logged in. Log out first.";

/// Flat view of the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Unauthenticated => write!(f, "unauthenticated"),
            SessionStatus::Authenticating => write!(f, "authenticating"),
            SessionStatus::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Authenticated identity and credential state of the current user.
///
/// Each variant carries exactly the fields valid in that status: a token only
/// while authenticating or authenticated, a username only once authenticated.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticating {
        token: String,
    },
    Authenticated {
        token: String,
        username: String,
    },
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        match self {
            Session::Unauthenticated => SessionStatus::Unauthenticated,
            Session::Authenticating { .. } => SessionStatus::Authenticating,
            Session::Authenticated { .. } => SessionStatus::Authenticated,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Unauthenticated => None,
            Session::Authenticating { token } | Session::Authenticated { token, .. } => {
                Some(token)
            }
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Session::Authenticated { username, .. } => Some(username),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// Token usable for protected calls; only present once authenticated.
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }
}

// Tokens never reach logs in full.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Unauthenticated => f.write_str("Unauthenticated"),
            Session::Authenticating { token } => f
                .debug_struct("Authenticating")
                .field("token", &mask_token(token))
                .finish(),
            Session::Authenticated { token, username } => f
                .debug_struct("Authenticated")
                .field("token", &mask_token(token))
                .field("username", username)
                .finish(),
        }
    }
}

/// Why an auth operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Missing username or password; no request was sent
    InvalidInput,
    /// A session is already active or being validated; no request was sent
    AlreadyAuthenticated,
    /// Operation needs an authenticated session
    NotAuthenticated,
    /// Backend rejected the credentials or token
    Rejected,
    /// Backend answered with another error status or an unreadable body
    Server,
    /// No response from the backend
    Transport,
}

/// Human-readable auth failure surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Converts a backend failure, preferring the body's own message.
    fn from_api(err: &ApiError, fallback: &str) -> Self {
        match err.kind {
            ApiErrorKind::Transport => Self::new(AuthErrorKind::Transport, CONNECT_ERROR_MESSAGE),
            ApiErrorKind::Timeout => Self::new(AuthErrorKind::Transport, TIMEOUT_ERROR_MESSAGE),
            ApiErrorKind::Unauthorized => Self::new(
                AuthErrorKind::Rejected,
                err.message.as_deref().unwrap_or(fallback),
            ),
            ApiErrorKind::HttpStatus | ApiErrorKind::Decode => Self::new(
                AuthErrorKind::Server,
                err.message.as_deref().unwrap_or(fallback),
            ),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone, Copy)]
enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    fn fallback_message(self) -> &'static str {
        match self {
            AuthAction::Login => "Login failed.",
            AuthAction::Register => "Registration failed.",
        }
    }
}

/// Owns the current [`Session`] and every transition of it.
pub struct SessionManager {
    api: BackendClient,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    last_error: Mutex<Option<String>>,
}

impl SessionManager {
    /// Creates a manager in the UNAUTHENTICATED state. Call [`restore`](Self::restore)
    /// to pick up a persisted token.
    pub fn new(api: BackendClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::Unauthenticated);
        Self {
            api,
            store,
            state,
            last_error: Mutex::new(None),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    /// Receiver that always observes the latest session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Username of the authenticated user, if any.
    pub fn whoami(&self) -> Option<String> {
        self.state.borrow().username().map(str::to_string)
    }

    /// Message of the most recent failed auth operation, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_error(&self, message: Option<String>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn fail(&self, error: AuthError) -> AuthError {
        self.set_last_error(Some(error.message.clone()));
        error
    }

    /// Startup step: validates a persisted token against `/me`.
    ///
    /// Any failure (rejected token, unreachable backend, malformed body) clears
    /// the credential store and leaves the session UNAUTHENTICATED, so running
    /// it again with the same bad token ends in the same state.
    pub async fn restore(&self) -> Session {
        let Some(token) = self.store.load() else {
            tracing::debug!("no stored session token");
            self.state.send_replace(Session::Unauthenticated);
            return Session::Unauthenticated;
        };

        tracing::info!(token = %mask_token(&token), "validating stored session");
        self.state.send_replace(Session::Authenticating {
            token: token.clone(),
        });

        let outcome = self.api.me(&token).await;

        // A logout or login during validation wins over this result.
        let still_current = matches!(
            &*self.state.borrow(),
            Session::Authenticating { token: current } if *current == token
        );
        if !still_current {
            tracing::debug!("session changed during validation; dropping /me result");
            return self.session();
        }

        match outcome {
            Ok(Profile { username, .. }) if !username.trim().is_empty() => {
                tracing::info!(%username, "session restored");
                self.set_last_error(None);
                let session = Session::Authenticated { token, username };
                self.state.send_replace(session.clone());
                session
            }
            Ok(_) => {
                tracing::warn!("/me returned no username; discarding stored session");
                self.reset();
                Session::Unauthenticated
            }
            Err(err) => {
                tracing::warn!("stored session rejected: {err}");
                self.reset();
                Session::Unauthenticated
            }
        }
    }

    /// Logs in with username and password.
    ///
    /// # Errors
    /// Returns the surfaced [`AuthError`]; the session stays UNAUTHENTICATED.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(AuthAction::Login, username, password, None)
            .await
    }

    /// Creates an account and logs in with it.
    ///
    /// # Errors
    /// Returns the surfaced [`AuthError`]; the session stays UNAUTHENTICATED.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        self.authenticate(AuthAction::Register, username, password, email)
            .await
    }

    async fn authenticate(
        &self,
        action: AuthAction,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        if self.status() != SessionStatus::Unauthenticated {
            return Err(self.fail(AuthError::new(
                AuthErrorKind::AlreadyAuthenticated,
                ALREADY_AUTHENTICATED_MESSAGE,
            )));
        }

        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(self.fail(AuthError::new(
                AuthErrorKind::InvalidInput,
                MISSING_CREDENTIALS_MESSAGE,
            )));
        }

        let response = match action {
            AuthAction::Login => self.api.login(username, password).await,
            AuthAction::Register => self.api.register(username, password, email).await,
        };

        let tokens = match response {
            Ok(tokens) if !tokens.access.is_empty() => tokens,
            Ok(_) => {
                tracing::warn!(?action, "backend returned an empty access token");
                return Err(self.fail(AuthError::new(
                    AuthErrorKind::Server,
                    action.fallback_message(),
                )));
            }
            Err(err) => {
                tracing::info!(?action, %username, "authentication failed: {err}");
                return Err(self.fail(AuthError::from_api(&err, action.fallback_message())));
            }
        };

        if self.status() != SessionStatus::Unauthenticated {
            // Another login completed while this one was in flight.
            return Err(self.fail(AuthError::new(
                AuthErrorKind::AlreadyAuthenticated,
                ALREADY_AUTHENTICATED_MESSAGE,
            )));
        }

        let session = Session::Authenticated {
            username: resolve_username(&tokens, username),
            token: tokens.access,
        };
        if let Some(token) = session.token()
            && let Err(err) = self.store.save(token)
        {
            tracing::warn!("failed to persist session token: {err:#}");
        }

        tracing::info!(?action, username = session.username(), "authenticated");
        self.set_last_error(None);
        self.state.send_replace(session);
        Ok(())
    }

    /// Ends the session and clears the credential store.
    ///
    /// Any in-flight parse issued under the old token is abandoned: its
    /// response no longer matches the current session and is discarded.
    /// Returns whether a session, a pending validation, or a stored token was
    /// present.
    pub fn logout(&self) -> bool {
        let was_active = self.status() != SessionStatus::Unauthenticated;
        let had_stored = self.reset();
        self.set_last_error(None);
        if was_active || had_stored {
            tracing::info!("logged out");
        }
        was_active || had_stored
    }

    /// Invalid-token transition: behaves like [`logout`](Self::logout) when
    /// `token` is still the current one, otherwise does nothing.
    ///
    /// Returns whether the session was reset.
    pub fn invalidate(&self, token: &str) -> bool {
        if self.state.borrow().token() != Some(token) {
            tracing::debug!("ignoring rejection of a token that is no longer current");
            return false;
        }
        tracing::warn!("backend rejected the session token; logging out");
        self.reset();
        self.set_last_error(Some(SESSION_EXPIRED_MESSAGE.to_string()));
        true
    }

    /// Re-fetches the profile for the authenticated user.
    ///
    /// A rejected token triggers the invalid-token transition.
    ///
    /// # Errors
    /// Returns [`AuthErrorKind::NotAuthenticated`] without a request when no
    /// session is active, otherwise the surfaced backend failure.
    pub async fn profile(&self) -> Result<Profile, AuthError> {
        let Some(token) = self.session().bearer_token().map(str::to_string) else {
            return Err(AuthError::new(
                AuthErrorKind::NotAuthenticated,
                "Not logged in.",
            ));
        };

        match self.api.me(&token).await {
            Ok(profile) => Ok(profile),
            Err(err) if err.is_unauthorized() => {
                self.invalidate(&token);
                Err(self.fail(AuthError::new(
                    AuthErrorKind::Rejected,
                    SESSION_EXPIRED_MESSAGE,
                )))
            }
            Err(err) => Err(self.fail(AuthError::from_api(&err, "Could not load profile."))),
        }
    }

    /// Clears the store and publishes UNAUTHENTICATED. Returns whether a token was stored.
    fn reset(&self) -> bool {
        let had_stored = match self.store.clear() {
            Ok(had_stored) => had_stored,
            Err(err) => {
                tracing::warn!("failed to clear stored session token: {err:#}");
                false
            }
        };
        self.state.send_replace(Session::Unauthenticated);
        had_stored
    }
}

/// Username for a fresh session: the one the backend reports, else the one
/// the user typed. The token endpoint never echoes it back, so the fallback
/// is the normal path for `login`.
fn resolve_username(tokens: &TokenResponse, submitted: &str) -> String {
    tokens
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(submitted)
        .to_string()
}
