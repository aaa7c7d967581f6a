//! Food-log submission lifecycle.
//!
//! The [`ParseController`] owns the active [`ParseRequest`] and reads, never
//! writes, the session published by the session manager. One request may be
//! in flight at a time; a second `submit` while busy is rejected without
//! touching the network. Responses that come back after the session token
//! changed are dropped (stale-response guard).

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::api::{ApiError, ApiErrorKind, BackendClient, ParseResult};
use crate::session::{
    CONNECT_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE, Session, TIMEOUT_ERROR_MESSAGE,
};

pub const EMPTY_LOG_MESSAGE: &str = "Please paste your food log first.";
pub const NOT_LOGGED_IN_MESSAGE: &str = "Please log in to parse your food log.";
pub const BUSY_MESSAGE: &str = "A food log is already being parsed. Please wait.";
pub const PARSE_FAILED_MESSAGE: &str = "Error parsing food log.";

/// Flat view of a request's lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Idle,
    Validating,
    InFlight,
    Succeeded,
    Failed,
}

/// Failure categories for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Empty or whitespace-only log; nothing was sent
    ValidationEmpty,
    /// No authenticated session; nothing was sent
    Unauthenticated,
    /// Another request is in flight; nothing was sent
    Busy,
    /// Backend answered 401/403 for the session token
    TokenRejected,
    /// Backend unreachable
    Transport,
    /// Request exceeded the configured timeout
    Timeout,
    /// Backend error status or unreadable success body
    Server,
}

/// Why a submission failed, with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ParseFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_api(err: &ApiError) -> Self {
        match err.kind {
            ApiErrorKind::Transport => Self::new(FailureKind::Transport, CONNECT_ERROR_MESSAGE),
            ApiErrorKind::Timeout => Self::new(FailureKind::Timeout, TIMEOUT_ERROR_MESSAGE),
            ApiErrorKind::Unauthorized => Self::new(
                FailureKind::TokenRejected,
                err.message.as_deref().unwrap_or(SESSION_EXPIRED_MESSAGE),
            ),
            ApiErrorKind::HttpStatus | ApiErrorKind::Decode => Self::new(
                FailureKind::Server,
                err.message.as_deref().unwrap_or(PARSE_FAILED_MESSAGE),
            ),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseFailure {}

/// Lifecycle stage; terminal stages carry exactly one of result or failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParseState {
    #[default]
    Idle,
    Validating,
    InFlight,
    Succeeded(ParseResult),
    Failed(ParseFailure),
}

/// One submission of a free-text food log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseRequest {
    pub raw_text: String,
    pub state: ParseState,
}

impl ParseRequest {
    pub fn status(&self) -> ParseStatus {
        match self.state {
            ParseState::Idle => ParseStatus::Idle,
            ParseState::Validating => ParseStatus::Validating,
            ParseState::InFlight => ParseStatus::InFlight,
            ParseState::Succeeded(_) => ParseStatus::Succeeded,
            ParseState::Failed(_) => ParseStatus::Failed,
        }
    }

    pub fn result(&self) -> Option<&ParseResult> {
        match &self.state {
            ParseState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match &self.state {
            ParseState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.failure().map(|f| f.message.as_str())
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, ParseState::InFlight)
    }
}

/// What a call to [`ParseController::submit`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The request reached SUCCEEDED or FAILED.
    Completed(ParseRequest),
    /// Refused while another request was in flight; the active request is untouched.
    Rejected(ParseFailure),
    /// The session changed before the response arrived; nothing was committed.
    Discarded,
}

impl SubmitOutcome {
    pub fn request(&self) -> Option<&ParseRequest> {
        match self {
            SubmitOutcome::Completed(request) => Some(request),
            _ => None,
        }
    }

    /// The failure surfaced by this outcome, if any.
    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            SubmitOutcome::Completed(request) => request.failure(),
            SubmitOutcome::Rejected(failure) => Some(failure),
            SubmitOutcome::Discarded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Active {
    request: ParseRequest,
    /// Token the in-flight request was issued with.
    issued_with: Option<String>,
    /// Bumped on every accepted submit; a response only commits if it still matches.
    generation: u64,
}

/// Drives one food-log submission at a time against the backend.
pub struct ParseController {
    api: BackendClient,
    session: watch::Receiver<Session>,
    active: Mutex<Active>,
}

impl ParseController {
    pub fn new(api: BackendClient, session: watch::Receiver<Session>) -> Self {
        Self {
            api,
            session,
            active: Mutex::new(Active::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Active> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_token(&self) -> Option<String> {
        self.session.borrow().bearer_token().map(str::to_string)
    }

    /// Snapshot of the active request.
    ///
    /// An in-flight request whose token is no longer the session's reads as
    /// IDLE: logout abandons it immediately, before its response arrives.
    pub fn current(&self) -> ParseRequest {
        let active = self.lock();
        if active.request.is_in_flight() && active.issued_with != self.current_token() {
            return ParseRequest {
                raw_text: active.request.raw_text.clone(),
                state: ParseState::Idle,
            };
        }
        active.request.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.current().is_in_flight()
    }

    /// Submits `raw_text` for parsing.
    ///
    /// Never returns an error: every failure lands in the returned outcome.
    /// Failures that reject a submit while another request is in flight (BUSY,
    /// blank input) leave [`current`](Self::current) untouched.
    pub async fn submit(&self, raw_text: &str) -> SubmitOutcome {
        let (token, generation) = {
            let mut active = self.lock();
            let token = self.current_token();
            let busy = active.request.is_in_flight() && active.issued_with == token;
            let empty = raw_text.trim().is_empty();

            if empty && busy {
                // Validation still applies; the in-flight request is left alone.
                tracing::debug!("blank food log submitted while a request is in flight");
                return SubmitOutcome::Completed(ParseRequest {
                    raw_text: raw_text.to_string(),
                    state: ParseState::Failed(ParseFailure::new(
                        FailureKind::ValidationEmpty,
                        EMPTY_LOG_MESSAGE,
                    )),
                });
            }

            if busy {
                tracing::debug!("submit rejected: request already in flight");
                return SubmitOutcome::Rejected(ParseFailure::new(
                    FailureKind::Busy,
                    BUSY_MESSAGE,
                ));
            }

            active.generation += 1;
            active.issued_with = None;
            active.request = ParseRequest {
                raw_text: raw_text.to_string(),
                state: ParseState::Validating,
            };

            if empty {
                return Self::finish_locally(
                    &mut active,
                    ParseFailure::new(FailureKind::ValidationEmpty, EMPTY_LOG_MESSAGE),
                );
            }

            let Some(token) = token else {
                return Self::finish_locally(
                    &mut active,
                    ParseFailure::new(FailureKind::Unauthenticated, NOT_LOGGED_IN_MESSAGE),
                );
            };

            active.issued_with = Some(token.clone());
            active.request.state = ParseState::InFlight;
            (token, active.generation)
        };

        tracing::info!(chars = raw_text.len(), "submitting food log");
        let response = self.api.parse_log(&token, raw_text).await;

        let mut active = self.lock();
        let superseded = active.generation != generation;
        let stale = self.current_token().as_deref() != Some(token.as_str());
        if superseded || stale {
            tracing::info!(superseded, stale, "discarding parse response");
            if !superseded {
                active.request.state = ParseState::Idle;
                active.issued_with = None;
            }
            return SubmitOutcome::Discarded;
        }

        active.request.state = match response {
            Ok(result) => {
                tracing::info!(
                    items = result.items.len(),
                    total_calories = result.total_calories,
                    "food log parsed"
                );
                ParseState::Succeeded(result)
            }
            Err(err) => {
                tracing::warn!("food log parse failed: {err}");
                ParseState::Failed(ParseFailure::from_api(&err))
            }
        };
        active.issued_with = None;
        SubmitOutcome::Completed(active.request.clone())
    }

    fn finish_locally(active: &mut Active, failure: ParseFailure) -> SubmitOutcome {
        tracing::debug!(kind = ?failure.kind, "submit failed before sending");
        active.request.state = ParseState::Failed(failure);
        SubmitOutcome::Completed(active.request.clone())
    }
}
