//! Login modal state: visibility, per-attempt phase and identity resolution.
//!
//! These are the synchronous transitions; [`crate::shell::AppShell`] owns the
//! timers and calls in here under its state lock.

use shared::{
    domain::{AttemptId, AuthProvider, SessionIdentity},
    error::ErrorCode,
    protocol::LoginPhase,
};
use tracing::debug;

use crate::{
    attempt::{AttemptOutcome, AttemptSequence, AttemptTicket, AttemptTracker},
    error::ClientError,
};

/// Identity used when the credential form is submitted without an email.
pub const FALLBACK_IDENTIFIER: &str = "demo@vibe.app";

/// Only an empty identifier falls back; anything else is used verbatim.
pub fn resolve_identifier(identifier: &str) -> &str {
    if identifier.is_empty() {
        FALLBACK_IDENTIFIER
    } else {
        identifier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginSnapshot {
    pub visible: bool,
    pub phase: LoginPhase,
    pub attempt: Option<AttemptId>,
}

#[derive(Debug)]
pub struct LoginModal {
    visible: bool,
    phase: LoginPhase,
    attempts: AttemptTracker,
}

impl LoginModal {
    pub fn new(sequence: AttemptSequence) -> Self {
        Self {
            visible: false,
            phase: LoginPhase::Idle,
            attempts: AttemptTracker::new(sequence),
        }
    }

    pub fn snapshot(&self) -> LoginSnapshot {
        LoginSnapshot {
            visible: self.visible,
            phase: self.phase,
            attempt: self.attempts.current(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    /// Returns false when the modal was already visible.
    pub fn open(&mut self) -> bool {
        if self.visible {
            return false;
        }
        self.visible = true;
        self.phase = LoginPhase::Idle;
        true
    }

    /// Hides the modal and abandons any attempt still in flight.
    pub fn close(&mut self) -> Option<AttemptId> {
        self.visible = false;
        self.phase = LoginPhase::Idle;
        let cancelled = self.attempts.cancel();
        if let Some(id) = cancelled {
            debug!(attempt = id.0, "login attempt abandoned");
        }
        cancelled
    }

    /// Back to a fresh modal; used on logout.
    pub fn reset(&mut self) {
        self.close();
    }

    pub fn begin_credentials(&mut self) -> Result<AttemptTicket, ClientError> {
        self.begin(LoginPhase::Submitting)
    }

    pub fn begin_federated(&mut self) -> Result<AttemptTicket, ClientError> {
        self.begin(LoginPhase::AwaitingFederatedConsent)
    }

    fn begin(&mut self, phase: LoginPhase) -> Result<AttemptTicket, ClientError> {
        if !self.visible {
            return Err(ClientError::validation("the sign-in dialog is not open"));
        }
        if self.phase.is_pending() {
            return Err(ClientError::OperationPending {
                operation: "sign-in",
            });
        }
        let ticket = self.attempts.begin();
        self.phase = phase;
        Ok(ticket)
    }

    /// Consent window closed with an account chosen; wait for the callback.
    pub fn enter_settling(&mut self, id: AttemptId) -> bool {
        if !self.attempts.is_current(id) || self.phase != LoginPhase::AwaitingFederatedConsent {
            return false;
        }
        self.phase = LoginPhase::Settling;
        true
    }

    /// Authenticates `identifier` if `id` is still the live attempt, closing
    /// the modal.
    pub fn complete(
        &mut self,
        id: AttemptId,
        identifier: &str,
        provider: AuthProvider,
    ) -> AttemptOutcome<SessionIdentity> {
        if !self.attempts.finish(id) {
            return AttemptOutcome::Superseded;
        }
        self.phase = LoginPhase::Authenticated;
        self.visible = false;
        AttemptOutcome::Completed(SessionIdentity::new(
            resolve_identifier(identifier),
            provider,
        ))
    }

    /// Marks the attempt failed; the modal stays open so the user can retry.
    pub fn fail(&mut self, id: AttemptId, code: ErrorCode) -> bool {
        if !self.attempts.finish(id) {
            return false;
        }
        self.phase = LoginPhase::Failed(code);
        true
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
