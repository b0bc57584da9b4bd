//! Single-slot confirmation prompt.
//!
//! # Responsibility
//! - Hold at most one outstanding yes/no request and the action it guards.
//! - Resolve that request into exactly one of accepted/cancelled.
//!
//! # Invariants
//! - A new request replaces the pending one; the replaced request resolves
//!   as cancelled.
//! - Resolving dismisses the prompt; resolving again is a no-op.
//! - There is no timeout: an unanswered request stays pending.

use log::debug;

/// User answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Accepted,
    Cancelled,
}

/// Keys the prompt reacts to. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKey {
    Enter,
    Escape,
    Char(char),
}

impl ConfirmKey {
    /// Maps a key press to the equivalent button press.
    pub fn outcome(self) -> Option<ConfirmOutcome> {
        match self {
            Self::Enter | Self::Char('y') | Self::Char('Y') => Some(ConfirmOutcome::Accepted),
            Self::Escape | Self::Char('n') | Self::Char('N') => Some(ConfirmOutcome::Cancelled),
            Self::Char(_) => None,
        }
    }
}

/// A resolved request, carrying the guarded action back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<A> {
    Accepted(A),
    Cancelled(A),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRequest<A> {
    message: String,
    action: A,
}

/// Modal confirmation holding one pending action of type `A`.
#[derive(Debug, Clone)]
pub struct ConfirmationGate<A> {
    pending: Option<PendingRequest<A>>,
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> ConfirmationGate<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a prompt for `action`, returning any request it displaced.
    pub fn request(&mut self, message: impl Into<String>, action: A) -> Option<Resolution<A>> {
        let displaced = self.pending.replace(PendingRequest {
            message: message.into(),
            action,
        });
        if displaced.is_some() {
            debug!("event=confirm_request module=confirm status=replaced");
        }
        displaced.map(|request| Resolution::Cancelled(request.action))
    }

    /// Returns whether a prompt is showing.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Prompt text of the pending request.
    pub fn message(&self) -> Option<&str> {
        self.pending.as_ref().map(|request| request.message.as_str())
    }

    /// Action guarded by the pending request.
    pub fn pending_action(&self) -> Option<&A> {
        self.pending.as_ref().map(|request| &request.action)
    }

    /// Dismisses the prompt with `outcome`.
    ///
    /// Returns `None` when nothing was pending.
    pub fn resolve(&mut self, outcome: ConfirmOutcome) -> Option<Resolution<A>> {
        let request = self.pending.take()?;
        Some(match outcome {
            ConfirmOutcome::Accepted => Resolution::Accepted(request.action),
            ConfirmOutcome::Cancelled => Resolution::Cancelled(request.action),
        })
    }

    /// Resolves from a key press; unmapped keys leave the prompt open.
    pub fn handle_key(&mut self, key: ConfirmKey) -> Option<Resolution<A>> {
        self.resolve(key.outcome()?)
    }
}
