//! Suppression of redundant session notifications.
//!
//! Auth providers re-announce the same change (on focus, on reconnect, on
//! token refresh). Only events that can change who is signed in are
//! processed, and each (kind, principal) pair at most once per window.

use chrono::{DateTime, Duration, Utc};
use pawtag_core::{Clock, PrincipalId};
use pawtag_platform_access::{SessionEvent, SessionEventKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Why an event was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Token refreshes and user updates leave principal and roles as they are.
    NoStateChange,
    /// A sign-in for the principal already held.
    SamePrincipal,
    /// The same kind and principal was processed within the window.
    Replay,
}

/// Verdict for one session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    Process,
    Ignore(IgnoreReason),
}

impl EventDecision {
    #[must_use]
    pub fn should_process(&self) -> bool {
        matches!(self, Self::Process)
    }
}

type EventKey = (SessionEventKind, Option<PrincipalId>);

/// Tracks when each (kind, principal) pair was last processed.
#[derive(Debug)]
pub struct EventDeduplicator {
    window: Duration,
    clock: Arc<dyn Clock>,
    last_processed: HashMap<EventKey, DateTime<Utc>>,
}

impl EventDeduplicator {
    #[must_use]
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            last_processed: HashMap::new(),
        }
    }

    /// Decides whether `event` should be processed, given the principal
    /// currently held. A processed event is recorded.
    pub fn evaluate(
        &mut self,
        event: &SessionEvent,
        current: Option<&PrincipalId>,
    ) -> EventDecision {
        if !event.kind.changes_identity() {
            return EventDecision::Ignore(IgnoreReason::NoStateChange);
        }

        let principal = event.principal_id();
        if event.kind == SessionEventKind::SignedIn && principal.is_some() && principal == current
        {
            return EventDecision::Ignore(IgnoreReason::SamePrincipal);
        }

        let now = self.clock.now();
        let key = (event.kind, principal.cloned());
        let replay = self
            .last_processed
            .get(&key)
            .is_some_and(|last| now - *last < self.window);
        if replay {
            return EventDecision::Ignore(IgnoreReason::Replay);
        }

        // An opposite transition ends the replay window of the previous one.
        let opposite = match event.kind {
            SessionEventKind::SignedIn => SessionEventKind::SignedOut,
            _ => SessionEventKind::SignedIn,
        };
        self.last_processed.retain(|(kind, _), _| *kind != opposite);
        self.last_processed.insert(key, now);
        EventDecision::Process
    }
}
