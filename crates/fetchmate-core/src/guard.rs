//! Route guard: gates protected commands on in-memory session state.

use crate::session::{Session, SessionStore};

/// Guidance printed when a guarded action is denied.
pub const ENTRY_POINT_HINT: &str =
    "Not logged in. Run `fetchmate login` or `fetchmate signup` first.";

/// Outcome of evaluating the guard for a protected action.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// A session is present; the action may proceed.
    Authenticated(Session),
    /// No session; send the user to the unauthenticated entry point.
    RedirectToEntry,
}

/// Evaluates the guard against the store's in-memory state.
///
/// Read-only: session transitions are driven by the auth service and the
/// HTTP wrapper's 401 handling, never by the guard itself.
pub fn evaluate(store: &SessionStore) -> GuardDecision {
    match store.current() {
        Some(session) => GuardDecision::Authenticated(session),
        None => GuardDecision::RedirectToEntry,
    }
}
