//! Fixture status state machine. The derived states (`Confirmed`, `Ready`,
//! `Play`) are a pure function of the fixture's match set; the terminal
//! states are owned by the invitation/cancellation flows and are never
//! overwritten here.

use tracing::debug;

use crate::error::OpError;
use crate::store::FixtureStore;
use crate::types::{FixtureId, FixtureStatus, Match};

/// Statuses written by external flows. This crate reads them only as a guard.
pub const TERMINAL_STATUSES: [FixtureStatus; 3] = [
    FixtureStatus::Pending,
    FixtureStatus::Rejected,
    FixtureStatus::Deleted,
];

pub fn is_terminal(status: FixtureStatus) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

/// Derive the status the fixture should carry given its matches. Returns
/// `Some(next)` only when a write is needed: terminal statuses and already
/// up-to-date values yield `None`, so repeated calls over unchanged data are
/// no-ops.
pub fn derive_status(current: FixtureStatus, matches: &[&Match]) -> Option<FixtureStatus> {
    if is_terminal(current) {
        return None;
    }
    let computed = if matches.is_empty() {
        FixtureStatus::Confirmed
    } else if matches.iter().any(|m| m.is_lined_up) {
        FixtureStatus::Play
    } else {
        FixtureStatus::Ready
    };
    (computed != current).then_some(computed)
}

/// Recompute and persist the fixture's status from its current match set.
/// Must run inside the same unit of work as the mutation that triggered it.
/// Returns the newly written status, if any.
pub fn reconcile_fixture_status(
    store: &mut FixtureStore,
    fixture_id: FixtureId,
) -> Result<Option<FixtureStatus>, OpError> {
    let current = store.require_fixture(fixture_id)?.status;
    let next = derive_status(current, &store.matches_of_fixture(fixture_id));
    if let Some(next) = next {
        store.require_fixture_mut(fixture_id)?.status = next;
        debug!(fixture_id, from = ?current, to = ?next, "fixture status reconciled");
    }
    Ok(next)
}
