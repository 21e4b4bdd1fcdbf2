//! Match lifecycle operations: the public operation surface of the crate.
//!
//! Every operation locks the shared store once, runs as one atomic unit of
//! work ([`FixtureStore::run_atomic`]), ends with the fixture status
//! reconciler, and returns a structured [`ActionResult`]. After a successful
//! commit a change signal (`fixture/{id}/match/{id}`) is handed to the
//! [`ChangeNotifier`] so the hosting application can invalidate caches.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::balance::{
    compute_side_status, compute_undecided_fillers, plan_balanced, plan_mirror, MirrorScope,
    SideTally,
};
use crate::error::{ActionResult, OpError};
use crate::status::reconcile_fixture_status;
use crate::store::FixtureStore;
use crate::types::{
    FixtureId, FixtureKind, Lineup, LineupId, Match, MatchId, PersonId, SharedStore, Side,
    MAX_MATCHES_PER_FIXTURE,
};

// ── Change signals ─────────────────────────────────────────────────────

/// Receives a path identifying what changed, after the change committed.
/// The core never performs invalidation itself.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, path: &str);
}

/// Default notifier: logs the change path at debug level.
pub struct LogNotifier;

impl ChangeNotifier for LogNotifier {
    fn notify(&self, path: &str) {
        debug!(path, "change signal");
    }
}

fn change_path(fixture_id: FixtureId, match_id: Option<MatchId>) -> String {
    match match_id {
        Some(match_id) => format!("fixture/{fixture_id}/match/{match_id}"),
        None => format!("fixture/{fixture_id}"),
    }
}

// ── Operation reports ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRemoval {
    pub match_id: MatchId,
    pub removed_lineups: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancedFillReport {
    pub match_id: MatchId,
    pub added: u32,
    pub side_a: u32,
    pub side_b: u32,
    pub is_lined_up: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub match_id: MatchId,
    pub lineup_count: u32,
    pub side_a: u32,
    pub side_b: u32,
    pub is_lined_up: bool,
}

/// Post-change side counts after a single lineup row was moved or removed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupChange {
    pub match_id: MatchId,
    pub side_a: u32,
    pub side_b: u32,
    pub is_lined_up: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupResetReport {
    pub match_id: MatchId,
    pub rows_reset: u32,
}

// ── Service ────────────────────────────────────────────────────────────

struct Commit<T> {
    data: T,
    message: Option<String>,
    path: String,
}

pub struct MatchService {
    store: SharedStore,
    notifier: Arc<dyn ChangeNotifier>,
}

impl MatchService {
    pub fn new(store: SharedStore) -> Self {
        MatchService {
            store,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(store: SharedStore, notifier: Arc<dyn ChangeNotifier>) -> Self {
        MatchService { store, notifier }
    }

    /// Lock the store, run one atomic unit of work, translate the outcome.
    fn execute<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut FixtureStore) -> Result<Commit<T>, OpError>,
    ) -> ActionResult<T> {
        let mut guard = match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!(op, error = %poisoned, "store lock poisoned");
                return ActionResult::fail(&OpError::Storage(poisoned.to_string()));
            }
        };
        match guard.run_atomic(f) {
            Ok(commit) => {
                drop(guard);
                self.notifier.notify(&commit.path);
                match commit.message {
                    Some(message) => ActionResult::ok_with_message(commit.data, message),
                    None => ActionResult::ok(commit.data),
                }
            }
            Err(err) => {
                match &err {
                    OpError::Storage(detail) => {
                        error!(op, detail = %detail, "operation aborted, store rolled back")
                    }
                    other => debug!(op, error = %other, "operation rejected"),
                }
                ActionResult::fail(&err)
            }
        }
    }

    // ── Match lifecycle ────────────────────────────────────────────────

    /// Insert a match with zero lineups under the fixture. An empty-lineup
    /// match still flips a `CONFIRMED` fixture to `READY`.
    pub fn create_match(&self, fixture_id: FixtureId, created_by: PersonId) -> ActionResult<Match> {
        self.execute("create_match", move |store| {
            let fixture = store.require_fixture(fixture_id)?.clone();
            if store.match_count_of_fixture(fixture_id) >= MAX_MATCHES_PER_FIXTURE {
                return Err(OpError::LimitReached {
                    fixture_id,
                    limit: MAX_MATCHES_PER_FIXTURE,
                });
            }
            let id = store.alloc_match_id();
            let m = Match {
                id,
                fixture_id,
                is_lined_up: false,
                side_a_fillers: 0,
                side_b_fillers: 0,
                undecided_fillers: fixture.filler_quota,
                roster_a_id: Some(fixture.roster_a_id),
                roster_b_id: fixture.roster_b_id,
                created_by_id: created_by,
                created_at: Utc::now(),
            };
            store.insert_match(m.clone());
            reconcile_fixture_status(store, fixture_id)?;
            info!(fixture_id, match_id = id, "match created");
            Ok(Commit {
                data: m,
                message: None,
                path: change_path(fixture_id, Some(id)),
            })
        })
    }

    /// Delete a match and every lineup row it owns.
    pub fn delete_match(&self, match_id: MatchId) -> ActionResult<MatchRemoval> {
        self.execute("delete_match", move |store| {
            let fixture_id = store.require_match(match_id)?.fixture_id;
            let removed = store
                .delete_match(match_id)
                .ok_or(OpError::not_found("match", match_id))?;
            reconcile_fixture_status(store, fixture_id)?;
            info!(fixture_id, match_id, removed, "match deleted");
            Ok(Commit {
                data: MatchRemoval {
                    match_id,
                    removed_lineups: removed as u32,
                },
                message: None,
                path: change_path(fixture_id, Some(match_id)),
            })
        })
    }

    /// Duplicate a match within an internal fixture.
    pub fn duplicate_internal_match(
        &self,
        match_id: MatchId,
        created_by: PersonId,
    ) -> ActionResult<Match> {
        self.duplicate_match(
            "duplicate_internal_match",
            match_id,
            created_by,
            FixtureKind::Internal,
        )
    }

    /// Duplicate a match within an external fixture.
    pub fn duplicate_external_match(
        &self,
        match_id: MatchId,
        created_by: PersonId,
    ) -> ActionResult<Match> {
        self.duplicate_match(
            "duplicate_external_match",
            match_id,
            created_by,
            FixtureKind::External,
        )
    }

    fn duplicate_match(
        &self,
        op: &'static str,
        match_id: MatchId,
        created_by: PersonId,
        expected: FixtureKind,
    ) -> ActionResult<Match> {
        self.execute(op, move |store| {
            let source = store.require_match(match_id)?.clone();
            let fixture = store.require_fixture(source.fixture_id)?.clone();
            if fixture.kind != expected {
                return Err(OpError::WrongKind {
                    expected: kind_name(expected),
                });
            }
            if store.match_count_of_fixture(fixture.id) >= MAX_MATCHES_PER_FIXTURE {
                return Err(OpError::LimitReached {
                    fixture_id: fixture.id,
                    limit: MAX_MATCHES_PER_FIXTURE,
                });
            }
            let id = store.alloc_match_id();
            store.insert_match(Match {
                id,
                fixture_id: fixture.id,
                is_lined_up: source.is_lined_up,
                side_a_fillers: source.side_a_fillers,
                side_b_fillers: source.side_b_fillers,
                undecided_fillers: source.undecided_fillers,
                roster_a_id: source.roster_a_id,
                roster_b_id: source.roster_b_id,
                created_by_id: created_by,
                created_at: Utc::now(),
            });
            let source_rows: Vec<Lineup> = store
                .lineups_of_match(match_id)
                .into_iter()
                .cloned()
                .collect();
            for row in source_rows {
                let lineup_id = store.alloc_lineup_id();
                store.insert_lineup(Lineup {
                    id: lineup_id,
                    match_id: id,
                    person_id: row.person_id,
                    side: row.side,
                });
            }
            refresh_lined_up(store, id)?;
            reconcile_fixture_status(store, fixture.id)?;
            info!(fixture_id = fixture.id, source = match_id, match_id = id, "match duplicated");
            Ok(Commit {
                data: store.require_match(id)?.clone(),
                message: None,
                path: change_path(fixture.id, Some(id)),
            })
        })
    }

    // ── Assignment strategies ──────────────────────────────────────────

    /// Balanced auto-fill for internal scrimmages: every attending person not
    /// yet in the lineup joins the smaller side, and the undecided filler
    /// pool is refreshed from the fixture quota. With nothing to add and an
    /// unchanged pool this is a structured success, not an error.
    pub fn apply_balanced_fill(&self, match_id: MatchId) -> ActionResult<BalancedFillReport> {
        self.execute("apply_balanced_fill", move |store| {
            let m = store.require_match(match_id)?.clone();
            let fixture = store.require_fixture(m.fixture_id)?.clone();
            if fixture.kind != FixtureKind::Internal {
                return Err(OpError::WrongKind {
                    expected: kind_name(FixtureKind::Internal),
                });
            }

            let rows = store.lineups_of_match(match_id);
            let already: HashSet<PersonId> = rows.iter().map(|r| r.person_id).collect();
            let tally = compute_side_status(&rows);
            let eligible: Vec<PersonId> = fixture
                .attendance
                .iter()
                .filter(|a| a.is_attending() && !already.contains(&a.person_id))
                .map(|a| a.person_id)
                .collect();

            let assignments = plan_balanced(&eligible, tally);
            let new_undecided =
                compute_undecided_fillers(fixture.filler_quota, m.side_a_fillers, m.side_b_fillers);

            if assignments.is_empty() && new_undecided == m.undecided_fillers {
                return Ok(Commit {
                    data: BalancedFillReport {
                        match_id,
                        added: 0,
                        side_a: tally.side_a,
                        side_b: tally.side_b,
                        is_lined_up: tally.is_lined_up,
                    },
                    message: Some("nothing to add".to_string()),
                    path: change_path(fixture.id, Some(match_id)),
                });
            }

            for &(person_id, side) in &assignments {
                let lineup_id = store.alloc_lineup_id();
                store.insert_lineup(Lineup {
                    id: lineup_id,
                    match_id,
                    person_id,
                    side,
                });
            }
            store.require_match_mut(match_id)?.undecided_fillers = new_undecided;
            let tally = refresh_lined_up(store, match_id)?;
            reconcile_fixture_status(store, fixture.id)?;
            info!(
                fixture_id = fixture.id,
                match_id,
                added = assignments.len(),
                "balanced auto-fill applied"
            );
            Ok(Commit {
                data: BalancedFillReport {
                    match_id,
                    added: assignments.len() as u32,
                    side_a: tally.side_a,
                    side_b: tally.side_b,
                    is_lined_up: tally.is_lined_up,
                },
                message: None,
                path: change_path(fixture.id, Some(match_id)),
            })
        })
    }

    /// Mirror the full attendance of an external fixture into the lineup.
    pub fn apply_full_mirror(&self, match_id: MatchId) -> ActionResult<MirrorReport> {
        self.apply_mirror("apply_full_mirror", match_id, MirrorScope::Full)
    }

    /// Mirror one side only; the other side's rows stay as they are.
    pub fn apply_partial_mirror(&self, match_id: MatchId, side: Side) -> ActionResult<MirrorReport> {
        if side == Side::Undecided {
            return ActionResult::fail(&OpError::InvalidSide);
        }
        self.apply_mirror("apply_partial_mirror", match_id, MirrorScope::SideOnly(side))
    }

    fn apply_mirror(
        &self,
        op: &'static str,
        match_id: MatchId,
        scope: MirrorScope,
    ) -> ActionResult<MirrorReport> {
        self.execute(op, move |store| {
            let m = store.require_match(match_id)?.clone();
            let fixture = store.require_fixture(m.fixture_id)?.clone();
            if fixture.kind != FixtureKind::External {
                return Err(OpError::WrongKind {
                    expected: kind_name(FixtureKind::External),
                });
            }
            // The match's denormalized pairing wins over the fixture's
            // current rosters, so duplicated matches keep mirroring the
            // rosters they were created with.
            let roster_a = m.roster_a_id.unwrap_or(fixture.roster_a_id);
            let roster_b = m.roster_b_id.or(fixture.roster_b_id);

            let plan = {
                let rows = store.lineups_of_match(match_id);
                plan_mirror(&fixture.attendance, roster_a, roster_b, &rows, scope)
            };
            for lineup_id in &plan.delete {
                store.delete_lineup(*lineup_id);
            }
            for &(lineup_id, side) in &plan.relocate {
                store.require_lineup_mut(lineup_id)?.side = side;
            }
            for &(person_id, side) in &plan.insert {
                let lineup_id = store.alloc_lineup_id();
                store.insert_lineup(Lineup {
                    id: lineup_id,
                    match_id,
                    person_id,
                    side,
                });
            }

            let tally = refresh_lined_up(store, match_id)?;
            reconcile_fixture_status(store, fixture.id)?;
            let lineup_count = store.lineups_of_match(match_id).len() as u32;
            info!(
                fixture_id = fixture.id,
                match_id,
                lineup_count,
                "mirror applied"
            );
            Ok(Commit {
                data: MirrorReport {
                    match_id,
                    lineup_count,
                    side_a: tally.side_a,
                    side_b: tally.side_b,
                    is_lined_up: tally.is_lined_up,
                },
                message: None,
                path: change_path(fixture.id, Some(match_id)),
            })
        })
    }

    // ── Single-row lineup edits ────────────────────────────────────────

    /// Move one person to a side, or back to undecided.
    pub fn move_lineup(&self, lineup_id: LineupId, side: Side) -> ActionResult<LineupChange> {
        self.execute("move_lineup", move |store| {
            let match_id = store.require_lineup(lineup_id)?.match_id;
            store.require_lineup_mut(lineup_id)?.side = side;
            let tally = refresh_lined_up(store, match_id)?;
            let fixture_id = store.require_match(match_id)?.fixture_id;
            reconcile_fixture_status(store, fixture_id)?;
            debug!(fixture_id, match_id, lineup_id, ?side, "lineup row moved");
            Ok(Commit {
                data: lineup_change(match_id, tally),
                message: None,
                path: change_path(fixture_id, Some(match_id)),
            })
        })
    }

    /// Remove one person from the lineup.
    pub fn remove_lineup(&self, lineup_id: LineupId) -> ActionResult<LineupChange> {
        self.execute("remove_lineup", move |store| {
            let match_id = store.require_lineup(lineup_id)?.match_id;
            store.delete_lineup(lineup_id);
            let tally = refresh_lined_up(store, match_id)?;
            let fixture_id = store.require_match(match_id)?.fixture_id;
            reconcile_fixture_status(store, fixture_id)?;
            debug!(fixture_id, match_id, lineup_id, "lineup row removed");
            Ok(Commit {
                data: lineup_change(match_id, tally),
                message: None,
                path: change_path(fixture_id, Some(match_id)),
            })
        })
    }

    // ── Fillers ────────────────────────────────────────────────────────

    /// Set the per-side filler counts and refresh the undecided pool.
    /// Filler counts never affect `is_lined_up`, but the status reconciler
    /// still runs for consistency.
    pub fn set_filler_counts(
        &self,
        match_id: MatchId,
        side_a_fillers: u32,
        side_b_fillers: u32,
    ) -> ActionResult<Match> {
        self.execute("set_filler_counts", move |store| {
            let fixture_id = store.require_match(match_id)?.fixture_id;
            let quota = store.require_fixture(fixture_id)?.filler_quota;
            {
                let m = store.require_match_mut(match_id)?;
                m.side_a_fillers = side_a_fillers;
                m.side_b_fillers = side_b_fillers;
                m.undecided_fillers =
                    compute_undecided_fillers(quota, side_a_fillers, side_b_fillers);
            }
            reconcile_fixture_status(store, fixture_id)?;
            debug!(fixture_id, match_id, side_a_fillers, side_b_fillers, "filler counts set");
            Ok(Commit {
                data: store.require_match(match_id)?.clone(),
                message: None,
                path: change_path(fixture_id, Some(match_id)),
            })
        })
    }

    /// Put an internal scrimmage back to a blank slate: every row undecided,
    /// side fillers zeroed, the undecided pool back at the fixture quota.
    pub fn reset_lineup(&self, match_id: MatchId) -> ActionResult<LineupResetReport> {
        self.execute("reset_lineup", move |store| {
            let m = store.require_match(match_id)?.clone();
            let fixture = store.require_fixture(m.fixture_id)?.clone();
            if fixture.kind != FixtureKind::Internal {
                return Err(OpError::WrongKind {
                    expected: kind_name(FixtureKind::Internal),
                });
            }
            let row_ids: Vec<LineupId> = store
                .lineups_of_match(match_id)
                .iter()
                .map(|r| r.id)
                .collect();
            for lineup_id in &row_ids {
                store.require_lineup_mut(*lineup_id)?.side = Side::Undecided;
            }
            {
                let m = store.require_match_mut(match_id)?;
                m.side_a_fillers = 0;
                m.side_b_fillers = 0;
                m.undecided_fillers = fixture.filler_quota;
                m.is_lined_up = false;
            }
            reconcile_fixture_status(store, fixture.id)?;
            info!(
                fixture_id = fixture.id,
                match_id,
                rows = row_ids.len(),
                "lineup reset"
            );
            Ok(Commit {
                data: LineupResetReport {
                    match_id,
                    rows_reset: row_ids.len() as u32,
                },
                message: None,
                path: change_path(fixture.id, Some(match_id)),
            })
        })
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn kind_name(kind: FixtureKind) -> &'static str {
    match kind {
        FixtureKind::Internal => "internal",
        FixtureKind::External => "external",
    }
}

/// Recompute `is_lined_up` from the live rows and persist it on the match.
fn refresh_lined_up(store: &mut FixtureStore, match_id: MatchId) -> Result<SideTally, OpError> {
    let tally = compute_side_status(&store.lineups_of_match(match_id));
    store.require_match_mut(match_id)?.is_lined_up = tally.is_lined_up;
    Ok(tally)
}

fn lineup_change(match_id: MatchId, tally: SideTally) -> LineupChange {
    LineupChange {
        match_id,
        side_a: tally.side_a,
        side_b: tally.side_b,
        is_lined_up: tally.is_lined_up,
    }
}
