use std::collections::HashMap;

use crate::error::OpError;
use crate::types::{Fixture, FixtureId, Lineup, LineupId, Match, MatchId};

/// In-memory relational store for fixtures, matches and lineup rows.
///
/// One store guards one club's fixture data; it is shared between request
/// handlers as [`crate::types::SharedStore`], so locking it gives each
/// lifecycle operation serializable isolation. Atomicity comes from
/// [`FixtureStore::run_atomic`].
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    fixtures: HashMap<FixtureId, Fixture>,
    matches: HashMap<MatchId, Match>,
    lineups: HashMap<LineupId, Lineup>,
    next_match_id: MatchId,
    next_lineup_id: LineupId,
}

impl FixtureStore {
    pub fn new() -> Self {
        FixtureStore::default()
    }

    /// Run `f` as one unit of work: either every write it performs survives,
    /// or none does. The store is checkpointed up front and restored wholesale
    /// when `f` fails, so a mid-operation error cannot leave a lineup change
    /// visible without its matching status recompute.
    pub fn run_atomic<T>(
        &mut self,
        f: impl FnOnce(&mut FixtureStore) -> Result<T, OpError>,
    ) -> Result<T, OpError> {
        let checkpoint = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                *self = checkpoint;
                Err(err)
            }
        }
    }

    // ── Fixtures ───────────────────────────────────────────────────────

    /// Insert or replace a fixture record. Used by the hosting application
    /// (scheduling forms, attendance flows) to seed fixture state.
    pub fn upsert_fixture(&mut self, fixture: Fixture) {
        self.fixtures.insert(fixture.id, fixture);
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.get(&id)
    }

    pub fn require_fixture(&self, id: FixtureId) -> Result<&Fixture, OpError> {
        self.fixtures
            .get(&id)
            .ok_or(OpError::not_found("fixture", id))
    }

    pub fn require_fixture_mut(&mut self, id: FixtureId) -> Result<&mut Fixture, OpError> {
        self.fixtures
            .get_mut(&id)
            .ok_or(OpError::not_found("fixture", id))
    }

    // ── Matches ────────────────────────────────────────────────────────

    pub fn alloc_match_id(&mut self) -> MatchId {
        self.next_match_id += 1;
        self.next_match_id
    }

    pub fn insert_match(&mut self, m: Match) {
        self.matches.insert(m.id, m);
    }

    pub fn match_row(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn require_match(&self, id: MatchId) -> Result<&Match, OpError> {
        self.matches.get(&id).ok_or(OpError::not_found("match", id))
    }

    pub fn require_match_mut(&mut self, id: MatchId) -> Result<&mut Match, OpError> {
        self.matches
            .get_mut(&id)
            .ok_or(OpError::not_found("match", id))
    }

    /// All matches of a fixture, ordered by id (creation order).
    pub fn matches_of_fixture(&self, fixture_id: FixtureId) -> Vec<&Match> {
        let mut rows: Vec<&Match> = self
            .matches
            .values()
            .filter(|m| m.fixture_id == fixture_id)
            .collect();
        rows.sort_by_key(|m| m.id);
        rows
    }

    pub fn match_count_of_fixture(&self, fixture_id: FixtureId) -> usize {
        self.matches
            .values()
            .filter(|m| m.fixture_id == fixture_id)
            .count()
    }

    /// Delete a match and cascade-delete its lineup rows. Returns the number
    /// of lineup rows removed, or `None` if the match did not exist.
    pub fn delete_match(&mut self, id: MatchId) -> Option<usize> {
        self.matches.remove(&id)?;
        let orphaned: Vec<LineupId> = self
            .lineups
            .values()
            .filter(|l| l.match_id == id)
            .map(|l| l.id)
            .collect();
        for lineup_id in &orphaned {
            self.lineups.remove(lineup_id);
        }
        Some(orphaned.len())
    }

    // ── Lineups ────────────────────────────────────────────────────────

    pub fn alloc_lineup_id(&mut self) -> LineupId {
        self.next_lineup_id += 1;
        self.next_lineup_id
    }

    pub fn insert_lineup(&mut self, lineup: Lineup) {
        self.lineups.insert(lineup.id, lineup);
    }

    pub fn lineup(&self, id: LineupId) -> Option<&Lineup> {
        self.lineups.get(&id)
    }

    pub fn require_lineup(&self, id: LineupId) -> Result<&Lineup, OpError> {
        self.lineups
            .get(&id)
            .ok_or(OpError::not_found("lineup", id))
    }

    pub fn require_lineup_mut(&mut self, id: LineupId) -> Result<&mut Lineup, OpError> {
        self.lineups
            .get_mut(&id)
            .ok_or(OpError::not_found("lineup", id))
    }

    pub fn delete_lineup(&mut self, id: LineupId) -> Option<Lineup> {
        self.lineups.remove(&id)
    }

    /// All lineup rows of a match, ordered by id (creation order).
    pub fn lineups_of_match(&self, match_id: MatchId) -> Vec<&Lineup> {
        let mut rows: Vec<&Lineup> = self
            .lineups
            .values()
            .filter(|l| l.match_id == match_id)
            .collect();
        rows.sort_by_key(|l| l.id);
        rows
    }
}
