use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::store::FixtureStore;

// ── Constants ──────────────────────────────────────────────────────────

/// Upper bound on matches per fixture; create/duplicate beyond this is rejected.
pub const MAX_MATCHES_PER_FIXTURE: usize = 16;

// ── Id aliases ─────────────────────────────────────────────────────────

pub type FixtureId = u64;
pub type MatchId = u64;
pub type LineupId = u64;
pub type PersonId = u64;
pub type RosterId = u64;

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedStore = Arc<Mutex<FixtureStore>>;

// ── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureKind {
    Internal,
    External,
}

/// Fixture status. `Pending`, `Rejected` and `Deleted` are owned by the
/// invitation/cancellation flows and are never written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureStatus {
    Pending,
    Rejected,
    Deleted,
    Confirmed,
    Ready,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "SIDE_A")]
    A,
    #[serde(rename = "SIDE_B")]
    B,
    #[serde(rename = "UNDECIDED")]
    Undecided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceState {
    Attending,
    Declined,
    Unknown,
}

// ── Domain records ─────────────────────────────────────────────────────

/// A scheduled meeting of one or two rosters, holding zero or more matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: FixtureId,
    pub kind: FixtureKind,
    pub status: FixtureStatus,
    pub roster_a_id: RosterId,
    /// None for internal scrimmages.
    pub roster_b_id: Option<RosterId>,
    /// How many unregistered guests roster A expects to use.
    pub filler_quota: u32,
    pub scheduled_at: DateTime<Utc>,
    /// RSVPs in insertion order. Balanced assignment iterates this order,
    /// which is the deterministic "who gets assigned first" contract.
    pub attendance: Vec<Attendance>,
}

/// One played game within a fixture. `is_lined_up` and `undecided_fillers`
/// are materialized values, recomputed inside the same unit of work as any
/// mutation that can change them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub fixture_id: FixtureId,
    pub is_lined_up: bool,
    pub side_a_fillers: u32,
    pub side_b_fillers: u32,
    pub undecided_fillers: u32,
    /// Roster pairing denormalized from the fixture at creation time, so a
    /// duplicated match keeps its pairing even if the fixture changes later.
    pub roster_a_id: Option<RosterId>,
    pub roster_b_id: Option<RosterId>,
    pub created_by_id: PersonId,
    pub created_at: DateTime<Utc>,
}

/// One attendee's side assignment within one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub id: LineupId,
    pub match_id: MatchId,
    pub person_id: PersonId,
    pub side: Side,
}

/// A person's RSVP for a fixture. Owned by the attendance flows; this crate
/// only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub person_id: PersonId,
    pub state: AttendanceState,
    /// Which roster the person represents (relevant for external fixtures).
    pub roster_id: Option<RosterId>,
}

impl Attendance {
    pub fn is_attending(&self) -> bool {
        self.state == AttendanceState::Attending
    }
}
