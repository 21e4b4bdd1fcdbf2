//! Pure lineup arithmetic: side tallies, the filler pool, and the planning
//! halves of the two assignment strategies. Nothing in here touches the
//! store; the service applies the returned plans inside its unit of work.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Attendance, Lineup, LineupId, PersonId, RosterId, Side};

/// Per-side member counts for one match, derived from live lineup rows.
/// `Undecided` rows count toward neither side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideTally {
    pub side_a: u32,
    pub side_b: u32,
    pub is_lined_up: bool,
}

/// A match is fully lined up once both playable sides have at least one member.
pub fn compute_side_status(rows: &[&Lineup]) -> SideTally {
    let mut side_a = 0;
    let mut side_b = 0;
    for row in rows {
        match row.side {
            Side::A => side_a += 1,
            Side::B => side_b += 1,
            Side::Undecided => {}
        }
    }
    SideTally {
        side_a,
        side_b,
        is_lined_up: side_a >= 1 && side_b >= 1,
    }
}

/// Fillers not yet committed to a side. Never negative, even when the
/// committed counts exceed the fixture quota.
pub fn compute_undecided_fillers(quota: u32, side_a_fillers: u32, side_b_fillers: u32) -> u32 {
    quota.saturating_sub(side_a_fillers.saturating_add(side_b_fillers))
}

/// Balanced strategy planning: each eligible person, in the given order, goes
/// to the side with fewer current members; exact tie goes to side A. Running
/// counters are updated per assignment so a batch of N spreads evenly.
pub fn plan_balanced(eligible: &[PersonId], current: SideTally) -> Vec<(PersonId, Side)> {
    let mut side_a = current.side_a;
    let mut side_b = current.side_b;
    let mut assignments = Vec::with_capacity(eligible.len());
    for &person_id in eligible {
        if side_b < side_a {
            assignments.push((person_id, Side::B));
            side_b += 1;
        } else {
            assignments.push((person_id, Side::A));
            side_a += 1;
        }
    }
    assignments
}

/// Which part of the lineup a mirror pass reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorScope {
    Full,
    /// One side only; the other side's rows are left alone.
    SideOnly(Side),
}

/// Minimal edit set that brings the lineup in line with attendance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorPlan {
    /// New rows to create, in attendance order.
    pub insert: Vec<(PersonId, Side)>,
    /// Existing rows whose side must change.
    pub relocate: Vec<(LineupId, Side)>,
    /// Rows with no backing attendee (within scope).
    pub delete: Vec<LineupId>,
}

impl MirrorPlan {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.relocate.is_empty() && self.delete.is_empty()
    }
}

/// Mirror strategy planning: the desired lineup is the image of the attending
/// set under roster→side (roster A → side A, roster B → side B; attendees
/// affiliated with neither roster produce no row). Expressed as a diff against
/// the actual rows rather than delete-all-recreate, so applying it twice in a
/// row yields an empty second plan.
///
/// A scoped pass restricts both the desired set and the deletions to one
/// side. A desired person already holding a row on the opposite side is
/// relocated rather than duplicated: one row per person per match.
pub fn plan_mirror(
    attendance: &[Attendance],
    roster_a: RosterId,
    roster_b: Option<RosterId>,
    rows: &[&Lineup],
    scope: MirrorScope,
) -> MirrorPlan {
    let mut desired: Vec<(PersonId, Side)> = Vec::new();
    for att in attendance.iter().filter(|a| a.is_attending()) {
        let side = match att.roster_id {
            Some(r) if r == roster_a => Side::A,
            Some(r) if Some(r) == roster_b => Side::B,
            _ => continue,
        };
        let in_scope = match scope {
            MirrorScope::Full => true,
            MirrorScope::SideOnly(s) => side == s,
        };
        if in_scope {
            desired.push((att.person_id, side));
        }
    }

    let by_person: HashMap<PersonId, &Lineup> =
        rows.iter().map(|row| (row.person_id, *row)).collect();

    let mut plan = MirrorPlan::default();
    for &(person_id, side) in &desired {
        match by_person.get(&person_id) {
            Some(row) if row.side == side => {}
            Some(row) => plan.relocate.push((row.id, side)),
            None => plan.insert.push((person_id, side)),
        }
    }

    let desired_persons: HashMap<PersonId, Side> = desired.iter().copied().collect();
    for row in rows {
        let in_scope = match scope {
            MirrorScope::Full => true,
            MirrorScope::SideOnly(s) => row.side == s,
        };
        if in_scope && !desired_persons.contains_key(&row.person_id) {
            plan.delete.push(row.id);
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceState;

    fn row(id: LineupId, person_id: PersonId, side: Side) -> Lineup {
        Lineup {
            id,
            match_id: 1,
            person_id,
            side,
        }
    }

    fn attending(person_id: PersonId, roster_id: RosterId) -> Attendance {
        Attendance {
            person_id,
            state: AttendanceState::Attending,
            roster_id: Some(roster_id),
        }
    }

    #[test]
    fn test_side_status_requires_both_sides() {
        let rows = [row(1, 100, Side::A), row(2, 101, Side::Undecided)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        let tally = compute_side_status(&refs);
        assert_eq!(tally.side_a, 1);
        assert_eq!(tally.side_b, 0);
        assert!(!tally.is_lined_up);

        let rows = [row(1, 100, Side::A), row(2, 101, Side::B)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        assert!(compute_side_status(&refs).is_lined_up);
    }

    #[test]
    fn test_undecided_fillers_never_negative() {
        assert_eq!(compute_undecided_fillers(4, 1, 1), 2);
        assert_eq!(compute_undecided_fillers(4, 3, 3), 0);
        assert_eq!(compute_undecided_fillers(0, 0, 0), 0);
        assert_eq!(compute_undecided_fillers(2, u32::MAX, 1), 0);
    }

    #[test]
    fn test_balanced_tie_goes_to_side_a() {
        let assignments = plan_balanced(
            &[100],
            SideTally {
                side_a: 2,
                side_b: 2,
                is_lined_up: true,
            },
        );
        assert_eq!(assignments, vec![(100, Side::A)]);
    }

    #[test]
    fn test_balanced_spreads_batches_evenly() {
        // Spread check for every batch size up to a full squad.
        for n in 0..22u64 {
            let people: Vec<PersonId> = (1..=n).collect();
            let assignments = plan_balanced(
                &people,
                SideTally {
                    side_a: 0,
                    side_b: 0,
                    is_lined_up: false,
                },
            );
            let a = assignments.iter().filter(|(_, s)| *s == Side::A).count() as i64;
            let b = assignments.iter().filter(|(_, s)| *s == Side::B).count() as i64;
            assert!((a - b).abs() <= 1, "n={n}: a={a} b={b}");
        }
    }

    #[test]
    fn test_balanced_tops_up_smaller_side_first() {
        let assignments = plan_balanced(
            &[100, 101, 102],
            SideTally {
                side_a: 3,
                side_b: 1,
                is_lined_up: true,
            },
        );
        // B catches up before the tie-break returns to A.
        assert_eq!(
            assignments,
            vec![(100, Side::B), (101, Side::B), (102, Side::A)]
        );
    }

    #[test]
    fn test_mirror_plan_from_empty_lineup() {
        let attendance = vec![attending(1, 10), attending(2, 10), attending(3, 20)];
        let plan = plan_mirror(&attendance, 10, Some(20), &[], MirrorScope::Full);
        assert_eq!(
            plan.insert,
            vec![(1, Side::A), (2, Side::A), (3, Side::B)]
        );
        assert!(plan.relocate.is_empty());
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_mirror_plan_is_idempotent() {
        let attendance = vec![attending(1, 10), attending(2, 20)];
        let rows = [row(1, 1, Side::A), row(2, 2, Side::B)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        let plan = plan_mirror(&attendance, 10, Some(20), &refs, MirrorScope::Full);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_mirror_drops_departed_attendees_and_skips_unaffiliated() {
        let mut attendance = vec![attending(1, 10)];
        attendance.push(Attendance {
            person_id: 9,
            state: AttendanceState::Attending,
            roster_id: Some(99), // neither roster
        });
        attendance.push(Attendance {
            person_id: 2,
            state: AttendanceState::Declined,
            roster_id: Some(20),
        });
        let rows = [row(1, 1, Side::A), row(2, 2, Side::B)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        let plan = plan_mirror(&attendance, 10, Some(20), &refs, MirrorScope::Full);
        assert!(plan.insert.is_empty());
        assert_eq!(plan.delete, vec![2]);
    }

    #[test]
    fn test_partial_mirror_leaves_other_side_alone() {
        // Side B has a row that no longer matches attendance; a side-A pass
        // must not touch it.
        let attendance = vec![attending(1, 10), attending(2, 10)];
        let rows = [row(1, 1, Side::A), row(2, 5, Side::B)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        let plan = plan_mirror(
            &attendance,
            10,
            Some(20),
            &refs,
            MirrorScope::SideOnly(Side::A),
        );
        assert_eq!(plan.insert, vec![(2, Side::A)]);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_mirror_relocates_cross_side_row() {
        // Person 1 was manually moved to side B; mirroring puts them back on
        // side A by relocating the existing row, never duplicating it.
        let attendance = vec![attending(1, 10)];
        let rows = [row(7, 1, Side::B)];
        let refs: Vec<&Lineup> = rows.iter().collect();
        let plan = plan_mirror(&attendance, 10, Some(20), &refs, MirrorScope::Full);
        assert_eq!(plan.relocate, vec![(7, Side::A)]);
        assert!(plan.insert.is_empty());
    }
}
