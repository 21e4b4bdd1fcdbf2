//! Fixture, match and lineup reconciliation core for amateur sports clubs.
//!
//! A [`Fixture`](types::Fixture) is a scheduled meeting of one or two rosters,
//! either an internal scrimmage split into ad-hoc sides or a friendly between
//! two rosters. The crate keeps a fixture's derived status in step with its
//! matches and lineups: balanced side assignment for scrimmages, roster
//! mirroring for friendlies, and a status reconciler that runs inside the same
//! unit of work as every mutation.
//!
//! The operation surface is [`service::MatchService`]; the hosting application
//! seeds fixtures and attendance through [`store::FixtureStore`] and installs
//! a [`service::ChangeNotifier`] for cache invalidation.

pub mod balance;
pub mod error;
pub mod service;
pub mod status;
pub mod store;
pub mod types;

pub use error::{ActionResult, OpError};
pub use service::{ChangeNotifier, LogNotifier, MatchService};
pub use store::FixtureStore;
pub use types::{
    Attendance, AttendanceState, Fixture, FixtureId, FixtureKind, FixtureStatus, Lineup, LineupId,
    Match, MatchId, PersonId, RosterId, SharedStore, Side,
};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with stderr output. Intended for binaries and demos
/// embedding this crate; hosts with their own subscriber should skip it.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
