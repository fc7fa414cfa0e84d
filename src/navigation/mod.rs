//! Retreat and route selection on top of the movement provider
//!
//! Neither module builds paths itself; both only rank and combine what
//! `MovementProvider` reports.

pub mod flee_search;
pub mod safe_route;

pub use flee_search::{FleeNodeSearch, FleeSearchTask, NodeCandidate, SearchStep};
pub use safe_route::{plan_safe_route, AvoidZone, SafeRoute};
