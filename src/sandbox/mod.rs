//! Headless stand-in for the host world
//!
//! Used by the tests, the benches and the scenario runner. It is a test
//! double, not a production pathfinder.

pub mod grid;
#[cfg(test)]
pub(crate) mod harness;
pub mod world;

pub use grid::FloorGrid;
pub use world::{SandboxAgent, SandboxWorld};
