//! External collaborator interfaces
//!
//! The decision engine never owns the world. Movement, perception,
//! inventory, presentation and transmission are provided by the host
//! (a game engine in production, `crate::sandbox` in tests) through
//! these traits. Snapshots are plain values: holding one never keeps an
//! entity alive, so every use re-resolves by id.

pub mod inventory;
pub mod movement;
pub mod perception;
pub mod presentation;

pub use inventory::{InventoryProvider, ItemKind, ItemView, WeaponState};
pub use movement::{MovementProvider, NavNode};
pub use perception::{AgentStatus, DoorView, EnemySnapshot, PerceptionProvider, PlayerSnapshot};
pub use presentation::{PresentationProvider, TransmissionProvider, VoiceHint};

/// Everything a state may call on the host world
pub trait WorldProviders:
    MovementProvider + PerceptionProvider + InventoryProvider + PresentationProvider + TransmissionProvider
{
}

impl<T> WorldProviders for T where
    T: MovementProvider
        + PerceptionProvider
        + InventoryProvider
        + PresentationProvider
        + TransmissionProvider
{
}
