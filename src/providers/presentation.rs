//! Presentation and transmission providers (fire-and-forget)

use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;

/// Advisory voice-line category; the host picks the actual clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceHint {
    Idle,
    Searching,
    FoundLoot,
    Following,
    LostPlayer,
    Scared,
    Fighting,
    ReturningHome,
    Lost,
}

pub trait PresentationProvider {
    fn play_voice(&mut self, agent: EntityId, hint: VoiceHint);

    /// Short status line shown above the agent
    fn set_status(&mut self, agent: EntityId, status: &str);
}

pub trait TransmissionProvider {
    /// Send text over the radio channel
    fn transmit(&mut self, agent: EntityId, text: &str);
}
