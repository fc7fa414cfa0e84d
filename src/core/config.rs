//! Agent configuration with documented constants
//!
//! Every tuning number the behaviour states read lives here, with an
//! explanation of what it controls and how it interacts with the others.
//! Threat distances are NOT here; they are per enemy kind and live in
//! `threat::profiles::ThreatTuning`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{AgentError, Result};

/// Configuration shared by every agent in a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // === DECISION LOOP ===
    /// Seconds between AI ticks
    ///
    /// Decisions run on this fixed interval, never per rendered frame.
    /// Sub-task waits are rounded up to whole intervals.
    pub ai_interval_secs: f32,

    // === PERCEPTION ===
    /// Field of view used when looking for enemies and players (degrees)
    pub sight_fov_degrees: f32,

    /// Maximum sight distance (world units)
    pub sight_range: f32,

    /// Enemies this close are noticed even outside the field of view
    pub proximity_awareness: f32,

    // === FOLLOWING PLAYERS ===
    /// Distance at which a pursued player counts as "in range"
    ///
    /// Must be smaller than `follow_leash` or the agent oscillates between
    /// settling and pursuing.
    pub chill_distance: f32,

    /// Distance at which a settled agent starts following again
    pub follow_leash: f32,

    /// Seconds a pursued player may stay out of sight before counting as lost
    pub lose_player_secs: f32,

    /// Seconds spent searching around a last-known position before giving up
    pub just_lost_give_up_secs: f32,

    // === SEARCHING ===
    /// Shortest stretch of sprinting or walking before the gait flips (seconds)
    pub gait_toggle_min_secs: f32,

    /// Longest stretch of sprinting or walking before the gait flips (seconds)
    pub gait_toggle_max_secs: f32,

    /// Shortest pause between random look-around glances (seconds)
    pub look_around_min_secs: f32,

    /// Longest pause between random look-around glances (seconds)
    pub look_around_max_secs: f32,

    /// How far a wander leg may go from the agent (world units)
    pub wander_radius: f32,

    /// Reach for grabbing items and using doors/chargers (world units)
    pub interact_reach: f32,

    // === PANIC ===
    /// Seconds of sustained safety before a panicking agent calms down
    ///
    /// Safety means: outside the flee radius AND line of sight to the enemy
    /// broken. Any sighting restarts the count.
    pub panic_cooldown_secs: f32,

    /// Nodes scanned per tick when the enemy is right on top of the agent
    pub flee_slice_max: usize,

    /// Nodes scanned per tick when the enemy is far (2x the radius or more)
    pub flee_slice_min: usize,

    /// Distance at which a flee destination counts as reached
    pub flee_arrive_distance: f32,

    /// Total cargo value above which a calm agent heads home instead of
    /// resuming what it was doing
    pub valuable_cargo_threshold: u32,

    // === FIGHTING ===
    /// Enemy further than this ends a fight (the enemy has left)
    pub fight_disengage_distance: f32,

    /// Seconds without seeing the engaged enemy before the fight is dropped
    pub fight_lost_sight_secs: f32,

    // === BASE ===
    /// Distance at which the base counts as reached
    pub base_arrive_distance: f32,

    /// Seconds spent idling at base before going out again
    pub chill_at_base_secs: f32,

    /// Seconds between safe-route retries while lost
    pub lost_retry_secs: f32,

    // === COMMUNICATION ===
    /// Minimum seconds between two outbound transmissions
    pub message_interval_secs: f32,

    /// Minimum seconds between two voice lines
    pub voice_cooldown_secs: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ai_interval_secs: 0.2,

            sight_fov_degrees: 120.0,
            sight_range: 40.0,
            proximity_awareness: 6.0,

            chill_distance: 6.0,
            follow_leash: 12.0,
            lose_player_secs: 3.0,
            just_lost_give_up_secs: 12.0,

            gait_toggle_min_secs: 3.0,
            gait_toggle_max_secs: 8.0,
            look_around_min_secs: 2.0,
            look_around_max_secs: 5.0,
            wander_radius: 20.0,
            interact_reach: 1.5,

            panic_cooldown_secs: 5.0,
            flee_slice_max: 48,
            flee_slice_min: 8,
            flee_arrive_distance: 1.5,
            valuable_cargo_threshold: 150,

            fight_disengage_distance: 35.0,
            fight_lost_sight_secs: 4.0,

            base_arrive_distance: 2.0,
            chill_at_base_secs: 20.0,
            lost_retry_secs: 6.0,

            message_interval_secs: 1.0,
            voice_cooldown_secs: 4.0,
        }
    }
}

impl AgentConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !self.ai_interval_secs.is_finite() || self.ai_interval_secs <= 0.0 {
            return Err(AgentError::Config(format!(
                "ai_interval_secs ({}) must be positive",
                self.ai_interval_secs
            )));
        }

        // Finite and non-negative before any ordering check
        let non_negative = [
            ("sight_fov_degrees", self.sight_fov_degrees),
            ("sight_range", self.sight_range),
            ("proximity_awareness", self.proximity_awareness),
            ("chill_distance", self.chill_distance),
            ("follow_leash", self.follow_leash),
            ("lose_player_secs", self.lose_player_secs),
            ("just_lost_give_up_secs", self.just_lost_give_up_secs),
            ("gait_toggle_min_secs", self.gait_toggle_min_secs),
            ("gait_toggle_max_secs", self.gait_toggle_max_secs),
            ("look_around_min_secs", self.look_around_min_secs),
            ("look_around_max_secs", self.look_around_max_secs),
            ("wander_radius", self.wander_radius),
            ("interact_reach", self.interact_reach),
            ("panic_cooldown_secs", self.panic_cooldown_secs),
            ("flee_arrive_distance", self.flee_arrive_distance),
            ("fight_disengage_distance", self.fight_disengage_distance),
            ("fight_lost_sight_secs", self.fight_lost_sight_secs),
            ("base_arrive_distance", self.base_arrive_distance),
            ("chill_at_base_secs", self.chill_at_base_secs),
            ("lost_retry_secs", self.lost_retry_secs),
            ("message_interval_secs", self.message_interval_secs),
            ("voice_cooldown_secs", self.voice_cooldown_secs),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(AgentError::Config(format!(
                "{} ({}) must be finite and non-negative",
                name, value
            )));
        }

        // Hysteresis between settling and following
        if self.chill_distance >= self.follow_leash {
            return Err(AgentError::Config(format!(
                "chill_distance ({}) should be < follow_leash ({})",
                self.chill_distance, self.follow_leash
            )));
        }

        if self.flee_slice_min == 0 || self.flee_slice_min > self.flee_slice_max {
            return Err(AgentError::Config(format!(
                "flee slice bounds invalid: min {} max {}",
                self.flee_slice_min, self.flee_slice_max
            )));
        }

        if self.gait_toggle_min_secs > self.gait_toggle_max_secs
            || self.look_around_min_secs > self.look_around_max_secs
        {
            return Err(AgentError::Config("min timer exceeds max timer".into()));
        }

        Ok(())
    }
}

/// Load and validate a config from a TOML file
///
/// Missing keys fall back to their defaults.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let contents = fs::read_to_string(path)?;
    let config: AgentConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
