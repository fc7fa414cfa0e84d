//! Headless scenario runner
//!
//! Drops one crew bot into a sandbox facility, runs the decision engine for
//! a fixed stretch of simulated time and prints a JSON summary of what it
//! did.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use glam::Vec3;
use serde::Serialize;

use crew_autopilot::agent::{Agent, AiTicker, StateMachineContext};
use crew_autopilot::combat::WeaponKind;
use crew_autopilot::core::config::{load_config, AgentConfig};
use crew_autopilot::core::error::Result;
use crew_autopilot::core::types::EntityId;
use crew_autopilot::providers::{ItemKind, PerceptionProvider};
use crew_autopilot::sandbox::SandboxWorld;
use crew_autopilot::threat::{load_threat_tuning, ThreatRegistry, ThreatTuning};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scenario {
    /// Open floor with scattered scrap
    Scavenge,
    /// Scrap behind a crawler; a hiding wall nearby
    Ambush,
    /// Armed bot meets a hound
    Standoff,
    /// A player walks the floor and asks to be followed
    Escort,
}

/// Crew bot scenario runner
#[derive(Parser, Debug)]
#[command(name = "crew_autopilot")]
#[command(about = "Run a crew bot through a sandbox scenario and print a JSON summary")]
struct Args {
    #[arg(long, value_enum, default_value = "scavenge")]
    scenario: Scenario,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Frame time fed to the AI ticker (seconds)
    #[arg(long, default_value_t = 1.0 / 30.0)]
    frame: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Agent tuning TOML (defaults built in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threat tuning TOML (defaults built in)
    #[arg(long)]
    threats: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary {
    scenario: String,
    seed: u64,
    ai_ticks: u64,
    final_state: String,
    states_visited: Vec<String>,
    transmissions: Vec<String>,
    voice_lines: usize,
    position: [f32; 3],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        tracing::error!(%err, "run failed");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };
    let tuning = match &args.threats {
        Some(path) => load_threat_tuning(path)?,
        None => ThreatTuning::default(),
    };
    let registry = Arc::new(ThreatRegistry::from_tuning(&tuning));
    let config = Arc::new(config);

    let agent_id = EntityId::new();
    let home = Vec3::new(2.5, 0.0, 2.5);
    let mut world = build_world(args.scenario, agent_id, home);
    let mut bot = StateMachineContext::new(Agent::new(agent_id, "crew-1", home), registry, config.clone(), seed);

    tracing::info!(scenario = ?args.scenario, seed, seconds = args.seconds, "scenario starting");
    bot.start_round(&mut world);

    let mut ticker = AiTicker::new(config.ai_interval_secs);
    let mut visited = vec![bot.state_kind()];
    let frames = (args.seconds / args.frame.max(1e-3)).ceil() as u64;
    for frame in 0..frames {
        world.step(args.frame);
        if let (Scenario::Escort, 30) = (args.scenario, frame) {
            if let Some(player) = world.players().first().map(|p| p.id) {
                bot.chat_received(&mut world, "follow me", player);
            }
        }
        for _ in 0..ticker.advance(args.frame) {
            bot.tick(&mut world);
            if visited.last() != Some(&bot.state_kind()) {
                visited.push(bot.state_kind());
            }
        }
    }
    bot.end_round(&mut world);

    let position = world.agent_body(agent_id).map_or(home, |b| b.position);
    let summary = RunSummary {
        scenario: format!("{:?}", args.scenario),
        seed,
        ai_ticks: bot.clock().tick,
        final_state: format!("{:?}", visited.last().copied().unwrap_or(bot.state_kind())),
        states_visited: visited.iter().map(|k| format!("{:?}", k)).collect(),
        transmissions: world.transmissions.iter().map(|(_, text)| text.clone()).collect(),
        voice_lines: world.voices.len(),
        position: position.to_array(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn build_world(scenario: Scenario, agent: EntityId, home: Vec3) -> SandboxWorld {
    let mut world = SandboxWorld::open(40, 40);
    world.add_agent(agent, home);
    match scenario {
        Scenario::Scavenge => {
            world.add_loose_item(ItemKind::Scrap, 60, Vec3::new(12.5, 0.0, 8.5));
            world.add_loose_item(ItemKind::Scrap, 90, Vec3::new(20.5, 0.0, 18.5));
            world.add_loose_item(ItemKind::Scrap, 40, Vec3::new(8.5, 0.0, 24.5));
        }
        Scenario::Ambush => {
            world.block_rect(14, 4, 15, 20);
            world.add_loose_item(ItemKind::Scrap, 120, Vec3::new(10.5, 0.0, 10.5));
            world.add_enemy("crawler", Vec3::new(22.5, 0.0, 12.5));
        }
        Scenario::Standoff => {
            world.give_weapon(agent, WeaponKind::Shotgun, 2, 4);
            world.add_enemy("hound", Vec3::new(8.5, 0.0, 6.5));
        }
        Scenario::Escort => {
            world.add_player("ana", Vec3::new(10.5, 0.0, 10.5));
        }
    }
    // After the walls, so no node lands inside one
    world.scatter_nav_nodes(4);
    world
}
