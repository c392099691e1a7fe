//! Charisma Engine demo runner
//!
//! Loads a project (or builds a small sample one), enters the main menu,
//! plays a few timed turns at a fixed step and logs the resulting context
//! fingerprint.
//!
//! Usage: `charisma-engine [--verbose] [--config engine.json] [project.json]`

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use charisma::{
    logging::init_logging,
    game::{MapTile, Player, Terrain, Unit, Faction},
    EngineConfig, FrameClock, GameContext, MainMenuState, ProjectData, StateMachine, TurnState,
    VERSION,
};

/// Turns played when the config does not cap them.
const DEMO_TURNS: u32 = 3;

/// Simulated seconds after which the demo gives up.
const DEMO_TIME_LIMIT_SECONDS: u32 = 60;

/// Charisma Engine demo runner
#[derive(Debug, Parser)]
#[command(name = "charisma-engine", version, about)]
struct DemoArgs {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project file (JSON); a sample project is built when omitted
    project: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = DemoArgs::parse();
    init_logging(args.verbose)?;

    info!("Charisma Engine v{}", VERSION);

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if config.max_turns.is_none() {
        config.max_turns = Some(DEMO_TURNS);
    }
    info!(tick_rate = config.tick_rate, integrity = ?config.integrity, "configuration");

    let context = match &args.project {
        Some(path) => ProjectData::load(path)?.into_context(config.integrity)?,
        None => sample_context(&config)?,
    };

    for violation in context.validate() {
        warn!(?violation, "dangling reference");
    }

    run_demo(context, &config)
}

/// Build a two-faction skirmish on a small map.
fn sample_context(config: &EngineConfig) -> Result<GameContext> {
    let mut project = ProjectData::new();
    project.factions.push(Faction::new("crown", "The Crown").with_units(["knight", "archer"]));
    project.factions.push(Faction::new("horde", "The Horde").with_units(["raider"]));
    project.add_unit(Unit::new("knight", "Knight", "crown").with_abilities(["charge"]))?;
    project.add_unit(Unit::new("archer", "Archer", "crown").with_abilities(["volley"]))?;
    project.add_unit(Unit::new("raider", "Raider", "horde"))?;

    let mut context = project.into_context(config.integrity)?;
    context.add_player(Player::human("p1", "Player", "crown"))?;
    context.add_player(Player::ai("p2", "Computer", "horde"))?;

    let tiles = (0..4)
        .flat_map(|y| (0..4).map(move |x| (x, y)))
        .map(|(x, y)| {
            let terrain = match (x + y) % 5 {
                3 => Terrain::Forest,
                4 => Terrain::Hills,
                _ => Terrain::Plains,
            };
            MapTile::new(x, y, terrain)
        })
        .collect();
    context.set_tiles(tiles);
    context.place_unit(0, 0, "knight")?;
    context.place_unit(1, 0, "archer")?;
    context.place_unit(3, 3, "raider")?;

    Ok(context)
}

/// Menu -> turn loop -> back to menu, at a fixed step.
fn run_demo(context: GameContext, config: &EngineConfig) -> Result<()> {
    info!("=== Starting Demo Session ===");
    info!("Initial Context Hash: {}", hex::encode(context.compute_hash()));

    let clock = FrameClock::new(config.tick_rate, config.max_delta_seconds);
    let delta = clock.fixed_delta();

    let mut machine = StateMachine::new(context);
    machine.change_state(MainMenuState::boxed())?;
    machine.tick(delta)?;
    machine.change_state(Box::new(TurnState::from_config(config)?))?;

    let max_ticks = u64::from(config.tick_rate) * u64::from(DEMO_TIME_LIMIT_SECONDS);
    let mut returned_to_menu = false;

    while machine.tick_count() < max_ticks {
        let result = machine.tick(delta)?;
        if result.transitioned && machine.current_state_name() == Some("MainMenu") {
            returned_to_menu = true;
            break;
        }
    }

    info!("=== Session Results ===");
    info!(
        "Ticks: {} ({:.2} simulated seconds), transitions: {}",
        machine.tick_count(),
        machine.elapsed(),
        machine.transition_count()
    );
    info!("Final Turn: {}", machine.context().current_turn());
    info!("Final Context Hash: {}", hex::encode(machine.context().compute_hash()));

    if !returned_to_menu {
        warn!("turn loop did not hand control back within {} seconds", DEMO_TIME_LIMIT_SECONDS);
    }

    Ok(())
}
