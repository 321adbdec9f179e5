//! Starwake sim - runs the empire AI headless over a scenario file.
//!
//! - `starwake-sim run` - play a scenario for a number of turns
//! - `starwake-sim personalities` - print the tuning of each archetype

mod scenario;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starwake_core::{
    load_settings, resolve_proposal, run_universe_turn, PersonalityModifiers, PersonalityPolicy, SettingsSource,
};
use starwake_protocol::{OfferResponse, PersonalityType};
use tracing_subscriber::{fmt, EnvFilter};

use crate::scenario::{PlayerPolicy, Scenario};
use crate::summary::Summary;

#[derive(Parser)]
#[command(name = "starwake-sim")]
#[command(about = "Headless empire AI simulator", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario
    Run {
        /// Scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Turns to play
        #[arg(short, long, default_value_t = 100)]
        turns: u32,

        /// Overrides the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Overrides how the player answers proposals
        #[arg(long, value_enum)]
        player: Option<PlayerPolicy>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show diplomatic traits and modifiers per personality
    Personalities {
        /// Settings file; the built-in tuning otherwise
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            turns,
            seed,
            player,
            json,
        } => run_scenario(scenario, turns, seed, player, json),
        Commands::Personalities { settings } => show_personalities(settings),
    }
}

fn run_scenario(path: PathBuf, turns: u32, seed: Option<u64>, player: Option<PlayerPolicy>, json: bool) -> Result<()> {
    let scenario = Scenario::load(&path)?;
    let name = scenario.name.clone();
    let policy = player.unwrap_or(scenario.player_policy);
    let mut sandbox = scenario.into_sandbox(seed)?;
    tracing::info!(scenario = %name, empires = sandbox.universe.len(), turns, "Starting simulation");

    let mut summary = Summary::new(&name);
    for _ in 0..turns {
        let turn = sandbox.turn;
        run_universe_turn(&mut sandbox.context()).with_context(|| format!("turn {turn}"))?;

        for proposal in sandbox.screen.take() {
            let response = if policy.accepts(&proposal) {
                OfferResponse::Accept
            } else {
                OfferResponse::Reject
            };
            tracing::debug!(
                turn,
                from = %proposal.from,
                dialogue = proposal.dialogue.as_deref().unwrap_or("-"),
                ?response,
                "Player answered"
            );
            summary.record_proposal(&proposal, response);
            resolve_proposal(&mut sandbox.context(), &proposal, response)
                .with_context(|| format!("resolving proposal from {} on turn {turn}", proposal.from))?;
        }
        summary.record_notifications(sandbox.notifications.entries.drain(..));
        sandbox.tick();
    }

    summary.finish(&sandbox);
    tracing::info!(turns = summary.turns_played, proposals = summary.proposals.len(), "Simulation finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }
    Ok(())
}

fn show_personalities(settings: Option<PathBuf>) -> Result<()> {
    let settings = match settings {
        Some(path) => load_settings(SettingsSource::Path(path.display().to_string()))
            .with_context(|| format!("loading settings {}", path.display()))?,
        None => load_settings(SettingsSource::Embedded)?,
    };

    println!(
        "{:<12} {:>6} {:>8} {:>6} {:>9} {:>9} {:>8}",
        "personality", "trade", "territory", "trust", "nap cost", "trade cost", "divisor"
    );
    for personality in PersonalityType::ALL {
        let traits = settings.traits_for(personality);
        let modifiers = PersonalityModifiers::for_personality(personality);
        let policy = PersonalityPolicy::for_personality(personality);
        println!(
            "{:<12} {:>6} {:>8} {:>6} {:>9} {:>9} {:>8}",
            format!("{personality:?}"),
            traits.trade,
            traits.territorialism,
            traits.trustworthiness,
            modifiers.trust_cost_nap_pact,
            modifiers.trust_cost_trade_pact,
            policy.territorial_divisor,
        );
    }
    Ok(())
}
