use std::{path::PathBuf, time::Duration};

use escape_ai::{
    difficulty::Difficulty,
    session::{SessionConfig, SessionOutcome, SessionRunner},
};
use escape_engine::PieceSeed;

use crate::{
    schema::{record::SimulationRecord, settings::SettingsFile},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Difficulty tier (easy, normal, hard or sabotage)
    #[arg(long)]
    difficulty: Option<Difficulty>,
    /// Seed for pieces, player and erratic moves (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum number of simulated ticks
    #[arg(long, default_value_t = 20_000)]
    ticks: u64,
    /// Length of one simulated tick in milliseconds
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Trigger sabotage whenever the cooldown allows
    #[arg(long)]
    sabotage: bool,
    /// Play without a player on the board
    #[arg(long)]
    no_player: bool,
    /// JSON file overriding difficulty weights and AI constants
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        difficulty,
        seed,
        ticks,
        tick_ms,
        sabotage,
        no_player,
        settings,
        output,
    } = arg;

    let file = match settings {
        Some(path) => util::read_settings_file(path)?,
        None => SettingsFile::default(),
    };
    let settings = file.resolve(*difficulty)?;
    let seed = PieceSeed::from_u64(seed.unwrap_or_else(rand::random));
    let config = SessionConfig {
        tick: Duration::from_millis((*tick_ms).max(1)),
        max_ticks: *ticks,
        auto_sabotage: *sabotage,
        with_player: !*no_player,
        ..SessionConfig::default()
    };

    tracing::info!(
        difficulty = %settings.difficulty,
        max_ticks = config.max_ticks,
        "starting simulation"
    );
    let report = SessionRunner::new(settings.clone(), seed, config).run();
    match report.outcome {
        SessionOutcome::Survived => eprintln!(
            "Survived {} ticks: {} pieces, {} lines",
            report.ticks, report.pieces, report.lines
        ),
        SessionOutcome::GameOver(cause) => eprintln!(
            "Game over after {} ticks ({cause}): {} pieces, {} lines",
            report.ticks, report.pieces, report.lines
        ),
    }

    let record = SimulationRecord {
        generated_at: chrono::Utc::now(),
        settings,
        report,
    };
    Output::save_json(&record, output.clone())?;
    Ok(())
}
