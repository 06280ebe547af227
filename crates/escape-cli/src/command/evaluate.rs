use std::path::PathBuf;

use anyhow::bail;
use escape_ai::{
    difficulty::Difficulty,
    placement_analysis::PlacementAnalysis,
    placement_search::{DangerAvoidance, PlacementSearch, danger_reward},
    position_evaluator::PositionEvaluator,
};
use escape_engine::{BOARD_WIDTH, Piece, PieceKind, PieceRotation, PlayerSnapshot, Pose};

use crate::{
    schema::{
        record::{EvaluatedPlacement, EvaluationRecord},
        settings::SettingsFile,
    },
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Board file: rows of `#` and `.`, aligned to the floor
    board: PathBuf,
    /// Piece kind (I, O, S, Z, J, L or T)
    #[arg(long, value_parser = parse_piece_kind)]
    piece: PieceKind,
    /// Difficulty tier (easy, normal, hard or sabotage)
    #[arg(long)]
    difficulty: Option<Difficulty>,
    /// Starting column of the piece (defaults to the spawn column)
    #[arg(long)]
    column: Option<i8>,
    /// Starting row of the piece
    #[arg(long, default_value_t = 0)]
    row: i8,
    /// Starting rotation index
    #[arg(long, default_value_t = 0)]
    rotation: u8,
    /// Column the player stands on; enables danger-zone avoidance
    #[arg(long)]
    player_column: Option<usize>,
    /// Player-triggered retargets so far, for danger reward decay
    #[arg(long, default_value_t = 0)]
    retarget_count: u32,
    /// JSON file overriding difficulty weights and AI constants
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_piece_kind(s: &str) -> Result<PieceKind, String> {
    let mut chars = s.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => PieceKind::from_char(c.to_ascii_uppercase())
            .ok_or_else(|| format!("unknown piece kind `{s}`")),
        _ => Err(format!("piece kind must be a single letter, got `{s}`")),
    }
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        board,
        piece,
        difficulty,
        column,
        row,
        rotation,
        player_column,
        retarget_count,
        settings,
        output,
    } = arg;

    let file = match settings {
        Some(path) => util::read_settings_file(path)?,
        None => SettingsFile::default(),
    };
    let settings = file.resolve(*difficulty)?;
    let board = util::read_board_file(board)?;
    let kind = *piece;

    let spawn = Piece::new(kind);
    let start = Piece::with_pose(
        kind,
        Pose::new(
            column.unwrap_or(spawn.pose().x),
            *row,
            PieceRotation::new(*rotation),
        ),
    );
    if board.is_colliding(start) {
        bail!("starting pose {start} collides with the board");
    }

    let danger = match *player_column {
        Some(column) if column >= BOARD_WIDTH => {
            bail!("player column {column} is outside the board (0..{BOARD_WIDTH})")
        }
        Some(column) => {
            let height = usize::from(board.column_heights()[column]);
            let zone = PlayerSnapshot::standing_on(column, height).danger_zone();
            let reward = danger_reward(&settings.config, *retarget_count, board.max_height());
            Some(DangerAvoidance::new(zone, reward))
        }
        None => None,
    };

    let evaluator = PositionEvaluator::new(&settings.config, &settings.constants);
    let outcome = PlacementSearch::new(&board, start, &evaluator)
        .with_danger(danger)
        .with_max_iterations(settings.constants.max_search_iterations)
        .run();

    let iterations = outcome.iterations();
    let path_through_danger = outcome.path_through_danger();
    let placement = outcome.into_result().map(|result| {
        let analysis =
            PlacementAnalysis::from_board(&board, Piece::with_pose(kind, result.target));
        let breakdown = evaluator.breakdown(&analysis);
        EvaluatedPlacement::new(start, result, breakdown)
    });
    match &placement {
        Some(placement) => eprintln!(
            "Best placement {} (score {:.1}, {} steps, {iterations} poses searched)",
            placement.piece,
            placement.score,
            placement.path.len()
        ),
        None => eprintln!("No reachable placement ({iterations} poses searched)"),
    }

    let record = EvaluationRecord {
        generated_at: chrono::Utc::now(),
        difficulty: settings.difficulty,
        start,
        player_column: *player_column,
        danger_reward: danger.map(|danger| danger.reward),
        iterations,
        path_through_danger,
        placement,
    };
    Output::save_json(&record, output.clone())?;
    Ok(())
}
