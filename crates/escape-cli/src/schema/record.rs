use chrono::{DateTime, Utc};
use escape_ai::{
    difficulty::{Difficulty, Settings},
    placement_search::PlacementResult,
    position_evaluator::ScoreBreakdown,
    session::SessionReport,
};
use escape_engine::{Piece, Pose};
use serde::Serialize;

/// Headless session result with the settings that produced it
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRecord {
    /// Timestamp when the simulation finished (ISO 8601 format)
    pub generated_at: DateTime<Utc>,
    /// Resolved AI settings used for the whole session
    pub settings: Settings,
    pub report: SessionReport,
}

/// Single placement search on a fixed board
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub generated_at: DateTime<Utc>,
    pub difficulty: Difficulty,
    /// Piece at its starting pose
    pub start: Piece,
    pub player_column: Option<usize>,
    /// Danger-zone reward applied to threatening poses, when a player is present
    pub danger_reward: Option<f32>,
    pub iterations: usize,
    pub path_through_danger: bool,
    /// `None` when no terminal pose is reachable
    pub placement: Option<EvaluatedPlacement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedPlacement {
    pub target: Pose,
    pub piece: Piece,
    /// Search score, including the danger-zone reward
    pub score: f32,
    pub path: Vec<Pose>,
    /// Heuristic score terms, without the danger-zone reward
    pub breakdown: ScoreBreakdown,
}

impl EvaluatedPlacement {
    pub fn new(start: Piece, result: PlacementResult, breakdown: ScoreBreakdown) -> Self {
        Self {
            target: result.target,
            piece: Piece::with_pose(start.kind(), result.target),
            score: result.score,
            path: result.path,
            breakdown,
        }
    }
}
