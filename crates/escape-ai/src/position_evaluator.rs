//! Position evaluation: scoring a board after a hypothetical placement.
//!
//! The score is a weighted sum of board terms, each coefficient taken from the
//! active [`DifficultyConfig`]:
//!
//! ```text
//! score = lines + multi-line bonus
//!       + holes + hole depth + weighted holes + rows with holes
//!       + column transitions + height + max height + bumpiness
//!       + terrain + danger + edge + floating
//! ```
//!
//! The danger term is an override: once the stack reaches the warning or panic margin
//! below the top, its constant dwarfs every other term. Edge and floating terms use
//! fixed constants from [`AiConstants`] and do not change between tiers.
//!
//! Scores are a pure function of the board snapshot, the placement and the tables;
//! the evaluator holds no mutable state.

use std::fmt;

use escape_engine::{BOARD_HEIGHT, BOARD_WIDTH, BitBoard, Piece};
use serde::Serialize;

use crate::{
    board_analysis::HoleStats,
    difficulty::{AiConstants, DifficultyConfig},
    placement_analysis::PlacementAnalysis,
    terrain::TerrainAnalysis,
};

/// Scores piece placements (higher is better).
pub trait PlacementEvaluator: fmt::Debug {
    fn evaluate_placement(&self, analysis: &PlacementAnalysis) -> f32;
}

/// Every weighted term of a placement score together with the raw measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub lines: f32,
    pub multi_line_bonus: f32,
    pub holes: f32,
    pub hole_depth: f32,
    pub weighted_holes: f32,
    pub rows_with_holes: f32,
    pub col_transitions: f32,
    pub height: f32,
    pub max_height: f32,
    pub danger: f32,
    pub bumpiness: f32,
    pub terrain: f32,
    pub edge: f32,
    pub floating: f32,
    pub total: f32,
    pub raw: RawMetrics,
    pub funnel: TerrainAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMetrics {
    pub heights: [u8; BOARD_WIDTH],
    pub lines: usize,
    pub holes: HoleStats,
    pub col_transitions: u32,
    pub bumpiness: u32,
    pub total_height: u32,
    pub max_height: u8,
}

/// Weighted heuristic evaluator for one difficulty table.
#[derive(Debug, Clone, Copy)]
pub struct PositionEvaluator<'a> {
    config: &'a DifficultyConfig,
    constants: &'a AiConstants,
}

#[expect(clippy::cast_precision_loss)]
fn weighted(count: u32, reward: f32) -> f32 {
    count as f32 * reward
}

impl<'a> PositionEvaluator<'a> {
    #[must_use]
    pub fn new(config: &'a DifficultyConfig, constants: &'a AiConstants) -> Self {
        Self { config, constants }
    }

    #[must_use]
    pub fn config(&self) -> &'a DifficultyConfig {
        self.config
    }

    /// Score of placing `piece` on `board`.
    #[must_use]
    pub fn evaluate(&self, board: &BitBoard, piece: Piece) -> f32 {
        self.evaluate_placement(&PlacementAnalysis::from_board(board, piece))
    }

    /// Detailed score of a placement.
    #[must_use]
    pub fn breakdown(&self, analysis: &PlacementAnalysis) -> ScoreBreakdown {
        let config = self.config;
        let constants = self.constants;
        let board = analysis.board_analysis();
        let heights = *board.column_heights();
        #[expect(clippy::cast_possible_truncation)]
        let lines = analysis.cleared_lines() as u32;

        let multi_line_bonus = match lines {
            _ if !config.multi_line_bonus => 0.0,
            4.. => constants.tetris_bonus,
            2.. => constants.multi_line_bonus,
            _ => 0.0,
        };

        let holes = board.holes();
        let col_transitions = board.column_transitions();
        let bumpiness = board.bumpiness();
        let total_height = board.total_height();
        let max_height = board.max_height();

        let max_rows = usize::from(max_height);
        let danger = if max_rows >= BOARD_HEIGHT.saturating_sub(usize::from(constants.panic_height))
        {
            constants.panic_score
        } else if max_rows >= BOARD_HEIGHT.saturating_sub(usize::from(constants.warning_height)) {
            constants.warning_score
        } else {
            0.0
        };

        let terrain = TerrainAnalysis::from_heights(
            &heights,
            constants.cliff_height_threshold,
            config,
        );

        let lowest_edge = heights[0].min(heights[BOARD_WIDTH - 1]);
        let edge = (constants.edge_reference_height - f32::from(lowest_edge)) * constants.edge_bonus;

        let bottom = analysis.placement().bottom();
        let floating = if bottom < constants.floating_row_threshold {
            #[expect(clippy::cast_precision_loss)]
            let rows = (constants.floating_row_threshold - bottom) as f32;
            -rows * constants.floating_penalty
        } else {
            0.0
        };

        let mut breakdown = ScoreBreakdown {
            lines: weighted(lines, config.line_reward),
            multi_line_bonus,
            holes: weighted(holes.count, config.hole_reward),
            hole_depth: weighted(holes.depth, config.hole_depth_reward),
            weighted_holes: weighted(holes.weighted, config.weighted_hole_reward),
            rows_with_holes: weighted(holes.rows, config.rows_with_holes_reward),
            col_transitions: weighted(col_transitions, config.col_transition_reward),
            height: weighted(total_height, config.height_reward),
            max_height: weighted(u32::from(max_height), config.max_height_reward),
            danger,
            bumpiness: weighted(bumpiness, config.bumpiness_reward),
            terrain: terrain.penalty,
            edge,
            floating,
            total: 0.0,
            raw: RawMetrics {
                heights,
                lines: analysis.cleared_lines(),
                holes,
                col_transitions,
                bumpiness,
                total_height,
                max_height,
            },
            funnel: terrain,
        };
        breakdown.total = breakdown.lines
            + breakdown.multi_line_bonus
            + breakdown.holes
            + breakdown.hole_depth
            + breakdown.weighted_holes
            + breakdown.rows_with_holes
            + breakdown.col_transitions
            + breakdown.height
            + breakdown.max_height
            + breakdown.danger
            + breakdown.bumpiness
            + breakdown.terrain
            + breakdown.edge
            + breakdown.floating;
        breakdown
    }
}

impl PlacementEvaluator for PositionEvaluator<'_> {
    fn evaluate_placement(&self, analysis: &PlacementAnalysis) -> f32 {
        self.breakdown(analysis).total
    }
}

#[cfg(test)]
mod tests {
    use escape_engine::{PieceKind, PieceRotation, Pose};

    use super::*;

    fn piece(kind: PieceKind, x: i8, y: i8, rotation: u8) -> Piece {
        Piece::with_pose(kind, Pose::new(x, y, PieceRotation::new(rotation)))
    }

    fn breakdown(config: &DifficultyConfig, board: &BitBoard, piece: Piece) -> ScoreBreakdown {
        let constants = AiConstants::default();
        let evaluator = PositionEvaluator::new(config, &constants);
        evaluator.breakdown(&PlacementAnalysis::from_board(board, piece))
    }

    #[test]
    fn test_o_piece_in_corner_on_empty_board() {
        let b = breakdown(
            &DifficultyConfig::NORMAL,
            &BitBoard::INITIAL,
            piece(PieceKind::O, 0, 18, 0),
        );
        assert_eq!(b.raw.holes, HoleStats::default());
        assert_eq!(b.raw.bumpiness, 2);
        assert_eq!(b.col_transitions, 10.0 * -5.0);
        assert_eq!(b.height, 4.0 * -2.0);
        assert_eq!(b.max_height, 2.0 * -3.0);
        assert_eq!(b.bumpiness, 2.0 * -10.0);
        assert_eq!(b.edge, 30.0);
        assert_eq!(b.floating, 0.0);
        assert_eq!(b.terrain, 0.0);
        assert_eq!(b.danger, 0.0);
        assert_eq!(b.total, -54.0);
    }

    #[test]
    fn test_total_matches_evaluate() {
        let constants = AiConstants::default();
        let config = DifficultyConfig::HARD;
        let evaluator = PositionEvaluator::new(&config, &constants);
        let board = BitBoard::from_ascii(
            "
            ....#.....
            #.###...##
            ",
        );
        let placement = piece(PieceKind::T, 1, 17, 2);
        let analysis = PlacementAnalysis::from_board(&board, placement);
        assert_eq!(
            evaluator.evaluate(&board, placement),
            evaluator.breakdown(&analysis).total
        );
    }

    #[test]
    fn test_tetris_bonus_only_with_flag() {
        let board = BitBoard::from_ascii(
            "
            .#########
            .#########
            .#########
            .#########
            ",
        );
        let well = piece(PieceKind::I, 0, 16, 1);

        let hard = breakdown(&DifficultyConfig::HARD, &board, well);
        assert_eq!(hard.raw.lines, 4);
        assert_eq!(hard.lines, 800.0);
        assert_eq!(hard.multi_line_bonus, 150.0);

        let normal = breakdown(&DifficultyConfig::NORMAL, &board, well);
        assert_eq!(normal.multi_line_bonus, 0.0);
    }

    #[test]
    fn test_four_line_clear_outscores_stacking_by_tetris_bonus() {
        let constants = AiConstants::default();
        let config = DifficultyConfig::HARD;
        let evaluator = PositionEvaluator::new(&config, &constants);
        let board = BitBoard::from_ascii(
            "
            .#########
            .#########
            .#########
            .#########
            ",
        );
        let tetris = evaluator.evaluate(&board, piece(PieceKind::I, 0, 16, 1));
        let stacked = evaluator.evaluate(&board, piece(PieceKind::I, 1, 15, 0));
        assert!(
            tetris - stacked >= constants.tetris_bonus,
            "tetris {tetris} vs stacked {stacked}"
        );
    }

    #[test]
    fn test_double_earns_multi_line_bonus() {
        let board = BitBoard::from_ascii(
            "
            ########..
            ########..
            ",
        );
        let b = breakdown(&DifficultyConfig::HARD, &board, piece(PieceKind::O, 8, 18, 0));
        assert_eq!(b.raw.lines, 2);
        assert_eq!(b.multi_line_bonus, 50.0);
    }

    #[test]
    fn test_breakdown_serializes_with_cliffs() {
        let board = BitBoard::from_ascii(&"#.........\n".repeat(6));
        let b = breakdown(&DifficultyConfig::NORMAL, &board, piece(PieceKind::O, 8, 18, 0));
        assert!(!b.funnel.cliffs.is_empty());
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(
            json["funnel"]["cliffs"].as_array().map(Vec::len),
            Some(b.funnel.cliffs.len())
        );
        assert_eq!(json["raw"]["max_height"], 6);
    }

    #[test]
    fn test_holes_are_penalized_per_term() {
        let board = BitBoard::from_ascii(
            "
            #.........
            ",
        );
        // Horizontal I resting on column 0 roofs over three empty cells.
        let b = breakdown(&DifficultyConfig::NORMAL, &board, piece(PieceKind::I, 0, 18, 0));
        assert_eq!(
            b.raw.holes,
            HoleStats {
                count: 3,
                depth: 3,
                weighted: 3,
                rows: 1,
            }
        );
        assert_eq!(b.holes, 3.0 * -30.0);
        assert_eq!(b.hole_depth, 3.0 * -1.0);
        assert_eq!(b.weighted_holes, 3.0 * -3.0);
        assert_eq!(b.rows_with_holes, -15.0);
    }

    #[test]
    fn test_danger_margins() {
        let warning = BitBoard::from_ascii(&"#.........\n".repeat(14));
        let b = breakdown(
            &DifficultyConfig::NORMAL,
            &warning,
            piece(PieceKind::O, 0, 4, 0),
        );
        assert_eq!(b.raw.max_height, 16);
        assert_eq!(b.danger, -20_000.0);

        let panic = BitBoard::from_ascii(&"#.........\n".repeat(16));
        let b = breakdown(&DifficultyConfig::NORMAL, &panic, piece(PieceKind::O, 0, 2, 0));
        assert_eq!(b.raw.max_height, 18);
        assert_eq!(b.danger, -100_000.0);
    }

    #[test]
    fn test_floating_penalty_uses_bottom_edge() {
        let tower = BitBoard::from_ascii(&"#.........\n".repeat(17));
        // O resting on a 17-high column: bottom edge at row 3.
        let b = breakdown(&DifficultyConfig::EASY, &tower, piece(PieceKind::O, 0, 1, 0));
        assert_eq!(b.floating, -30.0);

        let b = breakdown(&DifficultyConfig::EASY, &tower, piece(PieceKind::I, 6, -3, 1));
        assert_eq!(b.floating, -(4.0 - 1.0) * 30.0);
    }
}
