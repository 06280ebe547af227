//! Board state after a hypothetical piece placement.
//!
//! [`PlacementAnalysis`] overlays the piece on a copy of the board, clears completed
//! lines and keeps the resulting metrics in a lazily evaluated [`BoardAnalysis`].
//! The snapshot it was built from is never touched.

use escape_engine::{BitBoard, Piece};

use crate::board_analysis::BoardAnalysis;

#[derive(Debug)]
pub struct PlacementAnalysis {
    placement: Piece,
    cleared_lines: usize,
    board_analysis: BoardAnalysis,
}

impl PlacementAnalysis {
    #[must_use]
    pub fn from_board(before_placement: &BitBoard, placement: Piece) -> Self {
        let mut board = before_placement.clone();
        board.fill_piece(placement);
        let cleared_lines = board.clear_lines();

        Self {
            placement,
            cleared_lines,
            board_analysis: BoardAnalysis::from_board(&board),
        }
    }

    #[must_use]
    pub fn placement(&self) -> Piece {
        self.placement
    }

    #[must_use]
    pub fn cleared_lines(&self) -> usize {
        self.cleared_lines
    }

    /// Metrics of the board after line clears.
    #[must_use]
    pub fn board_analysis(&self) -> &BoardAnalysis {
        &self.board_analysis
    }
}

#[cfg(test)]
mod tests {
    use escape_engine::{PieceKind, PieceRotation, Pose};

    use super::*;

    #[test]
    fn test_clears_lines_on_a_copy() {
        let board = BitBoard::from_ascii(
            "
            ########..
            ########..
            ",
        );
        let placement = Piece::with_pose(PieceKind::O, Pose::new(8, 18, PieceRotation::SPAWN));
        let analysis = PlacementAnalysis::from_board(&board, placement);
        assert_eq!(analysis.cleared_lines(), 2);
        assert_eq!(analysis.board_analysis().max_height(), 0);
        assert_eq!(board.max_height(), 2);
    }

    #[test]
    fn test_hidden_cells_are_dropped() {
        let placement = Piece::with_pose(PieceKind::I, Pose::new(0, -3, PieceRotation::new(1)));
        let analysis = PlacementAnalysis::from_board(&BitBoard::INITIAL, placement);
        assert_eq!(analysis.cleared_lines(), 0);
        assert_eq!(analysis.board_analysis().max_height(), 20);
        assert_eq!(analysis.board_analysis().total_height(), 20);
    }
}
