use std::cell::OnceCell;

use escape_engine::{BOARD_HEIGHT, BOARD_WIDTH, BitBoard};
use serde::Serialize;

/// Hole metrics of a board.
///
/// A hole is an empty cell with at least one filled cell above it in the same column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HoleStats {
    pub count: u32,
    /// Sum over holes of the filled cells above each one.
    pub depth: u32,
    /// Sum over holes of `BOARD_HEIGHT - row`, so higher holes weigh more.
    pub weighted: u32,
    /// Number of distinct rows containing a hole.
    pub rows: u32,
}

/// Lazily computed board metrics.
#[derive(Debug)]
pub struct BoardAnalysis {
    board: BitBoard,
    column_heights: OnceCell<[u8; BOARD_WIDTH]>,
    max_height: OnceCell<u8>,
    total_height: OnceCell<u32>,
    holes: OnceCell<HoleStats>,
    column_transitions: OnceCell<u32>,
    bumpiness: OnceCell<u32>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_board(board: &BitBoard) -> Self {
        let board = board.clone();
        Self {
            board,
            column_heights: OnceCell::new(),
            max_height: OnceCell::new(),
            total_height: OnceCell::new(),
            holes: OnceCell::new(),
            column_transitions: OnceCell::new(),
            bumpiness: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    #[must_use]
    pub fn column_heights(&self) -> &[u8; BOARD_WIDTH] {
        self.column_heights
            .get_or_init(|| self.board.column_heights())
    }

    #[must_use]
    pub fn max_height(&self) -> u8 {
        *self
            .max_height
            .get_or_init(|| self.column_heights().iter().copied().max().unwrap_or(0))
    }

    #[must_use]
    pub fn total_height(&self) -> u32 {
        *self
            .total_height
            .get_or_init(|| self.column_heights().iter().map(|h| u32::from(*h)).sum())
    }

    #[must_use]
    pub fn holes(&self) -> HoleStats {
        *self.holes.get_or_init(|| {
            let mut stats = HoleStats::default();
            let mut rows_with_holes = [false; BOARD_HEIGHT];
            for x in 0..BOARD_WIDTH {
                let mut blocks_above = 0;
                for (y, row) in self.board.rows().enumerate() {
                    if row.is_cell_occupied(x) {
                        blocks_above += 1;
                    } else if blocks_above > 0 {
                        stats.count += 1;
                        stats.depth += blocks_above;
                        #[expect(clippy::cast_possible_truncation)]
                        let weight = (BOARD_HEIGHT - y) as u32;
                        stats.weighted += weight;
                        rows_with_holes[y] = true;
                    }
                }
            }
            #[expect(clippy::cast_possible_truncation)]
            let rows = rows_with_holes.iter().filter(|r| **r).count() as u32;
            stats.rows = rows;
            stats
        })
    }

    /// Vertical filled/empty toggles per column; the floor counts as filled.
    #[must_use]
    pub fn column_transitions(&self) -> u32 {
        *self.column_transitions.get_or_init(|| {
            let mut transitions = 0;
            for x in 0..BOARD_WIDTH {
                if !self.board.row(BOARD_HEIGHT - 1).is_cell_occupied(x) {
                    transitions += 1;
                }
                let mut prev_occupied = self.board.row(0).is_cell_occupied(x);
                for y in 1..BOARD_HEIGHT {
                    let occupied = self.board.row(y).is_cell_occupied(x);
                    if occupied != prev_occupied {
                        transitions += 1;
                    }
                    prev_occupied = occupied;
                }
            }
            transitions
        })
    }

    /// Sum of absolute height differences between neighbouring columns.
    #[must_use]
    pub fn bumpiness(&self) -> u32 {
        *self.bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| {
                    let left = i32::from(w[0]);
                    let right = i32::from(w[1]);
                    (right - left).unsigned_abs()
                })
                .sum()
        })
    }
}
