use std::fmt;

use serde::{Serialize, Serializer};

use super::{
    BOARD_HEIGHT, BOARD_WIDTH,
    bit_board::BitBoard,
    piece::{Piece, PieceKind},
};

/// A single cell in the block board representation.
///
/// Unlike [`BitBoard`](super::bit_board::BitBoard) which uses bits for collision detection,
/// `Block` remembers which piece locked each cell and whether it was placed while the
/// opponent was under player control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Block {
    /// Empty cell (no piece).
    #[default]
    Empty,
    /// Cell locked by the opponent's own placement.
    Piece(PieceKind),
    /// Cell locked by a piece the player was steering.
    Sabotaged(PieceKind),
    /// Cell that was already present when the arena was set up.
    Garbage,
}

impl Block {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Block::Empty
    }

    /// Single-character rendering: `.` for empty, the piece letter otherwise.
    ///
    /// Sabotaged cells use the lowercase letter.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Block::Empty => '.',
            Block::Piece(kind) => kind.as_char(),
            Block::Sabotaged(kind) => kind.as_char().to_ascii_lowercase(),
            Block::Garbage => '#',
        }
    }
}

type BlockRow = [Block; BOARD_WIDTH];

/// Cell-by-cell board representation kept alongside the bit board for reports.
///
/// Rows are ordered top to bottom and share their coordinates with
/// [`BitBoard`](super::bit_board::BitBoard), so line clears applied to both stay in step.
///
/// # Example
///
/// ```
/// use escape_engine::{Block, BlockBoard, Piece, PieceKind};
///
/// let mut board = BlockBoard::INITIAL;
/// let piece = Piece::new(PieceKind::O);
/// board.fill_piece(piece, Block::Piece(piece.kind()));
/// assert_eq!(board.rows().next().unwrap()[4], Block::Piece(PieceKind::O));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBoard {
    rows: [BlockRow; BOARD_HEIGHT],
}

impl Default for BlockBoard {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl BlockBoard {
    pub const INITIAL: Self = Self {
        rows: [[Block::Empty; BOARD_WIDTH]; BOARD_HEIGHT],
    };

    /// Colour board for a preset bit board, with every occupied cell as [`Block::Garbage`].
    #[must_use]
    pub fn from_bit_board(board: &BitBoard) -> Self {
        let mut blocks = Self::INITIAL;
        for (y, row) in board.rows().enumerate() {
            for (x, occupied) in row.iter_cells().enumerate() {
                if occupied {
                    blocks.rows[y][x] = Block::Garbage;
                }
            }
        }
        blocks
    }

    /// Returns an iterator over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Block; BOARD_WIDTH]> {
        self.rows.iter()
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Block {
        self.rows[y][x]
    }

    /// Fills the piece's cells with the given block.
    ///
    /// Cells outside the board (above the top while spawning) are skipped.
    pub fn fill_piece(&mut self, piece: Piece, block: Block) {
        for (x, y) in piece.cells() {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                continue;
            };
            if let Some(cell) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
                *cell = block;
            }
        }
    }

    /// Clears filled lines and returns the number of lines cleared.
    pub fn clear_lines(&mut self) -> usize {
        let mut count = 0;
        for y in (0..BOARD_HEIGHT).rev() {
            if self.rows[y].iter().all(|b| !b.is_empty()) {
                count += 1;
                continue;
            }
            if count > 0 {
                self.rows[y + count] = self.rows[y];
            }
        }
        self.rows[..count].fill([Block::Empty; BOARD_WIDTH]);
        count
    }

    /// Number of cells locked while under player control.
    #[must_use]
    pub fn sabotaged_cells(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|b| matches!(b, Block::Sabotaged(_)))
            .count()
    }
}

impl fmt::Display for BlockBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for block in row {
                write!(f, "{}", block.as_char())?;
            }
        }
        Ok(())
    }
}

impl Serialize for BlockBoard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // One string per row so reports stay readable
        serializer.collect_seq(
            self.rows
                .iter()
                .map(|row| row.iter().map(|b| b.as_char()).collect::<String>()),
        )
    }
}
