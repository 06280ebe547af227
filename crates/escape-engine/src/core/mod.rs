pub use self::{bit_board::*, block_board::*, piece::*, player::*};

pub(crate) mod bit_board;
pub(crate) mod block_board;
pub(crate) mod piece;
pub(crate) mod player;

/// Number of columns on the board.
pub const BOARD_WIDTH: usize = 10;
/// Number of rows on the board.
pub const BOARD_HEIGHT: usize = 20;
