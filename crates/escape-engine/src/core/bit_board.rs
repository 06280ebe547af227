use std::{fmt, iter};

use serde::{Deserialize, Serialize};

use crate::core::piece::Piece;

use super::{BOARD_HEIGHT, BOARD_WIDTH};

// Full row (all playable cells occupied)
const FULL_ROW_MASK: u16 = (1 << BOARD_WIDTH) - 1;

/// Single row in the bit board representation.
///
/// Stores one row of the board as a 16-bit bitmask where bit `x` represents column `x`.
/// Bits at and above [`BOARD_WIDTH`] are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRow {
    bits: u16,
}

impl BitRow {
    pub const EMPTY: Self = Self { bits: 0 };
    pub const FULL: Self = Self {
        bits: FULL_ROW_MASK,
    };

    /// Checks if every column of the row is occupied.
    #[inline]
    #[must_use]
    pub fn is_filled(self) -> bool {
        self.bits == FULL_ROW_MASK
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Checks if the cell at column `x` is occupied.
    #[inline]
    #[must_use]
    pub fn is_cell_occupied(self, x: usize) -> bool {
        (self.bits & (1 << x)) != 0
    }

    #[inline]
    fn is_any_cell_occupied(self, mask: u16) -> bool {
        (self.bits & mask) != 0
    }

    #[inline]
    fn occupy_cells(&mut self, mask: u16) {
        self.bits |= mask & FULL_ROW_MASK;
    }

    /// Iterates over all cells in the row, returning their occupied status.
    #[inline]
    pub fn iter_cells(self) -> impl Iterator<Item = bool> {
        (0..BOARD_WIDTH).map(move |x| self.is_cell_occupied(x))
    }
}

/// Locked-cell snapshot of the board for collision detection, line clearing and analysis.
///
/// Each of the [`BOARD_HEIGHT`] rows is a [`BitRow`]; row 0 is the top of the board.
/// Cells outside the side walls and below the floor count as occupied when testing
/// collisions, while rows above the top are free space so pieces may spawn partially
/// hidden.
///
/// The board is a plain value: copying it yields an immutable snapshot, which is what
/// the placement search reads for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBoard {
    rows: [BitRow; BOARD_HEIGHT],
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Serialize for BitBoard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "0000,0000,...,03ff" (comma-separated hex values, top row first)
        let hex: Vec<String> = self
            .rows
            .iter()
            .map(|row| format!("{:04x}", row.bits))
            .collect();
        serializer.serialize_str(&hex.join(","))
    }
}

impl<'de> Deserialize<'de> for BitBoard {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != BOARD_HEIGHT {
            return Err(serde::de::Error::custom(format!(
                "expected {} comma-separated hex values, got {}",
                BOARD_HEIGHT,
                parts.len()
            )));
        }

        let mut rows = [BitRow::EMPTY; BOARD_HEIGHT];
        for (i, hex_str) in parts.iter().enumerate() {
            let bits = u16::from_str_radix(hex_str, 16).map_err(|e| {
                serde::de::Error::custom(format!("invalid hex at row {i}: {hex_str} ({e})"))
            })?;
            if bits & !FULL_ROW_MASK != 0 {
                return Err(serde::de::Error::custom(format!(
                    "row {i} has bits outside the board: {hex_str}"
                )));
            }
            rows[i] = BitRow { bits };
        }

        Ok(BitBoard { rows })
    }
}

/// Error returned when an ASCII board cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseBoardError {
    #[display("expected at most {BOARD_HEIGHT} rows, got {_0}")]
    TooManyRows(#[error(not(source))] usize),
    #[display("row {row} must have exactly {BOARD_WIDTH} cells, got {width}")]
    RowWidth { row: usize, width: usize },
    #[display("unexpected character {ch:?} in row {row}")]
    InvalidCell { row: usize, ch: char },
}

impl BitBoard {
    pub const WIDTH: usize = BOARD_WIDTH;
    pub const HEIGHT: usize = BOARD_HEIGHT;

    pub const INITIAL: Self = Self {
        rows: [BitRow::EMPTY; BOARD_HEIGHT],
    };

    /// Returns a row by index (0 is the top row).
    #[must_use]
    pub fn row(&self, y: usize) -> BitRow {
        self.rows[y]
    }

    /// Returns an iterator over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = BitRow> + '_ {
        self.rows.iter().copied()
    }

    #[must_use]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.rows[y].is_cell_occupied(x)
    }

    /// Checks if the piece overlaps locked cells, the side walls or the floor.
    #[must_use]
    pub fn is_colliding(&self, piece: Piece) -> bool {
        let shape = piece.shape();
        let pose = piece.pose();
        let Ok(x0) = usize::try_from(pose.x) else {
            return true;
        };
        if x0 + shape.width() > BOARD_WIDTH {
            return true;
        }
        for (y, mask) in iter::zip(i32::from(pose.y).., shape.row_masks()) {
            // Above the top of the board
            let Ok(y) = usize::try_from(y) else {
                continue;
            };
            let Some(row) = self.rows.get(y) else {
                return true;
            };
            if row.is_any_cell_occupied(mask << x0) {
                return true;
            }
        }
        false
    }

    /// Checks that no locked cell lies inside the given rectangle.
    ///
    /// Parts of the rectangle outside the board are ignored.
    #[must_use]
    pub fn is_region_clear(&self, x: i32, y: i32, width: usize, height: usize) -> bool {
        let mut mask = 0u16;
        for column in iter::successors(Some(x), |c| Some(c + 1)).take(width) {
            if let Ok(column) = usize::try_from(column)
                && column < BOARD_WIDTH
            {
                mask |= 1 << column;
            }
        }
        iter::successors(Some(y), |r| Some(r + 1))
            .take(height)
            .filter_map(|r| usize::try_from(r).ok())
            .filter_map(|r| self.rows.get(r))
            .all(|row| !row.is_any_cell_occupied(mask))
    }

    /// Checks if rotating `from` into `to` would sweep through locked cells.
    ///
    /// Rotation is tested against the union of both bounding boxes anchored at the
    /// current pose, which catches cells a plain overlap test of the target misses.
    #[must_use]
    pub fn is_rotation_occluded(&self, from: Piece, to: Piece) -> bool {
        let (a, b) = (from.shape(), to.shape());
        let pose = from.pose();
        !self.is_region_clear(
            i32::from(pose.x),
            i32::from(pose.y),
            a.width().max(b.width()),
            a.height().max(b.height()),
        )
    }

    /// Locks a piece onto the board by setting its occupied cells.
    ///
    /// Cells above the top of the board are discarded.
    pub fn fill_piece(&mut self, piece: Piece) {
        for (x, y) in piece.cells() {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                continue;
            };
            if let Some(row) = self.rows.get_mut(y)
                && x < BOARD_WIDTH
            {
                row.occupy_cells(1 << x);
            }
        }
    }

    /// Clears filled lines and returns the number of lines cleared.
    ///
    /// Remaining rows shift down and the top is padded with empty rows.
    pub fn clear_lines(&mut self) -> usize {
        let mut count = 0;

        for y in (0..BOARD_HEIGHT).rev() {
            if self.rows[y].is_filled() {
                count += 1;
                continue;
            }
            if count > 0 {
                self.rows[y + count] = self.rows[y];
            }
        }

        self.rows[..count].fill(BitRow::EMPTY);
        count
    }

    /// Height of each column: rows from the floor up to and including its top cell.
    #[must_use]
    pub fn column_heights(&self) -> [u8; BOARD_WIDTH] {
        let mut heights = [0; BOARD_WIDTH];
        for (x, h) in heights.iter_mut().enumerate() {
            if let Some(top) = self.rows.iter().position(|row| row.is_cell_occupied(x)) {
                *h = u8::try_from(BOARD_HEIGHT - top).unwrap_or(u8::MAX);
            }
        }
        heights
    }

    /// Height of the tallest column.
    #[must_use]
    pub fn max_height(&self) -> u8 {
        self.rows
            .iter()
            .position(|row| !row.is_empty())
            .map_or(0, |top| u8::try_from(BOARD_HEIGHT - top).unwrap_or(u8::MAX))
    }

    /// Number of rows the piece can still fall before resting.
    #[must_use]
    pub fn drop_distance(&self, piece: Piece) -> usize {
        iter::successors(Some(piece), |p| Some(p.down()))
            .skip(1)
            .take_while(|p| !self.is_colliding(*p))
            .count()
    }

    /// Moves the piece straight down until it rests.
    #[must_use]
    pub fn simulate_drop_position(&self, piece: Piece) -> Piece {
        let mut dropped = piece;
        while !self.is_colliding(dropped.down()) {
            dropped = dropped.down();
        }
        dropped
    }

    /// Parses a board from ASCII art.
    ///
    /// `#` is an occupied cell and `.` an empty one; whitespace is ignored and blank
    /// lines are skipped. Rows are listed top to bottom and aligned to the floor, so
    /// only the lower part of the board needs to be given.
    pub fn parse_ascii(art: &str) -> Result<Self, ParseBoardError> {
        let lines: Vec<&str> = art.lines().filter(|line| !line.trim().is_empty()).collect();
        if lines.len() > BOARD_HEIGHT {
            return Err(ParseBoardError::TooManyRows(lines.len()));
        }

        let mut board = Self::INITIAL;
        let offset = BOARD_HEIGHT - lines.len();
        for (row, line) in lines.iter().enumerate() {
            let cells: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if cells.len() != BOARD_WIDTH {
                return Err(ParseBoardError::RowWidth {
                    row,
                    width: cells.len(),
                });
            }
            for (x, &ch) in cells.iter().enumerate() {
                match ch {
                    '#' => board.rows[row + offset].occupy_cells(1 << x),
                    '.' => {}
                    _ => return Err(ParseBoardError::InvalidCell { row, ch }),
                }
            }
        }
        Ok(board)
    }

    /// Creates a `BitBoard` from ASCII art for tests and fixtures.
    ///
    /// See [`BitBoard::parse_ascii`] for the format.
    ///
    /// # Panics
    ///
    /// Panics if the art is malformed.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        match Self::parse_ascii(art) {
            Ok(board) => board,
            Err(e) => panic!("invalid board art: {e}"),
        }
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows.iter().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for occupied in row.iter_cells() {
                f.write_str(if occupied { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::piece::{PieceKind, PieceRotation, Pose};

    use super::*;

    fn piece(kind: PieceKind, x: i8, y: i8, rotation: u8) -> Piece {
        Piece::with_pose(kind, Pose::new(x, y, PieceRotation::new(rotation)))
    }

    #[test]
    fn test_initial_board_is_empty() {
        let board = BitBoard::INITIAL;
        assert!(board.rows().all(BitRow::is_empty));
        assert_eq!(board.column_heights(), [0; BOARD_WIDTH]);
        assert_eq!(board.max_height(), 0);
    }

    #[test]
    fn test_collision_with_walls_and_floor() {
        let board = BitBoard::INITIAL;
        assert!(!board.is_colliding(piece(PieceKind::I, 0, 0, 0)));
        assert!(!board.is_colliding(piece(PieceKind::I, 6, 0, 0)));
        assert!(board.is_colliding(piece(PieceKind::I, 7, 0, 0)));
        assert!(board.is_colliding(piece(PieceKind::I, -1, 0, 0)));

        // Vertical I resting on the floor
        assert!(!board.is_colliding(piece(PieceKind::I, 9, 16, 1)));
        assert!(board.is_colliding(piece(PieceKind::I, 9, 17, 1)));
    }

    #[test]
    fn test_rows_above_top_are_free() {
        let board = BitBoard::from_ascii(
            "
            ##########
            ",
        );
        assert!(!board.is_colliding(piece(PieceKind::I, 9, -3, 1)));
        assert!(!board.is_colliding(piece(PieceKind::O, 0, -2, 0)));
    }

    #[test]
    fn test_collision_with_locked_cells() {
        let board = BitBoard::from_ascii(
            "
            ....#.....
            ##########
            ",
        );
        assert!(board.is_colliding(piece(PieceKind::O, 3, 17, 0)));
        assert!(!board.is_colliding(piece(PieceKind::O, 5, 17, 0)));
        assert_eq!(board.drop_distance(piece(PieceKind::O, 0, 0, 0)), 17);
        assert_eq!(board.drop_distance(piece(PieceKind::O, 3, 0, 0)), 16);
    }

    #[test]
    fn test_rotation_occlusion_uses_union_box() {
        // The vertical I fits, but the horizontal box it sweeps contains a locked cell.
        let board = BitBoard::from_ascii(
            "
            ..#.......
            ..........
            ..........
            ..........
            ",
        );
        let horizontal = piece(PieceKind::I, 0, 16, 0);
        let vertical = horizontal.rotated();
        assert!(!board.is_colliding(vertical));
        assert!(board.is_rotation_occluded(horizontal, vertical));

        let far = piece(PieceKind::I, 4, 16, 0);
        assert!(!board.is_rotation_occluded(far, far.rotated()));
    }

    #[test]
    fn test_fill_piece_discards_cells_above_top() {
        let mut board = BitBoard::INITIAL;
        board.fill_piece(piece(PieceKind::I, 0, -2, 1));
        assert!(board.is_occupied(0, 0));
        assert!(board.is_occupied(0, 1));
        assert_eq!(board.column_heights()[0], 20);
        assert_eq!(board.rows().filter(|r| !r.is_empty()).count(), 2);
    }

    #[test]
    fn test_clear_lines_shifts_rows_down() {
        let mut board = BitBoard::from_ascii(
            "
            #.........
            ##########
            .#........
            ##########
            ",
        );
        assert_eq!(board.clear_lines(), 2);
        let expected = BitBoard::from_ascii(
            "
            #.........
            .#........
            ",
        );
        assert_eq!(board, expected);
    }

    #[test]
    fn test_clear_lines_with_partial_lines() {
        let mut board = BitBoard::from_ascii(
            "
            #########.
            ",
        );
        assert_eq!(board.clear_lines(), 0);
        assert_eq!(board.row(BOARD_HEIGHT - 1).iter_cells().filter(|c| *c).count(), 9);
    }

    #[test]
    fn test_column_heights() {
        let board = BitBoard::from_ascii(
            "
            #.........
            #...#.....
            #..##....#
            ",
        );
        assert_eq!(board.column_heights(), [3, 0, 0, 1, 2, 0, 0, 0, 0, 1]);
        assert_eq!(board.max_height(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            BitBoard::parse_ascii("#####"),
            Err(ParseBoardError::RowWidth { row: 0, width: 5 })
        );
        assert_eq!(
            BitBoard::parse_ascii("####x#####"),
            Err(ParseBoardError::InvalidCell { row: 0, ch: 'x' })
        );
        let tall = "..........\n".repeat(21);
        assert_eq!(
            BitBoard::parse_ascii(&tall),
            Err(ParseBoardError::TooManyRows(21))
        );
    }

    #[test]
    fn test_display_round_trip() {
        let board = BitBoard::from_ascii(
            "
            .#........
            ##.....###
            ",
        );
        assert_eq!(BitBoard::from_ascii(&board.to_string()), board);
    }

    #[test]
    fn test_bit_board_serialization() {
        let board = BitBoard::from_ascii(
            "
            ##........
            ",
        );
        let serialized = serde_json::to_string(&board).unwrap();
        assert!(serialized.starts_with("\"0000,"));
        assert!(serialized.ends_with(",0003\""));
        assert_eq!(serialized.len(), BOARD_HEIGHT * 4 + (BOARD_HEIGHT - 1) + 2);

        let deserialized: BitBoard = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, board);

        let outside = format!("\"{}\"", ["0400"; BOARD_HEIGHT].join(","));
        assert!(serde_json::from_str::<BitBoard>(&outside).is_err());
    }
}
