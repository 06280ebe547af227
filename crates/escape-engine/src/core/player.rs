use serde::{Deserialize, Serialize};

use super::{BOARD_HEIGHT, piece::Piece};

/// Rows above the player's head that still count as threatened.
pub const DANGER_HEADROOM: usize = 2;

/// Axis-aligned rectangle of grid cells.
///
/// `x`/`y` are the top-left cell; rows grow downward like the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl CellRect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (Ok(dx), Ok(dy)) = (usize::try_from(x - self.x), usize::try_from(y - self.y)) else {
            return false;
        };
        dx < self.width && dy < self.height
    }

    /// Checks whether any cell of the piece lies inside the rectangle.
    #[must_use]
    pub fn overlaps_piece(&self, piece: Piece) -> bool {
        piece.cells().any(|(x, y)| self.contains(x, y))
    }
}

/// Read-only view of the player character in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub hitbox: CellRect,
}

impl PlayerSnapshot {
    /// Player height in cells.
    pub const HEIGHT: usize = 2;

    /// A one-column player standing on top of a column of the given height.
    #[must_use]
    pub fn standing_on(column: usize, column_height: usize) -> Self {
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let (x, top) = (
            column as i32,
            BOARD_HEIGHT as i32 - column_height as i32 - Self::HEIGHT as i32,
        );
        Self {
            hitbox: CellRect::new(x, top, 1, Self::HEIGHT),
        }
    }

    /// Grid column under the left edge of the hitbox.
    #[must_use]
    pub fn column(&self) -> i32 {
        self.hitbox.x
    }

    /// Whether the piece overlaps the hitbox itself.
    #[must_use]
    pub fn collides_with(&self, piece: Piece) -> bool {
        self.hitbox.overlaps_piece(piece)
    }

    /// Region around the player in which a piece counts as threatening.
    ///
    /// Covers the hitbox columns from [`DANGER_HEADROOM`] rows above the head down to the
    /// feet.
    #[must_use]
    pub fn danger_zone(&self) -> DangerZone {
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let headroom = DANGER_HEADROOM as i32;
        DangerZone {
            region: CellRect::new(
                self.hitbox.x,
                self.hitbox.y - headroom,
                self.hitbox.width,
                self.hitbox.height + DANGER_HEADROOM,
            ),
        }
    }
}

/// Derived danger region used to penalize or forbid piece poses near the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerZone {
    pub region: CellRect,
}

impl DangerZone {
    /// Whether the piece at its pose overlaps the danger region.
    #[must_use]
    pub fn threatens(&self, piece: Piece) -> bool {
        self.region.overlaps_piece(piece)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::piece::{PieceKind, PieceRotation, Pose};

    use super::*;

    fn piece(kind: PieceKind, x: i8, y: i8) -> Piece {
        Piece::with_pose(kind, Pose::new(x, y, PieceRotation::SPAWN))
    }

    #[test]
    fn test_standing_on_floor() {
        let player = PlayerSnapshot::standing_on(4, 0);
        assert_eq!(player.hitbox, CellRect::new(4, 18, 1, 2));
        assert_eq!(player.column(), 4);
    }

    #[test]
    fn test_danger_zone_extends_above_head() {
        let player = PlayerSnapshot::standing_on(4, 3);
        let zone = player.danger_zone();
        assert_eq!(zone.region, CellRect::new(4, 13, 1, 4));

        // O piece resting two rows above the head
        assert!(zone.threatens(piece(PieceKind::O, 3, 12)));
        assert!(!player.collides_with(piece(PieceKind::O, 3, 12)));
        // Entirely above the headroom
        assert!(!zone.threatens(piece(PieceKind::O, 3, 11)));
        // Beside the player
        assert!(!zone.threatens(piece(PieceKind::O, 5, 14)));
    }

    #[test]
    fn test_rect_contains_rejects_negative_offsets() {
        let rect = CellRect::new(2, 3, 2, 2);
        assert!(rect.contains(2, 3));
        assert!(rect.contains(3, 4));
        assert!(!rect.contains(1, 3));
        assert!(!rect.contains(4, 4));
        assert!(!rect.contains(2, 5));
    }
}
