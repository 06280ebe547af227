use crate::{
    PieceCollisionError,
    core::{
        bit_board::BitBoard,
        piece::{Piece, PieceRotation},
        player::{DangerZone, PlayerSnapshot},
    },
};

/// An atomic action the opponent asks the playfield to perform on the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum MoveCommand {
    Left,
    Right,
    /// Rotate directly to the given shape variant.
    Rotate(PieceRotation),
    /// Downward step taken by the opponent instead of waiting for gravity.
    ForcedDown,
    ErraticLeft,
    ErraticRight,
    /// Rotation to the next variant during sabotage.
    ErraticRotate,
}

impl MoveCommand {
    /// Single-character move-log tag.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            MoveCommand::Left => 'l',
            MoveCommand::Right => 'r',
            MoveCommand::Rotate(_) => 'R',
            MoveCommand::ForcedDown => 'd',
            MoveCommand::ErraticLeft => 'E',
            MoveCommand::ErraticRight => 'e',
            MoveCommand::ErraticRotate => 'X',
        }
    }

    /// The piece after this command, without any collision check.
    #[must_use]
    pub fn apply_to(self, piece: Piece) -> Piece {
        match self {
            MoveCommand::Left | MoveCommand::ErraticLeft => piece.left(),
            MoveCommand::Right | MoveCommand::ErraticRight => piece.right(),
            MoveCommand::Rotate(rotation) => piece.with_rotation(rotation),
            MoveCommand::ForcedDown => piece.down(),
            MoveCommand::ErraticRotate => piece.rotated(),
        }
    }
}

/// Grid and physics authority the opponent reads from and acts through.
///
/// Implementors own the locked cells, the active piece and the player. The opponent only
/// reads snapshots through the query methods and mutates through [`Playfield::apply`].
pub trait Playfield {
    /// Locked cells.
    fn board(&self) -> &BitBoard;

    /// The falling piece, if one is in play.
    fn active_piece(&self) -> Option<Piece>;

    /// Rows the active piece has descended since it spawned.
    fn fall_step_count(&self) -> usize;

    fn player(&self) -> Option<PlayerSnapshot>;

    /// Whether a sabotage timer is currently running.
    fn is_sabotaged(&self) -> bool;

    /// Performs a move on the active piece and records it in the move log.
    ///
    /// Fails without side effects when the resulting pose overlaps locked cells or walls,
    /// or when there is no active piece.
    fn apply(&mut self, command: MoveCommand) -> Result<(), PieceCollisionError>;

    /// Whether the piece fits against locked cells and walls.
    fn can_place(&self, piece: Piece) -> bool {
        !self.board().is_colliding(piece)
    }

    /// Like [`Playfield::can_place`], but also rejects overlap with the player's hitbox.
    fn can_place_with_player(&self, piece: Piece) -> bool {
        self.can_place(piece) && !self.player().is_some_and(|p| p.collides_with(piece))
    }

    /// Rows the active piece can still fall; zero without an active piece.
    fn drop_distance(&self) -> usize {
        self.active_piece()
            .map_or(0, |piece| self.board().drop_distance(piece))
    }

    fn danger_zone(&self) -> Option<DangerZone> {
        self.player().map(|p| p.danger_zone())
    }

    /// Whether the piece threatens the player; always false without a player.
    fn is_in_danger_zone(&self, piece: Piece) -> bool {
        self.danger_zone().is_some_and(|zone| zone.threatens(piece))
    }

    fn player_column(&self) -> Option<i32> {
        self.player().map(|p| p.column())
    }
}
