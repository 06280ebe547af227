use std::time::Duration;

use serde::Serialize;

use crate::{
    PieceCollisionError, SpawnError,
    core::{
        BOARD_WIDTH,
        bit_board::BitBoard,
        block_board::{Block, BlockBoard},
        piece::{Piece, PieceKind},
        player::PlayerSnapshot,
    },
};

use super::{
    arena_stats::ArenaStats,
    move_log::MoveLog,
    piece_generator::{PieceGenerator, PieceSeed},
    playfield::{MoveCommand, Playfield},
};

/// Largest height difference the player can climb onto an adjacent column.
pub const MAX_CLIMBABLE_HEIGHT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum GameOverCause {
    #[display("new piece collided at spawn")]
    SpawnCollision,
    #[display("player crushed by a piece")]
    PlayerCrushed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ArenaState {
    Playing,
    GameOver(GameOverCause),
}

/// Result of one gravity step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum GravityOutcome {
    /// The active piece fell one row.
    Fell,
    /// The opponent already moved the piece down this tick.
    Deferred,
    /// The piece locked; a new one spawned unless the game ended.
    Locked { cleared_lines: usize },
    /// The game is over.
    Idle,
}

#[derive(Debug, Clone, Copy, Default)]
struct SabotageTimer {
    remaining: Duration,
    cooldown: Duration,
}

/// Reference grid authority: locked cells, the falling piece, the player and timers.
///
/// The arena owns all mutation. It moves the piece by gravity, executes commands
/// through [`Playfield::apply`], locks pieces, clears lines and keeps the colour board
/// in step with the bit board.
///
/// # Example
///
/// ```
/// use escape_engine::{Arena, GravityOutcome, PieceSeed, Playfield};
///
/// let mut arena = Arena::new(PieceSeed::from_u64(1));
/// assert_eq!(arena.active_piece().unwrap().pose().y, 0);
///
/// while !arena.tick_gravity().is_locked() {}
/// assert_eq!(arena.stats().completed_pieces(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Arena {
    board: BitBoard,
    blocks: BlockBoard,
    generator: PieceGenerator,
    active: Option<Piece>,
    active_sabotaged: bool,
    fall_step_count: usize,
    controlled_descent: bool,
    player: Option<PlayerSnapshot>,
    sabotage: SabotageTimer,
    stats: ArenaStats,
    move_log: MoveLog,
    state: ArenaState,
}

impl Arena {
    #[must_use]
    pub fn new(seed: PieceSeed) -> Self {
        Self::with_board(BitBoard::INITIAL, seed)
    }

    /// Starts from a preset board; the first piece spawns immediately.
    #[must_use]
    pub fn with_board(board: BitBoard, seed: PieceSeed) -> Self {
        let mut arena = Self {
            blocks: BlockBoard::from_bit_board(&board),
            board,
            generator: PieceGenerator::with_seed(seed),
            active: None,
            active_sabotaged: false,
            fall_step_count: 0,
            controlled_descent: false,
            player: None,
            sabotage: SabotageTimer::default(),
            stats: ArenaStats::new(),
            move_log: MoveLog::new(),
            state: ArenaState::Playing,
        };
        let kind = arena.generator.pop_next();
        // A full preset board ends the game right away; the state records it.
        let _ = arena.spawn(kind);
        arena
    }

    #[must_use]
    pub fn blocks(&self) -> &BlockBoard {
        &self.blocks
    }

    #[must_use]
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    #[must_use]
    pub fn move_log(&self) -> &MoveLog {
        &self.move_log
    }

    #[must_use]
    pub fn state(&self) -> ArenaState {
        self.state
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    #[must_use]
    pub fn next_piece(&self) -> PieceKind {
        self.generator.peek_next()
    }

    #[must_use]
    pub fn sabotage_remaining(&self) -> Duration {
        self.sabotage.remaining
    }

    #[must_use]
    pub fn sabotage_cooldown(&self) -> Duration {
        self.sabotage.cooldown
    }

    /// Replaces the active piece with a freshly spawned piece of the given kind.
    ///
    /// Ends the game when the spawn position is blocked.
    pub fn spawn(&mut self, kind: PieceKind) -> Result<Piece, SpawnError> {
        if self.is_game_over() {
            return Err(SpawnError::GameOver);
        }
        let piece = Piece::new(kind);
        self.fall_step_count = 0;
        self.controlled_descent = false;
        self.active_sabotaged = self.is_sabotaged();
        if self.board.is_colliding(piece) {
            self.active = None;
            self.state = ArenaState::GameOver(GameOverCause::SpawnCollision);
            return Err(SpawnError::Collision);
        }
        self.active = Some(piece);
        self.check_player_crushed(piece);
        Ok(piece)
    }

    /// Moves the active piece to an arbitrary pose, e.g. for scenario setup.
    pub fn set_active_piece(&mut self, piece: Piece) -> Result<(), PieceCollisionError> {
        if self.is_game_over() || self.board.is_colliding(piece) {
            return Err(PieceCollisionError);
        }
        self.active = Some(piece);
        Ok(())
    }

    /// Puts the player on top of the given column.
    pub fn place_player(&mut self, column: usize) -> Result<(), PieceCollisionError> {
        if column >= BOARD_WIDTH {
            return Err(PieceCollisionError);
        }
        let player = self.player_standing_on(column);
        if self.active.is_some_and(|piece| player.collides_with(piece)) {
            return Err(PieceCollisionError);
        }
        self.player = Some(player);
        Ok(())
    }

    /// Steps the player one column left (`-1`) or right (`1`).
    ///
    /// Dropping down any height is allowed; climbing is limited to
    /// [`MAX_CLIMBABLE_HEIGHT`] rows. Returns whether the player moved.
    pub fn step_player(&mut self, direction: i8) -> bool {
        let Some(player) = self.player else {
            return false;
        };
        if self.is_game_over() {
            return false;
        }
        let Some(target) = usize::try_from(player.column() + i32::from(direction))
            .ok()
            .filter(|c| *c < BOARD_WIDTH)
        else {
            return false;
        };
        let heights = self.board.column_heights();
        let current = usize::try_from(player.column()).unwrap_or(0);
        let climb = usize::from(heights[target]).saturating_sub(usize::from(heights[current]));
        if climb > MAX_CLIMBABLE_HEIGHT {
            return false;
        }
        let moved = self.player_standing_on(target);
        if moved.hitbox.y < 0 || self.active.is_some_and(|piece| moved.collides_with(piece)) {
            return false;
        }
        self.player = Some(moved);
        true
    }

    /// Starts a sabotage period unless one is running or the cooldown is pending.
    ///
    /// The cooldown counts from activation. Returns whether sabotage started.
    pub fn start_sabotage(&mut self, duration: Duration, cooldown: Duration) -> bool {
        if self.is_game_over() || self.is_sabotaged() || !self.sabotage.cooldown.is_zero() {
            return false;
        }
        self.sabotage = SabotageTimer {
            remaining: duration,
            cooldown,
        };
        self.active_sabotaged = self.active.is_some();
        true
    }

    /// Advances the sabotage timers.
    pub fn advance_time(&mut self, elapsed: Duration) {
        self.sabotage.remaining = self.sabotage.remaining.saturating_sub(elapsed);
        self.sabotage.cooldown = self.sabotage.cooldown.saturating_sub(elapsed);
    }

    /// Applies gravity to the active piece: one row down, or lock and spawn.
    pub fn tick_gravity(&mut self) -> GravityOutcome {
        if self.is_game_over() {
            return GravityOutcome::Idle;
        }
        let Some(piece) = self.active else {
            return GravityOutcome::Idle;
        };
        if self.controlled_descent {
            self.controlled_descent = false;
            return GravityOutcome::Deferred;
        }

        let fallen = piece.down();
        if !self.board.is_colliding(fallen) {
            self.active = Some(fallen);
            self.fall_step_count += 1;
            self.check_player_crushed(fallen);
            return GravityOutcome::Fell;
        }

        let cleared_lines = self.lock(piece);
        let kind = self.generator.pop_next();
        let _ = self.spawn(kind);
        GravityOutcome::Locked { cleared_lines }
    }

    fn lock(&mut self, piece: Piece) -> usize {
        let block = if self.active_sabotaged {
            Block::Sabotaged(piece.kind())
        } else {
            Block::Piece(piece.kind())
        };
        self.board.fill_piece(piece);
        self.blocks.fill_piece(piece, block);
        let cleared_lines = self.board.clear_lines();
        let cleared_blocks = self.blocks.clear_lines();
        debug_assert_eq!(cleared_lines, cleared_blocks);
        self.stats
            .complete_piece_drop(cleared_lines, self.active_sabotaged);
        self.active = None;

        // The player rides the column it stands on.
        if let Some(player) = self.player
            && let Ok(column) = usize::try_from(player.column())
        {
            self.player = Some(self.player_standing_on(column));
        }
        cleared_lines
    }

    fn player_standing_on(&self, column: usize) -> PlayerSnapshot {
        let heights = self.board.column_heights();
        PlayerSnapshot::standing_on(column, usize::from(heights[column]))
    }

    fn check_player_crushed(&mut self, piece: Piece) {
        if self.player.is_some_and(|player| player.collides_with(piece)) {
            self.state = ArenaState::GameOver(GameOverCause::PlayerCrushed);
        }
    }
}

impl Playfield for Arena {
    fn board(&self) -> &BitBoard {
        &self.board
    }

    fn active_piece(&self) -> Option<Piece> {
        self.active
    }

    fn fall_step_count(&self) -> usize {
        self.fall_step_count
    }

    fn player(&self) -> Option<PlayerSnapshot> {
        self.player
    }

    fn is_sabotaged(&self) -> bool {
        !self.sabotage.remaining.is_zero()
    }

    fn apply(&mut self, command: MoveCommand) -> Result<(), PieceCollisionError> {
        if self.is_game_over() {
            return Err(PieceCollisionError);
        }
        let piece = self.active.ok_or(PieceCollisionError)?;
        let moved = command.apply_to(piece);
        if self.board.is_colliding(moved) {
            return Err(PieceCollisionError);
        }
        self.active = Some(moved);
        if command.is_forced_down() {
            self.fall_step_count += 1;
            self.controlled_descent = true;
        }
        self.move_log.record(command);
        self.check_player_crushed(moved);
        Ok(())
    }
}
