//! Headless sessions: the opponent AI playing against a wandering player.
//!
//! [`SessionRunner`] couples an [`Arena`] with an [`Orchestrator`] on a fixed simulated
//! tick. Gravity, AI decisions and player steps each fire every N ticks, where N is
//! their interval divided by the tick length. All randomness (pieces, the player and the
//! erratic walk) derives from a single [`PieceSeed`], so a seed fully determines a run.

use std::time::Duration;

use escape_engine::{
    Arena, ArenaState, ArenaStats, BOARD_WIDTH, BitBoard, BlockBoard, GameOverCause,
    GravityOutcome, MoveLog, PieceSeed, Playfield,
};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::{
    difficulty::{Difficulty, Settings},
    orchestrator::{Orchestrator, OrchestratorStats},
};

const PLAYER_STREAM: u64 = 1;
const AI_STREAM: u64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Length of one simulated tick.
    pub tick: Duration,
    pub max_ticks: u64,
    /// Start sabotage whenever the cooldown allows.
    pub auto_sabotage: bool,
    /// Put a player on the board.
    pub with_player: bool,
    /// Time between player steps.
    pub player_step_interval: Duration,
    /// Chance that the player turns around instead of continuing.
    pub player_turn_probability: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            max_ticks: 20_000,
            auto_sabotage: false,
            with_player: true,
            player_step_interval: Duration::from_millis(400),
            player_turn_probability: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The tick budget ran out with the game still going.
    Survived,
    GameOver(GameOverCause),
}

/// Summary of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub difficulty: Difficulty,
    pub seed: PieceSeed,
    pub ticks: u64,
    pub simulated_ms: u128,
    pub outcome: SessionOutcome,
    pub pieces: usize,
    pub sabotaged_pieces: usize,
    pub lines: usize,
    pub sabotages: usize,
    pub player_steps: usize,
    pub arena: ArenaStats,
    pub ai: OrchestratorStats,
    pub retarget_count: u32,
    pub move_log: MoveLog,
    pub final_board: BlockBoard,
}

/// Number of ticks between two events of the given interval; at least one.
fn ticks_per(interval: Duration, tick: Duration) -> u64 {
    if tick.is_zero() {
        return 1;
    }
    u64::try_from(interval.as_nanos() / tick.as_nanos())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[derive(Debug)]
pub struct SessionRunner {
    arena: Arena,
    ai: Orchestrator,
    config: SessionConfig,
    seed: PieceSeed,
    player_rng: Pcg32,
    ai_rng: Pcg32,
    player_direction: i8,
    ticks: u64,
    gravity_every: u64,
    ai_every: u64,
    player_every: u64,
    sabotages: usize,
    player_steps: usize,
}

impl SessionRunner {
    #[must_use]
    pub fn new(settings: Settings, seed: PieceSeed, config: SessionConfig) -> Self {
        Self::with_board(settings, BitBoard::INITIAL, seed, config)
    }

    #[must_use]
    pub fn with_board(
        settings: Settings,
        board: BitBoard,
        seed: PieceSeed,
        config: SessionConfig,
    ) -> Self {
        let mut arena = Arena::with_board(board, seed);
        let mut player_rng = seed.rng_for_stream(PLAYER_STREAM);
        if config.with_player {
            let column = player_rng.random_range(0..BOARD_WIDTH);
            if let Err(e) = arena.place_player(column) {
                tracing::warn!(column, "failed to place player: {e}");
            }
        }

        let gravity_every = ticks_per(settings.config.base_fall_tick(), config.tick);
        let ai_every = ticks_per(settings.config.ai_move_interval(), config.tick);
        let player_every = ticks_per(config.player_step_interval, config.tick);

        let mut ai = Orchestrator::new(settings);
        ai.on_spawn(&arena);

        Self {
            arena,
            ai,
            config,
            seed,
            player_rng,
            ai_rng: seed.rng_for_stream(AI_STREAM),
            player_direction: 1,
            ticks: 0,
            gravity_every,
            ai_every,
            player_every,
            sabotages: 0,
            player_steps: 0,
        }
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.ai
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.arena.is_game_over() || self.ticks >= self.config.max_ticks
    }

    /// Advances the session by one tick; returns whether it can continue.
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.ticks += 1;
        self.arena.advance_time(self.config.tick);

        if self.config.auto_sabotage {
            self.try_start_sabotage();
        }
        if self.ticks % self.player_every == 0 {
            self.step_player();
        }
        if self.ticks % self.ai_every == 0 {
            self.ai.tick(&mut self.arena, &mut self.ai_rng);
        }
        if self.ticks % self.gravity_every == 0 {
            match self.arena.tick_gravity() {
                GravityOutcome::Locked { cleared_lines } => {
                    tracing::debug!(
                        tick = self.ticks,
                        cleared_lines,
                        pieces = self.arena.stats().completed_pieces(),
                        "piece locked"
                    );
                    if !self.arena.is_game_over() {
                        self.ai.on_spawn(&self.arena);
                    }
                }
                GravityOutcome::Fell | GravityOutcome::Deferred | GravityOutcome::Idle => {}
            }
        }

        if let ArenaState::GameOver(cause) = self.arena.state() {
            tracing::debug!(tick = self.ticks, %cause, "session over");
        }
        !self.is_finished()
    }

    /// Runs until game over or the tick budget is spent.
    #[must_use]
    pub fn run(mut self) -> SessionReport {
        while self.step() {}
        self.into_report()
    }

    #[must_use]
    pub fn into_report(self) -> SessionReport {
        let stats = self.arena.stats().clone();
        let outcome = match self.arena.state() {
            ArenaState::Playing => SessionOutcome::Survived,
            ArenaState::GameOver(cause) => SessionOutcome::GameOver(cause),
        };
        SessionReport {
            difficulty: self.ai.settings().difficulty,
            seed: self.seed,
            ticks: self.ticks,
            simulated_ms: self.config.tick.as_millis() * u128::from(self.ticks),
            outcome,
            pieces: stats.completed_pieces(),
            sabotaged_pieces: stats.sabotaged_pieces(),
            lines: stats.total_cleared_lines(),
            sabotages: self.sabotages,
            player_steps: self.player_steps,
            ai: *self.ai.stats(),
            retarget_count: self.ai.state().retarget_count,
            move_log: self.arena.move_log().clone(),
            final_board: self.arena.blocks().clone(),
            arena: stats,
        }
    }

    fn try_start_sabotage(&mut self) {
        let config = &self.ai.settings().config;
        let (duration, cooldown) = (config.sabotage_duration(), config.sabotage_cooldown());
        if self.arena.start_sabotage(duration, cooldown) {
            self.sabotages += 1;
            self.ai.on_sabotage_start();
            tracing::debug!(tick = self.ticks, "sabotage started");
        }
    }

    fn step_player(&mut self) {
        if self.arena.player().is_none() {
            return;
        }
        if self
            .player_rng
            .random_bool(self.config.player_turn_probability)
        {
            self.player_direction = -self.player_direction;
        }
        if self.arena.step_player(self.player_direction) {
            self.player_steps += 1;
        } else {
            self.player_direction = -self.player_direction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short() -> SessionConfig {
        SessionConfig {
            max_ticks: 2_000,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_ticks_per_interval() {
        let tick = Duration::from_millis(50);
        assert_eq!(ticks_per(Duration::from_millis(550), tick), 11);
        assert_eq!(ticks_per(Duration::from_millis(20), tick), 1);
        assert_eq!(ticks_per(Duration::from_millis(100), Duration::ZERO), 1);
    }

    #[test]
    fn test_same_seed_same_report() {
        let run = || {
            let report = SessionRunner::new(
                Settings::preset(Difficulty::Hard),
                PieceSeed::from_u64(17),
                short(),
            )
            .run();
            serde_json::to_value(report).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_session_places_pieces() {
        let report = SessionRunner::new(Settings::default(), PieceSeed::from_u64(3), short()).run();
        assert!(report.ticks <= 2_000);
        assert!(report.pieces > 0);
        assert!(report.ai.searches >= report.pieces);
        assert!(!report.move_log.is_empty());
        if report.outcome == SessionOutcome::Survived {
            assert_eq!(report.ticks, 2_000);
        }
    }

    #[test]
    fn test_auto_sabotage_drives_erratic_moves() {
        let config = SessionConfig {
            auto_sabotage: true,
            ..short()
        };
        let report = SessionRunner::new(Settings::default(), PieceSeed::from_u64(9), config).run();
        assert!(report.sabotages > 0);
        assert!(report.ai.erratic_moves > 0);
        assert!(report.sabotaged_pieces <= report.pieces);
    }

    #[test]
    fn test_without_player_nobody_is_crushed() {
        let config = SessionConfig {
            with_player: false,
            ..short()
        };
        let mut runner = SessionRunner::new(Settings::default(), PieceSeed::from_u64(4), config);
        assert!(runner.arena().player().is_none());
        while runner.step() {}
        let report = runner.into_report();
        assert_ne!(
            report.outcome,
            SessionOutcome::GameOver(GameOverCause::PlayerCrushed)
        );
        assert_eq!(report.player_steps, 0);
    }
}
