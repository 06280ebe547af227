//! Decision orchestrator: per-tick state machine driving the active piece.
//!
//! The orchestrator owns the current target, the remaining path and the retarget
//! bookkeeping. Each [`Orchestrator::tick`] does at most one placement search and one
//! movement step:
//!
//! 1. Count how long the player has been threatened by the current target
//! 2. While sabotage runs in [`BehaviorMode::Erratic`], take a random step instead
//! 3. Replan if the player moved meaningfully (a retarget)
//! 4. Otherwise advance one step along the path
//!
//! # Path Execution
//!
//! Steps the piece has already passed (by gravity) or reached are dropped first. A
//! downward step is only forced in the middle of the fall: the first
//! `spawn_gravity_rows` after spawn and the last `landing_gravity_rows` before landing
//! are left to gravity. Horizontal and rotation steps respect the player's hitbox,
//! unless the piece already threatens the player, in which case only locked cells
//! count. A blocked step close to landing settles for the current column; further up it
//! triggers a fresh search.

use std::collections::VecDeque;

use arrayvec::ArrayVec;
use escape_engine::{MoveCommand, Piece, Playfield, Pose, PoseKey};
use rand::Rng;
use serde::Serialize;

use crate::{
    difficulty::Settings,
    erratic::ErraticController,
    placement_search::{DangerAvoidance, PlacementSearch, danger_reward},
    position_evaluator::PositionEvaluator,
};

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    /// Follow the searched path.
    #[default]
    #[display("targeting")]
    Targeting,
    /// Random walk while sabotage runs.
    #[display("erratic")]
    Erratic,
}

/// Mutable decision state.
///
/// Target, path and the danger flag belong to the current piece and are reset on
/// spawn; everything else persists across pieces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorState {
    pub move_count: u64,
    /// Target changes caused by player movement; decays the danger reward.
    pub retarget_count: u32,
    pub target: Option<Pose>,
    pub target_score: Option<f32>,
    pub path: VecDeque<Pose>,
    pub mode: BehaviorMode,
    pub erratic: ErraticController,
    /// The current path passes through the danger zone; only gravity moves the piece.
    pub path_through_danger: bool,
    /// Consecutive ticks the player has stood inside the target's danger zone.
    pub player_danger_ticks: u32,
    #[serde(skip)]
    pub last_target_key: Option<PoseKey>,
    pub last_player_column: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub searches: usize,
    /// Searches that found no terminal pose.
    pub stuck_searches: usize,
    pub retargets: usize,
    /// Searches triggered by a blocked step.
    pub replans: usize,
    pub settles: usize,
    pub erratic_moves: usize,
}

/// The opponent AI.
///
/// # Example
///
/// ```
/// use escape_ai::{difficulty::Settings, orchestrator::Orchestrator};
/// use escape_engine::{Arena, PieceSeed};
/// use rand::SeedableRng as _;
///
/// let mut arena = Arena::new(PieceSeed::from_u64(1));
/// let mut rng = rand_pcg::Pcg32::seed_from_u64(1);
/// let mut ai = Orchestrator::new(Settings::default());
/// ai.on_spawn(&arena);
/// ai.tick(&mut arena, &mut rng);
/// assert!(ai.state().target.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Orchestrator {
    settings: Settings,
    state: OrchestratorState,
    stats: OrchestratorStats,
}

impl Orchestrator {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: OrchestratorState::default(),
            stats: OrchestratorStats::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    #[must_use]
    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    /// Forgets all state, e.g. for a new session.
    pub fn reset(&mut self) {
        self.state = OrchestratorState::default();
        self.stats = OrchestratorStats::default();
    }

    /// Drops the previous piece's plan and searches for the new active piece.
    pub fn on_spawn<P>(&mut self, field: &P)
    where
        P: Playfield + ?Sized,
    {
        self.clear_plan();
        self.search(field, false);
    }

    /// Switches to the random walk; takes effect while the field reports sabotage.
    pub fn on_sabotage_start(&mut self) {
        self.state.mode = BehaviorMode::Erratic;
    }

    /// Runs one decision step and returns the executed commands.
    pub fn tick<P, R>(&mut self, field: &mut P, rng: &mut R) -> ArrayVec<MoveCommand, 2>
    where
        P: Playfield + ?Sized,
        R: Rng + ?Sized,
    {
        let mut executed = ArrayVec::new();
        let Some(piece) = field.active_piece() else {
            self.clear_plan();
            return executed;
        };
        self.state.move_count += 1;
        self.update_danger_ticks(field, piece);

        if self.state.mode.is_erratic() {
            if field.is_sabotaged() {
                let constants = &self.settings.constants;
                executed = self.state.erratic.step(field, rng, constants);
                self.stats.erratic_moves += executed.len();
                if field.drop_distance() < constants.fast_drop_height {
                    self.state.mode = BehaviorMode::Targeting;
                    self.search(field, false);
                }
                return executed;
            }
            self.state.mode = BehaviorMode::Targeting;
            self.search(field, false);
        }

        if self.player_moved_meaningfully(field) {
            self.search(field, true);
        }

        executed.extend(self.follow_path(field));
        executed
    }

    fn clear_plan(&mut self) {
        self.state.target = None;
        self.state.target_score = None;
        self.state.path.clear();
        self.state.path_through_danger = false;
    }

    fn update_danger_ticks<P>(&mut self, field: &P, piece: Piece)
    where
        P: Playfield + ?Sized,
    {
        let threatened = self
            .state
            .target
            .is_some_and(|target| field.is_in_danger_zone(Piece::with_pose(piece.kind(), target)));
        if threatened {
            self.state.player_danger_ticks += 1;
        } else {
            self.state.player_danger_ticks = 0;
        }
    }

    fn player_moved_meaningfully<P>(&self, field: &P) -> bool
    where
        P: Playfield + ?Sized,
    {
        let Some(column) = field.player_column() else {
            return false;
        };
        Some(column) != self.state.last_player_column
            && self.state.player_danger_ticks >= self.settings.config.danger_threshold
            && field.drop_distance() > self.settings.constants.retarget_distance
    }

    /// Replaces target and path with a fresh placement search.
    ///
    /// Uses the sabotage weights while sabotage runs. The danger zone is avoided
    /// whenever a player is present.
    fn search<P>(&mut self, field: &P, player_triggered: bool)
    where
        P: Playfield + ?Sized,
    {
        let Some(piece) = field.active_piece() else {
            self.clear_plan();
            return;
        };

        let outcome = {
            let settings = &self.settings;
            let config = if field.is_sabotaged() {
                &settings.sabotage
            } else {
                &settings.config
            };
            let evaluator = PositionEvaluator::new(config, &settings.constants);
            let reward = danger_reward(
                config,
                self.state.retarget_count,
                field.board().max_height(),
            );
            let danger = field
                .danger_zone()
                .map(|zone| DangerAvoidance::new(zone, reward));
            PlacementSearch::new(field.board(), piece, &evaluator)
                .with_danger(danger)
                .with_max_iterations(settings.constants.max_search_iterations)
                .run()
        };
        self.stats.searches += 1;
        self.state.path_through_danger = outcome.path_through_danger();

        match outcome.into_result() {
            Some(result) => {
                let key = result.target.key();
                if player_triggered && self.state.last_target_key.is_some_and(|last| last != key) {
                    self.state.retarget_count += 1;
                    self.stats.retargets += 1;
                    tracing::debug!(
                        target = ?result.target,
                        retarget_count = self.state.retarget_count,
                        "retargeted after player movement"
                    );
                }
                self.state.last_target_key = Some(key);
                self.state.target = Some(result.target);
                self.state.target_score = Some(result.score);
                self.state.path = result.path.into();
            }
            None => {
                self.stats.stuck_searches += 1;
                self.state.last_target_key = None;
                self.state.target = None;
                self.state.target_score = None;
                self.state.path.clear();
            }
        }

        if let Some(column) = field.player_column() {
            self.state.last_player_column = Some(column);
        }
    }

    fn follow_path<P>(&mut self, field: &mut P) -> Option<MoveCommand>
    where
        P: Playfield + ?Sized,
    {
        let piece = field.active_piece()?;
        let pose = piece.pose();
        while let Some(step) = self.state.path.front() {
            if step.y < pose.y || *step == pose {
                self.state.path.pop_front();
            } else {
                break;
            }
        }
        let next = *self.state.path.front()?;
        if self.state.path_through_danger {
            return None;
        }

        let config = &self.settings.config;
        if next.y > pose.y {
            if field.fall_step_count() < config.spawn_gravity_rows
                || field.drop_distance() <= config.landing_gravity_rows
            {
                return None;
            }
            let command = MoveCommand::ForcedDown;
            if field.can_place_with_player(piece.down()) && field.apply(command).is_ok() {
                tracing::trace!(piece = %piece, tag = %command.tag(), "executed move");
                return Some(command);
            }
            return None;
        }

        let command = if next.rotation != pose.rotation {
            Some(MoveCommand::Rotate(next.rotation))
        } else if next.x > pose.x {
            Some(MoveCommand::Right)
        } else if next.x < pose.x {
            Some(MoveCommand::Left)
        } else {
            None
        };
        if let Some(command) = command {
            let moved = command.apply_to(piece);
            let allowed = if field.is_in_danger_zone(piece) {
                field.can_place(moved)
            } else {
                field.can_place_with_player(moved)
            };
            if allowed && field.apply(command).is_ok() {
                tracing::trace!(piece = %piece, tag = %command.tag(), "executed move");
                return Some(command);
            }
        }

        let drop = field.drop_distance();
        if drop <= self.settings.constants.settle_distance {
            let landing = piece.pose();
            self.state.path.clear();
            self.state.target = Some(Pose {
                y: landing.y + i8::try_from(drop).unwrap_or(0),
                ..landing
            });
            self.stats.settles += 1;
        } else {
            self.stats.replans += 1;
            self.search(field, false);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use escape_engine::{Arena, BitBoard, PieceKind, PieceRotation, PieceSeed};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::difficulty::Difficulty;

    fn pose(x: i8, y: i8) -> Pose {
        Pose::new(x, y, PieceRotation::SPAWN)
    }

    fn arena_with_o(x: i8, y: i8) -> Arena {
        let mut arena = Arena::new(PieceSeed::from_u64(5));
        arena
            .set_active_piece(Piece::with_pose(PieceKind::O, pose(x, y)))
            .unwrap();
        arena
    }

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(11)
    }

    #[test]
    fn test_no_active_piece_is_a_no_op() {
        let mut arena = Arena::with_board(
            BitBoard::from_ascii(&"##########\n".repeat(20)),
            PieceSeed::from_u64(1),
        );
        assert!(arena.is_game_over());
        let mut ai = Orchestrator::new(Settings::default());
        ai.on_spawn(&arena);
        assert!(ai.tick(&mut arena, &mut rng()).is_empty());
        assert_eq!(ai.state().move_count, 0);
        assert_eq!(ai.state().target, None);
        assert_eq!(ai.stats().searches, 0);
    }

    #[test]
    fn test_moves_sideways_then_forces_descent_until_landing_band() {
        let mut arena = arena_with_o(4, 0);
        let mut ai = Orchestrator::new(Settings::preset(Difficulty::Normal));
        ai.on_spawn(&arena);
        assert_eq!(ai.state().target, Some(pose(0, 18)));
        assert_eq!(ai.state().path.front(), Some(&pose(3, 0)));

        let mut rng = rng();
        for _ in 0..30 {
            ai.tick(&mut arena, &mut rng);
        }
        // Gravity owns the last four rows on normal.
        assert_eq!(arena.active_piece().unwrap().pose(), pose(0, 14));
        assert_eq!(arena.move_log().as_str(), format!("llll{}", "d".repeat(14)));
        assert_eq!(arena.fall_step_count(), 14);
    }

    #[test]
    fn test_spawn_band_waits_for_gravity() {
        let mut settings = Settings::preset(Difficulty::Normal);
        settings.config.spawn_gravity_rows = 3;
        let mut arena = arena_with_o(0, 0);
        let mut ai = Orchestrator::new(settings);
        ai.on_spawn(&arena);
        assert!(ai.tick(&mut arena, &mut rng()).is_empty());

        for _ in 0..3 {
            assert!(arena.tick_gravity().is_fell());
        }
        assert_eq!(
            ai.tick(&mut arena, &mut rng()).as_slice(),
            [MoveCommand::ForcedDown]
        );
    }

    #[test]
    fn test_path_through_danger_freezes_voluntary_moves() {
        let mut arena = arena_with_o(4, 15);
        arena.place_player(4).unwrap();
        let mut ai = Orchestrator::new(Settings::default());
        ai.on_spawn(&arena);
        assert!(ai.state().path_through_danger);
        assert!(ai.tick(&mut arena, &mut rng()).is_empty());
        assert!(arena.move_log().is_empty());
    }

    #[test]
    fn test_blocked_step_near_landing_settles() {
        let mut arena = arena_with_o(1, 17);
        let mut ai = Orchestrator::new(Settings::default());
        ai.on_spawn(&arena);
        assert_eq!(ai.state().target, Some(pose(0, 18)));

        arena.place_player(0).unwrap();
        assert!(ai.tick(&mut arena, &mut rng()).is_empty());
        assert_eq!(ai.state().target, Some(pose(1, 18)));
        assert!(ai.state().path.is_empty());
        assert_eq!(ai.stats().settles, 1);
        assert_eq!(ai.stats().searches, 1);
    }

    #[test]
    fn test_player_movement_into_target_triggers_retarget() {
        let mut arena = arena_with_o(4, 0);
        arena.place_player(0).unwrap();
        let mut ai = Orchestrator::new(Settings::preset(Difficulty::Easy));
        ai.on_spawn(&arena);
        // The left corner would threaten the player.
        assert_eq!(ai.state().target, Some(pose(8, 18)));
        assert_eq!(ai.state().last_player_column, Some(0));

        let mut rng = rng();
        ai.tick(&mut arena, &mut rng);
        arena.place_player(9).unwrap();
        ai.tick(&mut arena, &mut rng);

        assert_eq!(ai.state().retarget_count, 1);
        assert_eq!(ai.stats().retargets, 1);
        assert_eq!(ai.state().target, Some(pose(0, 18)));
        assert_eq!(ai.state().last_player_column, Some(9));

        // Standing still does not count again.
        ai.tick(&mut arena, &mut rng);
        assert_eq!(ai.state().retarget_count, 1);
    }

    #[test]
    fn test_erratic_until_fast_drop_height() {
        let mut arena = arena_with_o(4, 0);
        let settings = Settings::default();
        let mut ai = Orchestrator::new(settings.clone());
        ai.on_spawn(&arena);
        assert!(arena.start_sabotage(
            settings.config.sabotage_duration(),
            settings.config.sabotage_cooldown()
        ));
        ai.on_sabotage_start();

        let mut rng = rng();
        ai.tick(&mut arena, &mut rng);
        assert!(ai.state().mode.is_erratic());
        assert!(!arena.move_log().as_str().contains(['l', 'r', 'd']));

        arena
            .set_active_piece(Piece::with_pose(PieceKind::O, pose(4, 14)))
            .unwrap();
        ai.tick(&mut arena, &mut rng);
        assert!(ai.state().mode.is_targeting());
        assert_eq!(ai.stats().searches, 2);
    }

    #[test]
    fn test_erratic_ends_with_sabotage() {
        let mut arena = arena_with_o(4, 0);
        let mut ai = Orchestrator::new(Settings::default());
        ai.on_spawn(&arena);
        ai.on_sabotage_start();
        // No sabotage timer is running, so the AI keeps targeting.
        ai.tick(&mut arena, &mut rng());
        assert!(ai.state().mode.is_targeting());
        assert_eq!(arena.move_log().as_str(), "l");
    }

    #[test]
    fn test_spawn_resets_plan_but_keeps_bookkeeping() {
        let mut arena = arena_with_o(4, 15);
        arena.place_player(4).unwrap();
        let mut ai = Orchestrator::new(Settings::default());
        ai.on_spawn(&arena);
        assert!(ai.state().path_through_danger);

        let mut arena = arena_with_o(4, 0);
        ai.on_spawn(&arena);
        assert!(!ai.state().path_through_danger);
        assert_eq!(ai.state().last_player_column, Some(4));
        ai.tick(&mut arena, &mut rng());
        assert_eq!(ai.state().move_count, 1);
    }
}
