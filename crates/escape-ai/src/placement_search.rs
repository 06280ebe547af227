//! Breadth-first search over reachable piece poses.
//!
//! Starting from the active piece's pose, the search expands each pose with four
//! atomic transitions in a fixed priority order: left, right, rotate to the next
//! variant, down. Every pose that cannot move further down is a terminal pose and gets
//! scored; the best terminal pose becomes the target and its parent chain becomes the
//! path.
//!
//! # Determinism
//!
//! The expansion order is fixed and the best score is replaced only on a strictly
//! greater score, so ties keep the first terminal pose discovered. Identical inputs
//! always produce the same target, score and path.
//!
//! # Danger Avoidance
//!
//! With a [`DangerAvoidance`] attached, a transition from a safe pose into the danger
//! zone is rejected. Once a pose already overlaps the zone every transition stays
//! eligible so the search can find a way out; poses reached that way are marked, and
//! reaching any terminal pose through such a step flags the whole outcome as
//! path-through-danger.

use std::collections::{HashMap, VecDeque, hash_map::Entry};

use escape_engine::{BOARD_HEIGHT, BitBoard, DangerZone, Piece, Pose, PoseKey};
use serde::Serialize;

use crate::{
    difficulty::DifficultyConfig, placement_analysis::PlacementAnalysis,
    position_evaluator::PlacementEvaluator,
};

/// Default bound on dequeued poses per search.
pub const DEFAULT_MAX_ITERATIONS: usize = 4000;

/// The chosen landing pose and the steps leading to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementResult {
    pub target: Pose,
    pub score: f32,
    /// Poses from the start pose (exclusive) to the target (inclusive).
    ///
    /// Adjacent poses differ by exactly one atomic transition.
    pub path: Vec<Pose>,
}

/// How the danger zone treats a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Transition {
    Allowed,
    /// Both poses overlap the zone; allowed so the piece can get out.
    ThroughDanger,
    /// Safe pose into the zone.
    Rejected,
}

/// Danger-zone steering for one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DangerAvoidance {
    pub zone: DangerZone,
    /// Added to the score of terminal poses that threaten the player.
    pub reward: f32,
}

impl DangerAvoidance {
    #[must_use]
    pub fn new(zone: DangerZone, reward: f32) -> Self {
        Self { zone, reward }
    }

    #[must_use]
    pub fn classify(&self, from: Piece, to: Piece) -> Transition {
        if !self.zone.threatens(to) {
            Transition::Allowed
        } else if self.zone.threatens(from) {
            Transition::ThroughDanger
        } else {
            Transition::Rejected
        }
    }

    fn addend(&self, piece: Piece) -> f32 {
        if self.zone.threatens(piece) {
            self.reward
        } else {
            0.0
        }
    }
}

/// Danger-zone reward after retarget decay and height attenuation.
///
/// The base reward decays geometrically with every player-triggered retarget, then
/// shrinks linearly toward zero as the stack rises. The result is never positive.
#[must_use]
pub fn danger_reward(config: &DifficultyConfig, retarget_count: u32, max_height: u8) -> f32 {
    let exponent = i32::try_from(retarget_count).unwrap_or(i32::MAX);
    let reward = config.danger_zone_reward * config.danger_zone_decay.powi(exponent);
    #[expect(clippy::cast_precision_loss)]
    let rows = BOARD_HEIGHT as f32;
    f32::min(0.0, reward - f32::from(max_height) * reward / rows)
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    parent: Option<PoseKey>,
    through_danger: bool,
}

/// Result of a [`PlacementSearch`] run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    result: Option<PlacementResult>,
    path_through_danger: bool,
    iterations: usize,
    visits: HashMap<PoseKey, Visit>,
}

impl SearchOutcome {
    /// The best terminal pose, or `None` when no terminal pose was found.
    #[must_use]
    pub fn result(&self) -> Option<&PlacementResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn into_result(self) -> Option<PlacementResult> {
        self.result
    }

    #[must_use]
    pub fn path_through_danger(&self) -> bool {
        self.path_through_danger
    }

    /// Number of poses dequeued.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Every pose accepted into the search, including the start pose.
    pub fn visited_poses(&self) -> impl Iterator<Item = Pose> + '_ {
        self.visits.keys().map(|key| Pose::from(*key))
    }

    /// The pose from which `pose` was first reached; `None` for the start pose.
    #[must_use]
    pub fn parent_of(&self, pose: Pose) -> Option<Pose> {
        self.visits
            .get(&pose.key())
            .and_then(|visit| visit.parent)
            .map(Pose::from)
    }
}

/// A single BFS placement search.
///
/// # Example
///
/// ```
/// use escape_ai::{
///     difficulty::{AiConstants, DifficultyConfig},
///     placement_search::PlacementSearch,
///     position_evaluator::PositionEvaluator,
/// };
/// use escape_engine::{BitBoard, Piece, PieceKind};
///
/// let config = DifficultyConfig::NORMAL;
/// let constants = AiConstants::default();
/// let evaluator = PositionEvaluator::new(&config, &constants);
/// let outcome = PlacementSearch::new(&BitBoard::INITIAL, Piece::new(PieceKind::O), &evaluator).run();
/// assert_eq!(outcome.result().unwrap().target.y, 18);
/// ```
#[derive(Debug)]
pub struct PlacementSearch<'a, E: ?Sized> {
    board: &'a BitBoard,
    start: Piece,
    evaluator: &'a E,
    danger: Option<DangerAvoidance>,
    max_iterations: usize,
}

impl<'a, E> PlacementSearch<'a, E>
where
    E: PlacementEvaluator + ?Sized,
{
    #[must_use]
    pub fn new(board: &'a BitBoard, start: Piece, evaluator: &'a E) -> Self {
        Self {
            board,
            start,
            evaluator,
            danger: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[must_use]
    pub fn with_danger(mut self, danger: Option<DangerAvoidance>) -> Self {
        self.danger = danger;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn run(&self) -> SearchOutcome {
        let board = self.board;
        let mut visits = HashMap::new();
        let mut queue = VecDeque::new();
        let mut best: Option<(Piece, f32)> = None;
        let mut path_through_danger = false;
        let mut iterations = 0;

        if board.is_colliding(self.start) {
            tracing::warn!(start = %self.start, "search started from a colliding pose");
        } else {
            visits.insert(
                self.start.pose().key(),
                Visit {
                    parent: None,
                    through_danger: false,
                },
            );
            queue.push_back(self.start);
        }

        while iterations < self.max_iterations {
            let Some(current) = queue.pop_front() else {
                break;
            };
            iterations += 1;
            let reached_through_danger = visits
                .get(&current.pose().key())
                .is_some_and(|visit| visit.through_danger);

            if board.is_colliding(current.down()) {
                let analysis = PlacementAnalysis::from_board(board, current);
                let addend = self.danger.map_or(0.0, |danger| danger.addend(current));
                let score = self.evaluator.evaluate_placement(&analysis) + addend;
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((current, score));
                }
                path_through_danger |= reached_through_danger;
            }

            for next in [
                current.left(),
                current.right(),
                current.rotated(),
                current.down(),
            ] {
                let Entry::Vacant(entry) = visits.entry(next.pose().key()) else {
                    continue;
                };
                let transition = self
                    .danger
                    .map_or(Transition::Allowed, |danger| danger.classify(current, next));
                if transition.is_rejected() {
                    continue;
                }
                let is_rotation = next.pose().rotation != current.pose().rotation;
                if board.is_colliding(next)
                    || (is_rotation && board.is_rotation_occluded(current, next))
                {
                    continue;
                }
                entry.insert(Visit {
                    parent: Some(current.pose().key()),
                    through_danger: reached_through_danger || transition.is_through_danger(),
                });
                queue.push_back(next);
            }
        }

        let result = best.map(|(target, score)| PlacementResult {
            target: target.pose(),
            score,
            path: backtrace(&visits, target.pose()),
        });

        match &result {
            Some(result) => tracing::debug!(
                piece = %self.start,
                target = ?result.target,
                score = result.score,
                iterations,
                path_through_danger,
                "placement search finished"
            ),
            None => tracing::warn!(
                piece = %self.start,
                iterations,
                "placement search found no terminal pose"
            ),
        }

        SearchOutcome {
            result,
            path_through_danger,
            iterations,
            visits,
        }
    }
}

fn backtrace(visits: &HashMap<PoseKey, Visit>, target: Pose) -> Vec<Pose> {
    let mut path = vec![];
    let mut key = target.key();
    loop {
        let Some(visit) = visits.get(&key) else {
            tracing::warn!(pose = ?Pose::from(key), "missing parent entry, truncating path");
            break;
        };
        let Some(parent) = visit.parent else {
            break;
        };
        path.push(Pose::from(key));
        key = parent;
    }
    path.reverse();
    path
}
