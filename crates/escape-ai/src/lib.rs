//! Opponent AI for Tetromino Escape: chooses where each falling piece should land and
//! steers it there, aiming to bury or crush the player.
//!
//! The crate is organized in layers, each built on the one below:
//!
//! ```text
//! Session (headless simulation against a wandering player)
//!     ↓ drives
//! Orchestrator (per-tick state machine: target, path, retargets, erratic mode)
//!     ↓ uses
//! Placement Search (BFS over reachable poses, danger avoidance)
//!     ↓ uses
//! Position Evaluator (weighted heuristic score of a placement)
//!     ↓ uses
//! Board / Terrain Analysis (heights, holes, transitions, funnels)
//! ```
//!
//! # Modules
//!
//! - [`difficulty`] - Weight tables per tier, fixed AI constants and [`Settings`](difficulty::Settings)
//! - [`board_analysis`] - Lazy-evaluated board metrics (heights, holes, transitions, bumpiness)
//! - [`terrain`] - Funnel and split detection on the column-height profile
//! - [`placement_analysis`] - Board state after a hypothetical lock, including line clears
//! - [`position_evaluator`] - Scores placements and explains the score term by term
//! - [`placement_search`] - Finds the best reachable terminal pose and the path to it
//! - [`erratic`] - Random walk used while sabotage is running
//! - [`orchestrator`] - Executes paths one step per tick and decides when to search again
//! - [`session`] - Runs a complete seeded game headlessly and reports the outcome
//!
//! # Determinism
//!
//! Given the same board, piece, player and settings, the search always returns the same
//! target, score and path. All randomness (the piece sequence, the erratic walk and the
//! simulated player) comes from generators seeded by a single
//! [`PieceSeed`](escape_engine::PieceSeed).
//!
//! # Example
//!
//! ```rust
//! use escape_ai::{
//!     difficulty::{Difficulty, Settings},
//!     session::{SessionConfig, SessionRunner},
//! };
//! use escape_engine::PieceSeed;
//!
//! let config = SessionConfig {
//!     max_ticks: 200,
//!     ..SessionConfig::default()
//! };
//! let report = SessionRunner::new(
//!     Settings::preset(Difficulty::Normal),
//!     PieceSeed::from_u64(42),
//!     config,
//! )
//! .run();
//! assert!(report.ticks <= 200);
//! ```

pub mod board_analysis;
pub mod difficulty;
pub mod erratic;
pub mod orchestrator;
pub mod placement_analysis;
pub mod placement_search;
pub mod position_evaluator;
pub mod session;
pub mod terrain;
