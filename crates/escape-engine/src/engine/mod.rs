//! Grid authority and simulation host.
//!
//! - [`Playfield`] - The interface the opponent AI reads from and acts through
//! - [`MoveCommand`] - Atomic actions on the active piece, with move-log tags
//! - [`Arena`] - Reference [`Playfield`]: gravity, locking, line clears, player, sabotage
//! - [`ArenaStats`] - Locked pieces and cleared lines
//! - [`PieceGenerator`] / [`PieceSeed`] - Seeded uniform piece source
//! - [`MoveLog`] - Write-only log of executed moves
//!
//! # Game Flow
//!
//! 1. Create an [`Arena`] from a seed (optionally with a preset board)
//! 2. Place the player and let the opponent issue [`MoveCommand`]s
//! 3. Call [`Arena::tick_gravity`] at the fall interval; pieces lock and respawn there
//! 4. Repeat until a spawn is blocked or the player is crushed

pub use self::{arena::*, arena_stats::*, move_log::*, piece_generator::*, playfield::*};

mod arena;
mod arena_stats;
mod move_log;
mod piece_generator;
mod playfield;
