//! Random-walk disruption used while sabotage is running.

use arrayvec::ArrayVec;
use escape_engine::{MoveCommand, Playfield};
use rand::{
    Rng,
    distr::{Bernoulli, Distribution as _},
};
use serde::Serialize;

use crate::difficulty::AiConstants;

/// Draws `true` with probability `p`; a probability outside `[0, 1]` never fires.
fn chance<R>(rng: &mut R, p: f64) -> bool
where
    R: Rng + ?Sized,
{
    Bernoulli::new(p).is_ok_and(|coin| coin.sample(rng))
}

/// Bounded random walk of the active piece, independent of the placement search.
///
/// Each step may flip the lateral direction, then tries a one-cell shift that way
/// (flipping instead when blocked), and occasionally rotates to the next variant.
/// Randomness comes from the caller's generator so a seeded run is reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErraticController {
    direction: i8,
}

impl Default for ErraticController {
    fn default() -> Self {
        Self { direction: 1 }
    }
}

impl ErraticController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lateral direction: `1` for right, `-1` for left.
    #[must_use]
    pub fn direction(&self) -> i8 {
        self.direction
    }

    fn flip(&mut self) {
        self.direction = -self.direction;
    }

    /// Performs one erratic step and returns the executed commands.
    pub fn step<P, R>(
        &mut self,
        field: &mut P,
        rng: &mut R,
        constants: &AiConstants,
    ) -> ArrayVec<MoveCommand, 2>
    where
        P: Playfield + ?Sized,
        R: Rng + ?Sized,
    {
        let mut executed = ArrayVec::new();
        let Some(piece) = field.active_piece() else {
            return executed;
        };

        if chance(rng, constants.erratic_flip_probability) {
            self.flip();
        }

        let shift = if self.direction > 0 {
            MoveCommand::ErraticRight
        } else {
            MoveCommand::ErraticLeft
        };
        if field.can_place_with_player(shift.apply_to(piece)) && field.apply(shift).is_ok() {
            executed.push(shift);
        } else {
            self.flip();
        }

        if chance(rng, constants.erratic_rotate_probability)
            && let Some(piece) = field.active_piece()
        {
            let rotated = MoveCommand::ErraticRotate.apply_to(piece);
            if rotated != piece
                && field.can_place_with_player(rotated)
                && !field.board().is_rotation_occluded(piece, rotated)
                && field.apply(MoveCommand::ErraticRotate).is_ok()
            {
                executed.push(MoveCommand::ErraticRotate);
            }
        }

        executed
    }
}
