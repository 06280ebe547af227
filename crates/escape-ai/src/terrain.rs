//! Terrain traversability: which cliffs the player can still climb around.
//!
//! A funnel is a run of columns sloping down from a board edge. Cliffs inside a funnel
//! can be approached from the low side, so they are only mildly penalized, more so the
//! further they sit from the edge. Any other cliff splits the board in two.

use arrayvec::ArrayVec;
use escape_engine::BOARD_WIDTH;
use serde::Serialize;

use crate::difficulty::DifficultyConfig;

const MID: usize = BOARD_WIDTH / 2;

/// How far the edge funnels reach into the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunnelBounds {
    /// Last column of the non-increasing run starting at column 0.
    pub left_valid_until: usize,
    /// First column of the non-increasing run starting at the last column.
    pub right_valid_until: usize,
}

impl FunnelBounds {
    #[must_use]
    pub fn from_heights(heights: &[u8; BOARD_WIDTH]) -> Self {
        let left_valid_until = (1..BOARD_WIDTH)
            .take_while(|&x| heights[x] <= heights[x - 1])
            .last()
            .unwrap_or(0);
        let right_valid_until = (0..BOARD_WIDTH - 1)
            .rev()
            .take_while(|&x| heights[x] <= heights[x + 1])
            .last()
            .unwrap_or(BOARD_WIDTH - 1);
        Self {
            left_valid_until,
            right_valid_until,
        }
    }

    /// Whether the cliff between `higher` and its neighbour `lower` lies inside a funnel.
    ///
    /// The half of the board holding the higher column decides which funnel applies.
    #[must_use]
    pub fn contains_cliff(&self, higher: usize, lower: usize) -> bool {
        if higher <= MID {
            higher < lower && self.left_valid_until >= lower
        } else {
            higher > lower && self.right_valid_until <= lower
        }
    }
}

/// A height jump of at least the cliff threshold between columns `x` and `x + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cliff {
    pub x: usize,
    pub height_diff: u8,
    pub higher_column: usize,
    pub is_funnel: bool,
    pub distance_from_edge: usize,
    pub penalty: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainAnalysis {
    pub bounds: FunnelBounds,
    pub cliffs: ArrayVec<Cliff, { BOARD_WIDTH - 1 }>,
    pub penalty: f32,
}

impl TerrainAnalysis {
    #[must_use]
    pub fn from_heights(
        heights: &[u8; BOARD_WIDTH],
        cliff_height_threshold: u8,
        config: &DifficultyConfig,
    ) -> Self {
        let bounds = FunnelBounds::from_heights(heights);
        let mut cliffs = ArrayVec::new();

        for x in 0..BOARD_WIDTH - 1 {
            let (left, right) = (heights[x], heights[x + 1]);
            let height_diff = left.abs_diff(right);
            if height_diff < cliff_height_threshold {
                continue;
            }
            let (higher, lower) = if left > right { (x, x + 1) } else { (x + 1, x) };
            let is_funnel = bounds.contains_cliff(higher, lower);
            let distance_from_edge = higher.min(BOARD_WIDTH - 1 - higher);
            let penalty = if is_funnel {
                #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let exponent = distance_from_edge as i32;
                config.funnel_penalty_base * 2f32.powi(exponent)
            } else {
                config.split_penalty
            };
            cliffs.push(Cliff {
                x,
                height_diff,
                higher_column: higher,
                is_funnel,
                distance_from_edge,
                penalty,
            });
        }

        let penalty = cliffs.iter().map(|c| c.penalty).sum();
        Self {
            bounds,
            cliffs,
            penalty,
        }
    }
}
