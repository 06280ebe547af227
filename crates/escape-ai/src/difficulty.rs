//! Difficulty tiers, their weight tables and the resolved AI settings.
//!
//! Every tier is an immutable [`DifficultyConfig`]. Positive weights reward a board
//! property, negative weights penalize it. The `sabotage` tier inverts most of the
//! stacking weights and is used while the player has triggered sabotage; it is not a
//! playable tier on its own, so its timing values are borrowed from `normal`.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Sabotage,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Normal, Self::Hard, Self::Sabotage];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Sabotage => "sabotage",
        }
    }

    /// Preset weight table of this tier.
    #[must_use]
    pub const fn config(self) -> DifficultyConfig {
        match self {
            Difficulty::Easy => DifficultyConfig::EASY,
            Difficulty::Normal => DifficultyConfig::NORMAL,
            Difficulty::Hard => DifficultyConfig::HARD,
            Difficulty::Sabotage => DifficultyConfig::SABOTAGE,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown difficulty {input:?} (expected easy, normal, hard or sabotage)")]
pub struct ParseDifficultyError {
    #[error(not(source))]
    input: String,
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseDifficultyError {
                input: s.to_owned(),
            })
    }
}

/// Weight table and pacing of one difficulty tier.
///
/// Missing fields in a JSON override fall back to the `normal` preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DifficultyConfig {
    /// Reward per completed line.
    pub line_reward: f32,
    /// Whether simultaneous clears earn the flat multi-line bonuses.
    pub multi_line_bonus: bool,
    pub hole_reward: f32,
    /// Weight per filled cell above each hole.
    pub hole_depth_reward: f32,
    /// Weight per hole, scaled by how high the hole sits.
    pub weighted_hole_reward: f32,
    pub rows_with_holes_reward: f32,
    pub col_transition_reward: f32,
    /// Weight of the aggregate column height.
    pub height_reward: f32,
    pub max_height_reward: f32,
    pub bumpiness_reward: f32,
    /// Funnel cliff penalty, doubled for each column away from the nearest edge.
    pub funnel_penalty_base: f32,
    /// Flat penalty for a cliff that splits the board.
    pub split_penalty: f32,
    /// Added to a placement that threatens the player.
    pub danger_zone_reward: f32,
    /// Geometric decay of the danger reward per player-triggered retarget.
    pub danger_zone_decay: f32,
    /// Rows after spawn during which only gravity moves the piece down.
    pub spawn_gravity_rows: usize,
    /// Rows before landing during which only gravity moves the piece down.
    pub landing_gravity_rows: usize,
    /// Opponent ticks the player must stay threatened before a retarget.
    pub danger_threshold: u32,
    pub base_fall_tick_ms: u64,
    pub ai_move_interval_ms: u64,
    pub sabotage_duration_secs: f32,
    pub sabotage_cooldown_secs: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl DifficultyConfig {
    pub const EASY: Self = Self {
        line_reward: 1.0,
        multi_line_bonus: false,
        hole_reward: -5.0,
        hole_depth_reward: 0.0,
        weighted_hole_reward: -1.0,
        rows_with_holes_reward: -5.0,
        col_transition_reward: -1.0,
        height_reward: 0.0,
        max_height_reward: 0.0,
        bumpiness_reward: -1.0,
        funnel_penalty_base: -30.0,
        split_penalty: -1000.0,
        danger_zone_reward: -500.0,
        danger_zone_decay: 1.0,
        spawn_gravity_rows: 0,
        landing_gravity_rows: 5,
        danger_threshold: 1,
        base_fall_tick_ms: 650,
        ai_move_interval_ms: 200,
        sabotage_duration_secs: 1.5,
        sabotage_cooldown_secs: 5.0,
    };

    pub const NORMAL: Self = Self {
        line_reward: 20.0,
        multi_line_bonus: false,
        hole_reward: -30.0,
        hole_depth_reward: -1.0,
        weighted_hole_reward: -3.0,
        rows_with_holes_reward: -15.0,
        col_transition_reward: -5.0,
        height_reward: -2.0,
        max_height_reward: -3.0,
        bumpiness_reward: -10.0,
        funnel_penalty_base: -20.0,
        split_penalty: -500.0,
        danger_zone_reward: -250.0,
        danger_zone_decay: 0.7,
        spawn_gravity_rows: 0,
        landing_gravity_rows: 4,
        danger_threshold: 2,
        base_fall_tick_ms: 550,
        ai_move_interval_ms: 100,
        sabotage_duration_secs: 1.5,
        sabotage_cooldown_secs: 10.0,
    };

    pub const HARD: Self = Self {
        line_reward: 200.0,
        multi_line_bonus: true,
        hole_reward: -80.0,
        hole_depth_reward: -2.0,
        weighted_hole_reward: -8.0,
        rows_with_holes_reward: -35.0,
        col_transition_reward: -12.0,
        height_reward: -4.0,
        max_height_reward: -5.0,
        bumpiness_reward: -20.0,
        funnel_penalty_base: -10.0,
        split_penalty: -250.0,
        danger_zone_reward: -75.0,
        danger_zone_decay: 0.4,
        spawn_gravity_rows: 0,
        landing_gravity_rows: 3,
        danger_threshold: 4,
        base_fall_tick_ms: 450,
        ai_move_interval_ms: 50,
        sabotage_duration_secs: 1.5,
        sabotage_cooldown_secs: 15.0,
    };

    /// Builds debris and blocks the player instead of clearing lines.
    pub const SABOTAGE: Self = Self {
        line_reward: -500.0,
        multi_line_bonus: false,
        hole_reward: 10.0,
        hole_depth_reward: 5.0,
        weighted_hole_reward: 2.0,
        rows_with_holes_reward: 5.0,
        col_transition_reward: 3.0,
        height_reward: 2.0,
        max_height_reward: 5.0,
        bumpiness_reward: 10.0,
        funnel_penalty_base: -30.0,
        split_penalty: -1000.0,
        danger_zone_reward: -500.0,
        danger_zone_decay: 1.0,
        ..Self::NORMAL
    };

    #[must_use]
    pub fn base_fall_tick(&self) -> Duration {
        Duration::from_millis(self.base_fall_tick_ms)
    }

    #[must_use]
    pub fn ai_move_interval(&self) -> Duration {
        Duration::from_millis(self.ai_move_interval_ms)
    }

    /// Sabotage length; zero when the configured value is not a valid duration.
    #[must_use]
    pub fn sabotage_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.sabotage_duration_secs).unwrap_or_default()
    }

    /// Sabotage cooldown; zero when the configured value is not a valid duration.
    #[must_use]
    pub fn sabotage_cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(self.sabotage_cooldown_secs).unwrap_or_default()
    }
}

/// Board-independent AI constants shared by every tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConstants {
    /// Minimum height difference between neighbouring columns that forms a cliff.
    pub cliff_height_threshold: u8,
    /// Rows from landing below which player movement no longer triggers a retarget.
    pub retarget_distance: usize,
    /// Sabotage hands control back to targeting below this drop distance.
    pub fast_drop_height: usize,
    /// Rows from the top at which the panic score applies.
    pub panic_height: u8,
    /// Rows from the top at which the warning score applies.
    pub warning_height: u8,
    pub max_search_iterations: usize,
    pub panic_score: f32,
    pub warning_score: f32,
    /// Flat bonus for clearing four or more lines at once.
    pub tetris_bonus: f32,
    /// Flat bonus for clearing two or three lines at once.
    pub multi_line_bonus: f32,
    /// Edge columns score `(edge_reference_height - lower edge height) * edge_bonus`.
    pub edge_reference_height: f32,
    pub edge_bonus: f32,
    /// Placements whose bottom edge is above this row are penalized.
    pub floating_row_threshold: i32,
    /// Penalty per row a placement floats above the threshold.
    pub floating_penalty: f32,
    /// A blocked move this close to landing accepts the current pose instead of replanning.
    pub settle_distance: usize,
    pub erratic_flip_probability: f64,
    pub erratic_rotate_probability: f64,
}

impl Default for AiConstants {
    fn default() -> Self {
        Self {
            cliff_height_threshold: 4,
            retarget_distance: 2,
            fast_drop_height: 6,
            panic_height: 2,
            warning_height: 4,
            max_search_iterations: 4000,
            panic_score: -100_000.0,
            warning_score: -20_000.0,
            tetris_bonus: 150.0,
            multi_line_bonus: 50.0,
            edge_reference_height: 10.0,
            edge_bonus: 3.0,
            floating_row_threshold: 4,
            floating_penalty: 30.0,
            settle_distance: 3,
            erratic_flip_probability: 0.1,
            erratic_rotate_probability: 0.05,
        }
    }
}

/// Fully resolved, immutable AI settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Weights and pacing of the selected tier.
    pub config: DifficultyConfig,
    /// Weights used for searches while sabotage is running.
    pub sabotage: DifficultyConfig,
    pub constants: AiConstants,
}

impl Settings {
    #[must_use]
    pub fn preset(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            config: difficulty.config(),
            sabotage: DifficultyConfig::SABOTAGE,
            constants: AiConstants::default(),
        }
    }
}

/// A loaded setting outside the range the AI can work with.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InvalidSettingsError {
    #[display("{field} must be a probability between 0 and 1, got {value}")]
    Probability { field: &'static str, value: f64 },
    #[display("{field} must be a non-negative, finite number of seconds, got {value}")]
    Seconds { field: &'static str, value: f32 },
}

impl Settings {
    /// Checks the values that come from user input and feed random draws or timers.
    pub fn validate(&self) -> Result<(), InvalidSettingsError> {
        let constants = &self.constants;
        for (field, value) in [
            ("erratic_flip_probability", constants.erratic_flip_probability),
            ("erratic_rotate_probability", constants.erratic_rotate_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidSettingsError::Probability { field, value });
            }
        }
        for config in [&self.config, &self.sabotage] {
            for (field, value) in [
                ("sabotage_duration_secs", config.sabotage_duration_secs),
                ("sabotage_cooldown_secs", config.sabotage_cooldown_secs),
            ] {
                if Duration::try_from_secs_f32(value).is_err() {
                    return Err(InvalidSettingsError::Seconds { field, value });
                }
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::preset(Difficulty::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_difficulty() {
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(" Easy ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        let err = "nightmare".parse::<Difficulty>().unwrap_err();
        assert!(err.to_string().contains("nightmare"));
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.to_string().parse::<Difficulty>().unwrap(), difficulty);
        }
    }

    #[test]
    fn test_sabotage_borrows_normal_pacing() {
        let sabotage = Difficulty::Sabotage.config();
        assert!(sabotage.line_reward < 0.0);
        assert!(!sabotage.multi_line_bonus);
        assert_eq!(sabotage.landing_gravity_rows, 4);
        assert_eq!(sabotage.base_fall_tick_ms, 550);
    }

    #[test]
    fn test_only_hard_has_multi_line_bonus() {
        let flags: Vec<_> = Difficulty::ALL
            .iter()
            .map(|d| d.config().multi_line_bonus)
            .collect();
        assert_eq!(flags, [false, false, true, false]);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: DifficultyConfig =
            serde_json::from_str(r#"{ "line_reward": 99.0, "landing_gravity_rows": 1 }"#).unwrap();
        assert_eq!(config.line_reward, 99.0);
        assert_eq!(config.landing_gravity_rows, 1);
        assert_eq!(config.hole_reward, DifficultyConfig::NORMAL.hole_reward);

        let constants: AiConstants =
            serde_json::from_str(r#"{ "max_search_iterations": 10 }"#).unwrap();
        assert_eq!(constants.max_search_iterations, 10);
        assert_eq!(constants.cliff_height_threshold, 4);
    }

    #[test]
    fn test_presets_are_valid() {
        for difficulty in Difficulty::ALL {
            assert_eq!(Settings::preset(difficulty).validate(), Ok(()));
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut settings = Settings::default();
        settings.constants.erratic_rotate_probability = 1.5;
        assert_eq!(
            settings.validate(),
            Err(InvalidSettingsError::Probability {
                field: "erratic_rotate_probability",
                value: 1.5,
            })
        );

        let mut settings = Settings::default();
        settings.constants.erratic_flip_probability = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sabotage.sabotage_cooldown_secs = -1.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("sabotage_cooldown_secs"));

        let mut settings = Settings::default();
        settings.config.sabotage_duration_secs = f32::INFINITY;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_seconds_do_not_panic() {
        let config = DifficultyConfig {
            sabotage_duration_secs: -3.0,
            sabotage_cooldown_secs: f32::NAN,
            ..DifficultyConfig::NORMAL
        };
        assert_eq!(config.sabotage_duration(), Duration::ZERO);
        assert_eq!(config.sabotage_cooldown(), Duration::ZERO);
    }

    #[test]
    fn test_unknown_config_field_is_rejected() {
        assert!(serde_json::from_str::<DifficultyConfig>(r#"{ "line_rewrd": 1.0 }"#).is_err());
        assert!(serde_json::from_str::<AiConstants>(r#"{ "panic": 1 }"#).is_err());
    }

    #[test]
    fn test_durations() {
        let config = Difficulty::Hard.config();
        assert_eq!(config.base_fall_tick(), Duration::from_millis(450));
        assert_eq!(config.ai_move_interval(), Duration::from_millis(50));
        assert_eq!(config.sabotage_duration(), Duration::from_millis(1500));
        assert_eq!(config.sabotage_cooldown(), Duration::from_secs(15));
    }
}
