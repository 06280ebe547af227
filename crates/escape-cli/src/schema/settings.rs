use anyhow::Context as _;
use escape_ai::difficulty::{AiConstants, Difficulty, DifficultyConfig, Settings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// AI settings override loaded from JSON.
///
/// Every field is optional. Weight tables are partial: each given field replaces the
/// corresponding value of the chosen tier's table and the rest stay as the tier has them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Tier preset to start from
    pub difficulty: Option<Difficulty>,
    /// Fields overriding the tier's weight table
    pub config: Option<Map<String, Value>>,
    /// Fields overriding the table used while sabotage runs
    pub sabotage: Option<Map<String, Value>>,
    pub constants: Option<AiConstants>,
}

/// Applies `fields` on top of `base`, keeping every field the override leaves out.
fn overlay(
    table: &str,
    base: &DifficultyConfig,
    fields: Map<String, Value>,
) -> anyhow::Result<DifficultyConfig> {
    let mut merged = match serde_json::to_value(base)? {
        Value::Object(map) => map,
        other => anyhow::bail!("{table} table serialized to {other}, expected an object"),
    };
    merged.extend(fields);
    serde_json::from_value(Value::Object(merged))
        .with_context(|| format!("Invalid `{table}` table in settings file"))
}

impl SettingsFile {
    /// Resolves the final settings: tier preset, then this file, then the CLI tier.
    ///
    /// A tier given on the command line wins over the file's tier; table overrides from
    /// the file apply on top of whichever tier wins.
    pub fn resolve(self, cli_difficulty: Option<Difficulty>) -> anyhow::Result<Settings> {
        let difficulty = cli_difficulty
            .or(self.difficulty)
            .unwrap_or(Difficulty::Normal);
        let mut settings = Settings::preset(difficulty);
        if let Some(fields) = self.config {
            settings.config = overlay("config", &settings.config, fields)?;
        }
        if let Some(fields) = self.sabotage {
            settings.sabotage = overlay("sabotage", &settings.sabotage, fields)?;
        }
        if let Some(constants) = self.constants {
            settings.constants = constants;
        }
        settings
            .validate()
            .context("Settings file holds an out-of-range value")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(json: &str, cli: Option<Difficulty>) -> anyhow::Result<Settings> {
        serde_json::from_str::<SettingsFile>(json)?.resolve(cli)
    }

    #[test]
    fn test_empty_file_is_normal_preset() {
        assert_eq!(resolve("{}", None).unwrap(), Settings::default());
    }

    #[test]
    fn test_cli_tier_wins_over_file_tier() {
        let json = r#"{ "difficulty": "easy" }"#;
        assert_eq!(resolve(json, None).unwrap().difficulty, Difficulty::Easy);
        let settings = resolve(json, Some(Difficulty::Hard)).unwrap();
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.config, DifficultyConfig::HARD);
    }

    #[test]
    fn test_partial_tables_apply_on_top_of_tier() {
        let settings = resolve(
            r#"{ "constants": { "max_search_iterations": 500 }, "config": { "line_reward": 99.0 } }"#,
            Some(Difficulty::Hard),
        )
        .unwrap();
        assert_eq!(settings.constants.max_search_iterations, 500);
        assert_eq!(settings.constants.retarget_distance, 2);
        assert_eq!(settings.config.line_reward, 99.0);
        assert_eq!(
            settings.config,
            DifficultyConfig {
                line_reward: 99.0,
                ..DifficultyConfig::HARD
            }
        );
    }

    #[test]
    fn test_partial_override_keeps_file_tier_values() {
        let settings = resolve(
            r#"{ "difficulty": "easy", "config": { "hole_reward": -1.0 }, "sabotage": { "line_reward": 0.0 } }"#,
            None,
        )
        .unwrap();
        assert_eq!(settings.config.danger_zone_reward, -500.0);
        assert_eq!(
            settings.config.bumpiness_reward,
            DifficultyConfig::EASY.bumpiness_reward
        );
        assert_eq!(settings.config.hole_reward, -1.0);
        assert_eq!(settings.sabotage.line_reward, 0.0);
        assert_eq!(
            settings.sabotage.bumpiness_reward,
            DifficultyConfig::SABOTAGE.bumpiness_reward
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let err = resolve(r#"{ "constants": { "erratic_rotate_probability": 1.5 } }"#, None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("erratic_rotate_probability"));

        let err = resolve(r#"{ "config": { "sabotage_duration_secs": -1.0 } }"#, None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("sabotage_duration_secs"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(serde_json::from_str::<SettingsFile>(r#"{ "dificulty": "hard" }"#).is_err());
        assert!(resolve(r#"{ "config": { "line_rewrd": 1.0 } }"#, None).is_err());
    }
}
