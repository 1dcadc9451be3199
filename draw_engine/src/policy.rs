//! Progression and tally policy.
//!
//! Policies are supplied to the engine through a [`PolicyProvider`]. The
//! default provider, [`StaticPolicy`], serves a fixed [`EngineConfig`] that can
//! be built from defaults, JSON, or environment variables.

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};
use thiserror::Error;

use crate::model::DrawError;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for DrawError {
    fn from(err: ConfigError) -> Self {
        DrawError::InvalidConfig(err.to_string())
    }
}

/// Round robin tie-break directives, applied in order
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TallyDirective {
    MatchUpsWon,
    MatchUpsRatio,
    /// Only resolves two-way ties
    HeadToHead,
    SetsDifferential,
    GamesDifferential,
    SetsRatio,
    GamesRatio,
}

impl FromStr for TallyDirective {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MATCH_UPS_WON" => Ok(Self::MatchUpsWon),
            "MATCH_UPS_RATIO" => Ok(Self::MatchUpsRatio),
            "HEAD_TO_HEAD" => Ok(Self::HeadToHead),
            "SETS_DIFFERENTIAL" => Ok(Self::SetsDifferential),
            "GAMES_DIFFERENTIAL" => Ok(Self::GamesDifferential),
            "SETS_RATIO" => Ok(Self::SetsRatio),
            "GAMES_RATIO" => Ok(Self::GamesRatio),
            other => Err(ConfigError::Invalid(format!("unknown tally directive {other}"))),
        }
    }
}

/// Progression flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionPolicy {
    /// Send a bye instead of an exit into the loser target of a double exit
    pub propagate_bye_on_double_exit: bool,

    /// Place a qualifying winner into a main-draw qualifier position
    pub auto_place_qualifiers: bool,

    /// Swap a placed qualifier when the qualifying result flips
    pub auto_replace_qualifiers: bool,

    /// Vacate a placed qualifier when the qualifying result is cleared
    pub auto_remove_qualifiers: bool,

    /// Playoff positioning waits for every group to finish
    pub require_completed_structures: bool,

    /// Upper bound on propagation steps in one call (default: 10000)
    pub max_propagation_steps: usize,
}

impl Default for ProgressionPolicy {
    fn default() -> Self {
        Self {
            propagate_bye_on_double_exit: false,
            auto_place_qualifiers: false,
            auto_replace_qualifiers: false,
            auto_remove_qualifiers: false,
            require_completed_structures: true,
            max_propagation_steps: 10_000,
        }
    }
}

impl ProgressionPolicy {
    /// Enable every qualifier automation
    pub fn with_auto_qualifiers(mut self) -> Self {
        self.auto_place_qualifiers = true;
        self.auto_replace_qualifiers = true;
        self.auto_remove_qualifiers = true;
        self
    }
}

/// Round robin tally policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyPolicy {
    pub directives: Vec<TallyDirective>,
}

impl Default for TallyPolicy {
    fn default() -> Self {
        Self {
            directives: vec![
                TallyDirective::MatchUpsWon,
                TallyDirective::HeadToHead,
                TallyDirective::SetsDifferential,
                TallyDirective::GamesDifferential,
            ],
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub progression: ProgressionPolicy,
    pub tally: TallyPolicy,
}

fn env_bool(name: &'static str, default: bool) -> ConfigResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidEnv { name, value }),
        },
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DRAW_PROPAGATE_BYE_ON_DOUBLE_EXIT` (default: false)
    /// - `DRAW_AUTO_PLACE_QUALIFIERS` (default: false)
    /// - `DRAW_AUTO_REPLACE_QUALIFIERS` (default: false)
    /// - `DRAW_AUTO_REMOVE_QUALIFIERS` (default: false)
    /// - `DRAW_REQUIRE_COMPLETED_STRUCTURES` (default: true)
    /// - `DRAW_MAX_PROPAGATION_STEPS` (default: 10000)
    /// - `DRAW_TALLY_DIRECTIVES`: comma separated directive names
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = ProgressionPolicy::default();
        let max_propagation_steps = match env::var("DRAW_MAX_PROPAGATION_STEPS") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: "DRAW_MAX_PROPAGATION_STEPS",
                    value,
                })?,
            Err(_) => defaults.max_propagation_steps,
        };
        let tally = match env::var("DRAW_TALLY_DIRECTIVES") {
            Ok(value) => TallyPolicy {
                directives: value
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(TallyDirective::from_str)
                    .collect::<ConfigResult<_>>()?,
            },
            Err(_) => TallyPolicy::default(),
        };

        let config = Self {
            progression: ProgressionPolicy {
                propagate_bye_on_double_exit: env_bool(
                    "DRAW_PROPAGATE_BYE_ON_DOUBLE_EXIT",
                    defaults.propagate_bye_on_double_exit,
                )?,
                auto_place_qualifiers: env_bool(
                    "DRAW_AUTO_PLACE_QUALIFIERS",
                    defaults.auto_place_qualifiers,
                )?,
                auto_replace_qualifiers: env_bool(
                    "DRAW_AUTO_REPLACE_QUALIFIERS",
                    defaults.auto_replace_qualifiers,
                )?,
                auto_remove_qualifiers: env_bool(
                    "DRAW_AUTO_REMOVE_QUALIFIERS",
                    defaults.auto_remove_qualifiers,
                )?,
                require_completed_structures: env_bool(
                    "DRAW_REQUIRE_COMPLETED_STRUCTURES",
                    defaults.require_completed_structures,
                )?,
                max_propagation_steps,
            },
            tally,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.progression.max_propagation_steps == 0 {
            return Err(ConfigError::Invalid(
                "max_propagation_steps must be greater than zero".to_string(),
            ));
        }
        if self.tally.directives.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one tally directive is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Source of policies consulted by the engine on every call
pub trait PolicyProvider: Send + Sync {
    fn progression_policy(&self) -> ProgressionPolicy;
    fn tally_policy(&self) -> TallyPolicy;
}

/// Fixed policy
#[derive(Debug, Clone, Default)]
pub struct StaticPolicy {
    config: EngineConfig,
}

impl StaticPolicy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl From<ProgressionPolicy> for StaticPolicy {
    fn from(progression: ProgressionPolicy) -> Self {
        Self::new(EngineConfig {
            progression,
            tally: TallyPolicy::default(),
        })
    }
}

impl PolicyProvider for StaticPolicy {
    fn progression_policy(&self) -> ProgressionPolicy {
        self.config.progression.clone()
    }

    fn tally_policy(&self) -> TallyPolicy {
        self.config.tally.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.progression.propagate_bye_on_double_exit);
        assert!(config.progression.require_completed_structures);
        assert_eq!(config.progression.max_propagation_steps, 10_000);
        assert_eq!(config.tally.directives[1], TallyDirective::HeadToHead);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"progression": {"propagate_bye_on_double_exit": true}}"#,
        )
        .unwrap();
        assert!(config.progression.propagate_bye_on_double_exit);
        assert!(!config.progression.auto_place_qualifiers);
        assert_eq!(config.tally, TallyPolicy::default());
    }

    #[test]
    fn test_validation_rejects_zero_budget() {
        let err = EngineConfig::from_json_str(r#"{"progression": {"max_propagation_steps": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_directive_parse() {
        assert_eq!(
            "games_ratio".parse::<TallyDirective>().unwrap(),
            TallyDirective::GamesRatio
        );
        assert!("coin_toss".parse::<TallyDirective>().is_err());
    }

    #[test]
    fn test_static_policy_serves_config() {
        let policy = StaticPolicy::from(ProgressionPolicy::default().with_auto_qualifiers());
        assert!(policy.progression_policy().auto_replace_qualifiers);
        assert_eq!(policy.tally_policy(), TallyPolicy::default());
    }
}
