//! Application-level configuration loading: gameplay tuning and word vocabularies.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    game::MatchMode,
    words::{ElementPool, WordGenerator, WordPools},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ELEMENT_CLASH_CONFIG_PATH";

/// Gameplay tuning knobs. Every field may be omitted from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Words dealt per deck.
    pub deck_size: usize,
    /// Chance that a dealt word comes from the charge pool.
    pub charge_word_probability: f64,
    /// Charge granted by a charge word.
    pub charge_word_gain: u8,
    /// Charge granted by a normal word.
    pub normal_word_gain: u8,
    /// Hp granted to the typist's team by a normal word.
    pub chip_boost_hp: u8,
    /// Shield granted to the typist's team by a normal word.
    pub chip_boost_shield: u8,
    /// Damage of a neutral attack.
    pub base_damage: u8,
    /// Strength of a freshly raised barrier.
    pub barrier_strength: u8,
    /// Roster size required for a manual start.
    pub min_players_to_start: usize,
    /// Lower bound of the delay between two bot ticks.
    pub bot_tick_min_ms: u64,
    /// Upper bound of the delay between two bot ticks.
    pub bot_tick_max_ms: u64,
    /// Chance that a bot spends an element on a given tick.
    pub bot_action_chance: f64,
    /// Share of bot actions that are attacks (the rest raise barriers).
    pub bot_attack_weight: f64,
    /// Chance that a simulated bot word is a typo.
    pub bot_mistake_chance: f64,
    /// Delay between a queue request and the batch it lands in.
    pub matchmaking_batch_delay_ms: u64,
    /// Delay between a matchmade room being formed and its match starting.
    pub match_start_delay_ms: u64,
    /// Room size used when a room is created by a direct join.
    pub direct_join_mode: MatchMode,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            deck_size: 6,
            charge_word_probability: 0.3,
            charge_word_gain: 30,
            normal_word_gain: 10,
            chip_boost_hp: 2,
            chip_boost_shield: 3,
            base_damage: 30,
            barrier_strength: 100,
            min_players_to_start: 2,
            bot_tick_min_ms: 2_000,
            bot_tick_max_ms: 5_000,
            bot_action_chance: 0.3,
            bot_attack_weight: 0.7,
            bot_mistake_chance: 0.0,
            matchmaking_batch_delay_ms: 2_000,
            match_start_delay_ms: 1_000,
            direct_join_mode: MatchMode::Team,
        }
    }
}

impl GameRules {
    /// Inclusive bounds of the bot tick delay, ordered even if misconfigured.
    pub fn bot_tick_range_ms(&self) -> (u64, u64) {
        let low = self.bot_tick_min_ms.min(self.bot_tick_max_ms);
        let high = self.bot_tick_min_ms.max(self.bot_tick_max_ms);
        (low, high)
    }

    /// Delay before a queue batch is formed.
    pub fn matchmaking_batch_delay(&self) -> Duration {
        Duration::from_millis(self.matchmaking_batch_delay_ms)
    }

    /// Delay before a matchmade room starts playing.
    pub fn match_start_delay(&self) -> Duration {
        Duration::from_millis(self.match_start_delay_ms)
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: GameRules,
    words: WordGenerator,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        deck_size = app_config.rules.deck_size,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Build a configuration from explicit parts.
    pub fn new(rules: GameRules, pools: WordPools) -> Self {
        let words = WordGenerator::new(pools, rules.charge_word_probability);
        Self { rules, words }
    }

    /// Gameplay tuning.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Deck generator built from the configured vocabularies.
    pub fn words(&self) -> &WordGenerator {
        &self.words
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(GameRules::default(), WordPools::default())
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rules: GameRules,
    #[serde(default)]
    words: RawWords,
}

#[derive(Debug, Default, Deserialize)]
/// Per-element vocabularies; missing elements use the built-in pools.
struct RawWords {
    #[serde(default)]
    fire: ElementPool,
    #[serde(default)]
    water: ElementPool,
    #[serde(default)]
    leaf: ElementPool,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let RawWords { fire, water, leaf } = value.words;
        Self::new(value.rules, WordPools::new(fire, water, leaf))
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "rules": { "base_damage": 40, "direct_join_mode": "solo" },
                "words": { "water": { "charge": ["whirlpool"] } }
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.rules().base_damage, 40);
        assert_eq!(config.rules().deck_size, 6);
        assert_eq!(config.rules().direct_join_mode, MatchMode::Solo);
        assert_eq!(config.rules().charge_word_gain, 30);
        assert_eq!(config.rules().matchmaking_batch_delay(), Duration::from_secs(2));
    }

    #[test]
    fn inverted_bot_tick_bounds_are_reordered() {
        let rules = GameRules {
            bot_tick_min_ms: 5_000,
            bot_tick_max_ms: 2_000,
            ..GameRules::default()
        };
        assert_eq!(rules.bot_tick_range_ms(), (2_000, 5_000));
    }
}
