//! Bot cadence and decision making.
//!
//! Bots are not tasks of their own: a room keeps one [`BotSchedule`] with the next due instant of
//! every active bot and a single driver wakes up for the earliest entry. Removing an entry is all
//! it takes to cancel a bot.

use std::{collections::HashMap, time::Duration};

use rand::Rng;
use tokio::time::Instant;

use crate::{
    config::GameRules,
    state::game::{Element, ElementAction},
};

/// Next due instant per bot id.
#[derive(Debug, Clone, Default)]
pub struct BotSchedule {
    due: HashMap<String, Instant>,
}

impl BotSchedule {
    /// Arm (or re-arm) `bot_id` for `at`.
    pub fn schedule(&mut self, bot_id: &str, at: Instant) {
        self.due.insert(bot_id.to_string(), at);
    }

    /// Drop the pending tick of `bot_id`. Returns whether one was armed.
    pub fn cancel(&mut self, bot_id: &str) -> bool {
        self.due.remove(bot_id).is_some()
    }

    /// Drop every pending tick.
    pub fn clear(&mut self) {
        self.due.clear();
    }

    /// Whether `bot_id` has a pending tick.
    pub fn is_scheduled(&self, bot_id: &str) -> bool {
        self.due.contains_key(bot_id)
    }

    /// Number of armed bots.
    pub fn len(&self) -> usize {
        self.due.len()
    }

    /// True when no bot is armed.
    pub fn is_empty(&self) -> bool {
        self.due.is_empty()
    }

    /// Earliest pending instant.
    pub fn next_due(&self) -> Option<Instant> {
        self.due.values().min().copied()
    }

    /// Remove and return every bot due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut ready: Vec<(Instant, String)> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (*at, id.clone()))
            .collect();
        ready.sort();
        for (_, id) in &ready {
            self.due.remove(id);
        }
        ready.into_iter().map(|(_, id)| id).collect()
    }
}

/// What a bot does on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTurn {
    /// Whether the simulated word was typed correctly.
    pub typed_correctly: bool,
    /// Element use decided this tick, if any.
    pub action: Option<(Element, ElementAction)>,
}

/// Randomized bot behaviour derived from [`GameRules`].
#[derive(Debug, Clone, Copy)]
pub struct BotPolicy {
    tick_min_ms: u64,
    tick_max_ms: u64,
    action_chance: f64,
    attack_weight: f64,
    mistake_chance: f64,
}

impl BotPolicy {
    /// Read the bot knobs from the rules.
    pub fn from_rules(rules: &GameRules) -> Self {
        let (tick_min_ms, tick_max_ms) = rules.bot_tick_range_ms();
        Self {
            tick_min_ms,
            tick_max_ms,
            action_chance: rules.bot_action_chance.clamp(0.0, 1.0),
            attack_weight: rules.bot_attack_weight.clamp(0.0, 1.0),
            mistake_chance: rules.bot_mistake_chance.clamp(0.0, 1.0),
        }
    }

    /// Uniform delay until the next tick.
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.tick_min_ms..=self.tick_max_ms))
    }

    /// Decide this tick's typing result and optional element use.
    ///
    /// The element is drawn independently of what was typed.
    pub fn plan_turn<R: Rng>(&self, rng: &mut R) -> BotTurn {
        let typed_correctly = !rng.random_bool(self.mistake_chance);
        let action = rng.random_bool(self.action_chance).then(|| {
            let element = Element::ALL[rng.random_range(0..Element::ALL.len())];
            let action = if rng.random_bool(self.attack_weight) {
                ElementAction::Attack
            } else {
                ElementAction::Barrier
            };
            (element, action)
        });

        BotTurn {
            typed_correctly,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn take_due_returns_only_elapsed_entries_in_order() {
        let start = Instant::now();
        let mut schedule = BotSchedule::default();
        schedule.schedule("bot-b", start + Duration::from_secs(3));
        schedule.schedule("bot-a", start + Duration::from_secs(2));
        schedule.schedule("bot-c", start + Duration::from_secs(9));

        assert_eq!(schedule.next_due(), Some(start + Duration::from_secs(2)));
        let due = schedule.take_due(start + Duration::from_secs(5));
        assert_eq!(due, vec!["bot-a".to_string(), "bot-b".to_string()]);
        assert_eq!(schedule.len(), 1);
        assert!(schedule.is_scheduled("bot-c"));
    }

    #[test]
    fn cancel_and_clear_disarm_bots() {
        let now = Instant::now();
        let mut schedule = BotSchedule::default();
        schedule.schedule("bot-a", now);
        schedule.schedule("bot-b", now);

        assert!(schedule.cancel("bot-a"));
        assert!(!schedule.cancel("bot-a"));
        schedule.clear();
        assert!(schedule.is_empty());
        assert_eq!(schedule.next_due(), None);
    }

    #[test]
    fn delays_stay_within_configured_bounds() {
        let policy = BotPolicy::from_rules(&GameRules::default());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let delay = policy.next_delay(&mut rng);
            assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(5));
        }
    }

    #[test]
    fn certain_knobs_force_outcomes() {
        let rules = GameRules {
            bot_action_chance: 1.0,
            bot_attack_weight: 1.0,
            bot_mistake_chance: 1.0,
            ..GameRules::default()
        };
        let policy = BotPolicy::from_rules(&rules);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let turn = policy.plan_turn(&mut rng);
            assert!(!turn.typed_correctly);
            assert!(matches!(turn.action, Some((_, ElementAction::Attack))));
        }

        let idle = BotPolicy::from_rules(&GameRules {
            bot_action_chance: 0.0,
            ..GameRules::default()
        });
        let turn = idle.plan_turn(&mut rng);
        assert!(turn.typed_correctly);
        assert_eq!(turn.action, None);
    }
}
