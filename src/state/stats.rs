//! End-of-match statistics.

use std::time::Duration;

use crate::state::game::{Player, Role, Team};

/// Final figures for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStats {
    /// Participant id.
    pub id: String,
    /// Display name.
    pub nickname: String,
    /// Side played.
    pub team: Team,
    /// Role played.
    pub role: Role,
    /// Whether a bot held the seat.
    pub is_bot: bool,
    /// Correct words per minute.
    pub wpm: u32,
    /// Correct share of typed words, in percent.
    pub accuracy: u32,
    /// Damage before barrier absorption.
    pub damage_dealt: u32,
    /// Shield and barrier strength granted.
    pub shield_restored: u32,
}

/// Correct words per minute over `duration`, rounded. Zero for an empty duration.
pub fn words_per_minute(correct_words: u32, duration: Duration) -> u32 {
    let minutes = duration.as_secs_f64() / 60.0;
    if minutes <= 0.0 {
        return 0;
    }
    (f64::from(correct_words) / minutes).round() as u32
}

/// Percentage of typed words that were correct, rounded. Typing nothing counts as 100.
pub fn accuracy(correct_words: u32, words_typed: u32) -> u32 {
    if words_typed == 0 {
        return 100;
    }
    (100.0 * f64::from(correct_words) / f64::from(words_typed)).round() as u32
}

/// Compute the summary of every participant for a match that lasted `duration`.
pub fn finalize<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    duration: Duration,
) -> Vec<FinalStats> {
    players
        .into_iter()
        .map(|player| {
            let stats = &player.stats;
            FinalStats {
                id: player.id.clone(),
                nickname: player.nickname.clone(),
                team: player.team,
                role: player.role,
                is_bot: player.is_bot(),
                wpm: words_per_minute(stats.correct_words, duration),
                accuracy: accuracy(stats.correct_words, stats.words_typed),
                damage_dealt: stats.damage_dealt,
                shield_restored: stats.shield_restored,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wpm_rounds_over_match_minutes() {
        assert_eq!(words_per_minute(30, Duration::from_secs(60)), 30);
        assert_eq!(words_per_minute(25, Duration::from_secs(120)), 13);
        assert_eq!(words_per_minute(10, Duration::from_secs(90)), 7);
    }

    #[test]
    fn wpm_is_zero_for_zero_duration() {
        assert_eq!(words_per_minute(12, Duration::ZERO), 0);
    }

    #[test]
    fn accuracy_defaults_to_perfect() {
        assert_eq!(accuracy(0, 0), 100);
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(9, 9), 100);
    }

    #[test]
    fn finalize_covers_every_player() {
        let mut human = Player::human("c1".into(), "ana".into(), 0, 2);
        human.stats.words_typed = 10;
        human.stats.correct_words = 8;
        human.stats.damage_dealt = 60;
        let bot = Player::bot(1, 2);

        let stats = finalize([&human, &bot], Duration::from_secs(120));
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].wpm, 4);
        assert_eq!(stats[0].accuracy, 80);
        assert_eq!(stats[0].damage_dealt, 60);
        assert_eq!(stats[0].team, Team::Blue);
        assert!(stats[1].is_bot);
        assert_eq!(stats[1].accuracy, 100);
    }
}
