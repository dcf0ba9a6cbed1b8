//! Core battle vocabulary: elements, teams, seats, charges, team health and participants.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::element::{Advantage, advantage};

/// Upper bound shared by hp, shield, barrier strength and element charge.
pub const GAUGE_MAX: u8 = 100;
/// Prefix marking synthesized participant ids as bots.
pub const BOT_ID_PREFIX: &str = "bot-";

const BOT_NAMES: &[&str] = &[
    "Cinder", "Tidecaller", "Bramble", "Ashfang", "Rivulet", "Thornwick", "Kindle", "Mistral",
];

/// The three elements of the rock-paper-scissors cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Beats leaf.
    Fire,
    /// Beats fire.
    Water,
    /// Beats water.
    Leaf,
}

impl Element {
    /// Every element, in a stable order.
    pub const ALL: [Element; 3] = [Element::Fire, Element::Water, Element::Leaf];

    /// The element this one deals critical damage to.
    pub fn beats(self) -> Element {
        match self {
            Element::Fire => Element::Leaf,
            Element::Water => Element::Fire,
            Element::Leaf => Element::Water,
        }
    }
}

/// Side of the arena a participant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// First half of the seats.
    Blue,
    /// Second half of the seats.
    Red,
}

impl Team {
    /// The opposing team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }
}

/// Seat flavour reported to clients. It does not gate words or actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Even seats.
    Striker,
    /// Odd seats.
    Guardian,
}

/// Room size requested when queueing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// One against one.
    Solo,
    /// Two against two.
    #[default]
    #[serde(alias = "duo", alias = "duos")]
    Team,
}

impl MatchMode {
    /// Number of seats in a room of this mode.
    pub fn capacity(self) -> usize {
        match self {
            MatchMode::Solo => 2,
            MatchMode::Team => 4,
        }
    }
}

/// Map a seat index to its team and role.
///
/// The first half of the seats play blue and the second half red; roles alternate
/// striker/guardian.
pub fn seat_assignment(seat: usize, capacity: usize) -> (Team, Role) {
    let team = if seat < capacity / 2 {
        Team::Blue
    } else {
        Team::Red
    };
    let role = if seat % 2 == 0 {
        Role::Striker
    } else {
        Role::Guardian
    };
    (team, role)
}

/// What a player spends a full charge on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementAction {
    /// Damage the opposing team.
    Attack,
    /// Shield the own team.
    Barrier,
}

/// Per-element charge, each gauge clamped to `0..=GAUGE_MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ElementCharges {
    /// Fire gauge.
    pub fire: u8,
    /// Water gauge.
    pub water: u8,
    /// Leaf gauge.
    pub leaf: u8,
}

impl ElementCharges {
    /// Current charge of `element`.
    pub fn get(&self, element: Element) -> u8 {
        match element {
            Element::Fire => self.fire,
            Element::Water => self.water,
            Element::Leaf => self.leaf,
        }
    }

    fn slot(&mut self, element: Element) -> &mut u8 {
        match element {
            Element::Fire => &mut self.fire,
            Element::Water => &mut self.water,
            Element::Leaf => &mut self.leaf,
        }
    }

    /// Add `amount` to `element`, saturating at [`GAUGE_MAX`]. Returns the new value.
    pub fn add(&mut self, element: Element, amount: u8) -> u8 {
        let slot = self.slot(element);
        *slot = slot.saturating_add(amount).min(GAUGE_MAX);
        *slot
    }

    /// Whether `element` is fully charged.
    pub fn is_full(&self, element: Element) -> bool {
        self.get(element) >= GAUGE_MAX
    }

    /// Drop `element` back to zero.
    pub fn reset(&mut self, element: Element) {
        *self.slot(element) = 0;
    }

    /// Average over the three gauges, rounded down.
    pub fn average(&self) -> u8 {
        ((u16::from(self.fire) + u16::from(self.water) + u16::from(self.leaf)) / 3) as u8
    }
}

/// Team-wide elemental shield. Strength is always above zero while it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Barrier {
    /// Decides the matchup against incoming attacks.
    pub element: Element,
    /// Damage left to absorb.
    pub strength: u8,
}

/// Result of resolving one attack against a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Matchup against the barrier, normal without one.
    pub advantage: Advantage,
    /// Damage computed from the matchup, before any absorption.
    pub damage: u16,
    /// Portion soaked up by the barrier.
    pub absorbed: u16,
    /// Portion that reached hp.
    pub hp_damage: u16,
    /// Whether the barrier was used up.
    pub barrier_broken: bool,
}

/// Health pool, legacy chip shield and optional barrier of one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamState {
    /// Remaining health; zero means defeat.
    pub hp: u8,
    /// Cosmetic shield raised by chip boosts.
    pub shield: u8,
    /// Active elemental barrier.
    pub barrier: Option<Barrier>,
}

impl Default for TeamState {
    fn default() -> Self {
        Self {
            hp: GAUGE_MAX,
            shield: 0,
            barrier: None,
        }
    }
}

impl TeamState {
    /// Apply a passive chip boost, returning the hp and shield actually gained.
    pub fn chip_boost(&mut self, hp: u8, shield: u8) -> (u8, u8) {
        let before = (self.hp, self.shield);
        self.hp = self.hp.saturating_add(hp).min(GAUGE_MAX);
        self.shield = self.shield.saturating_add(shield).min(GAUGE_MAX);
        (self.hp - before.0, self.shield - before.1)
    }

    /// Replace any active barrier with a fresh one of `element`.
    pub fn raise_barrier(&mut self, element: Element, strength: u8) {
        let strength = strength.min(GAUGE_MAX);
        self.barrier = (strength > 0).then_some(Barrier { element, strength });
    }

    /// Resolve an attack of `element` with `base_damage` against this team.
    ///
    /// The barrier (if any) decides the matchup and absorbs first; the remainder lowers hp,
    /// floored at zero.
    pub fn receive_attack(&mut self, element: Element, base_damage: u8) -> AttackOutcome {
        let advantage = self
            .barrier
            .map(|barrier| advantage(element, barrier.element))
            .unwrap_or(Advantage::Normal);
        let damage = advantage.damage(base_damage);

        let mut absorbed = 0;
        let mut barrier_broken = false;
        if let Some(barrier) = self.barrier.as_mut() {
            absorbed = damage.min(u16::from(barrier.strength));
            barrier.strength -= absorbed as u8;
            if barrier.strength == 0 {
                self.barrier = None;
                barrier_broken = true;
            }
        }

        let hp_damage = (damage - absorbed).min(u16::from(self.hp));
        self.hp -= hp_damage as u8;

        AttackOutcome {
            advantage,
            damage,
            absorbed,
            hp_damage,
            barrier_broken,
        }
    }

    /// A team with no hp left has lost.
    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

/// A word shown to a player, tagged with the element it charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WordWithElement {
    /// Lowercase word to type.
    pub word: String,
    /// Element it charges.
    pub element: Element,
    /// Charge words grant a large charge but no chip boost.
    pub is_charge: bool,
}

/// Counters accumulated by a participant during one match.
#[derive(Debug, Clone, Default)]
pub struct PlayerStats {
    /// Accepted words.
    pub words_typed: u32,
    /// Accepted words counted for speed and accuracy.
    pub correct_words: u32,
    /// Rejected submissions.
    pub incorrect_words: u32,
    /// Damage computed before barrier absorption.
    pub damage_dealt: u32,
    /// Shield and barrier strength granted to the own team.
    pub shield_restored: u32,
    /// Match start, set when the match begins.
    pub started_at: Option<Instant>,
}

impl PlayerStats {
    /// Fresh counters starting at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            started_at: Some(now),
            ..Self::default()
        }
    }
}

/// Whether a seat is driven by a connection or by the bot scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    /// Backed by a WebSocket connection.
    Human,
    /// Driven by the bot scheduler.
    Bot,
}

/// A seated participant of a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Connection id for humans, synthesized `bot-` id for bots.
    pub id: String,
    /// Display name.
    pub nickname: String,
    /// Seat index, stable for the life of the seat.
    pub seat: usize,
    /// Side derived from the seat.
    pub team: Team,
    /// Role derived from the seat.
    pub role: Role,
    /// Human or bot.
    pub kind: PlayerKind,
    /// Element gauges.
    pub charges: ElementCharges,
    /// Most recent deck only.
    pub current_words: Vec<WordWithElement>,
    /// Match counters.
    pub stats: PlayerStats,
}

impl Player {
    /// Seat a human connection.
    pub fn human(id: String, nickname: String, seat: usize, capacity: usize) -> Self {
        Self::seated(id, nickname, seat, capacity, PlayerKind::Human)
    }

    /// Create a bot for `seat`.
    pub fn bot(seat: usize, capacity: usize) -> Self {
        let id = format!("{BOT_ID_PREFIX}{}", Uuid::new_v4().simple());
        let name = BOT_NAMES[seat % BOT_NAMES.len()];
        Self::seated(id, format!("{name} (bot)"), seat, capacity, PlayerKind::Bot)
    }

    fn seated(
        id: String,
        nickname: String,
        seat: usize,
        capacity: usize,
        kind: PlayerKind,
    ) -> Self {
        let (team, role) = seat_assignment(seat, capacity);
        Self {
            id,
            nickname,
            seat,
            team,
            role,
            kind,
            charges: ElementCharges::default(),
            current_words: Vec::new(),
            stats: PlayerStats::default(),
        }
    }

    /// True for scheduler-driven participants.
    pub fn is_bot(&self) -> bool {
        self.kind == PlayerKind::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_clamp_at_max() {
        let mut charges = ElementCharges::default();
        for _ in 0..5 {
            charges.add(Element::Fire, 30);
        }
        assert_eq!(charges.fire, GAUGE_MAX);
        assert!(charges.is_full(Element::Fire));

        charges.reset(Element::Fire);
        assert_eq!(charges.get(Element::Fire), 0);
        assert_eq!(charges.add(Element::Leaf, u8::MAX), GAUGE_MAX);
    }

    #[test]
    fn chip_boost_is_clamped_and_reports_gain() {
        let mut team = TeamState {
            hp: 99,
            shield: 98,
            barrier: None,
        };
        assert_eq!(team.chip_boost(2, 3), (1, 2));
        assert_eq!((team.hp, team.shield), (100, 100));
        assert_eq!(team.chip_boost(2, 3), (0, 0));
    }

    #[test]
    fn attack_without_barrier_deals_base_damage() {
        let mut team = TeamState::default();
        let outcome = team.receive_attack(Element::Fire, 30);
        assert_eq!(outcome.advantage, Advantage::Normal);
        assert_eq!(outcome.hp_damage, 30);
        assert_eq!(team.hp, 70);
    }

    #[test]
    fn critical_attack_breaks_barrier_and_spills_into_hp() {
        let mut team = TeamState {
            hp: 100,
            shield: 0,
            barrier: Some(Barrier {
                element: Element::Fire,
                strength: 40,
            }),
        };
        let outcome = team.receive_attack(Element::Water, 30);
        assert_eq!(outcome.advantage, Advantage::Critical);
        assert_eq!(outcome.damage, 60);
        assert_eq!(outcome.absorbed, 40);
        assert_eq!(outcome.hp_damage, 20);
        assert!(outcome.barrier_broken);
        assert_eq!(team.barrier, None);
        assert_eq!(team.hp, 80);
    }

    #[test]
    fn weak_attack_is_fully_absorbed() {
        let mut team = TeamState::default();
        team.raise_barrier(Element::Fire, 100);
        let outcome = team.receive_attack(Element::Leaf, 30);
        assert_eq!(outcome.advantage, Advantage::Weak);
        assert_eq!(outcome.damage, 15);
        assert_eq!(team.barrier.map(|b| b.strength), Some(85));
        assert_eq!(team.hp, 100);
    }

    #[test]
    fn hp_never_goes_below_zero() {
        let mut team = TeamState {
            hp: 10,
            shield: 0,
            barrier: None,
        };
        let outcome = team.receive_attack(Element::Leaf, 30);
        assert_eq!(outcome.hp_damage, 10);
        assert!(team.is_defeated());
    }

    #[test]
    fn raising_a_barrier_replaces_the_old_one() {
        let mut team = TeamState::default();
        team.raise_barrier(Element::Leaf, 100);
        team.receive_attack(Element::Water, 30);
        team.raise_barrier(Element::Fire, 100);
        assert_eq!(
            team.barrier,
            Some(Barrier {
                element: Element::Fire,
                strength: 100
            })
        );
    }

    #[test]
    fn seats_rotate_teams_and_roles() {
        assert_eq!(seat_assignment(0, 4), (Team::Blue, Role::Striker));
        assert_eq!(seat_assignment(1, 4), (Team::Blue, Role::Guardian));
        assert_eq!(seat_assignment(2, 4), (Team::Red, Role::Striker));
        assert_eq!(seat_assignment(3, 4), (Team::Red, Role::Guardian));
        assert_eq!(seat_assignment(1, 2), (Team::Red, Role::Guardian));
    }

    #[test]
    fn bots_are_tagged_by_prefix() {
        let bot = Player::bot(1, 2);
        assert!(bot.is_bot());
        assert!(bot.id.starts_with(BOT_ID_PREFIX));
        assert_eq!(bot.team, Team::Red);
    }
}
