//! A single battle room: roster, spectators, team states, phase and bot schedule.
//!
//! [`Room`] is synchronous. Every operation takes the current instant and returns an [`Outbox`]
//! holding the messages in the order clients must observe them. Callers deliver the outbox while
//! they still hold the room lock so that concurrent operations never interleave their output.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use indexmap::{IndexMap, IndexSet};
use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    dto::{
        format_system_time,
        room::{PlayerCharges, PlayerFinalStats, PlayerSummary, RoomSnapshot, RoomSummary},
        ws::{
            AttackLandedEvent, BarrierCreatedEvent, ElementChargesEvent, MatchEndedEvent,
            MatchStartedEvent, MatchedEvent, NewWordsEvent, NotEnoughChargeEvent,
            RoomUpdateEvent, ServerMessage, SmallBoostEvent, SpectatorEvent, WordCorrectEvent,
            WordInvalidEvent,
        },
    },
    state::{
        bot::{BotPolicy, BotSchedule},
        element::Advantage,
        game::{
            Element, ElementAction, ElementCharges, GAUGE_MAX, MatchMode, Player, PlayerStats,
            Role, Team, TeamState, WordWithElement,
        },
        state_machine::{InvalidTransition, RoomEvent, RoomPhase, RoomStateMachine},
        stats,
    },
};

/// Addressing of one outgoing message.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Every seated human and spectator of the room.
    Room(ServerMessage),
    /// A single connection.
    Direct {
        /// Recipient connection id.
        to: String,
        /// Message to send.
        message: ServerMessage,
    },
}

/// Ordered messages produced by one room operation.
#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Dispatch>,
}

impl Outbox {
    /// Queue a room-wide broadcast.
    pub fn room(&mut self, message: ServerMessage) {
        self.items.push(Dispatch::Room(message));
    }

    /// Queue a unicast to `to`.
    pub fn direct(&mut self, to: &str, message: ServerMessage) {
        self.items.push(Dispatch::Direct {
            to: to.to_string(),
            message,
        });
    }

    /// Whether nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Queued messages in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &Dispatch> {
        self.items.iter()
    }
}

impl IntoIterator for Outbox {
    type Item = Dispatch;
    type IntoIter = std::vec::IntoIter<Dispatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Where a joining connection ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Took a seat.
    Seated {
        /// Side of the seat.
        team: Team,
        /// Role of the seat.
        role: Role,
        /// Bot evicted to make room, if any.
        replaced_bot: Option<String>,
    },
    /// No seat free; watching instead.
    Spectating,
}

/// Result of removing a connection from the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was neither seated nor spectating.
    NotMember,
    /// Removed; someone is still present.
    Left,
    /// No human and no spectator remain; the room is closed.
    Abandoned,
}

/// Rejections of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Phase does not allow starting.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    /// Roster below the configured minimum.
    #[error("at least {required} players are needed to start (have {present})")]
    NotEnoughPlayers {
        /// Seated participants, bots included.
        present: usize,
        /// Configured minimum.
        required: usize,
    },
    /// Requester holds no seat.
    #[error("only seated players can start the match")]
    NotSeated,
}

/// State of one room. See the module docs for the outbox contract.
#[derive(Debug)]
pub struct Room {
    id: String,
    mode: MatchMode,
    config: Arc<AppConfig>,
    bot_policy: BotPolicy,
    machine: RoomStateMachine,
    roster: IndexMap<String, Player>,
    spectators: IndexSet<String>,
    blue: TeamState,
    red: TeamState,
    started_at: Option<Instant>,
    started_wall: Option<SystemTime>,
    bots: BotSchedule,
    rng: StdRng,
    closed: bool,
}

impl Room {
    /// Create an empty lobby seeded from the OS.
    pub fn new(id: String, mode: MatchMode, config: Arc<AppConfig>) -> Self {
        Self::with_rng(id, mode, config, StdRng::from_os_rng())
    }

    /// Create an empty lobby drawing decks and bot decisions from `rng`.
    pub fn with_rng(id: String, mode: MatchMode, config: Arc<AppConfig>, rng: StdRng) -> Self {
        let bot_policy = BotPolicy::from_rules(config.rules());
        Self {
            id,
            mode,
            config,
            bot_policy,
            machine: RoomStateMachine::new(),
            roster: IndexMap::new(),
            spectators: IndexSet::new(),
            blue: TeamState::default(),
            red: TeamState::default(),
            started_at: None,
            started_wall: None,
            bots: BotSchedule::default(),
            rng,
            closed: false,
        }
    }

    /// Room identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mode fixing the room size.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of seats.
    pub fn capacity(&self) -> usize {
        self.mode.capacity()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoomPhase {
        self.machine.phase()
    }

    /// Winning team once the match has ended.
    pub fn winner(&self) -> Option<Team> {
        self.machine.winner()
    }

    /// Seated participant by id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.roster.get(id)
    }

    /// Seated participants in seating order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.roster.values()
    }

    /// Health and barrier of `team`.
    pub fn team(&self, team: Team) -> &TeamState {
        match team {
            Team::Blue => &self.blue,
            Team::Red => &self.red,
        }
    }

    fn team_mut(&mut self, team: Team) -> &mut TeamState {
        match team {
            Team::Blue => &mut self.blue,
            Team::Red => &mut self.red,
        }
    }

    /// Whether `connection_id` watches without a seat.
    pub fn is_spectator(&self, connection_id: &str) -> bool {
        self.spectators.contains(connection_id)
    }

    /// Whether `connection_id` is seated or spectating here.
    pub fn contains(&self, connection_id: &str) -> bool {
        self.roster.contains_key(connection_id) || self.spectators.contains(connection_id)
    }

    /// Seated humans.
    pub fn human_count(&self) -> usize {
        self.roster.values().filter(|player| !player.is_bot()).count()
    }

    /// Seated bots.
    pub fn bot_count(&self) -> usize {
        self.roster.values().filter(|player| player.is_bot()).count()
    }

    /// Watching connections.
    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// Connections that receive room broadcasts: seated humans, then spectators.
    pub fn recipients(&self) -> Vec<String> {
        self.roster
            .values()
            .filter(|player| !player.is_bot())
            .map(|player| player.id.clone())
            .chain(self.spectators.iter().cloned())
            .collect()
    }

    /// True once no human and no spectator is left. Bots do not keep a room alive.
    pub fn is_abandoned(&self) -> bool {
        self.human_count() == 0 && self.spectators.is_empty()
    }

    /// Whether the room was torn down and must not be reused.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the room as torn down and disarm every bot.
    pub fn close(&mut self) {
        self.closed = true;
        self.bots.clear();
    }

    /// Instant of the next bot tick, if the match is running.
    pub fn next_bot_due(&self) -> Option<Instant> {
        if self.closed || self.phase() != RoomPhase::Playing {
            return None;
        }
        self.bots.next_due()
    }

    /// Pending bot ticks.
    pub fn bot_schedule(&self) -> &BotSchedule {
        &self.bots
    }

    /// Whether a manual start would currently be accepted.
    pub fn can_start(&self) -> bool {
        self.phase() == RoomPhase::Lobby
            && self.roster.len() >= self.config.rules().min_players_to_start
    }

    /// Seat `connection_id` or, failing that, make it a spectator.
    ///
    /// A full room evicts its first bot. A room without a bot to evict, or an ended room, yields
    /// a spectator. Seating tops the roster up with bots and broadcasts the roster.
    pub fn join(
        &mut self,
        connection_id: &str,
        nickname: &str,
        now: Instant,
    ) -> (JoinOutcome, Outbox) {
        let mut outbox = Outbox::default();
        let outcome = self.admit(connection_id, nickname, now, &mut outbox);
        if matches!(outcome, JoinOutcome::Seated { .. }) {
            self.fill_with_bots(now);
            outbox.room(self.room_update());
        }
        (outcome, outbox)
    }

    /// Seat a matchmaking batch, humans first, then pad with bots and broadcast once.
    pub fn seat_batch<'a>(
        &mut self,
        entrants: impl IntoIterator<Item = (&'a str, &'a str)>,
        now: Instant,
    ) -> (Vec<(String, JoinOutcome)>, Outbox) {
        let mut outbox = Outbox::default();
        let mut outcomes = Vec::new();
        for (connection_id, nickname) in entrants {
            let outcome = self.admit(connection_id, nickname, now, &mut outbox);
            outcomes.push((connection_id.to_string(), outcome));
        }
        self.fill_with_bots(now);
        outbox.room(self.room_update());
        (outcomes, outbox)
    }

    fn admit(
        &mut self,
        connection_id: &str,
        nickname: &str,
        now: Instant,
        outbox: &mut Outbox,
    ) -> JoinOutcome {
        if let Some(player) = self.roster.get(connection_id) {
            let (team, role) = (player.team, player.role);
            outbox.direct(connection_id, self.matched(team, role));
            return JoinOutcome::Seated {
                team,
                role,
                replaced_bot: None,
            };
        }
        if self.phase() == RoomPhase::Ended {
            return self.admit_spectator(connection_id, outbox);
        }

        let (seat, replaced_bot) = match self.free_seat() {
            Some(seat) => (seat, None),
            None => match self.evict_bot() {
                Some(bot) => (bot.seat, Some(bot.id)),
                None => return self.admit_spectator(connection_id, outbox),
            },
        };

        self.spectators.shift_remove(connection_id);
        let mut player = Player::human(
            connection_id.to_string(),
            nickname.trim().to_string(),
            seat,
            self.capacity(),
        );
        let (team, role) = (player.team, player.role);
        outbox.direct(connection_id, self.matched(team, role));

        if self.phase() == RoomPhase::Playing {
            player.stats = PlayerStats::starting_at(now);
            player.current_words = self.deal_deck();
            outbox.direct(connection_id, self.match_started());
            outbox.direct(
                connection_id,
                ServerMessage::NewWords(NewWordsEvent {
                    words: player.current_words.clone(),
                }),
            );
        }
        self.roster.insert(connection_id.to_string(), player);

        info!(
            room_id = %self.id,
            connection_id,
            ?team,
            ?role,
            replaced_bot = ?replaced_bot,
            "player seated"
        );
        JoinOutcome::Seated {
            team,
            role,
            replaced_bot,
        }
    }

    fn admit_spectator(&mut self, connection_id: &str, outbox: &mut Outbox) -> JoinOutcome {
        self.spectators.insert(connection_id.to_string());
        outbox.direct(
            connection_id,
            ServerMessage::JoinedAsSpectator(SpectatorEvent {
                room_id: self.id.clone(),
                players: self.player_summaries(),
                blue_team: (&self.blue).into(),
                red_team: (&self.red).into(),
                phase: self.phase(),
            }),
        );
        info!(room_id = %self.id, connection_id, "joined as spectator");
        JoinOutcome::Spectating
    }

    fn free_seat(&self) -> Option<usize> {
        (0..self.capacity()).find(|seat| !self.roster.values().any(|player| player.seat == *seat))
    }

    fn evict_bot(&mut self) -> Option<Player> {
        let index = self.roster.values().position(Player::is_bot)?;
        let (_, bot) = self.roster.shift_remove_index(index)?;
        self.bots.cancel(&bot.id);
        info!(room_id = %self.id, bot_id = %bot.id, seat = bot.seat, "bot replaced by human");
        Some(bot)
    }

    fn fill_with_bots(&mut self, now: Instant) {
        if self.phase() == RoomPhase::Ended {
            return;
        }
        while let Some(seat) = self.free_seat() {
            let mut bot = Player::bot(seat, self.capacity());
            if self.phase() == RoomPhase::Playing {
                bot.stats = PlayerStats::starting_at(now);
                bot.current_words = self.deal_deck();
                let delay = self.bot_policy.next_delay(&mut self.rng);
                self.bots.schedule(&bot.id, now + delay);
            }
            debug!(room_id = %self.id, bot_id = %bot.id, seat, "bot seated");
            self.roster.insert(bot.id.clone(), bot);
        }
    }

    fn deal_deck(&mut self) -> Vec<WordWithElement> {
        self.config
            .words()
            .generate(&mut self.rng, self.config.rules().deck_size)
    }

    /// Move the lobby to `playing`.
    ///
    /// `requested_by` is the connection asking for a manual start; matchmaking passes `None`.
    /// Both teams and every player's charges and stats are reset, each participant gets a deck
    /// and every bot is armed.
    pub fn start(&mut self, requested_by: Option<&str>, now: Instant) -> Result<Outbox, RoomError> {
        let seated = |id: &str| self.roster.get(id).is_some_and(|player| !player.is_bot());
        if requested_by.is_some_and(|id| !seated(id)) {
            return Err(RoomError::NotSeated);
        }
        let required = self.config.rules().min_players_to_start;
        if self.phase() == RoomPhase::Lobby && self.roster.len() < required {
            return Err(RoomError::NotEnoughPlayers {
                present: self.roster.len(),
                required,
            });
        }
        self.machine.apply(RoomEvent::StartMatch)?;

        self.blue = TeamState::default();
        self.red = TeamState::default();
        self.started_at = Some(now);
        self.started_wall = Some(SystemTime::now());
        self.bots.clear();

        let mut outbox = Outbox::default();
        outbox.room(self.match_started());

        let ids: Vec<String> = self.roster.keys().cloned().collect();
        for id in ids {
            let deck = self.deal_deck();
            let Some(player) = self.roster.get_mut(&id) else {
                continue;
            };
            player.charges = ElementCharges::default();
            player.stats = PlayerStats::starting_at(now);
            player.current_words = deck.clone();
            if player.is_bot() {
                let delay = self.bot_policy.next_delay(&mut self.rng);
                self.bots.schedule(&id, now + delay);
            } else {
                outbox.direct(&id, ServerMessage::NewWords(NewWordsEvent { words: deck }));
            }
        }
        outbox.room(self.charges_update());

        info!(
            room_id = %self.id,
            players = self.roster.len(),
            bots = self.bots.len(),
            "match started"
        );
        Ok(outbox)
    }

    /// Deal a fresh deck to a seated human.
    pub fn player_ready(&mut self, player_id: &str) -> Outbox {
        let mut outbox = Outbox::default();
        if self.phase() != RoomPhase::Playing
            || !self.roster.get(player_id).is_some_and(|player| !player.is_bot())
        {
            return outbox;
        }
        let deck = self.deal_deck();
        if let Some(player) = self.roster.get_mut(player_id) {
            player.current_words = deck.clone();
        }
        outbox.direct(player_id, ServerMessage::NewWords(NewWordsEvent { words: deck }));
        outbox
    }

    /// Check a typed word against the submitter's current deck.
    ///
    /// A miss only bumps `incorrect_words` and tells the submitter; the deck stays. A hit charges
    /// the word's element, chip-boosts the team for normal words, deals a new deck and broadcasts
    /// every player's charges.
    pub fn submit_word(&mut self, player_id: &str, word: &str) -> Outbox {
        let mut outbox = Outbox::default();
        if self.phase() != RoomPhase::Playing {
            return outbox;
        }
        let config = Arc::clone(&self.config);
        let rules = config.rules();
        let normalized = word.trim().to_lowercase();

        let Some(player) = self
            .roster
            .get_mut(player_id)
            .filter(|player| !player.is_bot())
        else {
            return outbox;
        };
        let Some(entry) = player
            .current_words
            .iter()
            .find(|candidate| candidate.word == normalized)
            .cloned()
        else {
            player.stats.incorrect_words += 1;
            debug!(room_id = %self.id, player_id, word = %normalized, "word not in deck");
            outbox.direct(
                player_id,
                ServerMessage::WordInvalid(WordInvalidEvent { word: normalized }),
            );
            return outbox;
        };

        player.stats.words_typed += 1;
        player.stats.correct_words += 1;
        let gain = if entry.is_charge {
            rules.charge_word_gain
        } else {
            rules.normal_word_gain
        };
        player.charges.add(entry.element, gain);
        let team = player.team;

        if !entry.is_charge {
            let (hp_gain, shield_gain) = self
                .team_mut(team)
                .chip_boost(rules.chip_boost_hp, rules.chip_boost_shield);
            if let Some(player) = self.roster.get_mut(player_id) {
                player.stats.shield_restored += u32::from(shield_gain);
            }
            outbox.room(ServerMessage::SmallBoost(SmallBoostEvent {
                player_id: player_id.to_string(),
                team,
                hp_gain,
                shield_gain,
                blue_team: (&self.blue).into(),
                red_team: (&self.red).into(),
            }));
        }

        let deck = self.deal_deck();
        let Some(player) = self.roster.get_mut(player_id) else {
            return outbox;
        };
        player.current_words = deck.clone();
        let charges = player.charges;

        outbox.direct(
            player_id,
            ServerMessage::WordCorrect(WordCorrectEvent {
                word: entry.word,
                element: entry.element,
                is_charge: entry.is_charge,
                charges,
            }),
        );
        outbox.direct(player_id, ServerMessage::NewWords(NewWordsEvent { words: deck }));
        outbox.room(self.charges_update());
        outbox
    }

    /// Spend a full charge of `element` on an attack or a barrier.
    pub fn use_element(
        &mut self,
        player_id: &str,
        element: Element,
        action: ElementAction,
        now: Instant,
    ) -> Outbox {
        let mut outbox = Outbox::default();
        if self.phase() != RoomPhase::Playing {
            return outbox;
        }
        let Some(player) = self
            .roster
            .get_mut(player_id)
            .filter(|player| !player.is_bot())
        else {
            return outbox;
        };
        if !player.charges.is_full(element) {
            outbox.direct(
                player_id,
                ServerMessage::NotEnoughCharge(NotEnoughChargeEvent {
                    element,
                    charge: player.charges.get(element),
                    required: GAUGE_MAX,
                }),
            );
            return outbox;
        }
        player.charges.reset(element);

        let winner = self.resolve_element(player_id, element, action, &mut outbox);
        outbox.room(self.charges_update());
        if let Some(winner) = winner {
            self.finish_match(winner, now, &mut outbox);
        }
        outbox
    }

    /// Apply an attack or barrier for `actor_id`. Returns the winner if the target fell.
    fn resolve_element(
        &mut self,
        actor_id: &str,
        element: Element,
        action: ElementAction,
        outbox: &mut Outbox,
    ) -> Option<Team> {
        let team = self.roster.get(actor_id)?.team;
        let base_damage = self.config.rules().base_damage;
        let barrier_strength = self.config.rules().barrier_strength;

        match action {
            ElementAction::Attack => {
                let target = team.opponent();
                let outcome = self.team_mut(target).receive_attack(element, base_damage);
                if let Some(actor) = self.roster.get_mut(actor_id) {
                    actor.stats.damage_dealt += u32::from(outcome.damage);
                }
                info!(
                    room_id = %self.id,
                    attacker = actor_id,
                    ?element,
                    advantage = ?outcome.advantage,
                    damage = outcome.damage,
                    absorbed = outcome.absorbed,
                    hp_damage = outcome.hp_damage,
                    target_hp = self.team(target).hp,
                    "attack landed"
                );
                outbox.room(ServerMessage::AttackLanded(AttackLandedEvent {
                    attacker_id: actor_id.to_string(),
                    attacker_team: team,
                    element,
                    advantage: outcome.advantage,
                    is_critical: outcome.advantage == Advantage::Critical,
                    damage: outcome.damage,
                    absorbed: outcome.absorbed,
                    hp_damage: outcome.hp_damage,
                    barrier_broken: outcome.barrier_broken,
                    blue_team: (&self.blue).into(),
                    red_team: (&self.red).into(),
                }));
                self.team(target).is_defeated().then_some(team)
            }
            ElementAction::Barrier => {
                self.team_mut(team).raise_barrier(element, barrier_strength);
                let strength = self
                    .team(team)
                    .barrier
                    .map(|barrier| barrier.strength)
                    .unwrap_or(0);
                if let Some(actor) = self.roster.get_mut(actor_id) {
                    actor.stats.shield_restored += u32::from(strength);
                }
                info!(room_id = %self.id, player_id = actor_id, ?team, ?element, "barrier raised");
                outbox.room(ServerMessage::BarrierCreated(BarrierCreatedEvent {
                    player_id: actor_id.to_string(),
                    team,
                    element,
                    strength,
                    blue_team: (&self.blue).into(),
                    red_team: (&self.red).into(),
                }));
                None
            }
        }
    }

    /// End the match once. Later calls are ignored.
    fn finish_match(&mut self, winner: Team, now: Instant, outbox: &mut Outbox) {
        if self.machine.apply(RoomEvent::TeamDefeated { winner }).is_err() {
            return;
        }
        self.bots.clear();

        let duration = self
            .started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or(Duration::ZERO);
        let stats = stats::finalize(self.roster.values(), duration)
            .into_iter()
            .map(PlayerFinalStats::from)
            .collect();

        info!(
            room_id = %self.id,
            ?winner,
            duration_ms = duration.as_millis() as u64,
            "match ended"
        );
        outbox.room(ServerMessage::MatchEnded(MatchEndedEvent {
            winner,
            blue_team: (&self.blue).into(),
            red_team: (&self.red).into(),
            stats,
            duration_ms: duration.as_millis() as u64,
        }));
    }

    /// Run every bot tick due at `now`.
    pub fn run_due_bots(&mut self, now: Instant) -> Outbox {
        let mut outbox = Outbox::default();
        if self.closed || self.phase() != RoomPhase::Playing {
            self.bots.clear();
            return outbox;
        }
        for bot_id in self.bots.take_due(now) {
            if self.phase() != RoomPhase::Playing {
                break;
            }
            self.bot_turn(&bot_id, now, &mut outbox);
        }
        outbox
    }

    fn bot_turn(&mut self, bot_id: &str, now: Instant, outbox: &mut Outbox) {
        if !self.roster.get(bot_id).is_some_and(Player::is_bot) {
            return;
        }
        let turn = self.bot_policy.plan_turn(&mut self.rng);
        let deck = self.deal_deck();
        if let Some(bot) = self.roster.get_mut(bot_id) {
            bot.stats.words_typed += 1;
            if turn.typed_correctly {
                bot.stats.correct_words += 1;
            } else {
                bot.stats.incorrect_words += 1;
            }
            bot.current_words = deck;
        }

        if let Some((element, action)) = turn.action {
            debug!(room_id = %self.id, bot_id, ?element, ?action, "bot acts");
            if let Some(winner) = self.resolve_element(bot_id, element, action, outbox) {
                self.finish_match(winner, now, outbox);
                return;
            }
        }

        let delay = self.bot_policy.next_delay(&mut self.rng);
        self.bots.schedule(bot_id, now + delay);
    }

    /// Remove a seated player or spectator.
    ///
    /// Departing humans are not replaced by bots. An abandoned room closes itself; otherwise the
    /// roster is broadcast again.
    pub fn leave(&mut self, connection_id: &str) -> (LeaveOutcome, Outbox) {
        let mut outbox = Outbox::default();
        let was_player = self.roster.shift_remove(connection_id).is_some();
        let was_spectator = self.spectators.shift_remove(connection_id);
        if !was_player && !was_spectator {
            return (LeaveOutcome::NotMember, outbox);
        }
        info!(room_id = %self.id, connection_id, was_player, "left room");

        if self.is_abandoned() {
            self.close();
            return (LeaveOutcome::Abandoned, outbox);
        }
        outbox.room(self.room_update());
        (LeaveOutcome::Left, outbox)
    }

    fn matched(&self, team: Team, role: Role) -> ServerMessage {
        ServerMessage::Matched(MatchedEvent {
            room_id: self.id.clone(),
            team,
            role,
        })
    }

    fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.roster.values().map(PlayerSummary::from).collect()
    }

    fn room_update(&self) -> ServerMessage {
        ServerMessage::RoomUpdate(RoomUpdateEvent {
            room_id: self.id.clone(),
            players: self.player_summaries(),
            can_start: self.can_start(),
            phase: self.phase(),
        })
    }

    fn match_started(&self) -> ServerMessage {
        let match_start_time = self
            .started_wall
            .and_then(|wall| wall.duration_since(UNIX_EPOCH).ok())
            .map(|since| since.as_millis() as u64)
            .unwrap_or_default();
        ServerMessage::MatchStarted(MatchStartedEvent {
            phase: self.phase(),
            blue_team: (&self.blue).into(),
            red_team: (&self.red).into(),
            match_start_time,
        })
    }

    fn charges_update(&self) -> ServerMessage {
        ServerMessage::ElementChargesUpdate(ElementChargesEvent {
            player_charges: self.roster.values().map(PlayerCharges::from).collect(),
        })
    }

    /// One-line listing of the room.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            mode: self.mode,
            phase: self.phase(),
            humans: self.human_count(),
            bots: self.bot_count(),
            spectators: self.spectator_count(),
        }
    }

    /// Read-only view of the whole room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            mode: self.mode,
            phase: self.phase(),
            players: self.player_summaries(),
            blue_team: (&self.blue).into(),
            red_team: (&self.red).into(),
            winner: self.winner(),
            started_at: self.started_wall.map(format_system_time),
        }
    }
}
