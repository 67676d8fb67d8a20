//! Blackjack table state machine.
//!
//! Holds the data shared by every phase, the traits dispatched over the
//! phase enum, and the generic `Game<T>` wrapper.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::constants::{DEFAULT_MAX_PLAYERS, DEFAULT_NUM_DECKS, DEFAULT_STARTING_CHIPS, MAX_HANDS};
use super::entities::{
    Card, Chips, DealerView, Hand, HandSlot, HandView, Phase, Player, PlayerId, PlayerView,
    RoomSnapshot, RoomView, RoundResult, Shoe, TurnPosition, Username,
};
use super::states::PhaseMarker;

/// Reasons a table command was rejected. A rejected command never
/// changes table state.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TableError {
    #[error("not allowed during the {0} phase")]
    InvalidPhase(Phase),
    #[error("not your turn")]
    NotYourTurn,
    #[error("need {required} chips, have {available}")]
    InsufficientChips { required: Chips, available: Chips },
    #[error("hand can't be doubled or split")]
    InvalidHandShape,
    #[error("room not found")]
    RoomNotFound,
    #[error("bet must be greater than zero")]
    InvalidBet,
    #[error("every player must bet before the deal")]
    BetsOutstanding,
    #[error("need at least one player")]
    NoPlayers,
    #[error("player does not exist")]
    PlayerNotFound,
    #[error("player already exists")]
    PlayerAlreadyExists,
    #[error("room is full")]
    RoomFull,
    #[error("not dealt into this round")]
    NotInRound,
    #[error("insurance already answered")]
    InsuranceAlreadyResolved,
    #[error("reset belongs to round {requested}, table is on round {current}")]
    StaleReset { requested: u64, current: u64 },
}

/// Things that happened at the table, drained by the owner after each
/// command.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    Joined(Username),
    Left(Username),
    BetPlaced(Username, Chips),
    SharedModeChanged(bool),
    RoundStarted(u64),
    InsuranceOffered,
    InsuranceTaken(Username, Chips),
    InsuranceDeclined(Username),
    Hit(Username, u32),
    Stood(Username),
    Doubled(Username, Chips),
    Split(Username, usize),
    Busted(Username),
    PlayerDone(Username),
    PhaseChanged(Phase),
    DealerStands(u32),
    Settled(Username, i64),
    RoundReset(u64),
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Joined(username) => format!("{username} joined the table"),
            Self::Left(username) => format!("{username} left the table"),
            Self::BetPlaced(username, amount) => format!("{username} bets {amount}"),
            Self::SharedModeChanged(true) => "shared mode on".to_string(),
            Self::SharedModeChanged(false) => "shared mode off".to_string(),
            Self::RoundStarted(round) => format!("round {round} dealt"),
            Self::InsuranceOffered => "dealer shows an ace, insurance open".to_string(),
            Self::InsuranceTaken(username, stake) => format!("{username} insures for {stake}"),
            Self::InsuranceDeclined(username) => format!("{username} declines insurance"),
            Self::Hit(username, value) => format!("{username} hits to {value}"),
            Self::Stood(username) => format!("{username} stands"),
            Self::Doubled(username, bet) => format!("{username} doubles to {bet}"),
            Self::Split(username, hands) => format!("{username} splits into {hands} hands"),
            Self::Busted(username) => format!("{username} busts"),
            Self::PlayerDone(username) => format!("{username} is done"),
            Self::PhaseChanged(phase) => format!("{phase} phase"),
            Self::DealerStands(value) => format!("dealer stands on {value}"),
            Self::Settled(username, net) => format!("{username} nets {net:+}"),
            Self::RoundReset(round) => format!("round {round} cleared"),
        };
        write!(f, "{repr}")
    }
}

/// Table rules fixed for the lifetime of a room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    pub starting_chips: Chips,
    pub num_decks: usize,
    pub max_players: usize,
    pub max_hands: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_STARTING_CHIPS,
            DEFAULT_NUM_DECKS,
            DEFAULT_MAX_PLAYERS,
            MAX_HANDS,
        )
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(
        starting_chips: Chips,
        num_decks: usize,
        max_players: usize,
        max_hands: usize,
    ) -> Self {
        Self {
            starting_chips,
            num_decks,
            max_players,
            max_hands,
        }
    }
}

/// Mutable room data shared across all phases.
#[derive(Debug)]
pub struct GameData {
    /// Replaced with a freshly shuffled shoe at every deal.
    pub(super) shoe: Shoe,
    /// When set, the next deal uses this shoe instead of shuffling.
    pub(super) queued_shoe: Option<Shoe>,
    /// Insertion order is turn order.
    pub players: Vec<Player>,
    pub dealer_hand: Hand,
    pub shared_mode: bool,
    /// The one hand every player acts on in shared mode.
    pub shared_hand: Hand,
    pub turn: Option<TurnPosition>,
    /// Incremented at every deal.
    pub round: u64,
    pub last_result: Option<RoundResult>,
    pub(super) events: VecDeque<GameEvent>,
    pub(super) settings: GameSettings,
}

impl Default for GameData {
    fn default() -> Self {
        GameSettings::default().into()
    }
}

impl From<GameSettings> for GameData {
    fn from(value: GameSettings) -> Self {
        Self {
            shoe: Shoe::default(),
            queued_shoe: None,
            players: Vec::with_capacity(value.max_players),
            dealer_hand: Hand::new(),
            shared_mode: false,
            shared_hand: Hand::new(),
            turn: None,
            round: 0,
            last_result: None,
            events: VecDeque::new(),
            settings: value,
        }
    }
}

impl GameData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn player_index(&self, id: &PlayerId) -> Result<usize, TableError> {
        self.players
            .iter()
            .position(|p| &p.id == id)
            .ok_or(TableError::PlayerNotFound)
    }

    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Resolves a hand slot, following shared slots to the room's hand.
    #[must_use]
    pub fn hand(&self, pos: TurnPosition) -> Option<&Hand> {
        match self.players.get(pos.player)?.hands.get(pos.hand)? {
            HandSlot::Owned(hand) => Some(hand),
            HandSlot::Shared => Some(&self.shared_hand),
        }
    }

    pub(super) fn hand_mut(&mut self, pos: TurnPosition) -> Option<&mut Hand> {
        match self.players.get_mut(pos.player)?.hands.get_mut(pos.hand)? {
            HandSlot::Owned(hand) => Some(hand),
            HandSlot::Shared => Some(&mut self.shared_hand),
        }
    }

    pub(super) fn push_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Finds the first playable hand at or after `pos`, marking players
    /// with no hands left as done along the way.
    pub(super) fn seek_turn(&mut self, mut pos: TurnPosition) -> Option<TurnPosition> {
        while let Some(player) = self.players.get(pos.player) {
            if !player.in_round || player.done {
                pos = TurnPosition::first_hand_of(pos.player + 1);
                continue;
            }
            if pos.hand >= player.hands.len() {
                let name = player.name.clone();
                self.players[pos.player].done = true;
                self.push_event(GameEvent::PlayerDone(name));
                pos = TurnPosition::first_hand_of(pos.player + 1);
                continue;
            }
            // A shared hand can already be bust when the turn reaches it.
            if self.hand(pos).is_some_and(Hand::is_bust) {
                pos.hand += 1;
                continue;
            }
            return Some(pos);
        }
        None
    }

    /// Finishes the hand at `pos` and moves the turn to the next hand.
    pub(super) fn finish_hand(&mut self, pos: TurnPosition) {
        self.turn = self.seek_turn(TurnPosition {
            player: pos.player,
            hand: pos.hand + 1,
        });
    }

    /// Removes a player and keeps the turn pointer on the same logical
    /// seat.
    pub(super) fn remove_player(&mut self, id: &PlayerId) -> Result<Player, TableError> {
        let idx = self.player_index(id)?;
        let player = self.players.remove(idx);
        if let Some(turn) = self.turn {
            if idx < turn.player {
                self.turn = Some(TurnPosition {
                    player: turn.player - 1,
                    hand: turn.hand,
                });
            } else if idx == turn.player {
                self.turn = self.seek_turn(TurnPosition::first_hand_of(idx));
            }
        }
        self.push_event(GameEvent::Left(player.name.clone()));
        Ok(player)
    }

    /// Returns any open bets to their owners and clears the round.
    pub(super) fn refund_and_clear(&mut self) {
        for player in &mut self.players {
            player.chips = player.chips.saturating_add(player.total_staked());
        }
        self.clear_round();
    }

    pub(super) fn clear_round(&mut self) {
        self.dealer_hand.clear();
        self.shared_hand.clear();
        self.turn = None;
        self.last_result = None;
        for player in &mut self.players {
            player.reset_for_betting();
        }
    }

    fn hand_views(&self, player_idx: usize) -> Vec<HandView> {
        let player = &self.players[player_idx];
        player
            .hands
            .iter()
            .enumerate()
            .map(|(hand_idx, slot)| {
                let hand = match slot {
                    HandSlot::Owned(hand) => hand,
                    HandSlot::Shared => &self.shared_hand,
                };
                HandView {
                    cards: hand.cards().to_vec(),
                    value: hand.value(),
                    bet: player.bets.get(hand_idx).copied().unwrap_or(0),
                    shared: slot.is_shared(),
                }
            })
            .collect()
    }

    fn dealer_view(&self, phase: Phase) -> DealerView {
        let cards = self.dealer_hand.cards();
        if phase.hides_hole_card() && cards.len() >= 2 {
            let mut visible: Vec<Option<Card>> = cards.iter().copied().map(Some).collect();
            visible[1] = None;
            let shown: Vec<Card> = visible.iter().flatten().copied().collect();
            DealerView {
                value: super::functional::hand_value(&shown),
                cards: visible,
            }
        } else {
            DealerView {
                cards: cards.iter().copied().map(Some).collect(),
                value: self.dealer_hand.value(),
            }
        }
    }

    /// The broadcastable projection of the room.
    #[must_use]
    pub fn view(&self, phase: Phase) -> RoomView {
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(idx, p)| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                chips: p.chips,
                hands: self.hand_views(idx),
                insurance_stake: p.insurance_stake,
                insurance_resolved: p.insurance_resolved,
                in_round: p.in_round,
                done: p.done,
            })
            .collect();
        let active_player = self
            .turn
            .and_then(|pos| self.players.get(pos.player))
            .map(|p| p.id.clone());

        RoomView {
            round: self.round,
            phase,
            shared_mode: self.shared_mode,
            shared_hand: self.shared_hand.cards().to_vec(),
            dealer: self.dealer_view(phase),
            players,
            active_player,
            active_hand: self.turn.map(|pos| pos.hand),
            last_result: self.last_result.clone(),
        }
    }

    /// The full-authority projection of the room.
    #[must_use]
    pub fn snapshot(&self, phase: Phase) -> RoomSnapshot {
        RoomSnapshot {
            round: self.round,
            phase,
            shared_mode: self.shared_mode,
            shared_hand: self.shared_hand.clone(),
            dealer_hand: self.dealer_hand.clone(),
            players: self.players.clone(),
            turn: self.turn,
            shoe_remaining: self.shoe.len(),
            last_result: self.last_result.clone(),
        }
    }
}

/// Trait for reading table state (views, events).
#[enum_dispatch]
pub trait GameStateManagement {
    fn drain_events(&mut self) -> VecDeque<GameEvent>;

    fn phase(&self) -> Phase;

    fn round(&self) -> u64;

    fn player_count(&self) -> usize;

    fn contains_player(&self, id: &PlayerId) -> bool;

    /// Redacted view safe to broadcast.
    fn view(&self) -> RoomView;

    /// Full view including the dealer's hole card.
    fn snapshot(&self) -> RoomSnapshot;
}

/// Trait for user management operations independent of table phase.
#[enum_dispatch]
pub trait PhaseIndependentUserManagement {
    fn new_user(&mut self, id: &PlayerId, name: &Username) -> Result<(), TableError>;
}

/// A blackjack room in phase `T`.
#[derive(Debug)]
pub struct Game<T> {
    pub data: GameData,
    pub state: T,
}

impl<T: PhaseMarker> GameStateManagement for Game<T> {
    fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn phase(&self) -> Phase {
        T::PHASE
    }

    fn round(&self) -> u64 {
        self.data.round
    }

    fn player_count(&self) -> usize {
        self.data.players.len()
    }

    fn contains_player(&self, id: &PlayerId) -> bool {
        self.data.player(id).is_some()
    }

    fn view(&self) -> RoomView {
        self.data.view(T::PHASE)
    }

    fn snapshot(&self) -> RoomSnapshot {
        self.data.snapshot(T::PHASE)
    }
}

impl<T> PhaseIndependentUserManagement for Game<T> {
    fn new_user(&mut self, id: &PlayerId, name: &Username) -> Result<(), TableError> {
        if self.data.player(id).is_some() {
            return Err(TableError::PlayerAlreadyExists);
        }
        if self.data.players.len() >= self.data.settings.max_players {
            return Err(TableError::RoomFull);
        }
        let player = Player::new(id.clone(), name.clone(), self.data.settings.starting_chips);
        self.data.players.push(player);
        self.data.push_event(GameEvent::Joined(name.clone()));
        Ok(())
    }
}
