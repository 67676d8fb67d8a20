use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::{constants, functional};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Heart,
    Diamond,
    Club,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Heart, Self::Diamond, Self::Club, Self::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Ace,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
    ];

    /// Blackjack value with aces counted high.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Ace => 11,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Rank, pub Suit);

impl Card {
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0.value()
    }

    #[must_use]
    pub fn is_ace(&self) -> bool {
        self.0 == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.0, self.1);
        write!(f, "{repr:>4}")
    }
}

/// The pooled cards a round is dealt from.
///
/// Cards are drawn from the back. A shoe is thrown away at the start of
/// every round rather than topped up.
#[derive(Debug, Default)]
pub struct Shoe {
    cards: Vec<Card>,
    num_decks: usize,
}

impl Shoe {
    /// Builds and shuffles `num_decks` standard decks.
    #[must_use]
    pub fn new(num_decks: usize) -> Self {
        let mut cards = Vec::with_capacity(num_decks * constants::CARDS_PER_DECK);
        for _ in 0..num_decks {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card(rank, suit));
                }
            }
        }
        cards.shuffle(&mut rand::rng());
        Self { cards, num_decks }
    }

    /// A shoe that deals `cards` in the given order.
    pub fn stacked<I: IntoIterator<Item = Card>>(cards: I) -> Self {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Self {
            cards,
            num_decks: 0,
        }
    }

    /// Draws the next card, building a fresh shoe if this one ran dry.
    pub fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            let num_decks = self.num_decks.max(1);
            log::warn!("Shoe exhausted mid-round, building a fresh {num_decks}-deck shoe");
            *self = Self::new(num_decks);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Type alias for whole chips. Bets, stacks and payouts are all whole
/// chips; fractional blackjack payouts round down.
pub type Chips = u32;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .take(constants::MAX_USERNAME_LENGTH)
            .collect();
        if username.is_empty() {
            username.push_str("Guest");
        }
        Self(username)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Participant identity handed out by the session layer (one per
/// connection).
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Removes the most recently dealt card. Used when splitting.
    pub fn take_last(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Best total, recomputed on every call.
    #[must_use]
    pub fn value(&self) -> u32 {
        functional::hand_value(&self.cards)
    }

    #[must_use]
    pub fn is_soft(&self) -> bool {
        functional::is_soft(&self.cards)
    }

    #[must_use]
    pub fn is_bust(&self) -> bool {
        self.value() > constants::BLACKJACK
    }

    #[must_use]
    pub fn is_blackjack(&self) -> bool {
        functional::is_blackjack(&self.cards)
    }

    #[must_use]
    pub fn can_split(&self) -> bool {
        functional::can_split(&self.cards)
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Self {
            cards: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cards: Vec<String> = self.cards.iter().map(|c| c.to_string().trim().to_string()).collect();
        write!(f, "[{}] ({})", cards.join(" "), self.value())
    }
}

/// One of a player's hand slots.
///
/// In shared mode a player's first slot is `Shared`: the cards live once
/// in the room and every player's slot resolves to them, so a card dealt
/// for one player is dealt for all. Hands created by splitting are always
/// owned.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "cards", rename_all = "snake_case")]
pub enum HandSlot {
    Owned(Hand),
    Shared,
}

impl Default for HandSlot {
    fn default() -> Self {
        Self::Owned(Hand::default())
    }
}

impl HandSlot {
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: Username,
    pub chips: Chips,
    /// Parallel to `bets`.
    pub hands: Vec<HandSlot>,
    pub bets: Vec<Chips>,
    pub insurance_stake: Chips,
    pub insurance_resolved: bool,
    /// Dealt into the current round. Players who sit down mid-round wait
    /// for the next betting phase.
    pub in_round: bool,
    pub done: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: Username, chips: Chips) -> Self {
        Self {
            id,
            name,
            chips,
            hands: vec![HandSlot::default()],
            bets: vec![0],
            insurance_stake: 0,
            insurance_resolved: false,
            in_round: false,
            done: false,
        }
    }

    /// The opening bet placed during the betting phase.
    #[must_use]
    pub fn opening_bet(&self) -> Chips {
        self.bets.first().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_bet(&self) -> bool {
        self.opening_bet() > 0
    }

    /// Everything this player has on the table right now.
    #[must_use]
    pub fn total_staked(&self) -> Chips {
        self.bets
            .iter()
            .fold(self.insurance_stake, |total, bet| total.saturating_add(*bet))
    }

    /// Clears per-round state without touching the stack.
    pub fn reset_for_betting(&mut self) {
        self.hands = vec![HandSlot::default()];
        self.bets = vec![0];
        self.insurance_stake = 0;
        self.insurance_resolved = false;
        self.in_round = false;
        self.done = false;
    }
}

/// Whose turn it is: a player index in turn order and which of that
/// player's hands is being played.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TurnPosition {
    pub player: usize,
    pub hand: usize,
}

impl TurnPosition {
    #[must_use]
    pub const fn first_hand_of(player: usize) -> Self {
        Self { player, hand: 0 }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Betting,
    Insurance,
    Playing,
    Dealer,
    Payout,
}

impl Phase {
    /// Phases during which the dealer's second card is face down.
    #[must_use]
    pub fn hides_hole_card(self) -> bool {
        matches!(self, Self::Insurance | Self::Playing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Betting => "betting",
            Self::Insurance => "insurance",
            Self::Playing => "playing",
            Self::Dealer => "dealer",
            Self::Payout => "payout",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandOutcome {
    Bust,
    Lose,
    Push,
    Win,
    Blackjack,
}

impl fmt::Display for HandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Bust => "busts",
            Self::Lose => "loses",
            Self::Push => "pushes",
            Self::Win => "wins",
            Self::Blackjack => "has blackjack",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResult {
    pub hand_index: usize,
    pub outcome: HandOutcome,
    pub bet: Chips,
    /// Chips returned to the player, stake included.
    pub payout: Chips,
    pub value: u32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerResult {
    pub player: PlayerId,
    pub name: Username,
    pub hands: Vec<HandResult>,
    pub insurance_stake: Chips,
    pub insurance_payout: Chips,
    /// Payouts minus everything staked this round.
    pub net: i64,
}

impl PlayerResult {
    #[must_use]
    pub fn total_payout(&self) -> Chips {
        self.hands
            .iter()
            .fold(self.insurance_payout, |total, h| total.saturating_add(h.payout))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoundResult {
    pub round: u64,
    pub dealer_value: u32,
    pub dealer_blackjack: bool,
    pub dealer_bust: bool,
    pub players: Vec<PlayerResult>,
}

impl RoundResult {
    #[must_use]
    pub fn for_player(&self, id: &PlayerId) -> Option<&PlayerResult> {
        self.players.iter().find(|p| &p.player == id)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HandView {
    pub cards: Vec<Card>,
    pub value: u32,
    pub bet: Chips,
    pub shared: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: Username,
    pub chips: Chips,
    pub hands: Vec<HandView>,
    pub insurance_stake: Chips,
    pub insurance_resolved: bool,
    pub in_round: bool,
    pub done: bool,
}

/// Dealer cards as seen by the table. A face-down card is `None` and is
/// left out of `value`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DealerView {
    pub cards: Vec<Option<Card>>,
    pub value: u32,
}

/// The redacted projection that is safe to broadcast to every seat.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomView {
    pub round: u64,
    pub phase: Phase,
    pub shared_mode: bool,
    pub shared_hand: Vec<Card>,
    pub dealer: DealerView,
    pub players: Vec<PlayerView>,
    pub active_player: Option<PlayerId>,
    pub active_hand: Option<usize>,
    pub last_result: Option<RoundResult>,
}

impl RoomView {
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.id == id)
    }
}

/// The full-authority projection, hole card included. Never broadcast.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub round: u64,
    pub phase: Phase,
    pub shared_mode: bool,
    pub shared_hand: Hand,
    pub dealer_hand: Hand,
    pub players: Vec<Player>,
    pub turn: Option<TurnPosition>,
    pub shoe_remaining: usize,
    pub last_result: Option<RoundResult>,
}

impl RoomSnapshot {
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Chips held by every seat plus everything currently staked.
    #[must_use]
    pub fn chips_in_play(&self) -> u64 {
        self.players
            .iter()
            .map(|p| u64::from(p.chips) + u64::from(p.total_staked()))
            .sum()
    }
}
