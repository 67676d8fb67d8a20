use enum_dispatch::enum_dispatch;
use std::collections::VecDeque;

use super::entities::{
    Chips, Hand, HandResult, HandSlot, Phase, PlayerId, PlayerResult, RoomSnapshot, RoomView,
    RoundResult, Shoe, TurnPosition, Username,
};
use super::constants::BLACKJACK;
use super::functional;
use super::state_machine::{
    Game, GameData, GameEvent, GameSettings, GameStateManagement,
    PhaseIndependentUserManagement, TableError,
};
use super::states::{Betting, Dealer, Insurance, Payout, Playing};

impl Game<Betting> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places (or replaces) a player's opening bet. A replaced bet is
    /// refunded before the new one is taken.
    pub fn place_bet(&mut self, id: &PlayerId, amount: Chips) -> Result<(), TableError> {
        let idx = self.data.player_index(id)?;
        if amount == 0 {
            return Err(TableError::InvalidBet);
        }
        let player = &mut self.data.players[idx];
        let available = player.chips.saturating_add(player.opening_bet());
        if amount > available {
            return Err(TableError::InsufficientChips {
                required: amount,
                available,
            });
        }
        player.chips = available - amount;
        player.bets[0] = amount;
        let name = player.name.clone();
        self.data.push_event(GameEvent::BetPlaced(name, amount));
        Ok(())
    }

    /// Switching modes throws away the round being set up, so every open
    /// bet goes back to its owner.
    pub fn set_shared_mode(&mut self, enabled: bool) {
        self.data.refund_and_clear();
        self.data.shared_mode = enabled;
        self.data.push_event(GameEvent::SharedModeChanged(enabled));
    }

    pub fn can_deal(&self) -> Result<(), TableError> {
        if self.data.players.is_empty() {
            return Err(TableError::NoPlayers);
        }
        if !self.data.players.iter().all(|p| p.has_bet()) {
            return Err(TableError::BetsOutstanding);
        }
        Ok(())
    }

    /// Deals a new round from a fresh shoe: two cards to the dealer, then two
    /// to each player (or to the shared hand).
    fn deal(mut self) -> TableState {
        let data = &mut self.data;
        data.round += 1;
        let num_decks = data.settings.num_decks;
        data.shoe = data
            .queued_shoe
            .take()
            .unwrap_or_else(|| Shoe::new(num_decks));
        data.dealer_hand.clear();
        data.shared_hand.clear();
        data.last_result = None;
        data.turn = None;

        let shared = data.shared_mode;
        for player in &mut data.players {
            let bet = player.opening_bet();
            player.hands = vec![if shared {
                HandSlot::Shared
            } else {
                HandSlot::Owned(Hand::new())
            }];
            player.bets = vec![bet];
            player.insurance_stake = 0;
            player.insurance_resolved = false;
            player.in_round = true;
            player.done = false;
        }

        for _ in 0..2 {
            let card = data.shoe.draw();
            data.dealer_hand.push(card);
        }
        if shared {
            for _ in 0..2 {
                let card = data.shoe.draw();
                data.shared_hand.push(card);
            }
        } else {
            for player in &mut data.players {
                for _ in 0..2 {
                    let card = data.shoe.draw();
                    if let Some(HandSlot::Owned(hand)) = player.hands.first_mut() {
                        hand.push(card);
                    }
                }
            }
        }

        log::info!(
            "Round {} dealt to {} player(s){}",
            data.round,
            data.players.len(),
            if shared { " on the shared hand" } else { "" }
        );
        data.push_event(GameEvent::RoundStarted(data.round));

        let ace_up = data.dealer_hand.cards().first().is_some_and(|c| c.is_ace());
        if ace_up {
            data.push_event(GameEvent::InsuranceOffered);
            data.push_event(GameEvent::PhaseChanged(Phase::Insurance));
            return TableState::Insurance(Game {
                data: self.data,
                state: Insurance {},
            });
        }
        if data.dealer_hand.is_blackjack() {
            return Game::<Dealer>::from(self.data).play().into();
        }
        Game::<Playing>::open(self.data)
    }
}

impl Default for Game<Betting> {
    fn default() -> Self {
        Self {
            data: GameData::default(),
            state: Betting::default(),
        }
    }
}

impl From<GameData> for Game<Betting> {
    fn from(value: GameData) -> Self {
        Self {
            data: value,
            state: Betting::default(),
        }
    }
}

impl Game<Insurance> {
    /// Records a player's insurance answer. Accepting without enough chips
    /// for half the bet is recorded as a decline.
    pub fn insure(&mut self, id: &PlayerId, accept: bool) -> Result<(), TableError> {
        let idx = self.data.player_index(id)?;
        let player = &mut self.data.players[idx];
        if !player.in_round {
            return Err(TableError::NotInRound);
        }
        if player.insurance_resolved {
            return Err(TableError::InsuranceAlreadyResolved);
        }
        let stake = player.opening_bet() / 2;
        let event = if accept && stake > 0 && player.chips >= stake {
            player.chips -= stake;
            player.insurance_stake = stake;
            GameEvent::InsuranceTaken(player.name.clone(), stake)
        } else {
            GameEvent::InsuranceDeclined(player.name.clone())
        };
        player.insurance_resolved = true;
        self.data.push_event(event);
        Ok(())
    }

    /// Every dealt-in player has answered.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.data
            .players
            .iter()
            .filter(|p| p.in_round)
            .all(|p| p.insurance_resolved)
    }

    /// Ends the insurance window. A dealer natural skips straight to payout.
    fn close(self) -> TableState {
        if self.data.dealer_hand.is_blackjack() {
            Game::<Dealer>::from(self.data).play().into()
        } else {
            Game::<Playing>::open(self.data)
        }
    }
}

impl Game<Playing> {
    /// Points the turn at the first playable hand, going straight to the
    /// dealer if nobody has anything to play.
    fn open(mut data: GameData) -> TableState {
        data.turn = data.seek_turn(TurnPosition::first_hand_of(0));
        data.push_event(GameEvent::PhaseChanged(Phase::Playing));
        let game = Self {
            data,
            state: Playing {},
        };
        if game.is_finished() {
            game.into_dealer().play().into()
        } else {
            TableState::Playing(game)
        }
    }

    fn active(&self, id: &PlayerId) -> Result<TurnPosition, TableError> {
        let idx = self.data.player_index(id)?;
        match self.data.turn {
            Some(pos) if pos.player == idx => Ok(pos),
            _ => Err(TableError::NotYourTurn),
        }
    }

    fn draw_into(&mut self, pos: TurnPosition) -> u32 {
        let card = self.data.shoe.draw();
        match self.data.hand_mut(pos) {
            Some(hand) => {
                hand.push(card);
                hand.value()
            }
            None => {
                log::error!("Turn points at missing hand {pos:?}");
                0
            }
        }
    }

    /// Finishes the hand at `pos` if it went over.
    fn finish_if_bust(&mut self, pos: TurnPosition, value: u32) -> bool {
        if value <= BLACKJACK {
            return false;
        }
        let name = self.data.players[pos.player].name.clone();
        self.data.push_event(GameEvent::Busted(name));
        self.data.finish_hand(pos);
        true
    }

    pub fn hit(&mut self, id: &PlayerId) -> Result<(), TableError> {
        let pos = self.active(id)?;
        let value = self.draw_into(pos);
        let name = self.data.players[pos.player].name.clone();
        self.data.push_event(GameEvent::Hit(name, value));
        self.finish_if_bust(pos, value);
        Ok(())
    }

    pub fn stand(&mut self, id: &PlayerId) -> Result<(), TableError> {
        let pos = self.active(id)?;
        let name = self.data.players[pos.player].name.clone();
        self.data.push_event(GameEvent::Stood(name));
        self.data.finish_hand(pos);
        Ok(())
    }

    /// Doubles the active hand's bet for exactly one more card.
    pub fn double(&mut self, id: &PlayerId) -> Result<(), TableError> {
        let pos = self.active(id)?;
        if self.data.hand(pos).map_or(0, Hand::len) != 2 {
            return Err(TableError::InvalidHandShape);
        }
        let player = &mut self.data.players[pos.player];
        let bet = player.bets[pos.hand];
        if player.chips < bet {
            return Err(TableError::InsufficientChips {
                required: bet,
                available: player.chips,
            });
        }
        player.chips -= bet;
        let doubled = bet.saturating_mul(2);
        player.bets[pos.hand] = doubled;
        let name = player.name.clone();
        self.data.push_event(GameEvent::Doubled(name, doubled));

        let value = self.draw_into(pos);
        if !self.finish_if_bust(pos, value) {
            self.data.finish_hand(pos);
        }
        Ok(())
    }

    /// Splits the active hand. The second card starts a new hand at the end
    /// of the player's hands and the turn stays on the current hand.
    pub fn split(&mut self, id: &PlayerId) -> Result<(), TableError> {
        let pos = self.active(id)?;
        if !self.data.hand(pos).is_some_and(Hand::can_split)
            || self.data.players[pos.player].hands.len() >= self.data.settings.max_hands
        {
            return Err(TableError::InvalidHandShape);
        }
        let player = &self.data.players[pos.player];
        let bet = player.bets[pos.hand];
        if player.chips < bet {
            return Err(TableError::InsufficientChips {
                required: bet,
                available: player.chips,
            });
        }
        let Some(moved) = self.data.hand_mut(pos).and_then(Hand::take_last) else {
            return Err(TableError::InvalidHandShape);
        };
        self.draw_into(pos);
        let fresh = self.data.shoe.draw();

        let player = &mut self.data.players[pos.player];
        player.chips -= bet;
        player.hands.push(HandSlot::Owned(Hand::from(vec![moved, fresh])));
        player.bets.push(bet);
        let (name, hands) = (player.name.clone(), player.hands.len());
        self.data.push_event(GameEvent::Split(name, hands));
        Ok(())
    }

    /// No hand is left to play.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.data.turn.is_none()
    }

    fn into_dealer(self) -> Game<Dealer> {
        self.data.into()
    }
}

impl From<GameData> for Game<Dealer> {
    fn from(value: GameData) -> Self {
        Self {
            data: value,
            state: Dealer {},
        }
    }
}

impl Game<Dealer> {
    /// Draws the dealer out and settles every dealt-in player.
    fn play(mut self) -> Game<Payout> {
        let data = &mut self.data;
        data.turn = None;
        data.push_event(GameEvent::PhaseChanged(Phase::Dealer));
        while functional::dealer_should_hit(data.dealer_hand.cards()) {
            let card = data.shoe.draw();
            data.dealer_hand.push(card);
        }
        let dealer_value = data.dealer_hand.value();
        data.push_event(GameEvent::DealerStands(dealer_value));

        let result = self.settle();
        log::info!(
            "Round {} settled: dealer {}, {} player(s), net {:+}",
            result.round,
            dealer_value,
            result.players.len(),
            result.players.iter().map(|p| p.net).sum::<i64>()
        );
        self.data.last_result = Some(result);
        self.data.push_event(GameEvent::PhaseChanged(Phase::Payout));
        Game {
            data: self.data,
            state: Payout {},
        }
    }

    /// Pays out every hand and insurance stake, clearing stakes as they are
    /// paid. Insurance is paid once per player ahead of the hands.
    fn settle(&mut self) -> RoundResult {
        let data = &mut self.data;
        let dealer = data.dealer_hand.cards().to_vec();
        let mut players = Vec::new();
        let mut events = Vec::new();

        for player in data.players.iter_mut().filter(|p| p.in_round) {
            let staked = player.total_staked();
            let insurance_payout =
                functional::insurance_payout(player.insurance_stake, &dealer);

            let mut hands = Vec::with_capacity(player.hands.len());
            for (hand_index, (slot, bet)) in player.hands.iter().zip(&player.bets).enumerate() {
                let hand = match slot {
                    HandSlot::Owned(hand) => hand,
                    HandSlot::Shared => &data.shared_hand,
                };
                let (outcome, payout) = functional::settle_hand(hand.cards(), *bet, &dealer);
                hands.push(HandResult {
                    hand_index,
                    outcome,
                    bet: *bet,
                    payout,
                    value: hand.value(),
                });
            }

            let result = PlayerResult {
                player: player.id.clone(),
                name: player.name.clone(),
                insurance_stake: player.insurance_stake,
                insurance_payout,
                net: 0,
                hands,
            };
            let paid = result.total_payout();
            let net = i64::from(paid) - i64::from(staked);
            player.chips = player.chips.saturating_add(paid);
            player.bets.iter_mut().for_each(|b| *b = 0);
            player.insurance_stake = 0;
            player.done = true;

            events.push(GameEvent::Settled(player.name.clone(), net));
            players.push(PlayerResult { net, ..result });
        }
        data.events.extend(events);

        RoundResult {
            round: data.round,
            dealer_value: data.dealer_hand.value(),
            dealer_blackjack: data.dealer_hand.is_blackjack(),
            dealer_bust: data.dealer_hand.is_bust(),
            players,
        }
    }
}

impl Game<Payout> {
    /// Clears the table for the next round of betting.
    fn reset(mut self) -> Game<Betting> {
        self.data.clear_round();
        let round = self.data.round;
        self.data.push_event(GameEvent::RoundReset(round));
        self.data.push_event(GameEvent::PhaseChanged(Phase::Betting));
        self.data.into()
    }
}

/// A blackjack room in whichever phase it is currently in.
///
/// Every command either applies completely or returns a [`TableError`] and
/// leaves the room untouched. Commands that finish a phase move the room on
/// immediately, so `Dealer` is never observed at rest.
#[enum_dispatch(GameStateManagement, PhaseIndependentUserManagement)]
#[derive(Debug)]
pub enum TableState {
    Betting(Game<Betting>),
    Insurance(Game<Insurance>),
    Playing(Game<Playing>),
    Payout(Game<Payout>),
}

impl Default for TableState {
    fn default() -> Self {
        Self::Betting(Game::default())
    }
}

impl From<GameSettings> for TableState {
    fn from(value: GameSettings) -> Self {
        Self::Betting(GameData::from(value).into())
    }
}

impl TableState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> &GameData {
        match self {
            Self::Betting(game) => &game.data,
            Self::Insurance(game) => &game.data,
            Self::Playing(game) => &game.data,
            Self::Payout(game) => &game.data,
        }
    }

    fn data_mut(&mut self) -> &mut GameData {
        match self {
            Self::Betting(game) => &mut game.data,
            Self::Insurance(game) => &mut game.data,
            Self::Playing(game) => &mut game.data,
            Self::Payout(game) => &mut game.data,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        self.data().settings()
    }

    #[must_use]
    pub fn shared_mode(&self) -> bool {
        self.data().shared_mode
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&RoundResult> {
        self.data().last_result.as_ref()
    }

    /// Deals the next round from `shoe` instead of a freshly shuffled one.
    pub fn queue_shoe(&mut self, shoe: Shoe) {
        self.data_mut().queued_shoe = Some(shoe);
    }

    /// Seats a new player. Players joining after the deal sit out until
    /// the next round.
    pub fn join(&mut self, id: &PlayerId, name: &Username) -> Result<(), TableError> {
        self.new_user(id, name)
    }

    /// Removes a player in any phase. Their stake this round is forfeit.
    /// Returns the number of players left.
    pub fn leave(&mut self, id: &PlayerId) -> Result<usize, TableError> {
        self.data_mut().remove_player(id)?;
        let remaining = self.player_count();
        *self = match std::mem::take(self) {
            Self::Insurance(game) if game.is_resolved() => game.close(),
            Self::Playing(game) if game.is_finished() => game.into_dealer().play().into(),
            other => other,
        };
        Ok(remaining)
    }

    pub fn place_bet(&mut self, id: &PlayerId, amount: Chips) -> Result<(), TableError> {
        match self {
            Self::Betting(game) => game.place_bet(id, amount),
            _ => Err(TableError::InvalidPhase(self.phase())),
        }
    }

    /// Deals if every seated player has a bet.
    pub fn start_round(&mut self) -> Result<(), TableError> {
        match self {
            Self::Betting(game) => game.can_deal()?,
            _ => return Err(TableError::InvalidPhase(self.phase())),
        }
        *self = match std::mem::take(self) {
            Self::Betting(game) => game.deal(),
            other => other,
        };
        Ok(())
    }

    pub fn insurance(&mut self, id: &PlayerId, accept: bool) -> Result<(), TableError> {
        match self {
            Self::Insurance(game) => game.insure(id, accept)?,
            _ => return Err(TableError::InvalidPhase(self.phase())),
        }
        *self = match std::mem::take(self) {
            Self::Insurance(game) if game.is_resolved() => game.close(),
            other => other,
        };
        Ok(())
    }

    fn act(
        &mut self,
        id: &PlayerId,
        action: impl FnOnce(&mut Game<Playing>, &PlayerId) -> Result<(), TableError>,
    ) -> Result<(), TableError> {
        match self {
            Self::Playing(game) => action(game, id)?,
            _ => return Err(TableError::InvalidPhase(self.phase())),
        }
        *self = match std::mem::take(self) {
            Self::Playing(game) if game.is_finished() => game.into_dealer().play().into(),
            other => other,
        };
        Ok(())
    }

    pub fn hit(&mut self, id: &PlayerId) -> Result<(), TableError> {
        self.act(id, Game::<Playing>::hit)
    }

    pub fn stand(&mut self, id: &PlayerId) -> Result<(), TableError> {
        self.act(id, Game::<Playing>::stand)
    }

    pub fn double(&mut self, id: &PlayerId) -> Result<(), TableError> {
        self.act(id, Game::<Playing>::double)
    }

    pub fn split(&mut self, id: &PlayerId) -> Result<(), TableError> {
        self.act(id, Game::<Playing>::split)
    }

    pub fn set_shared_mode(&mut self, enabled: bool) -> Result<(), TableError> {
        match self {
            Self::Betting(game) => {
                game.set_shared_mode(enabled);
                Ok(())
            }
            _ => Err(TableError::InvalidPhase(self.phase())),
        }
    }

    pub fn toggle_shared_mode(&mut self) -> Result<(), TableError> {
        let enabled = !self.shared_mode();
        self.set_shared_mode(enabled)
    }

    /// Returns the room to betting after the payout of `round`. A reset
    /// for any other round is refused.
    pub fn reset_round(&mut self, round: u64) -> Result<(), TableError> {
        match self {
            Self::Payout(game) if game.data.round == round => {}
            Self::Payout(game) => {
                return Err(TableError::StaleReset {
                    requested: round,
                    current: game.data.round,
                });
            }
            _ => return Err(TableError::InvalidPhase(self.phase())),
        }
        *self = match std::mem::take(self) {
            Self::Payout(game) => Self::Betting(game.reset()),
            other => other,
        };
        Ok(())
    }
}
