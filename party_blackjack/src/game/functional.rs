//! Pure blackjack arithmetic: hand valuation and settlement.

use super::constants::{BLACKJACK, DEALER_STAND_VALUE};
use super::entities::{Card, Chips, HandOutcome};

/// Returns the best total and whether an ace is still counted as 11.
fn resolve(cards: &[Card]) -> (u32, bool) {
    let mut total = 0u32;
    let mut high_aces = 0u32;
    for card in cards {
        total += u32::from(card.value());
        if card.is_ace() {
            high_aces += 1;
        }
    }
    while total > BLACKJACK && high_aces > 0 {
        total -= 10;
        high_aces -= 1;
    }
    (total, high_aces > 0)
}

#[must_use]
pub fn hand_value(cards: &[Card]) -> u32 {
    resolve(cards).0
}

#[must_use]
pub fn is_soft(cards: &[Card]) -> bool {
    resolve(cards).1
}

#[must_use]
pub fn is_bust(cards: &[Card]) -> bool {
    hand_value(cards) > BLACKJACK
}

/// Exactly two cards worth 21.
#[must_use]
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == BLACKJACK
}

/// Two cards of equal blackjack value. Ten-valued cards pair with each
/// other regardless of rank.
#[must_use]
pub fn can_split(cards: &[Card]) -> bool {
    matches!(cards, [a, b] if a.value() == b.value())
}

#[must_use]
pub fn dealer_should_hit(cards: &[Card]) -> bool {
    hand_value(cards) < DEALER_STAND_VALUE
}

/// 3:2 on a natural, stake included, rounded down to whole chips.
#[must_use]
pub fn blackjack_payout(bet: Chips) -> Chips {
    bet.saturating_mul(5) / 2
}

/// Insurance pays 2:1 plus the stake, and only against a dealer natural.
#[must_use]
pub fn insurance_payout(stake: Chips, dealer: &[Card]) -> Chips {
    if stake > 0 && is_blackjack(dealer) {
        stake.saturating_mul(3)
    } else {
        0
    }
}

/// Settles one player hand against the finished dealer hand.
///
/// Returns the outcome and the chips handed back (stake included).
#[must_use]
pub fn settle_hand(cards: &[Card], bet: Chips, dealer: &[Card]) -> (HandOutcome, Chips) {
    let value = hand_value(cards);
    let dealer_value = hand_value(dealer);

    if value > BLACKJACK {
        (HandOutcome::Bust, 0)
    } else if is_blackjack(cards) && !is_blackjack(dealer) {
        (HandOutcome::Blackjack, blackjack_payout(bet))
    } else if value > dealer_value || dealer_value > BLACKJACK {
        (HandOutcome::Win, bet.saturating_mul(2))
    } else if value == dealer_value {
        (HandOutcome::Push, bet)
    } else {
        (HandOutcome::Lose, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Rank, Suit};

    fn cards(ranks: &[Rank]) -> Vec<Card> {
        ranks.iter().map(|&r| Card(r, Suit::Spade)).collect()
    }

    #[test]
    fn test_pair_of_aces_is_twelve() {
        assert_eq!(hand_value(&cards(&[Rank::Ace, Rank::Ace])), 12);
    }

    #[test]
    fn test_ace_king_is_twenty_one() {
        let hand = cards(&[Rank::Ace, Rank::King]);
        assert_eq!(hand_value(&hand), 21);
        assert!(is_blackjack(&hand));
        assert!(is_soft(&hand));
    }

    #[test]
    fn test_two_aces_and_nine_is_twenty_one() {
        let hand = cards(&[Rank::Ace, Rank::Ace, Rank::Nine]);
        assert_eq!(hand_value(&hand), 21);
        assert!(!is_blackjack(&hand));
    }

    #[test]
    fn test_king_queen_two_busts() {
        let hand = cards(&[Rank::King, Rank::Queen, Rank::Two]);
        assert_eq!(hand_value(&hand), 22);
        assert!(is_bust(&hand));
    }

    #[test]
    fn test_hard_total_after_demotion() {
        let hand = cards(&[Rank::Ace, Rank::Six, Rank::Nine]);
        assert_eq!(hand_value(&hand), 16);
        assert!(!is_soft(&hand));
    }

    #[test]
    fn test_empty_hand_is_zero() {
        assert_eq!(hand_value(&[]), 0);
    }

    #[test]
    fn test_split_ten_and_king() {
        assert!(can_split(&cards(&[Rank::Ten, Rank::King])));
    }

    #[test]
    fn test_split_nines() {
        assert!(can_split(&cards(&[Rank::Nine, Rank::Nine])));
    }

    #[test]
    fn test_cannot_split_nine_eight() {
        assert!(!can_split(&cards(&[Rank::Nine, Rank::Eight])));
    }

    #[test]
    fn test_cannot_split_three_cards() {
        assert!(!can_split(&cards(&[Rank::Five, Rank::Five, Rank::Five])));
    }

    #[test]
    fn test_dealer_stands_on_soft_seventeen() {
        assert!(!dealer_should_hit(&cards(&[Rank::Ace, Rank::Six])));
        assert!(dealer_should_hit(&cards(&[Rank::Ten, Rank::Six])));
    }

    #[test]
    fn test_blackjack_beats_three_card_twenty_one() {
        let player = cards(&[Rank::Ace, Rank::King]);
        let dealer = cards(&[Rank::Nine, Rank::Eight, Rank::Four]);
        assert_eq!(settle_hand(&player, 100, &dealer), (HandOutcome::Blackjack, 250));
    }

    #[test]
    fn test_blackjack_against_blackjack_pushes() {
        let player = cards(&[Rank::Ace, Rank::Queen]);
        let dealer = cards(&[Rank::Ace, Rank::King]);
        assert_eq!(settle_hand(&player, 100, &dealer), (HandOutcome::Push, 100));
    }

    #[test]
    fn test_blackjack_payout_rounds_down() {
        assert_eq!(blackjack_payout(15), 37);
    }

    #[test]
    fn test_bust_loses_even_when_dealer_busts() {
        let player = cards(&[Rank::King, Rank::Queen, Rank::Two]);
        let dealer = cards(&[Rank::King, Rank::Six, Rank::Nine]);
        assert_eq!(settle_hand(&player, 100, &dealer), (HandOutcome::Bust, 0));
    }

    #[test]
    fn test_dealer_bust_pays_even_money() {
        let player = cards(&[Rank::Ten, Rank::Two]);
        let dealer = cards(&[Rank::King, Rank::Six, Rank::Nine]);
        assert_eq!(settle_hand(&player, 40, &dealer), (HandOutcome::Win, 80));
    }

    #[test]
    fn test_equal_totals_push() {
        let player = cards(&[Rank::Ten, Rank::Eight]);
        let dealer = cards(&[Rank::Nine, Rank::Nine]);
        assert_eq!(settle_hand(&player, 40, &dealer), (HandOutcome::Push, 40));
    }

    #[test]
    fn test_lower_total_loses() {
        let player = cards(&[Rank::Ten, Rank::Seven]);
        let dealer = cards(&[Rank::Nine, Rank::Nine]);
        assert_eq!(settle_hand(&player, 40, &dealer), (HandOutcome::Lose, 0));
    }

    #[test]
    fn test_insurance_pays_against_dealer_blackjack() {
        let dealer = cards(&[Rank::Ace, Rank::King]);
        assert_eq!(insurance_payout(50, &dealer), 150);
    }

    #[test]
    fn test_insurance_lost_without_dealer_blackjack() {
        let dealer = cards(&[Rank::Ace, Rank::Six]);
        assert_eq!(insurance_payout(50, &dealer), 0);
        let three_card_21 = cards(&[Rank::Ace, Rank::Five, Rank::Five]);
        assert_eq!(insurance_payout(50, &three_card_21), 0);
    }
}
