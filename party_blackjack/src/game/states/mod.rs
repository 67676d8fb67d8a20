//! Phase markers for the table FSM.
//!
//! Each marker is the `T` in `Game<T>` and names one phase of a round.

use crate::game::entities::Phase;

/// Ties a marker type to the phase it reports in views.
pub trait PhaseMarker {
    const PHASE: Phase;
}

/// Taking bets; the only phase in which players can change their stake or
/// the table can switch shared mode.
#[derive(Debug, Default)]
pub struct Betting {}

/// Dealer shows an ace; waiting for every dealt-in player to accept or
/// decline insurance.
#[derive(Debug)]
pub struct Insurance {}

/// Players act on their hands in turn order.
#[derive(Debug)]
pub struct Playing {}

/// Dealer draws out. Never observed at rest.
#[derive(Debug)]
pub struct Dealer {}

/// Bets settled; waiting for the reset timer.
#[derive(Debug)]
pub struct Payout {}

impl PhaseMarker for Betting {
    const PHASE: Phase = Phase::Betting;
}

impl PhaseMarker for Insurance {
    const PHASE: Phase = Phase::Insurance;
}

impl PhaseMarker for Playing {
    const PHASE: Phase = Phase::Playing;
}

impl PhaseMarker for Dealer {
    const PHASE: Phase = Phase::Dealer;
}

impl PhaseMarker for Payout {
    const PHASE: Phase = Phase::Payout;
}
