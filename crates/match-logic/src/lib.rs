//! Match Logic for the Iterated Prisoner's Dilemma
//!
//! Core game logic plus the harness that vets a strategy before it is
//! trusted to play:
//! - moves, per-seat history and the [`Strategy`] / [`Player`] capabilities
//! - the round engine ([`run_match`], [`Match`])
//! - bundled example strategies
//! - [`StrategyTester`], which catches crashes, bad replies and slow runs

mod config;
mod error;
mod game;
mod random;
mod strategies;
mod strategy;
mod tester;

pub use config::{Deadline, TesterConfig};
pub use error::{ConfigError, MatchError, Side, StrategyError, UnknownStrategy};
pub use game::{run_match, Match, MatchResult, RoundResult};
pub use random::SeededRng;
pub use strategies::{
    AlwaysCooperate, AlwaysDefect, Builtin, Gradual, GrimTrigger, Pavlov, RandomStrategy, Rocks,
    SuspiciousTitForTat, TitForTat, TitForTwoTats, DEFAULT_SEED,
};
pub use strategy::{History, HistoryEntry, Move, Player, Reply, Strategy};
pub use tester::{Failure, Phase, StrategyTester, Summary, TestReport, Verdict};

/// Payoff matrix for the Prisoner's Dilemma
/// Returns (score_a, score_b)
pub fn payoff(a: Move, b: Move) -> (u8, u8) {
    match (a, b) {
        (Move::Cooperate, Move::Cooperate) => (3, 3),
        (Move::Cooperate, Move::Defect) => (0, 5),
        (Move::Defect, Move::Cooperate) => (5, 0),
        (Move::Defect, Move::Defect) => (1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, prop_oneof, proptest, Just};
    use proptest::strategy::Strategy as Generator;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1, 1));
    }

    fn any_move() -> impl Generator<Value = Move> {
        prop_oneof![Just(Move::Cooperate), Just(Move::Defect)]
    }

    proptest! {
        #[test]
        fn prop_payoff_swap_symmetric(a in any_move(), b in any_move()) {
            let (ab_a, ab_b) = payoff(a, b);
            let (ba_b, ba_a) = payoff(b, a);
            prop_assert_eq!((ab_a, ab_b), (ba_a, ba_b));
        }
    }
}
