//! Match execution engine

use serde::Serialize;
use tracing::trace;

use crate::error::{MatchError, Side};
use crate::payoff;
use crate::strategy::{History, HistoryEntry, Move, Player, Reply};

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    /// 1-based round number
    pub round: u32,
    pub move_a: Move,
    pub move_b: Move,
    pub score_a: u8,
    pub score_b: u8,
    pub cumulative_a: u64,
    pub cumulative_b: u64,
}

/// Result of a complete (or stopped) match
#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    pub rounds: Vec<RoundResult>,
    pub total_score_a: u64,
    pub total_score_b: u64,
    pub round_count: u32,
    /// Rounds from A's seat
    pub history_a: History,
    /// Rounds from B's seat
    pub history_b: History,
}

/// A match in progress between two players
///
/// Round 1 asks both players to `open`; every later round asks them to
/// `answer` the history from their own seat. Neither player sees the
/// other's move for the round being played.
pub struct Match<'p> {
    player_a: &'p mut dyn Player,
    player_b: &'p mut dyn Player,
    round_count: u32,
    rounds: Vec<RoundResult>,
    history_a: History,
    history_b: History,
    total_a: u64,
    total_b: u64,
}

impl<'p> Match<'p> {
    pub fn new(player_a: &'p mut dyn Player, player_b: &'p mut dyn Player, round_count: u32) -> Self {
        // cap the up-front reservation; very long matches grow as they go
        let capacity = round_count.min(1 << 16) as usize;
        Self {
            player_a,
            player_b,
            round_count,
            rounds: Vec::with_capacity(capacity),
            history_a: History::with_capacity(capacity),
            history_b: History::with_capacity(capacity),
            total_a: 0,
            total_b: 0,
        }
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn is_over(&self) -> bool {
        self.rounds_played() >= self.round_count
    }

    /// Play the next round.
    ///
    /// Returns `Ok(None)` once every round has been played. A fault from
    /// either player ends the match: nothing is recorded for that round.
    pub fn play_round(&mut self) -> Result<Option<&RoundResult>, MatchError> {
        if self.is_over() {
            return Ok(None);
        }
        let round = self.rounds_played() + 1;

        // Both calls are made before anything is recorded, so neither
        // player can observe the other's move for this round.
        let (reply_a, reply_b) = if round == 1 {
            (self.player_a.open(), self.player_b.open())
        } else {
            (
                self.player_a.answer(&self.history_a),
                self.player_b.answer(&self.history_b),
            )
        };
        let move_a = check_reply(Side::A, round, reply_a)?;
        let move_b = check_reply(Side::B, round, reply_b)?;

        let (score_a, score_b) = payoff(move_a, move_b);
        self.total_a += u64::from(score_a);
        self.total_b += u64::from(score_b);

        let entry = HistoryEntry::new(move_a, move_b);
        self.history_a.record(entry);
        self.history_b.record(entry.swapped());

        trace!(round, %move_a, %move_b, total_a = self.total_a, total_b = self.total_b, "round played");

        self.rounds.push(RoundResult {
            round,
            move_a,
            move_b,
            score_a,
            score_b,
            cumulative_a: self.total_a,
            cumulative_b: self.total_b,
        });
        Ok(self.rounds.last())
    }

    /// Wrap up with whatever has been played so far
    pub fn finish(self) -> MatchResult {
        MatchResult {
            round_count: self.rounds.len() as u32,
            rounds: self.rounds,
            total_score_a: self.total_a,
            total_score_b: self.total_b,
            history_a: self.history_a,
            history_b: self.history_b,
        }
    }
}

/// Accept a reply only if it is exactly a move
fn check_reply(side: Side, round: u32, reply: Reply) -> Result<Move, MatchError> {
    let value = reply.map_err(|source| MatchError::Fault { side, round, source })?;
    Move::from_reply(&value).ok_or(MatchError::InvalidMove { side, round, value })
}

/// Run a complete match between two players
///
/// # Arguments
/// * `player_a` - First player
/// * `player_b` - Second player
/// * `round_count` - Number of rounds to play; 0 makes no calls at all
///
/// # Returns
/// Complete match result with round-by-round details, or the first fault.
/// Faults are not swallowed; the caller decides whether they forfeit.
pub fn run_match(
    player_a: &mut dyn Player,
    player_b: &mut dyn Player,
    round_count: u32,
) -> Result<MatchResult, MatchError> {
    let mut game = Match::new(player_a, player_b, round_count);
    while game.play_round()?.is_some() {}
    Ok(game.finish())
}
