//! Moves, round history and the strategy capability

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::StrategyError;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    /// Every valid move
    pub const ALL: [Move; 2] = [Move::Cooperate, Move::Defect];

    /// Canonical spelling, identical to the serde representation
    pub fn name(self) -> &'static str {
        match self {
            Move::Cooperate => "Cooperate",
            Move::Defect => "Defect",
        }
    }

    /// Strict conversion from an unchecked reply. No case folding, no aliases.
    pub fn from_reply(value: &Value) -> Option<Move> {
        Move::deserialize(value).ok()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One completed round seen from one player's seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    own: Move,
    other: Move,
}

impl HistoryEntry {
    pub fn new(own: Move, other: Move) -> Self {
        Self { own, other }
    }

    /// The move this player made
    pub fn own(&self) -> Move {
        self.own
    }

    /// The move the opponent made
    pub fn other(&self) -> Move {
        self.other
    }

    /// The same round from the opponent's seat
    pub fn swapped(&self) -> Self {
        Self { own: self.other, other: self.own }
    }
}

/// Append-only record of completed rounds, oldest first
///
/// Cloning is cheap and yields a snapshot: rounds recorded afterwards
/// never show up in a clone taken earlier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Arc<Vec<HistoryEntry>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { entries: Arc::new(Vec::with_capacity(capacity)) }
    }

    /// Copy-on-write append; outstanding snapshots keep their old contents.
    pub(crate) fn record(&mut self, entry: HistoryEntry) {
        Arc::make_mut(&mut self.entries).push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Most recently completed round
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// This player's moves, oldest first
    pub fn own_moves(&self) -> impl DoubleEndedIterator<Item = Move> + ExactSizeIterator + '_ {
        self.entries.iter().map(HistoryEntry::own)
    }

    /// The opponent's moves, oldest first
    pub fn other_moves(&self) -> impl DoubleEndedIterator<Item = Move> + ExactSizeIterator + '_ {
        self.entries.iter().map(HistoryEntry::other)
    }
}

impl Index<usize> for History {
    type Output = HistoryEntry;

    fn index(&self, index: usize) -> &HistoryEntry {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<HistoryEntry> for History {
    fn from_iter<I: IntoIterator<Item = HistoryEntry>>(iter: I) -> Self {
        Self { entries: Arc::new(iter.into_iter().collect()) }
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

/// A decision procedure for the iterated game.
///
/// `begin` is called once for the first round; `turn` is called for every
/// later round with the rounds completed so far, seen from this strategy's
/// seat. Implementations keep whatever private state they like but must
/// not share mutable state across instances. A panic counts as a crash.
pub trait Strategy {
    fn begin(&mut self) -> Move;

    fn turn(&mut self, history: &History) -> Move;
}

/// What a player hands back for one round: an unchecked value or an error.
pub type Reply = Result<Value, StrategyError>;

/// The unchecked seat the match engine talks to.
///
/// Foreign or scripted strategy code answers with arbitrary JSON; the
/// engine only accepts replies that deserialize to a [`Move`] exactly.
/// Every [`Strategy`] is a `Player` that always answers with a valid move.
pub trait Player {
    fn open(&mut self) -> Reply;

    fn answer(&mut self, history: &History) -> Reply;
}

impl<S: Strategy> Player for S {
    fn open(&mut self) -> Reply {
        Ok(Value::from(self.begin().name()))
    }

    fn answer(&mut self, history: &History) -> Reply {
        Ok(Value::from(self.turn(history).name()))
    }
}
