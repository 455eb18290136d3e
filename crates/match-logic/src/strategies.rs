//! Bundled example strategies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UnknownStrategy;
use crate::random::SeededRng;
use crate::strategy::{History, Move, Player, Reply, Strategy};

/// Default seed for strategies that roll dice
pub const DEFAULT_SEED: u64 = 0x5eed_1e55_c0ff_ee00;

/// Copy the opponent's last move, start with cooperate
///
/// `forgiveness` is a percentage chance to cooperate anyway after a
/// defection; `retaliation_delay` is how many rounds of an unbroken run of
/// opponent defections to absorb before hitting back.
#[derive(Clone, Debug)]
pub struct TitForTat {
    pub forgiveness: u8,
    pub retaliation_delay: u8,
    rng: SeededRng,
}

impl TitForTat {
    pub fn new(forgiveness: u8, retaliation_delay: u8, seed: u64) -> Self {
        Self { forgiveness, retaliation_delay, rng: SeededRng::new(seed) }
    }
}

impl Default for TitForTat {
    fn default() -> Self {
        Self::new(0, 0, DEFAULT_SEED)
    }
}

impl Strategy for TitForTat {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, history: &History) -> Move {
        mirror(history, self.forgiveness, self.retaliation_delay, &mut self.rng)
    }
}

/// Tit-for-Tat that opens with a defection
#[derive(Clone, Debug, Default)]
pub struct SuspiciousTitForTat {
    inner: TitForTat,
}

impl Strategy for SuspiciousTitForTat {
    fn begin(&mut self) -> Move {
        Move::Defect
    }

    fn turn(&mut self, history: &History) -> Move {
        self.inner.turn(history)
    }
}

fn mirror(history: &History, forgiveness: u8, retaliation_delay: u8, rng: &mut SeededRng) -> Move {
    match history.last().map(|entry| entry.other()) {
        None | Some(Move::Cooperate) => Move::Cooperate,
        Some(Move::Defect) => {
            // rounds since the opponent's current run of defections began
            let streak = history.other_moves().rev().take_while(|&m| m == Move::Defect).count();
            if streak - 1 < retaliation_delay as usize {
                return Move::Cooperate;
            }
            if forgiveness > 0 && rng.chance(forgiveness) {
                Move::Cooperate
            } else {
                Move::Defect
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysDefect;

impl Strategy for AlwaysDefect {
    fn begin(&mut self) -> Move {
        Move::Defect
    }

    fn turn(&mut self, _history: &History) -> Move {
        Move::Defect
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysCooperate;

impl Strategy for AlwaysCooperate {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, _history: &History) -> Move {
        Move::Cooperate
    }
}

/// Cooperate until the opponent has defected more than `noise_tolerance`
/// times, then defect for the rest of the match
#[derive(Clone, Copy, Debug, Default)]
pub struct GrimTrigger {
    pub noise_tolerance: u8,
    triggered: bool,
}

impl GrimTrigger {
    pub fn with_tolerance(noise_tolerance: u8) -> Self {
        Self { noise_tolerance, triggered: false }
    }
}

impl Strategy for GrimTrigger {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, history: &History) -> Move {
        if !self.triggered {
            let defections = history.other_moves().filter(|m| *m == Move::Defect).count();
            self.triggered = defections > self.noise_tolerance as usize;
        }
        if self.triggered {
            Move::Defect
        } else {
            Move::Cooperate
        }
    }
}

/// Win-stay, lose-switch
/// - If last round was good (3+ points), repeat move
/// - If last round was bad (<3 points), switch move
#[derive(Clone, Copy, Debug, Default)]
pub struct Pavlov;

impl Strategy for Pavlov {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, history: &History) -> Move {
        let Some(last) = history.last() else {
            return Move::Cooperate;
        };
        let (my_score, _) = crate::payoff(last.own(), last.other());
        match (my_score >= 3, last.own()) {
            (true, stay) => stay,
            (false, Move::Cooperate) => Move::Defect,
            (false, Move::Defect) => Move::Cooperate,
        }
    }
}

/// Random choice with a configurable cooperation bias (0-100)
#[derive(Clone, Debug)]
pub struct RandomStrategy {
    pub cooperate_bias: u8,
    rng: SeededRng,
}

impl RandomStrategy {
    pub fn new(cooperate_bias: u8, seed: u64) -> Self {
        Self { cooperate_bias, rng: SeededRng::new(seed) }
    }

    fn roll(&mut self) -> Move {
        if self.rng.chance(self.cooperate_bias) {
            Move::Cooperate
        } else {
            Move::Defect
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new(50, DEFAULT_SEED)
    }
}

impl Strategy for RandomStrategy {
    fn begin(&mut self) -> Move {
        self.roll()
    }

    fn turn(&mut self, _history: &History) -> Move {
        self.roll()
    }
}

/// Only defect if the opponent defected twice in a row
#[derive(Clone, Copy, Debug, Default)]
pub struct TitForTwoTats;

impl Strategy for TitForTwoTats {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, history: &History) -> Move {
        let mut recent = history.other_moves().rev();
        match (recent.next(), recent.next()) {
            (Some(Move::Defect), Some(Move::Defect)) => Move::Defect,
            _ => Move::Cooperate,
        }
    }
}

/// Escalating retaliation: after N opponent defections, this player
/// should have made N(N+1)/2 defections of its own, then it forgives
#[derive(Clone, Copy, Debug, Default)]
pub struct Gradual;

impl Strategy for Gradual {
    fn begin(&mut self) -> Move {
        Move::Cooperate
    }

    fn turn(&mut self, history: &History) -> Move {
        let their_defections = history.other_moves().filter(|m| *m == Move::Defect).count();
        let my_defections = history.own_moves().filter(|m| *m == Move::Defect).count();

        let expected = their_defections * (their_defections + 1) / 2;
        if my_defections < expected {
            Move::Defect
        } else {
            Move::Cooperate
        }
    }
}

/// Insists on playing Rock, which is not a move in this game.
/// Useful for seeing what a rejected submission looks like.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rocks;

impl Player for Rocks {
    fn open(&mut self) -> Reply {
        Ok(Value::from("Rock"))
    }

    fn answer(&mut self, _history: &History) -> Reply {
        self.open()
    }
}

/// Every bundled strategy, by name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    #[default]
    TitForTat,
    AlwaysDefect,
    AlwaysCooperate,
    GrimTrigger,
    Pavlov,
    SuspiciousTitForTat,
    Random,
    TitForTwoTats,
    Gradual,
    Rocks,
}

impl Builtin {
    pub const ALL: [Builtin; 10] = [
        Builtin::TitForTat,
        Builtin::AlwaysDefect,
        Builtin::AlwaysCooperate,
        Builtin::GrimTrigger,
        Builtin::Pavlov,
        Builtin::SuspiciousTitForTat,
        Builtin::Random,
        Builtin::TitForTwoTats,
        Builtin::Gradual,
        Builtin::Rocks,
    ];

    /// Command-line spelling
    pub fn slug(self) -> &'static str {
        match self {
            Builtin::TitForTat => "tit-for-tat",
            Builtin::AlwaysDefect => "always-defect",
            Builtin::AlwaysCooperate => "always-cooperate",
            Builtin::GrimTrigger => "grim-trigger",
            Builtin::Pavlov => "pavlov",
            Builtin::SuspiciousTitForTat => "suspicious-tit-for-tat",
            Builtin::Random => "random",
            Builtin::TitForTwoTats => "tit-for-two-tats",
            Builtin::Gradual => "gradual",
            Builtin::Rocks => "rocks",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Builtin::TitForTat => "Copies opponent's last move. Starts by cooperating.",
            Builtin::AlwaysDefect => "Never cooperates. Always defects.",
            Builtin::AlwaysCooperate => "Never defects. Always cooperates.",
            Builtin::GrimTrigger => "Cooperates until betrayed, then always defects.",
            Builtin::Pavlov => "Repeats move if outcome was good, switches if bad.",
            Builtin::SuspiciousTitForTat => "Like Tit-for-Tat, but starts with defect.",
            Builtin::Random => "Randomly cooperates or defects each round.",
            Builtin::TitForTwoTats => "Only retaliates after two consecutive defections.",
            Builtin::Gradual => "Retaliates with increasing severity, then forgives.",
            Builtin::Rocks => "Always plays Rock. Fails validation on round 1.",
        }
    }

    /// A fresh instance; `seed` only matters to strategies that roll dice
    pub fn build(self, seed: u64) -> Box<dyn Player> {
        match self {
            Builtin::TitForTat => Box::new(TitForTat::new(0, 0, seed)),
            Builtin::AlwaysDefect => Box::new(AlwaysDefect),
            Builtin::AlwaysCooperate => Box::new(AlwaysCooperate),
            Builtin::GrimTrigger => Box::new(GrimTrigger::default()),
            Builtin::Pavlov => Box::new(Pavlov),
            Builtin::SuspiciousTitForTat => {
                Box::new(SuspiciousTitForTat { inner: TitForTat::new(0, 0, seed) })
            }
            Builtin::Random => Box::new(RandomStrategy::new(50, seed)),
            Builtin::TitForTwoTats => Box::new(TitForTwoTats),
            Builtin::Gradual => Box::new(Gradual),
            Builtin::Rocks => Box::new(Rocks),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Builtin {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Builtin::ALL
            .into_iter()
            .find(|b| b.slug() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
