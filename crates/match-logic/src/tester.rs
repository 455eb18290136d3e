//! Strategy tester
//!
//! Runs a strategy against a reference opponent under controlled
//! conditions and turns every way it can misbehave into a verdict.
//! Nothing a strategy does (panicking, erroring, replying with garbage,
//! being slow) escapes as a crash of the caller.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Deadline, TesterConfig};
use crate::error::{MatchError, Side, StrategyError};
use crate::game::{Match, MatchResult};
use crate::random::SeededRng;
use crate::strategies::Builtin;
use crate::strategy::{History, Player, Reply, Strategy};

type Builder = Box<dyn Fn(u64) -> Result<Box<dyn Player>, StrategyError>>;

/// Where a tester is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    NotStarted,
    Initializing,
    Running,
    Passed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Passed | Phase::Failed)
    }
}

/// Scores from a clean run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub rounds: u32,
    pub elapsed_secs: f64,
    pub strategy_total: u64,
    pub strategy_average: f64,
    pub opponent_total: u64,
    pub opponent_average: f64,
}

impl Summary {
    fn new(result: &MatchResult, elapsed: Duration) -> Self {
        let per_round = |total: u64| match result.round_count {
            0 => 0.0,
            n => total as f64 / f64::from(n),
        };
        Self {
            rounds: result.round_count,
            elapsed_secs: elapsed.as_secs_f64(),
            strategy_total: result.total_score_a,
            strategy_average: per_round(result.total_score_a),
            opponent_total: result.total_score_b,
            opponent_average: per_round(result.total_score_b),
        }
    }
}

/// The check a strategy failed
#[derive(Clone, Debug, PartialEq, Serialize, Error)]
pub enum Failure {
    #[error("initialization failed: {error}")]
    Initialization { error: StrategyError },

    #[error("{} crashed on round {round}: {error}", seat(.side))]
    Crashed { side: Side, round: u32, error: StrategyError },

    #[error(
        "{} returned a bad type on round {round}: got {value}, expected \"Cooperate\" or \"Defect\"",
        seat(.side)
    )]
    BadReturnType { side: Side, round: u32, value: Value },

    #[error("timeout: {rounds} rounds took {elapsed_secs:.3} seconds, budget is {budget_secs} seconds")]
    Timeout { rounds: u32, elapsed_secs: f64, budget_secs: u64 },
}

fn seat(side: &Side) -> &'static str {
    match side {
        Side::A => "strategy",
        Side::B => "reference opponent",
    }
}

impl From<MatchError> for Failure {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Fault { side, round, source } => Failure::Crashed { side, round, error: source },
            MatchError::InvalidMove { side, round, value } => {
                Failure::BadReturnType { side, round, value }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Verdict {
    Passed(Summary),
    Failed(Failure),
}

/// What a tester run produced
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestReport {
    pub strategy: String,
    pub opponent: Builtin,
    pub verdict: Verdict,
}

impl TestReport {
    pub fn is_pass(&self) -> bool {
        matches!(self.verdict, Verdict::Passed(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.verdict {
            Verdict::Passed(_) => None,
            Verdict::Failed(failure) => Some(failure),
        }
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Passed(s) => {
                writeln!(f, "PASS: {} rounds in {:.3} seconds", s.rounds, s.elapsed_secs)?;
                writeln!(
                    f,
                    "{}: total {}, average {:.3}",
                    self.strategy, s.strategy_total, s.strategy_average
                )?;
                write!(
                    f,
                    "{} (reference): total {}, average {:.3}",
                    self.opponent, s.opponent_total, s.opponent_average
                )
            }
            Verdict::Failed(failure) => {
                write!(f, "FAIL: {} vs {}: {}", self.strategy, self.opponent, failure)
            }
        }
    }
}

/// Validates one strategy before it is trusted to compete
///
/// ```
/// use match_logic::{StrategyTester, TitForTat};
///
/// let mut tester = StrategyTester::of::<TitForTat>().rounds(100);
/// let report = tester.run();
/// assert!(report.is_pass());
/// ```
pub struct StrategyTester {
    name: String,
    build: Builder,
    config: TesterConfig,
    phase: Phase,
    report: Option<TestReport>,
}

impl StrategyTester {
    /// Test whatever `build` constructs. `build` is called once per run;
    /// an `Err` or a panic from it is an initialization failure.
    pub fn new<P, F>(name: impl Into<String>, build: F) -> Self
    where
        P: Player + 'static,
        F: Fn() -> Result<P, StrategyError> + 'static,
    {
        Self::with_builder(
            name.into(),
            Box::new(move |_seed| build().map(|player| Box::new(player) as Box<dyn Player>)),
        )
    }

    /// Test a strategy type through its `Default` constructor, named after
    /// the type without its path or generic arguments
    pub fn of<S: Strategy + Default + 'static>() -> Self {
        let full = std::any::type_name::<S>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        Self::new(name, || Ok(S::default()))
    }

    /// Test one of the bundled strategies, seeded from the config
    pub fn builtin(strategy: Builtin) -> Self {
        Self::with_builder(strategy.slug().to_string(), Box::new(move |seed| Ok(strategy.build(seed))))
    }

    fn with_builder(name: String, build: Builder) -> Self {
        Self {
            name,
            build,
            config: TesterConfig::default(),
            phase: Phase::NotStarted,
            report: None,
        }
    }

    pub fn with_config(mut self, config: TesterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rounds(mut self, rounds: u32) -> Self {
        self.config.rounds = rounds;
        self
    }

    pub fn time_budget_secs(mut self, secs: u64) -> Self {
        self.config.time_budget_secs = secs;
        self
    }

    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.config.deadline = deadline;
        self
    }

    pub fn opponent(mut self, opponent: Builtin) -> Self {
        self.config.opponent = opponent;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run every check and report a verdict.
    ///
    /// A tester runs once; calling this again after a verdict returns the
    /// same report without replaying anything.
    pub fn run(&mut self) -> TestReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let verdict = self.execute();
        match &verdict {
            Verdict::Passed(summary) => {
                self.enter(Phase::Passed);
                debug!(
                    strategy = %self.name,
                    rounds = summary.rounds,
                    strategy_total = summary.strategy_total,
                    opponent_total = summary.opponent_total,
                    "run summary"
                );
            }
            Verdict::Failed(failure) => {
                self.enter(Phase::Failed);
                warn!(strategy = %self.name, "{}", failure);
            }
        }

        let report = TestReport {
            strategy: self.name.clone(),
            opponent: self.config.opponent,
            verdict,
        };
        self.report = Some(report.clone());
        report
    }

    fn enter(&mut self, phase: Phase) {
        info!(strategy = %self.name, from = ?self.phase, to = ?phase, "tester phase");
        self.phase = phase;
    }

    fn execute(&mut self) -> Verdict {
        self.enter(Phase::Initializing);
        let seed = self.config.seed;
        let mut tested = match guard(|| (self.build)(seed)) {
            Ok(player) => Guarded(player),
            Err(error) => return Verdict::Failed(Failure::Initialization { error }),
        };
        let mut reference = Guarded(self.config.opponent.build(reference_seed(seed)));

        self.enter(Phase::Running);
        let budget = self.config.time_budget();
        let per_round = self.config.deadline == Deadline::EveryRound;
        let timeout = |rounds: u32, elapsed: Duration| {
            Verdict::Failed(Failure::Timeout {
                rounds,
                elapsed_secs: elapsed.as_secs_f64(),
                budget_secs: budget.as_secs(),
            })
        };

        let started = Instant::now();
        let mut game = Match::new(&mut tested, &mut reference, self.config.rounds);
        loop {
            match game.play_round() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) => return Verdict::Failed(err.into()),
            }
            if per_round {
                let elapsed = started.elapsed();
                if elapsed > budget {
                    return timeout(game.rounds_played(), elapsed);
                }
            }
        }
        let elapsed = started.elapsed();
        let result = game.finish();

        if elapsed > budget {
            return timeout(result.round_count, elapsed);
        }
        Verdict::Passed(Summary::new(&result, elapsed))
    }
}

/// Seed for the reference opponent, on its own stream so a random opponent
/// doesn't mirror a random strategy built from the same seed
fn reference_seed(seed: u64) -> u64 {
    SeededRng::new(seed).fork(Side::B as u64).next_u64()
}

/// Player wrapper that turns panics into `StrategyError::Panicked`
struct Guarded(Box<dyn Player>);

impl Player for Guarded {
    fn open(&mut self) -> Reply {
        guard(|| self.0.open())
    }

    fn answer(&mut self, history: &History) -> Reply {
        guard(|| self.0.answer(history))
    }
}

fn guard<T>(f: impl FnOnce() -> Result<T, StrategyError>) -> Result<T, StrategyError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(StrategyError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{AlwaysCooperate, AlwaysDefect, TitForTat};
    use crate::strategy::Move;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Plays along until its fuse burns down, then panics
    struct Fuse {
        played: u32,
        blow_on: u32,
    }

    impl Fuse {
        fn tick(&mut self) -> Move {
            self.played += 1;
            if self.played == self.blow_on {
                panic!("fuse blew on round {}", self.played);
            }
            Move::Cooperate
        }
    }

    impl Strategy for Fuse {
        fn begin(&mut self) -> Move {
            self.tick()
        }

        fn turn(&mut self, _history: &History) -> Move {
            self.tick()
        }
    }

    /// Takes a measurable amount of time every round
    #[derive(Default)]
    struct Sluggish;

    impl Strategy for Sluggish {
        fn begin(&mut self) -> Move {
            std::thread::sleep(Duration::from_millis(2));
            Move::Cooperate
        }

        fn turn(&mut self, _history: &History) -> Move {
            self.begin()
        }
    }

    /// Answers with a fixed JSON value every round
    struct Says(Value);

    impl Player for Says {
        fn open(&mut self) -> Reply {
            Ok(self.0.clone())
        }

        fn answer(&mut self, _history: &History) -> Reply {
            Ok(self.0.clone())
        }
    }

    /// Raises an error on a given round
    struct Refuses {
        played: u32,
        on: u32,
    }

    impl Player for Refuses {
        fn open(&mut self) -> Reply {
            self.answer(&History::new())
        }

        fn answer(&mut self, _history: &History) -> Reply {
            self.played += 1;
            if self.played == self.on {
                return Err(StrategyError::raised("refusing to play"));
            }
            Ok(json!("Defect"))
        }
    }

    fn summary(report: &TestReport) -> &Summary {
        match &report.verdict {
            Verdict::Passed(summary) => summary,
            Verdict::Failed(failure) => panic!("expected a pass, got {failure}"),
        }
    }

    #[test]
    fn test_tit_for_tat_passes_with_defaults() {
        let mut tester = StrategyTester::of::<TitForTat>();
        assert_eq!(tester.phase(), Phase::NotStarted);

        let report = tester.run();
        let s = summary(&report);

        assert_eq!(tester.phase(), Phase::Passed);
        assert_eq!(s.rounds, 10_000);
        assert_eq!(s.strategy_total, 30_000);
        assert_eq!(s.opponent_total, 30_000);
        assert_eq!(s.strategy_average, 3.0);
        assert_eq!(report.strategy, "TitForTat");
        assert!(report.to_string().starts_with("PASS: 10000 rounds in "));
    }

    #[test]
    fn test_always_defect_against_reference() {
        let n = 200;
        let report = StrategyTester::of::<AlwaysDefect>().rounds(n).run();
        let s = summary(&report);

        // the reference Tit-for-Tat cooperates once, then mirrors
        assert_eq!(s.strategy_total, 5 + u64::from(n - 1));
        assert_eq!(s.opponent_total, u64::from(n - 1));
    }

    #[test]
    fn test_zero_rounds_passes_with_zero_scores() {
        let report = StrategyTester::of::<AlwaysCooperate>().rounds(0).run();
        let s = summary(&report);
        assert_eq!(s.rounds, 0);
        assert_eq!(s.strategy_total, 0);
        assert_eq!(s.strategy_average, 0.0);
    }

    #[test]
    fn test_panic_is_reported_with_round() {
        let mut tester =
            StrategyTester::new("Fuse", || Ok(Fuse { played: 0, blow_on: 5000 })).rounds(10_000);

        let report = tester.run();

        assert_eq!(tester.phase(), Phase::Failed);
        assert_eq!(
            report.failure(),
            Some(&Failure::Crashed {
                side: Side::A,
                round: 5000,
                error: StrategyError::Panicked("fuse blew on round 5000".into()),
            })
        );
        assert!(report.to_string().starts_with("FAIL: Fuse vs tit-for-tat: strategy crashed on round 5000"));
    }

    #[test]
    fn test_raised_error_is_reported_as_crash() {
        let report = StrategyTester::new("Refuses", || Ok(Refuses { played: 0, on: 3 })).run();

        assert_eq!(
            report.failure(),
            Some(&Failure::Crashed {
                side: Side::A,
                round: 3,
                error: StrategyError::raised("refusing to play"),
            })
        );
    }

    #[test]
    fn test_wrong_case_string_is_bad_return_type() {
        let report = StrategyTester::new("Lowercase", || Ok(Says(json!("cooperate")))).run();

        assert_eq!(
            report.failure(),
            Some(&Failure::BadReturnType { side: Side::A, round: 1, value: json!("cooperate") })
        );
        assert!(report.to_string().contains("got \"cooperate\""));
    }

    #[test]
    fn test_rocks_fails_validation() {
        let report = StrategyTester::builtin(Builtin::Rocks).run();
        assert!(matches!(
            report.failure(),
            Some(Failure::BadReturnType { round: 1, value, .. }) if *value == json!("Rock")
        ));
    }

    #[test]
    fn test_construction_error_is_initialization_failure() {
        let mut tester = StrategyTester::new("Broken", || -> Result<AlwaysCooperate, _> {
            Err(StrategyError::raised("missing weights file"))
        });

        let report = tester.run();

        assert_eq!(
            report.failure(),
            Some(&Failure::Initialization { error: StrategyError::raised("missing weights file") })
        );
        assert_eq!(tester.phase(), Phase::Failed);
    }

    #[test]
    fn test_construction_panic_is_initialization_failure() {
        let report = StrategyTester::new("Exploding", || -> Result<AlwaysCooperate, _> {
            panic!("constructor blew up")
        })
        .run();

        assert_eq!(
            report.failure(),
            Some(&Failure::Initialization {
                error: StrategyError::Panicked("constructor blew up".into()),
            })
        );
    }

    #[test]
    fn test_zero_budget_times_out() {
        let report = StrategyTester::of::<Sluggish>().rounds(5).time_budget_secs(0).run();

        match report.failure() {
            Some(Failure::Timeout { rounds, budget_secs, elapsed_secs }) => {
                assert_eq!(*rounds, 5);
                assert_eq!(*budget_secs, 0);
                assert!(*elapsed_secs > 0.0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_per_round_deadline_stops_early() {
        let report = StrategyTester::of::<Sluggish>()
            .rounds(1000)
            .time_budget_secs(0)
            .deadline(Deadline::EveryRound)
            .run();

        assert!(matches!(report.failure(), Some(Failure::Timeout { rounds: 1, .. })));
    }

    #[test]
    fn test_fault_takes_precedence_over_timeout() {
        let report = StrategyTester::new("Fuse", || Ok(Fuse { played: 0, blow_on: 1 }))
            .time_budget_secs(0)
            .run();

        assert!(matches!(report.failure(), Some(Failure::Crashed { round: 1, .. })));
    }

    #[test]
    fn test_opponent_fault_names_the_reference() {
        let report = StrategyTester::of::<AlwaysCooperate>().opponent(Builtin::Rocks).run();

        assert!(matches!(report.failure(), Some(Failure::BadReturnType { side: Side::B, .. })));
        assert!(report.to_string().contains("reference opponent returned a bad type"));
    }

    #[test]
    fn test_second_run_does_not_replay() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let mut tester = StrategyTester::new("Counted", move || {
            counter.set(counter.get() + 1);
            Ok(AlwaysCooperate)
        })
        .rounds(10);

        let first = tester.run();
        let second = tester.run();

        assert_eq!(built.get(), 1);
        assert_eq!(first, second);
        assert_eq!(tester.phase(), Phase::Passed);
    }

    #[test]
    fn test_builtin_uses_configured_seed() {
        let config = TesterConfig { rounds: 64, seed: 11, ..TesterConfig::default() };
        let first = StrategyTester::builtin(Builtin::Random).with_config(config.clone()).run();
        let second = StrategyTester::builtin(Builtin::Random).with_config(config).run();

        assert_eq!(summary(&first).strategy_total, summary(&second).strategy_total);
    }

    #[test]
    fn test_reference_opponent_gets_its_own_stream() {
        let seed = 11;
        assert_ne!(reference_seed(seed), seed);
        assert_eq!(reference_seed(seed), reference_seed(seed));

        let mut strategy = Builtin::Random.build(seed);
        let mut opponent = Builtin::Random.build(reference_seed(seed));
        let result = crate::game::run_match(strategy.as_mut(), opponent.as_mut(), 64).unwrap();

        assert!(result.rounds.iter().any(|r| r.move_a != r.move_b));
    }

    /// Generic strategy, to check the name `of` derives
    #[derive(Default)]
    struct Wrapper<S>(S);

    impl<S: Strategy> Strategy for Wrapper<S> {
        fn begin(&mut self) -> Move {
            self.0.begin()
        }

        fn turn(&mut self, history: &History) -> Move {
            self.0.turn(history)
        }
    }

    #[test]
    fn test_name_of_generic_strategy() {
        let tester = StrategyTester::of::<Wrapper<TitForTat>>();
        assert_eq!(tester.name(), "Wrapper");

        let report = StrategyTester::of::<Wrapper<Wrapper<AlwaysCooperate>>>().rounds(5).run();
        assert_eq!(report.strategy, "Wrapper");
        assert!(report.is_pass());
    }

    #[test]
    fn test_report_serializes() {
        let report = StrategyTester::new("Lowercase", || Ok(Says(json!("cooperate")))).run();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["strategy"], json!("Lowercase"));
        assert_eq!(value["opponent"], json!("TitForTat"));
        assert_eq!(value["verdict"]["Failed"]["BadReturnType"]["round"], json!(1));
    }
}
