//! Strategy Tester - command-line harness
//!
//! Runs one bundled strategy against a reference opponent and prints a
//! PASS/FAIL report. Exit status: 0 pass, 1 fail, 2 usage or config error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use match_logic::{Builtin, Deadline, StrategyTester, TesterConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "strategy-tester", version, about)]
struct Args {
    /// Strategy to test
    #[arg(short, long, default_value = "tit-for-tat")]
    strategy: Builtin,

    /// Reference opponent (overrides the config file)
    #[arg(short, long)]
    opponent: Option<Builtin>,

    /// Rounds to play (default 10000)
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Wall-clock budget for the whole run, in seconds (default 60)
    #[arg(short, long = "time-budget")]
    time_budget: Option<u64>,

    /// Check the budget after every round instead of once at the end
    #[arg(long)]
    per_round_deadline: bool,

    /// Seed for strategies that roll dice
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file; flags take precedence over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// List bundled strategies and exit
    #[arg(long)]
    list: bool,
}

impl Args {
    fn tester_config(&self) -> Result<TesterConfig> {
        let mut config = match &self.config {
            Some(path) => TesterConfig::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => TesterConfig::default(),
        };
        if let Some(opponent) = self.opponent {
            config.opponent = opponent;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(secs) = self.time_budget {
            config.time_budget_secs = secs;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.per_round_deadline {
            config.deadline = Deadline::EveryRound;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(passed) if passed => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    if args.list {
        for builtin in Builtin::ALL {
            println!("{:<24} {}", builtin.slug(), builtin.description());
        }
        return Ok(true);
    }

    let config = args.tester_config()?;
    debug!(?config, strategy = %args.strategy, "starting tester");

    let mut tester = StrategyTester::builtin(args.strategy).with_config(config);
    let report = tester.run();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?);
    } else {
        println!("{report}");
    }
    Ok(report.is_pass())
}
