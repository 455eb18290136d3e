//! Error types for strategy execution, matches and configuration

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A failure raised from inside strategy code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error)]
pub enum StrategyError {
    /// The strategy panicked; carries the panic payload when it was a string.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The strategy reported an error through its reply.
    #[error("{0}")]
    Raised(String),
}

impl StrategyError {
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }
}

/// Which seat of a match a player occupies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "player A"),
            Side::B => write!(f, "player B"),
        }
    }
}

/// Why a match stopped before its last round
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MatchError {
    #[error("{side} failed on round {round}: {source}")]
    Fault {
        side: Side,
        round: u32,
        #[source]
        source: StrategyError,
    },

    #[error("{side} returned {value} on round {round}, which is not a move")]
    InvalidMove { side: Side, round: u32, value: Value },
}

impl MatchError {
    pub fn side(&self) -> Side {
        match self {
            MatchError::Fault { side, .. } | MatchError::InvalidMove { side, .. } => *side,
        }
    }

    pub fn round(&self) -> u32 {
        match self {
            MatchError::Fault { round, .. } | MatchError::InvalidMove { round, .. } => *round,
        }
    }
}

/// Errors loading a tester configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A strategy name that matches no bundled strategy
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}'")]
pub struct UnknownStrategy(pub String);
