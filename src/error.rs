use std::path::PathBuf;

use thiserror::Error;

use crate::types::DeckleRange;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no roll requirements supplied")]
    EmptyInput,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No candidate pattern fits the deckle range.
    #[error("no cutting pattern fits deckle range {deckle}")]
    InfeasibleDeckle { deckle: DeckleRange },

    /// The solver produced a plan that breaks a hard constraint. Always a bug.
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),

    #[error("unknown mill '{0}'")]
    UnknownMill(String),

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("plan entry {entry} violates {bound}")]
pub struct ConstraintViolation {
    pub entry: usize,
    pub bound: ViolatedBound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolatedBound {
    DeckleMin { width_sum: u64, min_mm: u32 },
    DeckleMax { width_sum: u64, max_mm: u32 },
    Multiplier { multiplier: u32, max: u32 },
    EntryCount { count: usize, max: usize },
    EmptyPattern,
    /// A cut whose id is not requested, or whose width disagrees with the request.
    UnknownRoll { id: String, width_mm: u32 },
}

impl std::fmt::Display for ViolatedBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolatedBound::DeckleMin { width_sum, min_mm } => {
                write!(f, "deckle minimum: width sum {width_sum}mm < {min_mm}mm")
            }
            ViolatedBound::DeckleMax { width_sum, max_mm } => {
                write!(f, "deckle maximum: width sum {width_sum}mm > {max_mm}mm")
            }
            ViolatedBound::Multiplier { multiplier, max } => {
                write!(f, "multiplier bound: {multiplier} not in [1, {max}]")
            }
            ViolatedBound::EntryCount { count, max } => {
                write!(f, "pattern count: {count} entries > {max}")
            }
            ViolatedBound::EmptyPattern => write!(f, "non-empty pattern"),
            ViolatedBound::UnknownRoll { id, width_mm } => {
                write!(f, "requested rolls: no requirement '{id}' of {width_mm}mm")
            }
        }
    }
}
