//! Trim-set planning for paper machines.
//!
//! Given a deckle range and the tons required per roll width, find a few
//! cutting patterns and how many times to run each so produced tons track
//! the requirement, preferring surplus over shortfall.

pub mod config;
pub mod error;
pub mod mills;
pub mod patterns;
pub mod render;
pub mod report;
pub mod solver;
pub mod types;
pub mod validate;
pub mod weight;

pub use error::{ConstraintViolation, Error, Result, ViolatedBound};
pub use patterns::{GeneratorConfig, PatternGenerator, generate};
pub use solver::{PenaltyWeights, Solver, SolverConfig, objective};
pub use types::{
    Cut, DeckleRange, Pattern, Plan, PlanEntry, ProducedTotal, ProducedTotals, ProductionParams,
    RollRequirement, Solution,
};
pub use validate::{PlanLimits, validate};
