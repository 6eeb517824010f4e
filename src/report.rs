//! JSON view of a solution: the `sets` suggestion shape plus the
//! required vs produced comparison.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ProductionParams, Solution};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionReport {
    pub sets: Vec<SetReport>,
    pub produced: Vec<ProducedReport>,
    pub uncovered: Vec<String>,
    pub objective: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReport {
    pub multiplier: u32,
    /// Roll id to quantity per pass.
    pub combination: BTreeMap<String, u32>,
    pub width_sum: u64,
    /// Weight of all runs of this set.
    pub tons: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducedReport {
    pub id: String,
    pub width: u32,
    pub required_tons: f64,
    pub rolls: u64,
    pub tons: f64,
}

impl SuggestionReport {
    pub fn new(solution: &Solution, production: &ProductionParams) -> Self {
        let sets = solution
            .plan
            .entries()
            .iter()
            .map(|entry| SetReport {
                multiplier: entry.multiplier,
                combination: entry
                    .pattern
                    .cuts()
                    .iter()
                    .map(|c| (c.id.clone(), c.quantity))
                    .collect(),
                width_sum: entry.width_sum(),
                tons: entry.tons(production),
            })
            .collect();

        let produced = solution
            .totals
            .iter()
            .map(|t| ProducedReport {
                id: t.id.clone(),
                width: t.width_mm,
                required_tons: t.required_tons,
                rolls: t.roll_count,
                tons: t.tons_produced,
            })
            .collect();

        Self {
            sets,
            produced,
            uncovered: solution.uncovered.clone(),
            objective: solution.objective,
        }
    }
}
