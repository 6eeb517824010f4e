use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::patterns::{GeneratorConfig, PatternGenerator};
use crate::types::{
    DeckleRange, Pattern, Plan, PlanEntry, ProducedTotals, ProductionParams, RollRequirement,
    Solution,
};
use crate::validate::{self, PlanLimits};

/// Smallest objective decrease that counts as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Cost per ton of missing (`under`) and surplus (`over`) production.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub under: f64,
    pub over: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            under: 10.0,
            over: 1.0,
        }
    }
}

impl PenaltyWeights {
    pub fn new(under: f64, over: f64) -> Self {
        Self { under, over }
    }

    pub fn penalty(&self, required_tons: f64, produced_tons: f64) -> f64 {
        self.under * (required_tons - produced_tons).max(0.0)
            + self.over * (produced_tons - required_tons).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of entries in a plan.
    pub max_patterns: usize,
    /// Maximum runs of a single pattern.
    pub max_multiplier: u32,
    pub penalty: PenaltyWeights,
    /// Per requirement id; falls back to `penalty`.
    pub penalty_overrides: BTreeMap<String, PenaltyWeights>,
    /// Upper bound on accepted local-search moves.
    pub local_search_rounds: usize,
    pub generator: GeneratorConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_patterns: 5,
            max_multiplier: 10,
            penalty: PenaltyWeights::default(),
            penalty_overrides: BTreeMap::new(),
            local_search_rounds: 100,
            generator: GeneratorConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_patterns(mut self, max_patterns: usize) -> Self {
        self.max_patterns = max_patterns;
        self
    }

    pub fn with_max_multiplier(mut self, max_multiplier: u32) -> Self {
        self.max_multiplier = max_multiplier;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyWeights) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_penalty_override(mut self, id: impl Into<String>, penalty: PenaltyWeights) -> Self {
        self.penalty_overrides.insert(id.into(), penalty);
        self
    }

    pub fn with_local_search_rounds(mut self, rounds: usize) -> Self {
        self.local_search_rounds = rounds;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn limits(&self) -> PlanLimits {
        PlanLimits {
            max_patterns: self.max_patterns,
            max_multiplier: self.max_multiplier,
        }
    }

    pub fn weights_for(&self, id: &str) -> PenaltyWeights {
        self.penalty_overrides
            .get(id)
            .copied()
            .unwrap_or(self.penalty)
    }

    fn check(&self) -> Result<()> {
        if self.max_multiplier == 0 {
            return Err(Error::InvalidInput(
                "max multiplier must be at least 1".to_string(),
            ));
        }
        let all = std::iter::once(&self.penalty).chain(self.penalty_overrides.values());
        for w in all {
            if !(w.under.is_finite() && w.under >= 0.0 && w.over.is_finite() && w.over >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "penalty weights must be finite and non-negative, got under={} over={}",
                    w.under, w.over
                )));
            }
        }
        Ok(())
    }
}

/// Weighted deviation of `plan` from the required tons.
pub fn objective(
    requirements: &[RollRequirement],
    production: &ProductionParams,
    plan: &Plan,
    config: &SolverConfig,
) -> f64 {
    totals_objective(&ProducedTotals::compute(requirements, production, plan), config)
}

fn totals_objective(totals: &ProducedTotals, config: &SolverConfig) -> f64 {
    totals
        .iter()
        .map(|t| config.weights_for(&t.id).penalty(t.required_tons, t.tons_produced))
        .sum()
}

pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Generate candidates, search for a plan and validate it.
    pub fn solve(
        &self,
        requirements: &[RollRequirement],
        deckle: DeckleRange,
        production: ProductionParams,
    ) -> Result<Solution> {
        check_requirements(requirements)?;
        production.check()?;
        self.config.check()?;

        let candidates: Vec<Pattern> =
            PatternGenerator::new(requirements, deckle, self.config.generator.clone()).collect();
        tracing::debug!(candidates = candidates.len(), %deckle, "generated candidate patterns");
        if candidates.is_empty() {
            return Err(Error::InfeasibleDeckle { deckle });
        }

        let uncovered: Vec<String> = requirements
            .iter()
            .filter(|r| candidates.iter().all(|p| p.quantity_of(&r.id) == 0))
            .map(|r| r.id.clone())
            .collect();
        for id in &uncovered {
            tracing::warn!(id = %id, %deckle, "no pattern within the deckle range contains this roll");
        }

        let plan = self.select_plan(requirements, &production, &candidates);
        let plan = validate::validate(plan, requirements, &deckle, &self.config.limits())
            .map_err(|violation| {
                tracing::error!(%violation, "solver produced a plan outside hard constraints");
                Error::from(violation)
            })?;

        let totals = ProducedTotals::compute(requirements, &production, &plan);
        let objective = totals_objective(&totals, &self.config);
        tracing::debug!(entries = plan.len(), objective, "plan selected");

        Ok(Solution {
            plan,
            totals,
            uncovered,
            objective,
            candidates: candidates.len(),
        })
    }

    /// Pick up to `max_patterns` candidates and their multipliers.
    ///
    /// Ties go to the earlier candidate. An empty pool yields an empty plan.
    pub fn select_plan(
        &self,
        requirements: &[RollRequirement],
        production: &ProductionParams,
        candidates: &[Pattern],
    ) -> Plan {
        let search = Search::new(&self.config, requirements, production, candidates);
        if search.columns.is_empty() || self.config.max_patterns == 0 {
            return Plan::default();
        }

        let chosen = search.improve(search.seed());
        Plan::new(
            chosen
                .into_iter()
                .map(|c| PlanEntry::new(search.patterns[c.candidate].clone(), c.multiplier))
                .collect(),
        )
    }
}

fn check_requirements(requirements: &[RollRequirement]) -> Result<()> {
    if requirements.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut seen = HashSet::new();
    for r in requirements {
        if r.id.trim().is_empty() {
            return Err(Error::InvalidInput("roll id must not be blank".to_string()));
        }
        if !seen.insert(r.id.as_str()) {
            return Err(Error::InvalidInput(format!("duplicate roll id '{}'", r.id)));
        }
        if r.width_mm == 0 {
            return Err(Error::InvalidInput(format!(
                "roll '{}' must have a non-zero width",
                r.id
            )));
        }
        if !(r.required_tons.is_finite() && r.required_tons > 0.0) {
            return Err(Error::InvalidInput(format!(
                "roll '{}' must require a positive tonnage, got {}",
                r.id, r.required_tons
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chosen {
    candidate: usize,
    multiplier: u32,
}

/// Candidate pool flattened into per-requirement quantity columns.
struct Search<'a> {
    config: &'a SolverConfig,
    production: &'a ProductionParams,
    widths: Vec<u32>,
    required: Vec<f64>,
    weights: Vec<PenaltyWeights>,
    patterns: Vec<&'a Pattern>,
    columns: Vec<Vec<u32>>,
}

impl<'a> Search<'a> {
    fn new(
        config: &'a SolverConfig,
        requirements: &[RollRequirement],
        production: &'a ProductionParams,
        candidates: &'a [Pattern],
    ) -> Self {
        let index: HashMap<&str, usize> = requirements
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut patterns = Vec::new();
        let mut columns = Vec::new();
        'candidates: for pattern in candidates {
            if pattern.is_empty() {
                continue;
            }
            let mut column = vec![0u32; requirements.len()];
            for cut in pattern.cuts() {
                match index.get(cut.id.as_str()) {
                    Some(&i) if requirements[i].width_mm == cut.width_mm => {
                        column[i] += cut.quantity;
                    }
                    _ => {
                        tracing::debug!(%pattern, id = %cut.id, "skipping candidate with unknown roll");
                        continue 'candidates;
                    }
                }
            }
            patterns.push(pattern);
            columns.push(column);
        }

        Self {
            config,
            production,
            widths: requirements.iter().map(|r| r.width_mm).collect(),
            required: requirements.iter().map(|r| r.required_tons).collect(),
            weights: requirements
                .iter()
                .map(|r| config.weights_for(&r.id))
                .collect(),
            patterns,
            columns,
        }
    }

    fn add(&self, counts: &mut [u64], candidate: usize, multiplier: u32) {
        for (count, &quantity) in counts.iter_mut().zip(&self.columns[candidate]) {
            *count += quantity as u64 * multiplier as u64;
        }
    }

    fn counts(&self, chosen: &[Chosen]) -> Vec<u64> {
        let mut counts = vec![0u64; self.widths.len()];
        for c in chosen {
            self.add(&mut counts, c.candidate, c.multiplier);
        }
        counts
    }

    fn evaluate(&self, counts: &[u64]) -> f64 {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let produced = self.production.tons(self.widths[i], count);
                self.weights[i].penalty(self.required[i], produced)
            })
            .sum()
    }

    fn value(&self, chosen: &[Chosen]) -> f64 {
        self.evaluate(&self.counts(chosen))
    }

    /// Smallest multiplier that clears the largest deficit among the
    /// candidate's widths, clamped to `[1, max_multiplier]`.
    fn multiplier_for(&self, candidate: usize, counts: &[u64]) -> u32 {
        let column = &self.columns[candidate];
        let mut target: Option<(usize, f64)> = None;
        for (i, &quantity) in column.iter().enumerate() {
            if quantity == 0 {
                continue;
            }
            let deficit = self.required[i] - self.production.tons(self.widths[i], counts[i]);
            if target.is_none_or(|(_, largest)| deficit > largest) {
                target = Some((i, deficit));
            }
        }

        let Some((i, deficit)) = target else {
            return 1;
        };
        let per_run = self.production.tons(self.widths[i], column[i] as u64);
        if deficit <= 0.0 || per_run <= 0.0 {
            return 1;
        }
        let max = self.config.max_multiplier.max(1);
        let runs = (deficit / per_run).ceil().min(max as f64);
        (runs as u32).clamp(1, max)
    }

    fn is_used(chosen: &[Chosen], candidate: usize) -> bool {
        chosen.iter().any(|c| c.candidate == candidate)
    }

    /// Greedy construction: add the candidate that lowers the objective most
    /// until the plan is full or nothing improves.
    fn seed(&self) -> Vec<Chosen> {
        let mut chosen: Vec<Chosen> = Vec::new();
        let mut counts = vec![0u64; self.widths.len()];
        let mut current = self.evaluate(&counts);

        while chosen.len() < self.config.max_patterns {
            let mut best: Option<(Chosen, f64)> = None;
            for candidate in 0..self.columns.len() {
                if Self::is_used(&chosen, candidate) {
                    continue;
                }
                let multiplier = self.multiplier_for(candidate, &counts);
                let mut trial = counts.clone();
                self.add(&mut trial, candidate, multiplier);
                // Ranked on the full weighted objective, not the
                // under-production term alone.
                let value = self.evaluate(&trial);
                let bar = best.map_or(current, |(_, v)| v);
                if value < bar - IMPROVEMENT_EPSILON {
                    best = Some((
                        Chosen {
                            candidate,
                            multiplier,
                        },
                        value,
                    ));
                }
            }

            let Some((pick, value)) = best else {
                break;
            };
            self.add(&mut counts, pick.candidate, pick.multiplier);
            chosen.push(pick);
            current = value;
        }
        chosen
    }

    fn consider(&self, best: &mut Option<(Vec<Chosen>, f64)>, trial: Vec<Chosen>, current: f64) {
        let value = self.value(&trial);
        let bar = best.as_ref().map_or(current, |(_, v)| *v);
        if value < bar - IMPROVEMENT_EPSILON {
            *best = Some((trial, value));
        }
    }

    /// Best-improvement local search. Each round evaluates every move and
    /// applies the best one if it strictly lowers the objective:
    /// re-sizing one entry by one run or to the run count its deficit
    /// calls for (or dropping it), shifting one run from one entry to
    /// another, swapping an entry for an unused candidate, and adding an
    /// unused candidate while slots remain.
    fn improve(&self, mut chosen: Vec<Chosen>) -> Vec<Chosen> {
        let max = self.config.max_multiplier.max(1);
        let mut current = self.value(&chosen);

        for round in 0..self.config.local_search_rounds {
            let mut best: Option<(Vec<Chosen>, f64)> = None;

            for j in 0..chosen.len() {
                let mut rest = chosen.clone();
                rest.remove(j);
                let current_multiplier = chosen[j].multiplier;
                let target = self.multiplier_for(chosen[j].candidate, &self.counts(&rest));
                let sizes = [
                    current_multiplier.saturating_sub(1),
                    current_multiplier.saturating_add(1),
                    target,
                ];
                for (k, &multiplier) in sizes.iter().enumerate() {
                    if multiplier == 0
                        || multiplier > max
                        || multiplier == current_multiplier
                        || sizes[..k].contains(&multiplier)
                    {
                        continue;
                    }
                    let mut trial = chosen.clone();
                    trial[j].multiplier = multiplier;
                    self.consider(&mut best, trial, current);
                }
                self.consider(&mut best, rest, current);
            }

            for from in 0..chosen.len() {
                for to in 0..chosen.len() {
                    if from != to && chosen[from].multiplier > 1 && chosen[to].multiplier < max {
                        let mut trial = chosen.clone();
                        trial[from].multiplier -= 1;
                        trial[to].multiplier += 1;
                        self.consider(&mut best, trial, current);
                    }
                }
            }

            for j in 0..chosen.len() {
                let mut rest = chosen.clone();
                rest.remove(j);
                let base = self.counts(&rest);
                for candidate in 0..self.columns.len() {
                    if Self::is_used(&chosen, candidate) {
                        continue;
                    }
                    let resized = self.multiplier_for(candidate, &base);
                    for multiplier in [resized, chosen[j].multiplier] {
                        let mut trial = chosen.clone();
                        trial[j] = Chosen {
                            candidate,
                            multiplier,
                        };
                        self.consider(&mut best, trial, current);
                    }
                }
            }

            if chosen.len() < self.config.max_patterns {
                let base = self.counts(&chosen);
                for candidate in 0..self.columns.len() {
                    if Self::is_used(&chosen, candidate) {
                        continue;
                    }
                    let mut trial = chosen.clone();
                    trial.push(Chosen {
                        candidate,
                        multiplier: self.multiplier_for(candidate, &base),
                    });
                    self.consider(&mut best, trial, current);
                }
            }

            let Some((trial, value)) = best else {
                break;
            };
            tracing::debug!(round, from = current, to = value, "local search move accepted");
            chosen = trial;
            current = value;
        }
        chosen
    }
}
