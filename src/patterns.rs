//! Candidate cutting patterns for a deckle range.
//!
//! Patterns are enumerated depth-first over per-width quantities, widest
//! width first and highest quantity first, so fuller patterns surface early.
//! The search runs in two phases: first only patterns with at most
//! `max_widths_per_pattern` distinct widths, then (budget permitting) the
//! patterns with more. The order is fully deterministic.

use serde::{Deserialize, Serialize};

use crate::types::{Cut, DeckleRange, Pattern, RollRequirement};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Distinct widths allowed per pattern before the cap is relaxed.
    pub max_widths_per_pattern: usize,
    /// Stop after this many accepted patterns.
    pub candidate_budget: usize,
    /// Stop after visiting this many search nodes.
    pub node_budget: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_widths_per_pattern: 3,
            candidate_budget: 2000,
            node_budget: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Capped,
    Relaxed,
}

/// Lazy, finite, non-restartable sequence of patterns that fit the deckle.
pub struct PatternGenerator<'a> {
    requirements: &'a [RollRequirement],
    deckle: DeckleRange,
    config: GeneratorConfig,
    /// Requirement indices, widest first.
    order: Vec<usize>,
    /// floor(deckle.max / width) per search position.
    cap_bounds: Vec<u32>,
    phase: Phase,
    /// Quantity chosen at each search position assigned so far.
    stack: Vec<u32>,
    width_sum: u32,
    distinct: usize,
    started: bool,
    done: bool,
    emitted: usize,
    visited: usize,
}

/// Enumerate the patterns of `requirements` that fit `deckle`.
pub fn generate<'a>(
    requirements: &'a [RollRequirement],
    deckle: DeckleRange,
    max_widths_per_pattern: usize,
) -> PatternGenerator<'a> {
    PatternGenerator::new(
        requirements,
        deckle,
        GeneratorConfig {
            max_widths_per_pattern,
            ..GeneratorConfig::default()
        },
    )
}

impl<'a> PatternGenerator<'a> {
    pub fn new(
        requirements: &'a [RollRequirement],
        deckle: DeckleRange,
        config: GeneratorConfig,
    ) -> Self {
        let mut order: Vec<usize> = (0..requirements.len()).collect();
        // Stable: equal widths keep request order
        order.sort_by(|&a, &b| requirements[b].width_mm.cmp(&requirements[a].width_mm));

        let cap_bounds = order
            .iter()
            .map(|&i| match requirements[i].width_mm {
                0 => 0,
                w => deckle.max_mm() / w,
            })
            .collect();

        Self {
            requirements,
            deckle,
            config,
            order,
            cap_bounds,
            phase: Phase::Capped,
            stack: Vec::new(),
            width_sum: 0,
            distinct: 0,
            started: false,
            done: false,
            emitted: 0,
            visited: 0,
        }
    }

    fn width_cap(&self) -> usize {
        self.config.max_widths_per_pattern.max(1)
    }

    fn distinct_limit(&self) -> usize {
        match self.phase {
            Phase::Capped => self.width_cap(),
            Phase::Relaxed => self.order.len(),
        }
    }

    fn width_at(&self, pos: usize) -> u32 {
        self.requirements[self.order[pos]].width_mm
    }

    fn highest_quantity(&self, pos: usize) -> u32 {
        let width = self.width_at(pos);
        if width == 0 || self.distinct >= self.distinct_limit() {
            return 0;
        }
        let room = self.deckle.max_mm() - self.width_sum;
        self.cap_bounds[pos].min(room / width)
    }

    fn push(&mut self, quantity: u32) {
        let pos = self.stack.len();
        self.width_sum += quantity * self.width_at(pos);
        if quantity > 0 {
            self.distinct += 1;
        }
        self.stack.push(quantity);
        self.visited += 1;
    }

    fn pop(&mut self) -> Option<u32> {
        let quantity = self.stack.pop()?;
        let pos = self.stack.len();
        self.width_sum -= quantity * self.width_at(pos);
        if quantity > 0 {
            self.distinct -= 1;
        }
        Some(quantity)
    }

    /// Extend the partial assignment to a full one, taking the largest
    /// quantity that keeps the width sum within the deckle maximum.
    fn descend(&mut self) {
        while self.stack.len() < self.order.len() {
            let quantity = self.highest_quantity(self.stack.len());
            self.push(quantity);
        }
    }

    /// Move to the next full assignment in depth-first order.
    fn backtrack(&mut self) -> bool {
        while let Some(quantity) = self.pop() {
            if quantity > 0 {
                self.push(quantity - 1);
                self.descend();
                return true;
            }
        }
        false
    }

    fn accepts(&self) -> bool {
        let enough_widths = match self.phase {
            Phase::Capped => self.distinct > 0,
            Phase::Relaxed => self.distinct > self.width_cap(),
        };
        enough_widths && self.deckle.contains(self.width_sum as u64)
    }

    fn pattern(&self) -> Pattern {
        let mut quantities = vec![0u32; self.requirements.len()];
        for (pos, &quantity) in self.stack.iter().enumerate() {
            quantities[self.order[pos]] = quantity;
        }
        Pattern::new(
            self.requirements
                .iter()
                .zip(quantities)
                .map(|(r, quantity)| Cut {
                    id: r.id.clone(),
                    width_mm: r.width_mm,
                    quantity,
                })
                .collect(),
        )
    }
}

impl Iterator for PatternGenerator<'_> {
    type Item = Pattern;

    fn next(&mut self) -> Option<Pattern> {
        loop {
            if self.done {
                return None;
            }
            if self.emitted >= self.config.candidate_budget
                || self.visited >= self.config.node_budget
            {
                tracing::debug!(
                    emitted = self.emitted,
                    visited = self.visited,
                    "pattern search budget reached"
                );
                self.done = true;
                return None;
            }

            let advanced = if self.started {
                self.backtrack()
            } else {
                self.started = true;
                self.descend();
                true
            };

            if !advanced {
                if self.phase == Phase::Capped && self.width_cap() < self.order.len() {
                    self.phase = Phase::Relaxed;
                    self.started = false;
                    continue;
                }
                self.done = true;
                return None;
            }

            if self.accepts() {
                self.emitted += 1;
                return Some(self.pattern());
            }
        }
    }
}

impl std::iter::FusedIterator for PatternGenerator<'_> {}
