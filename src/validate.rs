//! Final hard-constraint check on a plan before it leaves the solver.

use std::collections::HashMap;

use crate::error::{ConstraintViolation, ViolatedBound};
use crate::types::{DeckleRange, Plan, RollRequirement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_patterns: usize,
    pub max_multiplier: u32,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_patterns: 5,
            max_multiplier: 10,
        }
    }
}

/// Re-derive every entry's width sum from the requested widths and check
/// the multiplier bound.
///
/// The first failing entry rejects the whole plan; nothing is dropped.
pub fn validate(
    plan: Plan,
    requirements: &[RollRequirement],
    deckle: &DeckleRange,
    limits: &PlanLimits,
) -> Result<Plan, ConstraintViolation> {
    if plan.len() > limits.max_patterns {
        return Err(ConstraintViolation {
            entry: limits.max_patterns,
            bound: ViolatedBound::EntryCount {
                count: plan.len(),
                max: limits.max_patterns,
            },
        });
    }

    let widths: HashMap<&str, u32> = requirements
        .iter()
        .map(|r| (r.id.as_str(), r.width_mm))
        .collect();

    for (entry, e) in plan.entries().iter().enumerate() {
        let violation = |bound| ConstraintViolation { entry, bound };

        if e.pattern.is_empty() {
            return Err(violation(ViolatedBound::EmptyPattern));
        }

        let mut width_sum: u64 = 0;
        for cut in e.pattern.cuts() {
            match widths.get(cut.id.as_str()) {
                Some(&width_mm) if width_mm == cut.width_mm => {
                    width_sum += width_mm as u64 * cut.quantity as u64;
                }
                _ => {
                    return Err(violation(ViolatedBound::UnknownRoll {
                        id: cut.id.clone(),
                        width_mm: cut.width_mm,
                    }));
                }
            }
        }

        if width_sum < deckle.min_mm() as u64 {
            return Err(violation(ViolatedBound::DeckleMin {
                width_sum,
                min_mm: deckle.min_mm(),
            }));
        }
        if width_sum > deckle.max_mm() as u64 {
            return Err(violation(ViolatedBound::DeckleMax {
                width_sum,
                max_mm: deckle.max_mm(),
            }));
        }
        if e.multiplier == 0 || e.multiplier > limits.max_multiplier {
            return Err(violation(ViolatedBound::Multiplier {
                multiplier: e.multiplier,
                max: limits.max_multiplier,
            }));
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cut, Pattern, PlanEntry};

    fn pattern(cuts: &[(&str, u32, u32)]) -> Pattern {
        Pattern::new(
            cuts.iter()
                .map(|&(id, width_mm, quantity)| Cut {
                    id: id.to_string(),
                    width_mm,
                    quantity,
                })
                .collect(),
        )
    }

    fn requirements() -> Vec<RollRequirement> {
        vec![
            RollRequirement::new("a", 1600, 20.0),
            RollRequirement::new("b", 1100, 8.0),
        ]
    }

    fn deckle() -> DeckleRange {
        DeckleRange::new(4560, 4960).unwrap()
    }

    fn check(plan: Plan) -> Result<Plan, ConstraintViolation> {
        validate(plan, &requirements(), &deckle(), &PlanLimits::default())
    }

    fn good_plan() -> Plan {
        Plan::new(vec![
            PlanEntry::new(pattern(&[("a", 1600, 3)]), 4),
            PlanEntry::new(pattern(&[("a", 1600, 1), ("b", 1100, 3)]), 10),
        ])
    }

    #[test]
    fn test_valid_plan_passes_unchanged() {
        let plan = good_plan();
        let checked = check(plan.clone()).unwrap();
        assert_eq!(checked, plan);
    }

    #[test]
    fn test_empty_plan_passes() {
        assert!(check(Plan::default()).is_ok());
    }

    #[test]
    fn test_over_deckle_rejected() {
        let mut entries = good_plan().entries().to_vec();
        // 1600 x 4 = 6400
        entries[1] = PlanEntry::new(pattern(&[("a", 1600, 4)]), 1);
        let err = check(Plan::new(entries)).unwrap_err();
        assert_eq!(err.entry, 1);
        assert_eq!(
            err.bound,
            ViolatedBound::DeckleMax {
                width_sum: 6400,
                max_mm: 4960
            }
        );
    }

    #[test]
    fn test_under_deckle_rejected() {
        let plan = Plan::new(vec![PlanEntry::new(pattern(&[("b", 1100, 4)]), 2)]);
        let err = check(plan).unwrap_err();
        assert_eq!(err.entry, 0);
        assert!(matches!(err.bound, ViolatedBound::DeckleMin { width_sum: 4400, .. }));
    }

    #[test]
    fn test_multiplier_bounds_rejected() {
        let zero = Plan::new(vec![PlanEntry::new(pattern(&[("a", 1600, 3)]), 0)]);
        let err = check(zero).unwrap_err();
        assert!(matches!(err.bound, ViolatedBound::Multiplier { multiplier: 0, .. }));

        let mut entries = good_plan().entries().to_vec();
        entries[0].multiplier = 11;
        let err = check(Plan::new(entries)).unwrap_err();
        assert_eq!(err.entry, 0);
        assert_eq!(
            err.bound,
            ViolatedBound::Multiplier {
                multiplier: 11,
                max: 10
            }
        );
    }

    #[test]
    fn test_too_many_entries_rejected() {
        let entry = PlanEntry::new(pattern(&[("a", 1600, 3)]), 1);
        let plan = Plan::new(vec![entry; 6]);
        let err = check(plan).unwrap_err();
        assert!(matches!(err.bound, ViolatedBound::EntryCount { count: 6, max: 5 }));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let plan = Plan::new(vec![PlanEntry::new(Pattern::default(), 1)]);
        let err = check(plan).unwrap_err();
        assert_eq!(err.bound, ViolatedBound::EmptyPattern);
        assert_eq!(err.to_string(), "plan entry 0 violates non-empty pattern");
    }

    #[test]
    fn test_unrequested_roll_rejected() {
        // 1600x3 = 4800 fits the deckle, but no roll "zz" was requested
        let plan = Plan::new(vec![PlanEntry::new(pattern(&[("zz", 1600, 3)]), 1)]);
        let err = check(plan).unwrap_err();
        assert_eq!(err.entry, 0);
        assert_eq!(
            err.bound,
            ViolatedBound::UnknownRoll {
                id: "zz".to_string(),
                width_mm: 1600
            }
        );
    }

    #[test]
    fn test_width_mismatch_rejected() {
        // "b" is requested at 1100mm; a cut claiming 1200mm is corrupt
        let mut entries = good_plan().entries().to_vec();
        entries[1] = PlanEntry::new(pattern(&[("a", 1600, 1), ("b", 1200, 3)]), 2);
        let err = check(Plan::new(entries)).unwrap_err();
        assert_eq!(err.entry, 1);
        assert_eq!(
            err.to_string(),
            "plan entry 1 violates requested rolls: no requirement 'b' of 1200mm"
        );
    }
}
