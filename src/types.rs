use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::weight;

/// One required roll width and the tonnage wanted of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRequirement {
    pub id: String,
    pub width_mm: u32,
    pub required_tons: f64,
}

impl RollRequirement {
    pub fn new(id: impl Into<String>, width_mm: u32, required_tons: f64) -> Self {
        Self {
            id: id.into(),
            width_mm,
            required_tons,
        }
    }
}

/// Minimum and maximum total width a machine can produce per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DeckleBounds", into = "DeckleBounds")]
pub struct DeckleRange {
    min_mm: u32,
    max_mm: u32,
}

/// Wire form of [`DeckleRange`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeckleBounds {
    pub min: u32,
    pub max: u32,
}

impl DeckleRange {
    pub fn new(min_mm: u32, max_mm: u32) -> Result<Self> {
        if min_mm == 0 {
            return Err(Error::InvalidInput(
                "deckle minimum must be non-zero".to_string(),
            ));
        }
        if min_mm > max_mm {
            return Err(Error::InvalidInput(format!(
                "deckle minimum {min_mm}mm exceeds maximum {max_mm}mm"
            )));
        }
        Ok(Self { min_mm, max_mm })
    }

    pub fn min_mm(&self) -> u32 {
        self.min_mm
    }

    pub fn max_mm(&self) -> u32 {
        self.max_mm
    }

    pub fn contains(&self, width_sum: u64) -> bool {
        width_sum >= self.min_mm as u64 && width_sum <= self.max_mm as u64
    }
}

impl TryFrom<DeckleBounds> for DeckleRange {
    type Error = Error;

    fn try_from(bounds: DeckleBounds) -> Result<Self> {
        DeckleRange::new(bounds.min, bounds.max)
    }
}

impl From<DeckleRange> for DeckleBounds {
    fn from(deckle: DeckleRange) -> Self {
        Self {
            min: deckle.min_mm,
            max: deckle.max_mm,
        }
    }
}

impl std::fmt::Display for DeckleRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]mm", self.min_mm, self.max_mm)
    }
}

/// Paper grade and run length shared by every pattern in one solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionParams {
    pub substance_gsm: f64,
    pub length_m: f64,
}

impl ProductionParams {
    pub fn new(substance_gsm: f64, length_m: f64) -> Result<Self> {
        let params = Self {
            substance_gsm,
            length_m,
        };
        params.check()?;
        Ok(params)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if !(self.substance_gsm.is_finite() && self.substance_gsm > 0.0) {
            return Err(Error::InvalidInput(format!(
                "substance must be a positive number, got {}",
                self.substance_gsm
            )));
        }
        if !(self.length_m.is_finite() && self.length_m > 0.0) {
            return Err(Error::InvalidInput(format!(
                "length must be a positive number, got {}",
                self.length_m
            )));
        }
        Ok(())
    }

    /// Tons produced by `roll_count` rolls of `width_mm`.
    pub fn tons(&self, width_mm: u32, roll_count: u64) -> f64 {
        weight::tons(width_mm, self.substance_gsm, self.length_m, roll_count)
    }
}

/// Copies of one required width cut side by side in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cut {
    pub id: String,
    pub width_mm: u32,
    pub quantity: u32,
}

/// A multiset of roll widths cut together from one master roll.
///
/// Identity is the composition: two patterns with the same cuts in the same
/// order are equal. Zero-quantity cuts are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pattern {
    cuts: Vec<Cut>,
}

impl Pattern {
    pub fn new(cuts: Vec<Cut>) -> Self {
        Self {
            cuts: cuts.into_iter().filter(|c| c.quantity > 0).collect(),
        }
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn width_sum(&self) -> u64 {
        self.cuts
            .iter()
            .map(|c| c.width_mm as u64 * c.quantity as u64)
            .sum()
    }

    pub fn quantity_of(&self, id: &str) -> u32 {
        self.cuts
            .iter()
            .filter(|c| c.id == id)
            .map(|c| c.quantity)
            .sum()
    }

    pub fn fits(&self, deckle: &DeckleRange) -> bool {
        deckle.contains(self.width_sum())
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cuts.is_empty() {
            return write!(f, "(empty)");
        }
        for (i, cut) in self.cuts.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}x{}", cut.width_mm, cut.quantity)?;
        }
        write!(f, " = {}", self.width_sum())
    }
}

/// A pattern and the number of times it is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub pattern: Pattern,
    pub multiplier: u32,
}

impl PlanEntry {
    pub fn new(pattern: Pattern, multiplier: u32) -> Self {
        Self {
            pattern,
            multiplier,
        }
    }

    pub fn width_sum(&self) -> u64 {
        self.pattern.width_sum()
    }

    /// Tons produced by every run of this entry together.
    pub fn tons(&self, production: &ProductionParams) -> f64 {
        self.pattern
            .cuts()
            .iter()
            .map(|c| production.tons(c.width_mm, c.quantity as u64 * self.multiplier as u64))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rolls of `id` produced across all entries.
    pub fn roll_count(&self, id: &str) -> u64 {
        self.entries
            .iter()
            .map(|e| e.pattern.quantity_of(id) as u64 * e.multiplier as u64)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducedTotal {
    pub id: String,
    pub width_mm: u32,
    pub required_tons: f64,
    pub roll_count: u64,
    pub tons_produced: f64,
}

impl ProducedTotal {
    /// Produced minus required; negative means under-production.
    pub fn deviation(&self) -> f64 {
        self.tons_produced - self.required_tons
    }
}

/// Required vs produced, one row per requirement in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProducedTotals(Vec<ProducedTotal>);

impl ProducedTotals {
    pub fn compute(
        requirements: &[RollRequirement],
        production: &ProductionParams,
        plan: &Plan,
    ) -> Self {
        Self(
            requirements
                .iter()
                .map(|r| {
                    let roll_count = plan.roll_count(&r.id);
                    ProducedTotal {
                        id: r.id.clone(),
                        width_mm: r.width_mm,
                        required_tons: r.required_tons,
                        roll_count,
                        tons_produced: production.tons(r.width_mm, roll_count),
                    }
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProducedTotal> {
        self.0.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ProducedTotal> {
        self.0.iter().find(|t| t.id == id)
    }
}

impl<'a> IntoIterator for &'a ProducedTotals {
    type Item = &'a ProducedTotal;
    type IntoIter = std::slice::Iter<'a, ProducedTotal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of one solve.
#[derive(Debug, Clone)]
pub struct Solution {
    pub plan: Plan,
    pub totals: ProducedTotals,
    /// Requirement ids that no candidate pattern contains.
    pub uncovered: Vec<String>,
    pub objective: f64,
    pub candidates: usize,
}

/// Accepts whole JSON numbers written either as integers or as floats (`1500.0`).
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(id: &str, width_mm: u32, quantity: u32) -> Cut {
        Cut {
            id: id.to_string(),
            width_mm,
            quantity,
        }
    }

    #[test]
    fn test_deckle_rejects_inverted_bounds() {
        assert!(DeckleRange::new(4960, 4560).is_err());
        assert!(DeckleRange::new(0, 100).is_err());
        let deckle = DeckleRange::new(4560, 4560).unwrap();
        assert!(deckle.contains(4560));
        assert!(!deckle.contains(4559));
    }

    #[test]
    fn test_deckle_deserialize_checks_invariant() {
        let ok: DeckleRange = serde_json::from_str(r#"{"min":4560,"max":4960}"#).unwrap();
        assert_eq!(ok.min_mm(), 4560);
        assert_eq!(ok.max_mm(), 4960);
        assert!(serde_json::from_str::<DeckleRange>(r#"{"min":5000,"max":4960}"#).is_err());
    }

    #[test]
    fn test_production_params_rejects_bad_values() {
        assert!(ProductionParams::new(0.0, 6000.0).is_err());
        assert!(ProductionParams::new(100.0, -1.0).is_err());
        assert!(ProductionParams::new(f64::NAN, 6000.0).is_err());
        assert!(ProductionParams::new(100.0, 6000.0).is_ok());
    }

    #[test]
    fn test_pattern_drops_zero_quantities() {
        let p = Pattern::new(vec![cut("a", 1500, 3), cut("b", 1000, 0)]);
        assert_eq!(p.cuts().len(), 1);
        assert_eq!(p.width_sum(), 4500);
        assert_eq!(p.quantity_of("a"), 3);
        assert_eq!(p.quantity_of("b"), 0);
        assert_eq!(p.to_string(), "1500x3 = 4500");
    }

    #[test]
    fn test_plan_totals() {
        let production = ProductionParams::new(100.0, 6000.0).unwrap();
        let requirements = vec![
            RollRequirement::new("a", 1500, 10.0),
            RollRequirement::new("b", 1000, 5.0),
            RollRequirement::new("c", 700, 1.0),
        ];
        let plan = Plan::new(vec![
            PlanEntry::new(Pattern::new(vec![cut("a", 1500, 2), cut("b", 1000, 2)]), 3),
            PlanEntry::new(Pattern::new(vec![cut("a", 1500, 3)]), 2),
        ]);
        let totals = ProducedTotals::compute(&requirements, &production, &plan);

        let a = totals.get("a").unwrap();
        assert_eq!(a.roll_count, 12);
        assert!((a.tons_produced - 10.8).abs() < 1e-9);
        assert!((a.deviation() - 0.8).abs() < 1e-9);

        let b = totals.get("b").unwrap();
        assert_eq!(b.roll_count, 6);
        assert!((b.tons_produced - 3.6).abs() < 1e-9);

        // Uncovered widths are still reported.
        let c = totals.get("c").unwrap();
        assert_eq!(c.roll_count, 0);
        assert_eq!(c.tons_produced, 0.0);

        let entry_tons = plan.entries()[0].tons(&production);
        assert!((entry_tons - (5.4 + 3.6)).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_width_from_float() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_u32_from_number")]
            width: u32,
        }
        let row: Row = serde_json::from_str(r#"{"width":1500.0}"#).unwrap();
        assert_eq!(row.width, 1500);
        let row: Row = serde_json::from_str(r#"{"width":980}"#).unwrap();
        assert_eq!(row.width, 980);
        assert!(serde_json::from_str::<Row>(r#"{"width":12.5}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"width":-3}"#).is_err());
    }
}
