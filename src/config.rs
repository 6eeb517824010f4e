//! TOML settings file.
//!
//! ```toml
//! [solver]
//! max_patterns = 5
//! max_multiplier = 10
//!
//! [solver.penalty]
//! under = 10.0
//! over = 1.0
//!
//! [solver.generator]
//! max_widths_per_pattern = 3
//! candidate_budget = 2000
//!
//! [mills.NEW-MILL]
//! min = 4000
//! max = 4400
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::mills::MillTable;
use crate::solver::SolverConfig;
use crate::types::DeckleRange;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub solver: SolverConfig,
    /// Added to, or replacing, the built-in mills.
    pub mills: BTreeMap<String, DeckleRange>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn mill_table(&self) -> MillTable {
        let mut table = MillTable::builtin();
        for (name, deckle) in &self.mills {
            table.insert(name, *deckle);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::PenaltyWeights;

    #[test]
    fn test_empty_file_is_default() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.solver.max_patterns, 5);
        assert_eq!(settings.solver.max_multiplier, 10);
        assert_eq!(settings.solver.generator.candidate_budget, 2000);
    }

    #[test]
    fn test_partial_solver_section() {
        let settings = Settings::from_toml(
            r#"
            [solver]
            max_multiplier = 8

            [solver.penalty]
            over = 0.5

            [solver.penalty_overrides.r2]
            under = 20.0
            over = 2.0

            [solver.generator]
            max_widths_per_pattern = 2
            "#,
        )
        .unwrap();
        let solver = &settings.solver;
        assert_eq!(solver.max_multiplier, 8);
        assert_eq!(solver.max_patterns, 5);
        assert_eq!(solver.penalty, PenaltyWeights::new(10.0, 0.5));
        assert_eq!(solver.weights_for("r2"), PenaltyWeights::new(20.0, 2.0));
        assert_eq!(solver.weights_for("r1"), PenaltyWeights::new(10.0, 0.5));
        assert_eq!(solver.generator.max_widths_per_pattern, 2);
        assert_eq!(solver.generator.candidate_budget, 2000);
    }

    #[test]
    fn test_mills_section() {
        let settings = Settings::from_toml(
            r#"
            [mills.NEW-MILL]
            min = 4000
            max = 4400

            [mills.HANSOL]
            min = 4250
            max = 4650
            "#,
        )
        .unwrap();
        let table = settings.mill_table();
        assert_eq!(table.len(), 8);
        assert_eq!(table.lookup("new-mill").unwrap().max_mm(), 4400);
        assert_eq!(table.lookup("HANSOL").unwrap().min_mm(), 4250);
    }

    #[test]
    fn test_invalid_deckle_rejected() {
        let result = Settings::from_toml(
            r#"
            [mills.BROKEN]
            min = 5000
            max = 4000
            "#,
        );
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(Settings::from_toml("[output]\nformat = \"pdf\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/trim_planner.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
