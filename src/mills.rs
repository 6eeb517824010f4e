//! Deckle ranges of the supported paper machines.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::DeckleRange;

const BUILTIN_MILLS: &[(&str, u32, u32)] = &[
    ("NPI-IWAKUNI", 4560, 4960),
    ("NPI-SHIRAOI", 3000, 3200),
    ("HOKUETSU", 5000, 5500),
    ("APP-A", 6000, 6800),
    ("APP-B", 8000, 8500),
    ("MOORIM", 3200, 3500),
    ("HANSOL", 4200, 4600),
];

/// Mill name to deckle range. Names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct MillTable {
    mills: BTreeMap<String, DeckleRange>,
}

impl Default for MillTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MillTable {
    pub fn empty() -> Self {
        Self {
            mills: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for &(name, min, max) in BUILTIN_MILLS {
            if let Ok(deckle) = DeckleRange::new(min, max) {
                table.insert(name, deckle);
            }
        }
        table
    }

    /// Add or replace a mill.
    pub fn insert(&mut self, name: &str, deckle: DeckleRange) {
        self.mills.insert(name.trim().to_uppercase(), deckle);
    }

    pub fn lookup(&self, name: &str) -> Option<DeckleRange> {
        self.mills.get(&name.trim().to_uppercase()).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<DeckleRange> {
        self.lookup(name)
            .ok_or_else(|| Error::UnknownMill(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mills.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DeckleRange)> {
        self.mills.iter().map(|(name, deckle)| (name.as_str(), *deckle))
    }

    pub fn len(&self) -> usize {
        self.mills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let mills = MillTable::builtin();
        assert_eq!(mills.len(), 7);
        let iwakuni = mills.lookup("NPI-IWAKUNI").unwrap();
        assert_eq!((iwakuni.min_mm(), iwakuni.max_mm()), (4560, 4960));
        assert_eq!(mills.lookup("hansol"), mills.lookup("HANSOL"));
        assert!(mills.lookup("nowhere").is_none());
    }

    #[test]
    fn test_resolve_unknown() {
        let err = MillTable::builtin().resolve("nowhere").unwrap_err();
        assert!(matches!(err, Error::UnknownMill(name) if name == "nowhere"));
    }

    #[test]
    fn test_names_sorted() {
        let table = MillTable::builtin();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names.first(), Some(&"APP-A"));
        assert_eq!(names.len(), 7);
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_insert_overrides() {
        let mut mills = MillTable::builtin();
        mills.insert("moorim", DeckleRange::new(3300, 3600).unwrap());
        assert_eq!(mills.len(), 7);
        assert_eq!(mills.lookup("MOORIM").unwrap().min_mm(), 3300);
    }
}
