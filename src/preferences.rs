use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::category::CategoryKind;

/// Last category used on the add screen, one slot per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_expense_category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_income_category_id: Option<i64>,
}

impl Preferences {
    pub fn last_category_id(&self, kind: CategoryKind) -> Option<i64> {
        match kind {
            CategoryKind::Expense => self.last_expense_category_id,
            CategoryKind::Income => self.last_income_category_id,
        }
    }

    pub fn set_last_category_id(&mut self, kind: CategoryKind, id: i64) {
        match kind {
            CategoryKind::Expense => self.last_expense_category_id = Some(id),
            CategoryKind::Income => self.last_income_category_id = Some(id),
        }
    }
}

/// File-backed [`Preferences`]. A missing file reads as empty preferences.
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        let contents = serde_json::to_string_pretty(preferences)?;
        fs::write(&self.path, contents)?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }

    pub fn remember_category(&self, kind: CategoryKind, id: i64) -> Result<()> {
        let mut preferences = self.load()?;
        preferences.set_last_category_id(kind, id);
        self.save(&preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn test_remember_category_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));

        store.remember_category(CategoryKind::Expense, 4).unwrap();
        store.remember_category(CategoryKind::Income, 9).unwrap();
        store.remember_category(CategoryKind::Expense, 5).unwrap();

        let preferences = store.load().unwrap();
        assert_eq!(preferences.last_category_id(CategoryKind::Expense), Some(5));
        assert_eq!(preferences.last_category_id(CategoryKind::Income), Some(9));
    }

    #[test]
    fn test_file_uses_slot_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        store.remember_category(CategoryKind::Income, 3).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"last_income_category_id\": 3"));
        assert!(!raw.contains("last_expense_category_id"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();

        assert!(PreferenceStore::new(path).load().is_err());
    }
}
