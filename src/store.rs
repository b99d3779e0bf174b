// 🗄️ Data Store - flat JSON files
//
// One file per dataset under the data directory. Files are read fresh on
// every call: no cache, no locking, no write-back.

use crate::entities::{Borrower, Collateral, Equipment, Loan, Payment};
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ============================================================================
// DATASETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Borrowers,
    Loans,
    Payments,
    Collateral,
    Equipment,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::Borrowers,
        Dataset::Loans,
        Dataset::Payments,
        Dataset::Collateral,
        Dataset::Equipment,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Dataset::Borrowers => "borrowers.json",
            Dataset::Loans => "loans.json",
            Dataset::Payments => "payments.json",
            Dataset::Collateral => "collateral.json",
            Dataset::Equipment => "equipment.json",
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, dataset: Dataset) -> PathBuf {
        self.root.join(dataset.file_name())
    }

    /// Load every record of a dataset.
    ///
    /// A missing or blank file is an empty dataset. Unreadable files and
    /// malformed JSON are errors, never silently swallowed.
    pub fn load<T: DeserializeOwned>(&self, dataset: Dataset) -> Result<Vec<T>, StoreError> {
        let path = self.path_for(dataset);

        if !path.exists() {
            warn!(path = %path.display(), "data file not found, treating as empty");
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            warn!(path = %path.display(), "data file is empty");
            return Ok(Vec::new());
        }

        let records: Vec<T> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse { path: path.clone(), source })?;

        debug!(dataset = dataset.file_name(), count = records.len(), "loaded dataset");
        Ok(records)
    }

    pub fn borrowers(&self) -> Result<Vec<Borrower>, StoreError> {
        self.load(Dataset::Borrowers)
    }

    pub fn loans(&self) -> Result<Vec<Loan>, StoreError> {
        self.load(Dataset::Loans)
    }

    pub fn payments(&self) -> Result<Vec<Payment>, StoreError> {
        self.load(Dataset::Payments)
    }

    pub fn collateral(&self) -> Result<Vec<Collateral>, StoreError> {
        self.load(Dataset::Collateral)
    }

    pub fn equipment(&self) -> Result<Vec<Equipment>, StoreError> {
        self.load(Dataset::Equipment)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, dataset: Dataset, contents: &str) {
        fs::write(dir.path().join(dataset.file_name()), contents).unwrap();
    }

    #[test]
    fn test_missing_file_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());

        assert!(store.equipment().unwrap().is_empty());
    }

    #[test]
    fn test_blank_file_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        write(&dir, Dataset::Payments, "  \n");
        let store = DataStore::new(dir.path());

        assert!(store.payments().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, Dataset::Loans, "[{\"loan_id\": ");
        let store = DataStore::new(dir.path());

        let err = store.loans().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("loans.json"));
    }

    #[test]
    fn test_loads_records_fresh_each_call() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            Dataset::Collateral,
            r#"[{"collateral_id":"C001","loan_id":"L001","description":"Tractor","value":30000}]"#,
        );
        let store = DataStore::new(dir.path());
        assert_eq!(store.collateral().unwrap().len(), 1);

        write(&dir, Dataset::Collateral, "[]");
        assert!(store.collateral().unwrap().is_empty());
    }

    #[test]
    fn test_seeded_data_loads() {
        let store = DataStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"));

        let borrowers = store.borrowers().unwrap();
        assert!(borrowers.iter().any(|b| b.borrower_id == "B003"));
        assert!(!store.loans().unwrap().is_empty());
        assert!(!store.payments().unwrap().is_empty());
        assert!(!store.collateral().unwrap().is_empty());
        assert!(!store.equipment().unwrap().is_empty());
    }
}
