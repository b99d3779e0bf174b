// ✅ Data Integrity Check
//
// Scans every dataset and reports broken foreign keys, duplicate ids and
// implausible values. Read-only: nothing is repaired.

use crate::entities::{Borrower, Collateral, EntityKind, Equipment, Loan, Payment};
use crate::error::StoreError;
use crate::store::DataStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Reference cannot be resolved or identity is ambiguous
    Warning,  // Value is implausible but usable
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub severity: Severity,
    pub entity: EntityKind,
    pub record_id: String,
    pub field: String,
    pub issue: String,
}

impl IntegrityIssue {
    fn critical(entity: EntityKind, record_id: &str, field: &str, issue: String) -> Self {
        IntegrityIssue {
            severity: Severity::Critical,
            entity,
            record_id: record_id.to_string(),
            field: field.to_string(),
            issue,
        }
    }

    fn warning(entity: EntityKind, record_id: &str, field: &str, issue: String) -> Self {
        IntegrityIssue {
            severity: Severity::Warning,
            ..Self::critical(entity, record_id, field, issue)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub records_scanned: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} records, {} issue(s) ({} critical)",
            self.records_scanned,
            self.issues.len(),
            self.critical_count()
        )
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.critical_count() > 0
    }
}

// ============================================================================
// CHECKS
// ============================================================================

pub fn check_integrity(store: &DataStore) -> Result<IntegrityReport, StoreError> {
    let borrowers = store.borrowers()?;
    let loans = store.loans()?;
    let payments = store.payments()?;
    let collateral = store.collateral()?;
    let equipment = store.equipment()?;

    let report = check_records(&borrowers, &loans, &payments, &collateral, &equipment);
    info!(
        records = report.records_scanned,
        issues = report.issues.len(),
        critical = report.critical_count(),
        "integrity check finished"
    );
    Ok(report)
}

/// Same checks over already-loaded records
pub fn check_records(
    borrowers: &[Borrower],
    loans: &[Loan],
    payments: &[Payment],
    collateral: &[Collateral],
    equipment: &[Equipment],
) -> IntegrityReport {
    let mut issues = Vec::new();

    let borrower_ids = unique_ids(
        EntityKind::Borrower,
        "borrower_id",
        borrowers.iter().map(|b| b.borrower_id.as_str()),
        &mut issues,
    );
    let loan_ids = unique_ids(
        EntityKind::Loan,
        "loan_id",
        loans.iter().map(|l| l.loan_id.as_str()),
        &mut issues,
    );
    unique_ids(
        EntityKind::Payment,
        "payment_id",
        payments.iter().map(|p| p.payment_id.as_str()),
        &mut issues,
    );
    unique_ids(
        EntityKind::Collateral,
        "collateral_id",
        collateral.iter().map(|c| c.collateral_id.as_str()),
        &mut issues,
    );
    unique_ids(
        EntityKind::Equipment,
        "equipment_id",
        equipment.iter().map(|e| e.equipment_id.as_str()),
        &mut issues,
    );

    for b in borrowers {
        if !(300..=850).contains(&b.credit_score) {
            issues.push(IntegrityIssue::warning(
                EntityKind::Borrower,
                &b.borrower_id,
                "credit_score",
                format!("Credit score {} outside 300-850", b.credit_score),
            ));
        }
    }

    for l in loans {
        if !borrower_ids.contains(l.borrower_id.as_str()) {
            issues.push(orphan(EntityKind::Loan, &l.loan_id, "borrower_id", &l.borrower_id));
        }
        if l.loan_amount <= 0.0 {
            issues.push(IntegrityIssue::warning(
                EntityKind::Loan,
                &l.loan_id,
                "loan_amount",
                format!("Non-positive loan amount {}", l.loan_amount),
            ));
        }
        if let (Some(start), Some(end)) = (l.start_date, l.end_date) {
            if end < start {
                issues.push(IntegrityIssue::warning(
                    EntityKind::Loan,
                    &l.loan_id,
                    "end_date",
                    format!("End date {} before start date {}", end, start),
                ));
            }
        }
    }

    for p in payments {
        if !loan_ids.contains(p.loan_id.as_str()) {
            issues.push(orphan(EntityKind::Payment, &p.payment_id, "loan_id", &p.loan_id));
        }
    }

    for c in collateral {
        if !loan_ids.contains(c.loan_id.as_str()) {
            issues.push(orphan(EntityKind::Collateral, &c.collateral_id, "loan_id", &c.loan_id));
        }
        if c.value < 0.0 {
            issues.push(IntegrityIssue::warning(
                EntityKind::Collateral,
                &c.collateral_id,
                "value",
                format!("Negative collateral value {}", c.value),
            ));
        }
    }

    for e in equipment {
        if !borrower_ids.contains(e.borrower_id.as_str()) {
            issues.push(orphan(EntityKind::Equipment, &e.equipment_id, "borrower_id", &e.borrower_id));
        }
    }

    IntegrityReport {
        records_scanned: borrowers.len() + loans.len() + payments.len() + collateral.len() + equipment.len(),
        issues,
    }
}

fn orphan(entity: EntityKind, record_id: &str, field: &str, target: &str) -> IntegrityIssue {
    IntegrityIssue::critical(
        entity,
        record_id,
        field,
        format!("{} references missing record {}", field, target),
    )
}

fn unique_ids<'a>(
    entity: EntityKind,
    field: &str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<IntegrityIssue>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(IntegrityIssue::critical(
                entity,
                id,
                field,
                format!("Duplicate {} {}", field, id),
            ));
        }
    }
    seen
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_seeded_data_is_clean() {
        let store = DataStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data"));
        let report = check_integrity(&store).unwrap();

        assert!(report.is_clean(), "{:?}", report.issues);
        assert!(report.records_scanned > 0);
    }

    #[test]
    fn test_orphans_and_duplicates_reported() {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, value: serde_json::Value| {
            fs::write(dir.path().join(name), value.to_string()).unwrap();
        };

        write(
            "borrowers.json",
            json!([{
                "borrower_id": "B001", "first_name": "A", "last_name": "B",
                "credit_score": 900, "income": 1.0, "farm_size": 1.0, "farm_type": "Crop"
            }]),
        );
        write(
            "loans.json",
            json!([
                {"loan_id": "L001", "borrower_id": "B001", "loan_amount": 10.0, "interest_rate": 1.0, "term_length": 12, "status": "Active"},
                {"loan_id": "L001", "borrower_id": "B404", "loan_amount": 10.0, "interest_rate": 1.0, "term_length": 12, "status": "Active"}
            ]),
        );
        write(
            "payments.json",
            json!([{"payment_id": "P1", "loan_id": "L404", "payment_date": "2024-01-01", "amount": 1.0, "status": "Late"}]),
        );

        let report = check_integrity(&DataStore::new(dir.path())).unwrap();

        // duplicate L001, loan -> B404, payment -> L404
        assert_eq!(report.critical_count(), 3);
        // credit score 900
        assert_eq!(report.issues.len(), 4);
        assert!(report
            .issues
            .iter()
            .any(|i| i.entity == EntityKind::Payment && i.issue.contains("L404")));
        assert_eq!(report.summary(), "Scanned 4 records, 4 issue(s) (3 critical)");
    }
}
