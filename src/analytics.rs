// 📊 Analytics - payment patterns and portfolio summary
//
// Pure computations. `as_of` is passed explicitly so windows are
// reproducible in tests; the API layer supplies today's date.

use crate::entities::{Borrower, Loan, LoanStatus, Payment};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// ============================================================================
// ANALYSIS PERIOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisPeriod {
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    ThreeYears,
}

impl AnalysisPeriod {
    pub const SCHEMA_VALUES: [&'static str; 4] = ["6m", "1y", "2y", "3y"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "6m" => Some(AnalysisPeriod::SixMonths),
            "1y" => Some(AnalysisPeriod::OneYear),
            "2y" => Some(AnalysisPeriod::TwoYears),
            "3y" => Some(AnalysisPeriod::ThreeYears),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPeriod::SixMonths => "6m",
            AnalysisPeriod::OneYear => "1y",
            AnalysisPeriod::TwoYears => "2y",
            AnalysisPeriod::ThreeYears => "3y",
        }
    }

    fn months(&self) -> u32 {
        match self {
            AnalysisPeriod::SixMonths => 6,
            AnalysisPeriod::OneYear => 12,
            AnalysisPeriod::TwoYears => 24,
            AnalysisPeriod::ThreeYears => 36,
        }
    }

    /// First day included in the window ending at `as_of`
    pub fn window_start(&self, as_of: NaiveDate) -> NaiveDate {
        as_of
            .checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN)
    }
}

// ============================================================================
// PAYMENT PATTERNS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPatterns {
    pub borrower_id: String,
    pub borrower_name: String,
    pub period: String,
    pub total_payments_analyzed: usize,
    pub patterns: Vec<String>,
    pub late_percentage: f64,
    pub seasonality_score: f64,
    pub consistency_score: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn payment_patterns(
    borrower: &Borrower,
    loans: &[Loan],
    payments: &[Payment],
    period: AnalysisPeriod,
    as_of: NaiveDate,
) -> PaymentPatterns {
    let loan_ids: Vec<&str> = loans
        .iter()
        .filter(|l| l.borrower_id == borrower.borrower_id)
        .map(|l| l.loan_id.as_str())
        .collect();

    let mut result = PaymentPatterns {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        period: period.as_str().to_string(),
        total_payments_analyzed: 0,
        patterns: Vec::new(),
        late_percentage: 0.0,
        seasonality_score: 0.0,
        consistency_score: 0.0,
    };

    if loan_ids.is_empty() {
        result.patterns.push("No loans found for this borrower".to_string());
        return result;
    }

    let start = period.window_start(as_of);
    let window: Vec<&Payment> = payments
        .iter()
        .filter(|p| loan_ids.contains(&p.loan_id.as_str()))
        .filter(|p| p.payment_date >= start && p.payment_date <= as_of)
        .collect();

    // month index (0-11) -> (payments, late)
    let mut by_month: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for payment in &window {
        let entry = by_month.entry(payment.payment_date.month0()).or_default();
        entry.0 += 1;
        if payment.is_late() {
            entry.1 += 1;
        }
    }

    let mut counts: Vec<(u32, usize)> = by_month.iter().map(|(m, (n, _))| (*m, *n)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let busy: Vec<&str> = counts
        .iter()
        .take(3)
        .filter(|(_, n)| *n > 1)
        .map(|(m, _)| MONTH_NAMES[*m as usize])
        .collect();
    if !busy.is_empty() {
        result
            .patterns
            .push(format!("Higher payment activity in: {}", busy.join(", ")));
    }

    let problem: Vec<&str> = by_month
        .iter()
        .filter(|(_, (n, late))| *n >= 2 && (*late as f64 / *n as f64) > 0.5)
        .map(|(m, _)| MONTH_NAMES[*m as usize])
        .collect();
    if !problem.is_empty() {
        result
            .patterns
            .push(format!("More payment issues observed in: {}", problem.join(", ")));
    }

    let total = window.len();
    let on_time = window.iter().filter(|p| p.is_on_time()).count();
    let late = window.iter().filter(|p| p.is_late()).count();

    if total > 0 {
        let late_pct = late as f64 / total as f64 * 100.0;
        if late == 0 {
            result.patterns.push("All payments made on time".to_string());
        } else {
            result.patterns.push(format!(
                "{}% of payments were late ({} of {})",
                late_pct.round(),
                late,
                total
            ));
        }
        result.late_percentage = round2(late_pct);
        result.consistency_score = round2(on_time as f64 / total as f64);
    } else {
        result
            .patterns
            .push(format!("No payments recorded in the last {}", period.as_str()));
    }

    if counts.len() >= 3 {
        let top3: usize = counts.iter().take(3).map(|(_, n)| n).sum();
        result.seasonality_score = round2(top3 as f64 / total as f64);
    }

    result.total_payments_analyzed = total;
    result
}

// ============================================================================
// LOAN SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub total_loans: usize,
    pub active_loans: usize,
    pub total_amount: f64,
    /// Percentage of loans with at least one late payment
    pub delinquency_rate: f64,
}

pub fn loan_summary(loans: &[Loan], payments: &[Payment]) -> LoanSummary {
    let total_loans = loans.len();
    let active_loans = loans.iter().filter(|l| l.status == LoanStatus::Active).count();
    let total_amount = loans.iter().map(|l| l.loan_amount).sum();

    let delinquent = loans
        .iter()
        .filter(|l| payments.iter().any(|p| p.loan_id == l.loan_id && p.is_late()))
        .count();

    let delinquency_rate = if total_loans > 0 {
        round2(delinquent as f64 / total_loans as f64 * 100.0)
    } else {
        0.0
    };

    LoanSummary {
        total_loans,
        active_loans,
        total_amount,
        delinquency_rate,
    }
}

// ============================================================================
// TESTS
// ============================================================================
