// 💡 Loan Advisory - refinancing and restructuring options
//
// Pure functions over one loan and its payments. Payments use the standard
// amortization formula; balances are estimated from elapsed months, not
// from posted payments.
//
// Every rate is an annual percentage, every term a count of months.

use crate::entities::{Borrower, Loan, Payment};
use crate::risk::round_to;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Refinanced and restructured rates never drop below this
pub const RATE_FLOOR: f64 = 3.0;

// ============================================================================
// AMORTIZATION
// ============================================================================

/// Level monthly payment that retires `principal` over `months`
pub fn monthly_payment(principal: f64, annual_rate: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let r = annual_rate / 100.0 / 12.0;
    if r == 0.0 {
        return principal / f64::from(months);
    }
    let growth = (1.0 + r).powi(months as i32);
    principal * r * growth / (growth - 1.0)
}

/// Outstanding principal after `elapsed` of `term` scheduled payments
pub fn remaining_balance(principal: f64, annual_rate: f64, term: u32, elapsed: u32) -> f64 {
    if elapsed == 0 {
        return principal;
    }
    if elapsed >= term {
        return 0.0;
    }
    let r = annual_rate / 100.0 / 12.0;
    if r == 0.0 {
        return principal * f64::from(term - elapsed) / f64::from(term);
    }
    let full = (1.0 + r).powi(term as i32);
    let done = (1.0 + r).powi(elapsed as i32);
    principal * (full - done) / (full - 1.0)
}

/// Whole calendar months from `start` to `today`; 0 when the loan has not started
pub fn elapsed_months(start: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(start) = start else {
        return 0;
    };
    let months = (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    u32::try_from(months).unwrap_or(0)
}

// ============================================================================
// REFINANCING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "option_id")]
pub enum RefinanceOption {
    #[serde(rename = "REFI-1")]
    LowerRate {
        description: String,
        new_rate: f64,
        new_term: u32,
        monthly_payment: f64,
        monthly_savings: f64,
        total_interest_savings: f64,
    },
    #[serde(rename = "REFI-2")]
    ShorterTerm {
        description: String,
        new_rate: f64,
        new_term: u32,
        monthly_payment: f64,
        /// Positive when the new payment is higher
        monthly_difference: f64,
        total_interest_savings: f64,
    },
    #[serde(rename = "REFI-3")]
    CashOut {
        description: String,
        new_loan_amount: f64,
        additional_funds: f64,
        new_rate: f64,
        new_term: u32,
        monthly_payment: f64,
        monthly_payment_increase: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceOptions {
    pub loan_id: String,
    pub current_rate: f64,
    pub current_term_remaining: u32,
    pub current_balance: f64,
    pub refinancing_recommended: bool,
    pub options: Vec<RefinanceOption>,
}

/// Refinancing options for one loan.
///
/// The remaining term is estimated as 70% of the original, never under two
/// years. Cash-out needs a loan above 50,000 with no late payments.
pub fn refinance_options(loan: &Loan, payments: &[Payment]) -> RefinanceOptions {
    let rate = loan.interest_rate;
    let principal = loan.loan_amount;
    let remaining = ((f64::from(loan.term_length) * 0.7).floor() as u32).max(24);
    let payment_before = monthly_payment(principal, rate, loan.term_length);

    let mut options = Vec::new();

    if rate > RATE_FLOOR {
        let new_rate = (rate - 0.75).max(RATE_FLOOR);
        let after = monthly_payment(principal, new_rate, remaining);
        let savings = payment_before - after;
        options.push(RefinanceOption::LowerRate {
            description: "Lower rate refinance".to_string(),
            new_rate,
            new_term: remaining,
            monthly_payment: round_to(after, 2),
            monthly_savings: round_to(savings, 2),
            total_interest_savings: round_to(savings * f64::from(remaining), 2),
        });
    }

    if remaining > 36 {
        let new_term = (f64::from(remaining) * 0.8).floor() as u32;
        let new_rate = (rate - 0.25).max(RATE_FLOOR);
        let after = monthly_payment(principal, new_rate, new_term);
        let interest_before = payment_before * f64::from(remaining) - principal;
        let interest_after = after * f64::from(new_term) - principal;
        options.push(RefinanceOption::ShorterTerm {
            description: "Shorter term refinance".to_string(),
            new_rate,
            new_term,
            monthly_payment: round_to(after, 2),
            monthly_difference: round_to(after - payment_before, 2),
            total_interest_savings: round_to(interest_before - interest_after, 2),
        });
    }

    let late = payments
        .iter()
        .filter(|p| p.loan_id == loan.loan_id && p.is_late())
        .count();
    if principal > 50000.0 && late == 0 {
        let additional = principal * 0.2;
        let new_amount = principal + additional;
        let new_rate = rate + 0.25;
        let after = monthly_payment(new_amount, new_rate, remaining);
        options.push(RefinanceOption::CashOut {
            description: "Cash-out refinance for farm improvements".to_string(),
            new_loan_amount: round_to(new_amount, 2),
            additional_funds: round_to(additional, 2),
            new_rate,
            new_term: remaining,
            monthly_payment: round_to(after, 2),
            monthly_payment_increase: round_to(after - payment_before, 2),
        });
    }

    RefinanceOptions {
        loan_id: loan.loan_id.clone(),
        current_rate: rate,
        current_term_remaining: remaining,
        current_balance: principal,
        refinancing_recommended: !options.is_empty(),
        options,
    }
}

// ============================================================================
// RESTRUCTURING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestructuringGoal {
    #[default]
    LowerPayments,
    ShorterTerm,
    ReduceInterest,
    ImproveCashFlow,
}

impl RestructuringGoal {
    pub const SCHEMA_VALUES: [&'static str; 4] =
        ["lower_payments", "shorter_term", "reduce_interest", "improve_cash_flow"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "lower_payments" => Some(RestructuringGoal::LowerPayments),
            "shorter_term" => Some(RestructuringGoal::ShorterTerm),
            "reduce_interest" => Some(RestructuringGoal::ReduceInterest),
            "improve_cash_flow" => Some(RestructuringGoal::ImproveCashFlow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestructuringGoal::LowerPayments => "lower_payments",
            RestructuringGoal::ShorterTerm => "shorter_term",
            RestructuringGoal::ReduceInterest => "reduce_interest",
            RestructuringGoal::ImproveCashFlow => "improve_cash_flow",
        }
    }

    /// New term for the combined option, starting from `remaining` months
    fn adjust_term(&self, remaining: u32) -> u32 {
        let tenth = (f64::from(remaining) * 0.1).round() as u32;
        let fifth = (f64::from(remaining) * 0.2).round() as u32;
        match self {
            RestructuringGoal::LowerPayments => remaining + tenth.min(12),
            RestructuringGoal::ReduceInterest => remaining.saturating_sub(tenth.min(12)).max(12),
            RestructuringGoal::ShorterTerm => remaining.saturating_sub(fifth.min(24)).max(12),
            RestructuringGoal::ImproveCashFlow => remaining,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPerformance {
    Good,
    Fair,
    Poor,
}

impl PaymentPerformance {
    /// Poor when more than a quarter of payments were late
    pub fn from_counts(late: usize, total: usize) -> Self {
        if late == 0 || total == 0 {
            PaymentPerformance::Good
        } else if late as f64 / total as f64 > 0.25 {
            PaymentPerformance::Poor
        } else {
            PaymentPerformance::Fair
        }
    }

    /// Rate cut the borrower qualifies for
    fn rate_reduction(&self, credit_score: u32) -> f64 {
        match self {
            PaymentPerformance::Good if credit_score >= 700 => 0.75,
            PaymentPerformance::Fair if credit_score >= 650 => 0.5,
            _ if credit_score >= 600 => 0.25,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "option_id")]
pub enum RestructuringOption {
    #[serde(rename = "RESTRUCTURE-1")]
    RateReduction {
        description: String,
        current_rate: f64,
        new_rate: f64,
        rate_reduction: f64,
        term_months: u32,
        current_payment: f64,
        new_payment: f64,
        monthly_savings: f64,
        total_savings: f64,
        closing_costs: f64,
        /// None when the new payment saves nothing
        break_even_months: Option<u32>,
    },
    #[serde(rename = "RESTRUCTURE-2")]
    TermExtension {
        description: String,
        current_rate: f64,
        new_rate: f64,
        current_term_remaining: u32,
        extension_months: u32,
        new_term: u32,
        current_payment: f64,
        new_payment: f64,
        monthly_payment_reduction: f64,
        payment_reduction_percent: f64,
        additional_interest_cost: f64,
        closing_costs: f64,
    },
    #[serde(rename = "RESTRUCTURE-3")]
    Optimized {
        description: String,
        optimization_goal: String,
        current_rate: f64,
        new_rate: f64,
        rate_reduction: f64,
        current_term_remaining: u32,
        new_term: u32,
        term_change_months: i64,
        current_payment: f64,
        new_payment: f64,
        monthly_impact: f64,
        total_cost_savings: f64,
        closing_costs: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestructuringPlan {
    pub loan_id: String,
    pub borrower_id: String,
    pub borrower_name: String,
    pub loan_type: String,
    pub original_amount: f64,
    pub current_balance: f64,
    pub current_rate: f64,
    pub remaining_term_months: u32,
    pub payment_performance: PaymentPerformance,
    pub restructuring_options: Vec<RestructuringOption>,
    pub recommendations: Vec<String>,
    pub optimization_goal: String,
}

/// Restructuring options for a loan as of `today`.
///
/// A loan past its term has nothing left to restructure and gets no options.
pub fn restructuring_options(
    loan: &Loan,
    borrower: &Borrower,
    payments: &[Payment],
    goal: RestructuringGoal,
    today: NaiveDate,
) -> RestructuringPlan {
    let loan_payments: Vec<&Payment> = payments.iter().filter(|p| p.loan_id == loan.loan_id).collect();
    let late = loan_payments.iter().filter(|p| p.is_late()).count();
    let performance = PaymentPerformance::from_counts(late, loan_payments.len());

    let rate = loan.interest_rate;
    let term = loan.term_length;
    let elapsed = elapsed_months(loan.start_date, today);
    let remaining = term.saturating_sub(elapsed);
    let payment = monthly_payment(loan.loan_amount, rate, term);
    let balance = remaining_balance(loan.loan_amount, rate, term, elapsed);

    let reduction = performance.rate_reduction(borrower.credit_score);
    let reduced_rate = (rate - reduction).max(RATE_FLOOR);
    let mut options = Vec::new();

    if reduction > 0.0 && remaining > 0 {
        let new_payment = monthly_payment(balance, reduced_rate, remaining);
        let savings = payment - new_payment;
        let closing = balance * 0.01;
        options.push(RestructuringOption::RateReduction {
            description: "Rate reduction".to_string(),
            current_rate: rate,
            new_rate: reduced_rate,
            rate_reduction: reduction,
            term_months: remaining,
            current_payment: round_to(payment, 2),
            new_payment: round_to(new_payment, 2),
            monthly_savings: round_to(savings, 2),
            total_savings: round_to(savings * f64::from(remaining), 2),
            closing_costs: closing.round(),
            break_even_months: (savings > 0.0).then(|| (closing / savings).ceil() as u32),
        });
    }

    if remaining >= 24 {
        let extension = (f64::from(remaining) * 0.25 / 12.0).round() as u32 * 12;
        let new_term = remaining + extension;
        let new_payment = monthly_payment(balance, rate, new_term);
        let savings = payment - new_payment;
        let additional_interest = new_payment * f64::from(new_term) - payment * f64::from(remaining);
        options.push(RestructuringOption::TermExtension {
            description: "Term extension".to_string(),
            current_rate: rate,
            new_rate: rate,
            current_term_remaining: remaining,
            extension_months: extension,
            new_term,
            current_payment: round_to(payment, 2),
            new_payment: round_to(new_payment, 2),
            monthly_payment_reduction: round_to(savings, 2),
            payment_reduction_percent: round_to(savings / payment * 100.0, 1),
            additional_interest_cost: round_to(additional_interest, 2),
            closing_costs: (balance * 0.005).round(),
        });
    }

    if reduction > 0.0 && remaining >= 24 {
        let new_term = goal.adjust_term(remaining);
        let new_payment = monthly_payment(balance, reduced_rate, new_term);
        let savings = payment * f64::from(remaining) - new_payment * f64::from(new_term);
        options.push(RestructuringOption::Optimized {
            description: "Optimized restructuring".to_string(),
            optimization_goal: goal.as_str().to_string(),
            current_rate: rate,
            new_rate: reduced_rate,
            rate_reduction: reduction,
            current_term_remaining: remaining,
            new_term,
            term_change_months: i64::from(new_term) - i64::from(remaining),
            current_payment: round_to(payment, 2),
            new_payment: round_to(new_payment, 2),
            monthly_impact: round_to(payment - new_payment, 2),
            total_cost_savings: round_to(savings, 2),
            closing_costs: (balance * 0.015).round(),
        });
    }

    let mut recommendations = Vec::new();
    if performance == PaymentPerformance::Poor {
        recommendations.push("Focus on payment history improvement before refinancing for better terms.".to_string());
    } else if !options.is_empty() {
        let pick = match goal {
            RestructuringGoal::LowerPayments => {
                Some("Option 2 (Term Extension) provides the largest monthly payment reduction.")
            }
            RestructuringGoal::ReduceInterest => {
                Some("Option 1 (Rate Reduction) offers the best interest savings over the loan term.")
            }
            RestructuringGoal::ShorterTerm => Some(
                "Option 3 with shorter term will increase monthly payments but reduce overall interest cost.",
            ),
            RestructuringGoal::ImproveCashFlow => None,
        };
        recommendations.extend(pick.map(str::to_string));
    }

    if borrower.credit_score < 650 {
        recommendations
            .push("Consider credit improvement strategies to qualify for better rates in the future.".to_string());
    } else if borrower.credit_score >= 750 {
        recommendations.push(
            "Excellent credit profile may qualify for additional rate discounts or premium products.".to_string(),
        );
    }

    RestructuringPlan {
        loan_id: loan.loan_id.clone(),
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        loan_type: loan.loan_type.clone(),
        original_amount: loan.loan_amount,
        current_balance: round_to(balance, 2),
        current_rate: rate,
        remaining_term_months: remaining,
        payment_performance: performance,
        restructuring_options: options,
        recommendations,
        optimization_goal: goal.as_str().to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
