use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::category::{Category, CategoryKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A stored transaction joined with the category it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal,
    pub description: String,
    pub category: Category,
    pub date: NaiveDate,
}

impl Transaction {
    /// Always the kind of the owning category.
    pub fn kind(&self) -> CategoryKind {
        self.category.kind
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<5} {}  {:>12}  {:<24}  {}",
            self.id,
            self.date.format(DATE_FORMAT),
            self.amount,
            self.category.to_string(),
            self.description
        )
    }
}

/// Values written by the add and update operations.
///
/// Only constructible through [`TransactionDraft::new`], which applies
/// [`normalize_amount`] against the category's kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    amount: Decimal,
    description: String,
    category_id: i64,
    date: NaiveDate,
}

impl TransactionDraft {
    pub fn new(amount: Decimal, description: impl Into<String>, category: &Category, date: NaiveDate) -> Self {
        Self {
            amount: normalize_amount(amount, category.kind),
            description: description.into().trim().to_string(),
            category_id: category.id,
            date,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Negative for expenses, positive for incomes, rounded to cents.
pub fn normalize_amount(amount: Decimal, kind: CategoryKind) -> Decimal {
    let magnitude = amount.abs().round_dp(2);
    if magnitude.is_zero() {
        return Decimal::ZERO;
    }
    match kind {
        CategoryKind::Expense => -magnitude,
        CategoryKind::Income => magnitude,
    }
}
