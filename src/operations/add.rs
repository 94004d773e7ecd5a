use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::db::{category_repository, transaction_repository};
use crate::error::{FinanceError, Result};
use crate::models::category::{Category, CategoryKind, DEFAULT_CATEGORY_NAME};
use crate::models::transaction::{DATE_FORMAT, TransactionDraft};
use crate::preferences::{PreferenceStore, Preferences};

const MAX_DESCRIPTION_LEN: usize = 255;

pub fn parse_amount(input: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| {
        FinanceError::Validation(format!(
            "Invalid amount '{}'. Please provide a valid decimal number.",
            input.trim()
        ))
    })?;
    // Cents, as stored; 0.004 would otherwise be saved as an unsigned 0.
    let amount = amount.round_dp(2);
    if amount.is_zero() {
        return Err(FinanceError::Validation("Amount must be at least 0.01".to_string()));
    }
    Ok(amount)
}

/// Empty input means `today`.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(today);
    }
    parse_iso_date(input)
}

/// Strict "YYYY-MM-DD" with a four-digit year, the only shape the month queries understand.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    let invalid = || FinanceError::Validation(format!("Invalid date '{}'. Please use YYYY-MM-DD.", input));
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| invalid())?;
    if !(1..=9999).contains(&date.year()) {
        return Err(invalid());
    }
    Ok(date)
}

pub fn parse_description(input: &str) -> Result<String> {
    let description = input.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(FinanceError::Validation("Description too long".to_string()));
    }
    Ok(description.to_string())
}

/// Category pre-selected on the add screen: the last one used for `kind` when it still
/// exists, otherwise "Otros".
pub fn default_category(conn: &Connection, preferences: &Preferences, kind: CategoryKind) -> Result<Category> {
    if let Some(id) = preferences.last_category_id(kind) {
        match category_repository::get_category_by_id(conn, id)? {
            Some(category) if category.kind == kind => return Ok(category),
            _ => debug!("Ignoring stale last-used category {}", id),
        }
    }

    category_repository::get_category(conn, DEFAULT_CATEGORY_NAME, kind)?.ok_or_else(|| {
        FinanceError::Validation(format!(
            "No category available for {}. Create one first.",
            kind
        ))
    })
}

/// Parses "type, amount, category, date, description".
///
/// `category` is a name within `type`; empty picks [`default_category`]. Empty `date`
/// means today. The description takes the rest of the line and may contain commas.
pub fn create_transaction(
    conn: &Connection,
    preferences: &Preferences,
    input: &str,
    today: NaiveDate,
) -> Result<(TransactionDraft, Category)> {
    let parts: Vec<&str> = input.splitn(5, ',').map(|s| s.trim()).collect();
    if parts.len() < 2 {
        return Err(FinanceError::Validation(format!(
            "Invalid number of details provided. Expected at least type and amount but got {}",
            parts.len()
        )));
    }

    let kind = CategoryKind::from_str(parts[0])?;
    let amount = parse_amount(parts[1])?;

    let category_name = parts.get(2).copied().unwrap_or("");
    let category = if category_name.is_empty() {
        default_category(conn, preferences, kind)?
    } else {
        category_repository::get_category(conn, category_name, kind)?.ok_or_else(|| {
            FinanceError::Validation(format!("Category '{}' ({}) does not exist", category_name, kind))
        })?
    };

    let date = parse_date(parts.get(3).copied().unwrap_or(""), today)?;
    let description = parse_description(parts.get(4).copied().unwrap_or(""))?;

    Ok((TransactionDraft::new(amount, description, &category, date), category))
}

/// Stores the transaction and remembers its category for the next add.
///
/// An unreadable or unwritable preferences file only costs the category
/// pre-selection; it never fails the add.
pub fn add_transaction_to_db(
    conn: &Connection,
    preferences: &PreferenceStore,
    input: &str,
    today: NaiveDate,
) -> Result<i64> {
    let last_used = preferences.load().unwrap_or_else(|e| {
        warn!("Ignoring preferences at {}: {}", preferences.path().display(), e);
        Preferences::default()
    });
    let (draft, category) = create_transaction(conn, &last_used, input, today)?;
    let id = transaction_repository::add_transaction(conn, &draft)?;
    if let Err(e) = preferences.remember_category(category.kind, category.id) {
        warn!("Could not remember category {} for {}: {}", category.id, category.kind, e);
    }
    Ok(id)
}
