use rusqlite::Connection;

use crate::db::{category_repository, transaction_repository};
use crate::error::{FinanceError, Result};
use crate::models::transaction::{Transaction, TransactionDraft};
use crate::operations::add::{parse_amount, parse_date, parse_description};
use crate::operations::remove::parse_id;

pub fn load_transaction(conn: &Connection, id_input: &str) -> Result<Transaction> {
    let id = parse_id(id_input)?;
    transaction_repository::get_transaction(conn, id)?.ok_or_else(|| FinanceError::transaction_not_found(id))
}

/// Parses "amount, category label, date, description" against `current`.
///
/// Blank fields keep the current value. The category is given by its label, e.g.
/// "Sueldo (Ingreso)", so an edit can move a transaction to the other kind; the
/// amount sign follows the resulting category either way.
pub fn build_edit(conn: &Connection, current: &Transaction, input: &str) -> Result<TransactionDraft> {
    let parts: Vec<&str> = input.splitn(4, ',').map(|s| s.trim()).collect();
    let field = |i: usize| parts.get(i).copied().unwrap_or("");

    let amount = match field(0) {
        "" => current.amount,
        raw => parse_amount(raw)?,
    };

    let category = match field(1) {
        "" => current.category.clone(),
        label => category_repository::find_category_by_display(conn, label)?
            .ok_or_else(|| FinanceError::Validation(format!("Category '{}' does not exist", label)))?,
    };

    let date = parse_date(field(2), current.date)?;

    let description = match field(3) {
        "" => current.description.clone(),
        raw => parse_description(raw)?,
    };

    Ok(TransactionDraft::new(amount, description, &category, date))
}

pub fn edit_transaction_in_db(conn: &Connection, id_input: &str, input: &str) -> Result<Transaction> {
    let current = load_transaction(conn, id_input)?;
    let draft = build_edit(conn, &current, input)?;

    if !transaction_repository::update_transaction(conn, current.id, &draft)? {
        return Err(FinanceError::transaction_not_found(current.id));
    }
    transaction_repository::get_transaction(conn, current.id)?
        .ok_or_else(|| FinanceError::transaction_not_found(current.id))
}
