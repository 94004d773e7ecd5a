use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tracing::{debug, info, warn};

use crate::db::category_repository::get_category_by_id;
use crate::error::{FinanceError, Result};
use crate::models::balance::MonthYear;
use crate::models::category::{Category, CategoryKind};
use crate::models::transaction::{Transaction, TransactionDraft};

const SELECT_JOINED: &str = "
    SELECT t.id, t.amount, t.description, t.date, c.id, c.name, c.kind
    FROM transactions t
    INNER JOIN categories c ON t.category_id = c.id";

/// History filters. Every present filter must match (AND); absent ones match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub category_name: Option<String>,
    pub month: Option<MonthYear>,
    pub kind: Option<CategoryKind>,
}

impl TransactionFilter {
    pub fn category(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.category_name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }

    pub fn month(mut self, month: MonthYear) -> Self {
        self.month = Some(month);
        self
    }

    pub fn kind(mut self, kind: CategoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category_name.is_none() && self.month.is_none() && self.kind.is_none()
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut args = Vec::new();

        if let Some(ref name) = self.category_name {
            args.push(name.clone());
            conditions.push(format!("c.name = ?{}", args.len()));
        }
        if let Some(month) = self.month {
            let (first, last) = month.date_bounds();
            args.push(first);
            args.push(last);
            conditions.push(format!("t.date BETWEEN ?{} AND ?{}", args.len() - 1, args.len()));
        }
        if let Some(kind) = self.kind {
            args.push(kind.as_db_str().to_string());
            conditions.push(format!("c.kind = ?{}", args.len()));
        }

        if conditions.is_empty() {
            (String::new(), args)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), args)
        }
    }
}

fn map_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let amount: f64 = row.get(1)?;
    let description: Option<String> = row.get(2)?;

    Ok(Transaction {
        id: row.get(0)?,
        amount: decimal_from_real(amount)
            .ok_or_else(|| rusqlite::Error::FromSqlConversionFailure(1, Type::Real, "amount is not finite".into()))?,
        description: description.unwrap_or_default(),
        date: row.get(3)?,
        category: Category {
            id: row.get(4)?,
            name: row.get(5)?,
            kind: row.get(6)?,
        },
    })
}

pub(crate) fn decimal_from_real(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(2))
}

fn real_from_decimal(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| FinanceError::Validation(format!("Amount {} is out of range", value)))
}

fn ensure_category(conn: &Connection, category_id: i64) -> Result<()> {
    if get_category_by_id(conn, category_id)?.is_none() {
        return Err(FinanceError::Validation(format!(
            "Category with ID {} does not exist",
            category_id
        )));
    }
    Ok(())
}

fn insert_draft(conn: &Connection, draft: &TransactionDraft) -> Result<i64> {
    ensure_category(conn, draft.category_id())?;
    conn.execute(
        "INSERT INTO transactions (amount, description, category_id, date) VALUES (?1, ?2, ?3, ?4)",
        params![
            real_from_decimal(draft.amount())?,
            draft.description(),
            draft.category_id(),
            draft.date(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a transaction. The draft already carries the sign of its category's kind.
pub fn add_transaction(conn: &Connection, draft: &TransactionDraft) -> Result<i64> {
    let id = insert_draft(conn, draft)?;
    debug!("Added transaction {} in category {}", id, draft.category_id());
    Ok(id)
}

/// Inserts every draft or none of them.
pub fn add_transactions(conn: &Connection, drafts: &[TransactionDraft]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for draft in drafts {
        insert_draft(&tx, draft)?;
    }
    tx.commit()?;
    info!("Inserted {} transactions in one batch", drafts.len());
    Ok(drafts.len())
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let sql = format!("{} WHERE t.id = ?1", SELECT_JOINED);
    let transaction = conn.query_row(&sql, [id], map_transaction).optional()?;
    Ok(transaction)
}

/// Returns `Ok(false)` when no transaction has this id.
pub fn update_transaction(conn: &Connection, id: i64, draft: &TransactionDraft) -> Result<bool> {
    ensure_category(conn, draft.category_id())?;
    let rows_affected = conn.execute(
        "UPDATE transactions SET amount = ?1, description = ?2, category_id = ?3, date = ?4 WHERE id = ?5",
        params![
            real_from_decimal(draft.amount())?,
            draft.description(),
            draft.category_id(),
            draft.date(),
            id,
        ],
    )?;
    Ok(rows_affected > 0)
}

/// Returns `Ok(false)` when no transaction has this id.
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let rows_affected = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if rows_affected == 0 {
        warn!("Transaction {} not found for deletion", id);
        return Ok(false);
    }
    debug!("Deleted transaction {}", id);
    Ok(true)
}

/// Transactions joined with their category, newest first.
pub fn query_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let (where_clause, args) = filter.where_clause();
    let sql = format!("{}{} ORDER BY t.date DESC, t.id DESC", SELECT_JOINED, where_clause);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), map_transaction)?;

    let mut transactions = Vec::new();
    for transaction in rows {
        transactions.push(transaction?);
    }
    Ok(transactions)
}
