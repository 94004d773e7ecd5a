use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::transaction_repository::decimal_from_real;
use crate::error::{FinanceError, Result};
use crate::models::balance::{MonthYear, MonthlyBalance};

fn to_decimal(total: f64) -> Result<Decimal> {
    decimal_from_real(total)
        .ok_or_else(|| FinanceError::Validation(format!("Balance {} cannot be represented", total)))
}

/// Sum of every transaction amount; zero when there are none.
pub fn total_balance(conn: &Connection) -> Result<Decimal> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM transactions",
        [],
        |row| row.get(0),
    )?;
    to_decimal(total)
}

pub fn monthly_balance(conn: &Connection, month: MonthYear) -> Result<Decimal> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM transactions WHERE date BETWEEN ?1 AND ?2",
        month.date_bounds(),
        |row| row.get(0),
    )?;
    to_decimal(total)
}

/// Months that have at least one transaction, newest first.
pub fn months_with_transactions(conn: &Connection) -> Result<Vec<MonthYear>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT strftime('%Y-%m', date) AS month
         FROM transactions
         WHERE strftime('%Y-%m', date) IS NOT NULL
         ORDER BY month DESC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut months = Vec::new();
    for month in rows {
        months.push(month?.parse::<MonthYear>()?);
    }
    Ok(months)
}

/// Balance of the `count` months ending at the month of `today`, newest first.
/// Months without activity report zero.
pub fn recent_monthly_balances(conn: &Connection, today: NaiveDate, count: usize) -> Result<Vec<MonthlyBalance>> {
    let mut month = MonthYear::from_date(today);
    let mut balances = Vec::with_capacity(count);
    for _ in 0..count {
        balances.push(MonthlyBalance {
            month,
            balance: monthly_balance(conn, month)?,
        });
        month = month.previous();
    }
    Ok(balances)
}
