use rusqlite::Connection;

use crate::db::transaction_repository::{self, TransactionFilter};
use crate::error::{FinanceError, Result};
use crate::models::balance::MonthYear;
use crate::models::category::CategoryKind;
use crate::models::transaction::Transaction;

/// Parses "category=Comida, month=2024-03, kind=gasto". Any key may be left out;
/// empty input matches everything.
pub fn parse_filter(input: &str) -> Result<TransactionFilter> {
    let mut filter = TransactionFilter::default();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| {
            FinanceError::Validation(format!("Invalid filter '{}'. Use key=value.", part))
        })?;
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "category" | "categoria" => filter = filter.category(value),
            "month" | "mes" => filter = filter.month(value.parse::<MonthYear>()?),
            "kind" | "type" | "tipo" => filter = filter.kind(value.parse::<CategoryKind>()?),
            other => {
                return Err(FinanceError::Validation(format!(
                    "Unknown filter '{}'. Use category, month or kind.",
                    other
                )));
            }
        }
    }

    Ok(filter)
}

pub fn search_transactions_db(conn: &Connection, input: &str) -> Result<Vec<Transaction>> {
    let filter = parse_filter(input)?;
    transaction_repository::query_transactions(conn, &filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_all_keys() {
        let filter = parse_filter("category=Casa nueva, month=2024-03, kind=ingreso").unwrap();
        assert_eq!(filter.category_name.as_deref(), Some("Casa nueva"));
        assert_eq!(filter.month, Some("2024-03".parse().unwrap()));
        assert_eq!(filter.kind, Some(CategoryKind::Income));
    }

    #[test]
    fn test_parse_filter_empty() {
        assert!(parse_filter("").unwrap().is_empty());
        assert!(parse_filter(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(parse_filter("Comida").unwrap_err().is_validation());
        assert!(parse_filter("month=marzo").unwrap_err().is_validation());
        assert!(parse_filter("kind=transfer").unwrap_err().is_validation());
        assert!(parse_filter("amount=5").unwrap_err().is_validation());
    }
}
