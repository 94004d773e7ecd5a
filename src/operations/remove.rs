use rusqlite::Connection;

use crate::db::transaction_repository;
use crate::error::{FinanceError, Result};

pub fn parse_id(input: &str) -> Result<i64> {
    let input = input.trim().trim_start_matches('#');
    if input.is_empty() {
        return Err(FinanceError::Validation("Transaction ID cannot be empty.".to_string()));
    }
    input
        .parse::<i64>()
        .map_err(|_| FinanceError::Validation(format!("Invalid transaction ID '{}'.", input)))
}

/// `Ok(false)` when nothing had that id.
pub fn remove_transaction_from_db(conn: &Connection, input: &str) -> Result<bool> {
    let id = parse_id(input)?;
    transaction_repository::delete_transaction(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::category_repository::{add_category, get_category_by_id};
    use crate::db::connection::establish_test_connection;
    use crate::models::category::CategoryKind;
    use crate::models::transaction::TransactionDraft;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(" 12 ").unwrap(), 12);
        assert_eq!(parse_id("#7").unwrap(), 7);
        assert!(parse_id("").unwrap_err().is_validation());
        assert!(parse_id("abc").unwrap_err().is_validation());
    }

    #[test]
    fn test_remove_transaction_from_db() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        let food = get_category_by_id(&conn, id).unwrap().unwrap();
        let draft = TransactionDraft::new(
            Decimal::from(3),
            "Café",
            &food,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        );
        let tx_id = transaction_repository::add_transaction(&conn, &draft).unwrap();

        assert!(remove_transaction_from_db(&conn, &tx_id.to_string()).unwrap());
        assert!(!remove_transaction_from_db(&conn, &tx_id.to_string()).unwrap());
    }
}
