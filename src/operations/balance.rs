use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::balance_repository;
use crate::error::Result;
use crate::models::balance::MonthlyBalance;

/// Numbers shown on the main screen.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSummary {
    pub total: Decimal,
    pub recent: Vec<MonthlyBalance>,
}

pub fn balance_summary(conn: &Connection, today: NaiveDate, months: usize) -> Result<BalanceSummary> {
    Ok(BalanceSummary {
        total: balance_repository::total_balance(conn)?,
        recent: balance_repository::recent_monthly_balances(conn, today, months)?,
    })
}

pub fn format_money(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    let cents = amount.abs().round_dp(2);
    let text = format!("{:.2}", cents);
    let (whole, frac) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}$ {}.{}", sign, grouped, frac)
}

pub fn render_summary(summary: &BalanceSummary) -> Vec<String> {
    let mut lines = vec![format!("Saldo: {}", format_money(summary.total))];
    for balance in &summary.recent {
        lines.push(format!(
            "  {:<16} {:>16}",
            balance.month.display_name(),
            format_money(balance.balance)
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::category_repository::{add_category, get_category_by_id};
    use crate::db::connection::establish_test_connection;
    use crate::db::transaction_repository::add_transaction;
    use crate::models::category::CategoryKind;
    use crate::models::transaction::TransactionDraft;
    use std::str::FromStr;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::ZERO), "$ 0.00");
        assert_eq!(format_money(Decimal::from_str("1234567.5").unwrap()), "$ 1,234,567.50");
        assert_eq!(format_money(Decimal::from(-50)), "-$ 50.00");
        assert_eq!(format_money(Decimal::from_str("999.999").unwrap()), "$ 1,000.00");
    }

    #[test]
    fn test_balance_summary() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        let food = get_category_by_id(&conn, id).unwrap().unwrap();
        let march = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        add_transaction(&conn, &TransactionDraft::new(Decimal::from(50), "", &food, march)).unwrap();

        let summary = balance_summary(&conn, march, 2).unwrap();
        assert_eq!(summary.total, Decimal::from(-50));
        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.recent[0].balance, Decimal::from(-50));
        assert_eq!(summary.recent[1].balance, Decimal::ZERO);

        let lines = render_summary(&summary);
        assert_eq!(lines[0], "Saldo: -$ 50.00");
        assert!(lines[1].contains("Marzo 2024"));
        assert!(lines[2].contains("Febrero 2024"));
    }
}
