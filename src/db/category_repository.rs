use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{FinanceError, Result, is_constraint_violation};
use crate::models::category::{Category, CategoryKind, DEFAULT_CATEGORY_NAME, parse_display_label};

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
    })
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FinanceError::Validation("Category name cannot be empty".to_string()));
    }
    Ok(name)
}

fn conflict_or(err: rusqlite::Error, name: &str, kind: CategoryKind) -> FinanceError {
    if is_constraint_violation(&err) {
        FinanceError::Conflict {
            name: name.to_string(),
            kind,
        }
    } else {
        FinanceError::Database(err)
    }
}

pub fn add_category(conn: &Connection, name: &str, kind: CategoryKind) -> Result<i64> {
    let name = validate_name(name)?;
    conn.execute(
        "INSERT INTO categories (name, kind) VALUES (?1, ?2)",
        params![name, kind],
    )
    .map_err(|e| conflict_or(e, name, kind))?;

    let id = conn.last_insert_rowid();
    debug!("Added category {} '{}' ({})", id, name, kind.as_db_str());
    Ok(id)
}

pub fn get_category(conn: &Connection, name: &str, kind: CategoryKind) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, kind FROM categories WHERE name = ?1 AND kind = ?2",
            params![name, kind],
            map_category,
        )
        .optional()?;
    Ok(category)
}

pub fn get_category_by_id(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, kind FROM categories WHERE id = ?1",
            [id],
            map_category,
        )
        .optional()?;
    Ok(category)
}

/// Resolves a label such as "Comida (Gasto)" to its category.
pub fn find_category_by_display(conn: &Connection, label: &str) -> Result<Option<Category>> {
    let (name, kind) = parse_display_label(label)?;
    get_category(conn, &name, kind)
}

pub fn category_exists(conn: &Connection, name: &str, kind: CategoryKind) -> Result<bool> {
    Ok(get_category(conn, name, kind)?.is_some())
}

pub fn list_categories(conn: &Connection, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, kind FROM categories
         WHERE ?1 IS NULL OR kind = ?1
         ORDER BY name ASC, kind ASC",
    )?;

    let rows = stmt.query_map([kind], map_category)?;

    let mut categories = Vec::new();
    for category in rows {
        categories.push(category?);
    }
    Ok(categories)
}

/// Renames and/or re-kinds a category. Returns `Ok(false)` when `id` does not exist.
///
/// Changing the kind flips the sign of every transaction in the category inside the
/// same database transaction, so amounts keep matching their kind.
pub fn update_category(conn: &Connection, id: i64, name: &str, kind: CategoryKind) -> Result<bool> {
    let name = validate_name(name)?;
    let tx = conn.unchecked_transaction()?;

    let current_kind: Option<CategoryKind> = tx
        .query_row("SELECT kind FROM categories WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    let Some(current_kind) = current_kind else {
        return Ok(false);
    };

    tx.execute(
        "UPDATE categories SET name = ?1, kind = ?2 WHERE id = ?3",
        params![name, kind, id],
    )
    .map_err(|e| conflict_or(e, name, kind))?;

    if current_kind != kind {
        let sql = match kind {
            CategoryKind::Expense => "UPDATE transactions SET amount = -ABS(amount) WHERE category_id = ?1",
            CategoryKind::Income => "UPDATE transactions SET amount = ABS(amount) WHERE category_id = ?1",
        };
        let resigned = tx.execute(sql, [id])?;
        debug!("Re-signed {} transactions of category {}", resigned, id);
    }

    tx.commit()?;
    Ok(true)
}

/// Deletes a category and every transaction that references it, atomically.
/// Returns `Ok(false)` when `id` does not exist.
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;

    let removed_transactions = tx.execute("DELETE FROM transactions WHERE category_id = ?1", [id])?;
    let removed = tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if removed == 0 {
        return Ok(false);
    }

    tx.commit()?;
    info!(
        "Deleted category {} and {} dependent transactions",
        id, removed_transactions
    );
    Ok(true)
}

/// Makes sure "Otros" exists once per kind. Safe to call on every start.
pub fn ensure_default_categories(conn: &Connection) -> Result<()> {
    for kind in CategoryKind::ALL {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO categories (name, kind) VALUES (?1, ?2)",
            params![DEFAULT_CATEGORY_NAME, kind],
        )?;
        if inserted > 0 {
            info!("Created default category '{}' ({})", DEFAULT_CATEGORY_NAME, kind.as_db_str());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::db::transaction_repository::{add_transaction, get_transaction};
    use crate::models::transaction::TransactionDraft;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn add_test_transaction(conn: &Connection, category: &Category, amount: i64) -> i64 {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let draft = TransactionDraft::new(Decimal::from(amount), "test", category, date);
        add_transaction(conn, &draft).unwrap()
    }

    fn saved(conn: &Connection, name: &str, kind: CategoryKind) -> Category {
        let id = add_category(conn, name, kind).unwrap();
        get_category_by_id(conn, id).unwrap().unwrap()
    }

    #[test]
    fn test_add_category_success() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        assert!(id > 0);

        let category = get_category(&conn, "Comida", CategoryKind::Expense).unwrap().unwrap();
        assert_eq!(category.id, id);
        assert_eq!(category.name, "Comida");
        assert_eq!(category.kind, CategoryKind::Expense);
    }

    #[test]
    fn test_add_category_trims_name() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "  Ocio ", CategoryKind::Expense).unwrap();
        assert!(category_exists(&conn, "Ocio", CategoryKind::Expense).unwrap());
    }

    #[test]
    fn test_add_category_empty_name() {
        let conn = establish_test_connection().unwrap();
        let result = add_category(&conn, "   ", CategoryKind::Income);
        assert!(result.unwrap_err().is_validation());
        assert!(list_categories(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_add_category_duplicate_conflicts() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "Comida", CategoryKind::Expense).unwrap();

        let result = add_category(&conn, "Comida", CategoryKind::Expense);
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(list_categories(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn test_same_name_different_kind_allowed() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "Regalos", CategoryKind::Expense).unwrap();
        add_category(&conn, "Regalos", CategoryKind::Income).unwrap();

        let all = list_categories(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        for a in &all {
            for b in &all {
                if a.id != b.id && a.name == b.name {
                    assert_ne!(a.kind, b.kind);
                }
            }
        }
    }

    #[test]
    fn test_get_category_not_found() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        assert!(get_category(&conn, "Comida", CategoryKind::Income).unwrap().is_none());
        assert!(get_category_by_id(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_list_categories_sorted_and_filtered() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "Transporte", CategoryKind::Expense).unwrap();
        add_category(&conn, "Sueldo", CategoryKind::Income).unwrap();
        add_category(&conn, "Comida", CategoryKind::Expense).unwrap();

        let names: Vec<String> = list_categories(&conn, None)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Comida", "Sueldo", "Transporte"]);

        let expenses = list_categories(&conn, Some(CategoryKind::Expense)).unwrap();
        assert_eq!(expenses.len(), 2);
        assert!(expenses.iter().all(|c| c.kind == CategoryKind::Expense));
        assert_eq!(expenses[0].name, "Comida");
    }

    #[test]
    fn test_find_category_by_display() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Casa (nueva)", CategoryKind::Expense).unwrap();

        let found = find_category_by_display(&conn, "Casa (nueva) (Gasto)").unwrap().unwrap();
        assert_eq!(found.id, id);

        assert!(find_category_by_display(&conn, "Casa (nueva) (Ingreso)").unwrap().is_none());
        assert!(matches!(
            find_category_by_display(&conn, "Casa (Otro)"),
            Err(FinanceError::MalformedDisplay(_))
        ));
    }

    #[test]
    fn test_update_category_success() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Comida", CategoryKind::Expense).unwrap();

        assert!(update_category(&conn, id, "Supermercado", CategoryKind::Expense).unwrap());
        let category = get_category_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(category.name, "Supermercado");
    }

    #[test]
    fn test_update_category_to_itself() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        assert!(update_category(&conn, id, "Comida", CategoryKind::Expense).unwrap());
    }

    #[test]
    fn test_update_category_conflict_leaves_store_unchanged() {
        let conn = establish_test_connection().unwrap();
        add_category(&conn, "Comida", CategoryKind::Expense).unwrap();
        let income = saved(&conn, "Comida", CategoryKind::Income);
        let tx_id = add_test_transaction(&conn, &income, 100);

        let result = update_category(&conn, income.id, "Comida", CategoryKind::Expense);
        assert!(result.unwrap_err().is_conflict());

        let unchanged = get_category_by_id(&conn, income.id).unwrap().unwrap();
        assert_eq!(unchanged, income);
        let tx = get_transaction(&conn, tx_id).unwrap().unwrap();
        assert_eq!(tx.amount, Decimal::from(100));
    }

    #[test]
    fn test_update_category_missing_id() {
        let conn = establish_test_connection().unwrap();
        assert!(!update_category(&conn, 42, "Nada", CategoryKind::Expense).unwrap());
    }

    #[test]
    fn test_update_category_kind_resigns_transactions() {
        let conn = establish_test_connection().unwrap();
        let category = saved(&conn, "Varios", CategoryKind::Expense);
        let tx_id = add_test_transaction(&conn, &category, 30);
        assert_eq!(get_transaction(&conn, tx_id).unwrap().unwrap().amount, Decimal::from(-30));

        update_category(&conn, category.id, "Varios", CategoryKind::Income).unwrap();

        let tx = get_transaction(&conn, tx_id).unwrap().unwrap();
        assert_eq!(tx.kind(), CategoryKind::Income);
        assert_eq!(tx.amount, Decimal::from(30));
    }

    #[test]
    fn test_delete_category_cascades_only_its_transactions() {
        let conn = establish_test_connection().unwrap();
        let food = saved(&conn, "Comida", CategoryKind::Expense);
        let salary = saved(&conn, "Sueldo", CategoryKind::Income);
        let food_tx = add_test_transaction(&conn, &food, 10);
        let food_tx2 = add_test_transaction(&conn, &food, 20);
        let salary_tx = add_test_transaction(&conn, &salary, 1000);

        assert!(delete_category(&conn, food.id).unwrap());

        assert!(get_category_by_id(&conn, food.id).unwrap().is_none());
        assert!(get_transaction(&conn, food_tx).unwrap().is_none());
        assert!(get_transaction(&conn, food_tx2).unwrap().is_none());
        assert!(get_transaction(&conn, salary_tx).unwrap().is_some());
    }

    #[test]
    fn test_delete_category_missing_id() {
        let conn = establish_test_connection().unwrap();
        assert!(!delete_category(&conn, 7).unwrap());
    }

    #[test]
    fn test_ensure_default_categories_idempotent() {
        let conn = establish_test_connection().unwrap();
        ensure_default_categories(&conn).unwrap();
        ensure_default_categories(&conn).unwrap();

        let all = list_categories(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        for kind in CategoryKind::ALL {
            let matching = all
                .iter()
                .filter(|c| c.name == DEFAULT_CATEGORY_NAME && c.kind == kind)
                .count();
            assert_eq!(matching, 1);
        }
    }

    #[test]
    fn test_ensure_default_categories_keeps_existing() {
        let conn = establish_test_connection().unwrap();
        let id = add_category(&conn, DEFAULT_CATEGORY_NAME, CategoryKind::Expense).unwrap();
        ensure_default_categories(&conn).unwrap();

        let existing = get_category(&conn, DEFAULT_CATEGORY_NAME, CategoryKind::Expense)
            .unwrap()
            .unwrap();
        assert_eq!(existing.id, id);
        assert_eq!(list_categories(&conn, None).unwrap().len(), 2);
    }
}
