use std::str::FromStr;

use rusqlite::Connection;
use tracing::info;

use crate::db::category_repository;
use crate::error::{FinanceError, Result};
use crate::models::category::{Category, CategoryKind};

/// Parses "name, kind".
fn parse_name_and_kind(input: &str) -> Result<(String, CategoryKind)> {
    let (name, kind) = input.rsplit_once(',').ok_or_else(|| {
        FinanceError::Validation("Expected 'name, kind' (kind is gasto or ingreso)".to_string())
    })?;
    Ok((name.trim().to_string(), CategoryKind::from_str(kind)?))
}

/// Resolves a label as listed by `categories`, e.g. "Comida (Gasto)".
pub fn select_category(conn: &Connection, label: &str) -> Result<Category> {
    category_repository::find_category_by_display(conn, label.trim())?
        .ok_or_else(|| FinanceError::Validation(format!("Category '{}' does not exist", label.trim())))
}

pub fn add_category_db(conn: &Connection, input: &str) -> Result<Category> {
    let (name, kind) = parse_name_and_kind(input)?;
    if category_repository::category_exists(conn, &name, kind)? {
        return Err(FinanceError::Conflict { name, kind });
    }
    let id = category_repository::add_category(conn, &name, kind)?;
    category_repository::get_category_by_id(conn, id)?.ok_or_else(|| FinanceError::category_not_found(id))
}

/// Applies "new name, new kind" to the category labelled `label`.
pub fn edit_category_db(conn: &Connection, label: &str, input: &str) -> Result<Category> {
    let category = select_category(conn, label)?;
    let (name, kind) = parse_name_and_kind(input)?;

    if !category_repository::update_category(conn, category.id, &name, kind)? {
        return Err(FinanceError::category_not_found(category.id));
    }
    info!("Category {} renamed from '{}' to '{}'", category.id, category, name);
    category_repository::get_category_by_id(conn, category.id)?
        .ok_or_else(|| FinanceError::category_not_found(category.id))
}

/// Deletes the category labelled `label` together with its transactions.
/// The "Otros" fallback categories cannot be deleted from here.
pub fn delete_category_db(conn: &Connection, label: &str) -> Result<Category> {
    let category = select_category(conn, label)?;
    if category.is_default() {
        return Err(FinanceError::Validation(format!(
            "'{}' is the fallback category and cannot be deleted",
            category
        )));
    }
    if !category_repository::delete_category(conn, category.id)? {
        return Err(FinanceError::category_not_found(category.id));
    }
    Ok(category)
}

pub fn list_category_labels(conn: &Connection, kind_input: &str) -> Result<Vec<String>> {
    let kind = match kind_input.trim() {
        "" => None,
        raw => Some(CategoryKind::from_str(raw)?),
    };
    Ok(category_repository::list_categories(conn, kind)?
        .iter()
        .map(Category::to_string)
        .collect())
}
