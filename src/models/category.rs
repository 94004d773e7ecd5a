use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::{FinanceError, Result};

/// Name of the fallback category created for each kind.
pub const DEFAULT_CATEGORY_NAME: &str = "Otros";

const EXPENSE_LABEL: &str = "Gasto";
const INCOME_LABEL: &str = "Ingreso";

// Greedy name so "Casa (nueva) (Gasto)" splits on the last " (".
static DISPLAY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.+) \(([^()]*)\)$").expect("valid display label regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Expense,
    Income,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 2] = [CategoryKind::Expense, CategoryKind::Income];

    /// Value stored in the `kind` column.
    pub fn as_db_str(self) -> &'static str {
        match self {
            CategoryKind::Expense => "EXPENSE",
            CategoryKind::Income => "INCOME",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "EXPENSE" => Some(CategoryKind::Expense),
            "INCOME" => Some(CategoryKind::Income),
            _ => None,
        }
    }

    /// Label shown to the user: "Gasto" or "Ingreso".
    pub fn label(self) -> &'static str {
        match self {
            CategoryKind::Expense => EXPENSE_LABEL,
            CategoryKind::Income => INCOME_LABEL,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            EXPENSE_LABEL => Some(CategoryKind::Expense),
            INCOME_LABEL => Some(CategoryKind::Income),
            _ => None,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts what a user types at the prompt: english or spanish, any case.
impl FromStr for CategoryKind {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "gasto" | "e" | "g" => Ok(CategoryKind::Expense),
            "income" | "ingreso" | "i" => Ok(CategoryKind::Income),
            other => Err(FinanceError::Validation(format!(
                "Invalid category kind '{}'. Use 'gasto' or 'ingreso'.",
                other
            ))),
        }
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_db_str()))
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        CategoryKind::from_db_str(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown category kind '{}'", raw).into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: CategoryKind,
}

impl Category {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_CATEGORY_NAME
    }
}

/// Renders the label the history and category screens show, e.g. "Comida (Gasto)".
impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_display_label(&self.name, self.kind))
    }
}

pub fn format_display_label(name: &str, kind: CategoryKind) -> String {
    format!("{} ({})", name, kind.label())
}

/// Inverse of [`format_display_label`].
///
/// An unknown kind label is reported as [`FinanceError::MalformedDisplay`] rather
/// than treated as a lookup miss.
pub fn parse_display_label(label: &str) -> Result<(String, CategoryKind)> {
    let captures = DISPLAY_LABEL
        .captures(label)
        .ok_or_else(|| FinanceError::MalformedDisplay(label.to_string()))?;

    let name = &captures[1];
    let kind = CategoryKind::from_label(&captures[2])
        .ok_or_else(|| FinanceError::MalformedDisplay(label.to_string()))?;

    Ok((name.to_string(), kind))
}
