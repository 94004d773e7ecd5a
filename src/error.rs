use thiserror::Error;

use crate::models::category::CategoryKind;

#[derive(Error, Debug)]
pub enum FinanceError {
    /// Empty required field, unresolvable reference or unparsable input
    #[error("Validation error: {0}")]
    Validation(String),

    /// (name, kind) already taken by another category
    #[error("Category '{name}' ({kind}) already exists")]
    Conflict { name: String, kind: CategoryKind },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Display string outside the "{name} ({Gasto|Ingreso})" grammar
    #[error("Malformed category label '{0}'. Expected 'Name (Gasto)' or 'Name (Ingreso)'")]
    MalformedDisplay(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences error: {0}")]
    Preferences(#[from] serde_json::Error),
}

impl FinanceError {
    pub fn category_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Category",
            id,
        }
    }

    pub fn transaction_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Transaction",
            id,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, FinanceError>;

/// True when SQLite rejected a write because of a UNIQUE/FK/CHECK constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
