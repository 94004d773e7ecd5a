use std::fs::File;
use std::path::Path;

use rusqlite::Connection;

use crate::db::{category_repository, transaction_repository};
use crate::error::{FinanceError, Result};
use crate::models::category::parse_display_label;
use crate::models::transaction::TransactionDraft;
use crate::operations::add::{parse_amount, parse_description, parse_iso_date};

#[derive(Debug)]
pub enum ImportFormat {
    Csv,
}

/// Imports every row of the file or, on the first bad row, none of them.
pub fn import_transactions_to_db(conn: &Connection, format: ImportFormat, path: &Path) -> Result<usize> {
    let drafts = match format {
        ImportFormat::Csv => read_csv(conn, path)?,
    };
    transaction_repository::add_transactions(conn, &drafts)
}

/// Rows are "date, description, amount, category label" without a header, e.g.
/// `2024-03-10,Cena,50,Comida (Gasto)`. The sign of `amount` is ignored.
fn read_csv(conn: &Connection, path: &Path) -> Result<Vec<TransactionDraft>> {
    let file = File::open(path)
        .map_err(|e| FinanceError::Import(format!("Failed to open file '{}': {}", path.display(), e)))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .from_reader(file);

    let mut drafts = Vec::new();
    for (line_index, result) in reader.records().enumerate() {
        let line = line_index + 1;
        let record =
            result.map_err(|e| FinanceError::Import(format!("CSV parse error on line {}: {}", line, e)))?;

        if record.len() != 4 {
            return Err(FinanceError::Import(format!(
                "Invalid number of columns on line {}: expected 4, got {}",
                line,
                record.len()
            )));
        }

        let draft = parse_row(conn, &record).map_err(|e| FinanceError::Import(format!("Line {}: {}", line, e)))?;
        drafts.push(draft);
    }

    Ok(drafts)
}

fn parse_row(conn: &Connection, record: &csv::StringRecord) -> Result<TransactionDraft> {
    let date = parse_iso_date(&record[0])?;
    let description = parse_description(&record[1])?;
    let amount = parse_amount(&record[2])?;

    let (name, kind) = parse_display_label(&record[3])?;
    let category = category_repository::get_category(conn, &name, kind)?
        .ok_or_else(|| FinanceError::Validation(format!("Category '{}' does not exist", &record[3])))?;

    Ok(TransactionDraft::new(amount, description, &category, date))
}
