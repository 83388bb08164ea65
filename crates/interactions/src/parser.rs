//! Parser for transaction CSV files.
//!
//! Expected format, one record per line:
//! `user_id,item_id,quantity`
//!
//! A header line naming the columns is recognised and skipped.

use crate::error::{Result, TransactionLoadError};
use crate::types::Transaction;
use std::fs;
use std::path::Path;

const FIELD_COUNT: usize = 3;

fn parse_field<T: std::str::FromStr>(s: &str, field: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| TransactionLoadError::InvalidValue {
            field: field.to_string(),
            value: s.to_string(),
        })
}

/// Parse a transactions file into records.
///
/// Empty lines are skipped; any malformed line aborts the load with a
/// line-precise error.
pub fn parse_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content = fs::read_to_string(path)?;

    let mut transactions = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Skip the header line if present
        if line_no == 1 && line.starts_with("user_id") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(TransactionLoadError::FieldCountMismatch {
                expected: FIELD_COUNT,
                found: fields.len(),
                line: line_no,
            });
        }

        let user_id = parse_field(fields[0], "user_id").map_err(|e| with_line(e, &file_name, line_no))?;
        let item_id = parse_field(fields[1], "item_id").map_err(|e| with_line(e, &file_name, line_no))?;
        let quantity = parse_field(fields[2], "quantity").map_err(|e| with_line(e, &file_name, line_no))?;

        transactions.push(Transaction {
            user_id,
            item_id,
            quantity,
        });
    }

    Ok(transactions)
}

fn with_line(err: TransactionLoadError, file: &str, line: usize) -> TransactionLoadError {
    match err {
        TransactionLoadError::InvalidValue { field, value } => TransactionLoadError::Parse {
            file: file.to_string(),
            line,
            reason: format!("invalid {field}: {value:?}"),
        },
        other => other,
    }
}
