//! Raw spreadsheet rows, as produced by an external extraction step.

use crate::PipelineError;
use ledgerline_lineage::CellRef;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub sheet: String,
    /// 1-based.
    pub row: u32,
    /// 1-based.
    pub col: u32,
    /// A1-style reference; derived from `row`/`col` when absent.
    #[serde(default)]
    pub cell_ref: Option<String>,
    pub label: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl RawRow {
    pub fn new(sheet: &str, row: u32, col: u32, label: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            row,
            col,
            cell_ref: None,
            label: label.to_string(),
            period: None,
            value: None,
        }
    }

    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.to_string());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn cell(&self) -> CellRef {
        CellRef {
            sheet: self.sheet.clone(),
            row: self.row,
            col: self.col,
            cell_ref: self
                .cell_ref
                .clone()
                .unwrap_or_else(|| a1_reference(self.row, self.col)),
        }
    }
}

/// `(3, 28)` → `AB3`. Column 0 is treated as column 1.
pub fn a1_reference(row: u32, col: u32) -> String {
    let mut col = col.max(1);
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &row.to_string()
}

pub fn rows_from_json(json: &str) -> Result<Vec<RawRow>, PipelineError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<RawRow>, PipelineError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.display().to_string(),
        source,
    })?;
    rows_from_json(&contents)
}
