//! Column type vocabulary and type inference for freshly loaded CSV text.
//!
//! Inference mirrors how the raw sales exports are typed: a column whose
//! present values all parse as `i64` is an integer column, one whose values
//! all parse as `f64` is a float column, a column with no values at all is a
//! float column of missing cells, and everything else is text. Dates stay
//! text until the cleaner's date transformation parses them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Category,
    DateTime,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Text => "text",
            DataType::Category => "category",
            DataType::DateTime => "datetime",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Text | DataType::Category)
    }

    /// SQLite storage class used when the column is materialized in the store.
    pub fn sql_affinity(&self) -> &'static str {
        if self.is_integer() {
            "INTEGER"
        } else if self.is_numeric() {
            "REAL"
        } else {
            "TEXT"
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    observed: usize,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            observed: 0,
        }
    }

    fn update(&mut self, value: &str) {
        self.observed += 1;
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
    }

    fn decide(&self) -> DataType {
        if self.observed == 0 {
            DataType::Float64
        } else if self.possible_integer {
            DataType::Int64
        } else if self.possible_float {
            DataType::Float64
        } else {
            DataType::Text
        }
    }
}

/// Normalizes a raw field: surrounding whitespace is dropped and an empty
/// result means the cell is missing.
pub fn normalize_field(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Infers a type per header and materializes typed columns from raw rows.
pub fn infer_columns(headers: &[String], rows: &[Vec<String>]) -> Vec<Column> {
    let mut candidates = vec![TypeCandidate::new(); headers.len()];
    for row in rows {
        for (idx, candidate) in candidates.iter_mut().enumerate() {
            if let Some(value) = row.get(idx).and_then(|raw| normalize_field(raw)) {
                candidate.update(value);
            }
        }
    }

    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let cells = rows
                .iter()
                .map(|row| row.get(idx).and_then(|raw| normalize_field(raw)));
            let data = match candidates[idx].decide() {
                DataType::Int64 => ColumnData::Int64(
                    cells.map(|cell| cell.and_then(|v| v.parse().ok())).collect(),
                ),
                // `NaN` and `inf` literals parse as floats but count as missing.
                DataType::Float64 => ColumnData::Float64(
                    cells
                        .map(|cell| {
                            cell.and_then(|v| v.parse::<f64>().ok())
                                .filter(|f| f.is_finite())
                        })
                        .collect(),
                ),
                _ => ColumnData::Text(cells.map(|cell| cell.map(str::to_string)).collect()),
            };
            Column::new(header.trim(), data)
        })
        .collect()
}
