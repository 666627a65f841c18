//! Columnar in-memory table shared by the cleaner and the explorer.
//!
//! Every column stores `Option<T>` cells so a missing value is always
//! representable regardless of the physical type. The physical type is what
//! the cleaner optimizes, so the variants cover the narrow integer and float
//! widths plus a dictionary-encoded category column.

use std::collections::{BTreeSet, HashSet};
use std::mem::size_of;

use chrono::NaiveDateTime;

use crate::data::{RowKey, Value, format_float, DATETIME_OUTPUT_FORMAT};
use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Category {
        categories: Vec<String>,
        codes: Vec<Option<u32>>,
    },
    DateTime(Vec<Option<NaiveDateTime>>),
}

fn retain_by_mask<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut keep = mask.iter();
    values.retain(|_| keep.next().copied().unwrap_or(true));
}

fn count_missing<T>(values: &[Option<T>]) -> usize {
    values.iter().filter(|cell| cell.is_none()).count()
}

fn fixed_width_bytes<T>(values: &[Option<T>]) -> usize {
    values.len() * size_of::<Option<T>>()
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Category { codes, .. } => codes.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int8(_) => DataType::Int8,
            ColumnData::Int16(_) => DataType::Int16,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float32(_) => DataType::Float32,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Text(_) => DataType::Text,
            ColumnData::Category { .. } => DataType::Category,
            ColumnData::DateTime(_) => DataType::DateTime,
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Int8(v) => count_missing(v),
            ColumnData::Int16(v) => count_missing(v),
            ColumnData::Int32(v) => count_missing(v),
            ColumnData::Int64(v) => count_missing(v),
            ColumnData::Float32(v) => count_missing(v),
            ColumnData::Float64(v) => count_missing(v),
            ColumnData::Text(v) => count_missing(v),
            ColumnData::Category { codes, .. } => count_missing(codes),
            ColumnData::DateTime(v) => count_missing(v),
        }
    }

    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            ColumnData::Int8(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            ColumnData::Int16(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            ColumnData::Int32(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            ColumnData::Int64(v) => v.get(row).copied().flatten().map(Value::Integer),
            ColumnData::Float32(v) => v.get(row).copied().flatten().map(|x| Value::Float(x.into())),
            ColumnData::Float64(v) => v.get(row).copied().flatten().map(Value::Float),
            ColumnData::Text(v) => v.get(row).cloned().flatten().map(Value::Text),
            ColumnData::Category { categories, codes } => codes
                .get(row)
                .copied()
                .flatten()
                .and_then(|code| categories.get(code as usize))
                .map(|label| Value::Text(label.clone())),
            ColumnData::DateTime(v) => v.get(row).copied().flatten().map(Value::DateTime),
        }
    }

    /// Numeric view of a cell; `None` for missing cells and non-numeric columns.
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            ColumnData::Int8(v) => v.get(row).copied().flatten().map(f64::from),
            ColumnData::Int16(v) => v.get(row).copied().flatten().map(f64::from),
            ColumnData::Int32(v) => v.get(row).copied().flatten().map(f64::from),
            ColumnData::Int64(v) => v.get(row).copied().flatten().map(|x| x as f64),
            ColumnData::Float32(v) => v.get(row).copied().flatten().map(f64::from),
            ColumnData::Float64(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Borrowed label of a text or category cell.
    pub fn text_at(&self, row: usize) -> Option<&str> {
        match self {
            ColumnData::Text(v) => v.get(row).and_then(|cell| cell.as_deref()),
            ColumnData::Category { categories, codes } => codes
                .get(row)
                .copied()
                .flatten()
                .and_then(|code| categories.get(code as usize))
                .map(String::as_str),
            _ => None,
        }
    }

    pub fn datetime_at(&self, row: usize) -> Option<NaiveDateTime> {
        match self {
            ColumnData::DateTime(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Present values of a numeric column, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|row| self.f64_at(row)).collect()
    }

    /// Renders a cell for delimited output; missing cells render empty.
    pub fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Float32(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|x| format_float(f64::from(x)))
                .unwrap_or_default(),
            ColumnData::DateTime(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|dt| dt.format(DATETIME_OUTPUT_FORMAT).to_string())
                .unwrap_or_default(),
            _ => self
                .value(row)
                .map(|value| value.as_display())
                .unwrap_or_default(),
        }
    }

    pub fn distinct_count(&self) -> usize {
        match self {
            ColumnData::Category { codes, .. } => {
                codes.iter().flatten().collect::<HashSet<_>>().len()
            }
            ColumnData::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            _ => (0..self.len())
                .filter_map(|row| self.value(row))
                .map(|value| RowKey::from_cells([Some(value)]))
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// Deterministic storage footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        match self {
            ColumnData::Int8(v) => fixed_width_bytes(v),
            ColumnData::Int16(v) => fixed_width_bytes(v),
            ColumnData::Int32(v) => fixed_width_bytes(v),
            ColumnData::Int64(v) => fixed_width_bytes(v),
            ColumnData::Float32(v) => fixed_width_bytes(v),
            ColumnData::Float64(v) => fixed_width_bytes(v),
            ColumnData::DateTime(v) => fixed_width_bytes(v),
            ColumnData::Text(v) => {
                fixed_width_bytes(v) + v.iter().flatten().map(String::len).sum::<usize>()
            }
            ColumnData::Category { categories, codes } => {
                fixed_width_bytes(codes)
                    + categories
                        .iter()
                        .map(|label| size_of::<String>() + label.len())
                        .sum::<usize>()
            }
        }
    }

    /// Keeps the rows whose mask entry is `true`.
    pub fn retain(&mut self, mask: &[bool]) {
        match self {
            ColumnData::Int8(v) => retain_by_mask(v, mask),
            ColumnData::Int16(v) => retain_by_mask(v, mask),
            ColumnData::Int32(v) => retain_by_mask(v, mask),
            ColumnData::Int64(v) => retain_by_mask(v, mask),
            ColumnData::Float32(v) => retain_by_mask(v, mask),
            ColumnData::Float64(v) => retain_by_mask(v, mask),
            ColumnData::Text(v) => retain_by_mask(v, mask),
            ColumnData::Category { codes, .. } => retain_by_mask(codes, mask),
            ColumnData::DateTime(v) => retain_by_mask(v, mask),
        }
    }

    /// Dictionary-encodes a text column; categories are kept sorted.
    pub fn into_category(self) -> ColumnData {
        match self {
            ColumnData::Text(values) => {
                let categories: Vec<String> = values
                    .iter()
                    .flatten()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let codes = values
                    .iter()
                    .map(|cell| {
                        cell.as_ref().and_then(|label| {
                            categories
                                .binary_search(label)
                                .ok()
                                .and_then(|idx| u32::try_from(idx).ok())
                        })
                    })
                    .collect();
                ColumnData::Category { categories, codes }
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Appends a column, or replaces an existing column of the same name in place.
    pub fn upsert_column(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn row_key(&self, row: usize) -> RowKey {
        RowKey::from_cells(self.columns.iter().map(|c| c.data.value(row)))
    }

    pub fn render_row(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.data.render(row)).collect()
    }

    pub fn retain_rows(&mut self, mask: &[bool]) {
        for column in &mut self.columns {
            column.data.retain(mask);
        }
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    /// Number of rows that exactly repeat an earlier row.
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.row_count());
        (0..self.row_count())
            .filter(|&row| !seen.insert(self.row_key(row)))
            .count()
    }

    pub fn memory_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.data.memory_bytes()).sum()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.data_type().is_numeric())
    }
}

pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::new("ID", ColumnData::Int64(vec![Some(1), Some(2), Some(1)])),
            Column::new(
                "NAME",
                ColumnData::Text(vec![Some("a".into()), None, Some("a".into())]),
            ),
        ])
    }

    #[test]
    fn duplicate_count_matches_exact_repeats() {
        let dataset = sample();
        assert_eq!(dataset.duplicate_count(), 1);
        assert_eq!(dataset.total_missing(), 1);
    }

    #[test]
    fn retain_rows_applies_mask_to_every_column() {
        let mut dataset = sample();
        dataset.retain_rows(&[true, false, true]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.render_row(1), vec!["1".to_string(), "a".to_string()]);
    }

    #[test]
    fn into_category_builds_sorted_dictionary() {
        let column = ColumnData::Text(vec![
            Some("Ships".into()),
            Some("Cars".into()),
            None,
            Some("Ships".into()),
        ])
        .into_category();
        match &column {
            ColumnData::Category { categories, codes } => {
                assert_eq!(categories, &vec!["Cars".to_string(), "Ships".to_string()]);
                assert_eq!(codes, &vec![Some(1), Some(0), None, Some(1)]);
            }
            other => panic!("expected category, got {other:?}"),
        }
        assert_eq!(column.text_at(0), Some("Ships"));
        assert_eq!(column.distinct_count(), 2);
    }

    #[test]
    fn memory_bytes_shrinks_for_narrow_integers() {
        let wide = ColumnData::Int64(vec![Some(1); 100]);
        let narrow = ColumnData::Int8(vec![Some(1); 100]);
        assert!(narrow.memory_bytes() < wide.memory_bytes());
    }

    #[test]
    fn upsert_column_replaces_existing_name() {
        let mut dataset = sample();
        dataset.upsert_column(Column::new("ID", ColumnData::Int8(vec![Some(7); 3])));
        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.column("ID").unwrap().data_type(), DataType::Int8);
    }
}
