//! Stage one: turn the raw sales export into a cleaned, typed table.
//!
//! `SalesCleaner` owns the loaded [`Dataset`] and an ordered audit log. Each
//! operation mutates the table in place and appends human-readable entries to
//! the log, which `save_cleaned_data` writes next to the cleaned file.

use std::{
    collections::HashSet,
    fmt,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDateTime};
use clap::ValueEnum;
use log::{info, warn};
use serde::Serialize;

use crate::{
    data::parse_timestamp,
    dataset::{Column, ColumnData, Dataset, bytes_to_mb},
    error::PipelineError,
    io_utils,
    schema::{self, DataType},
    stats::ColumnStats,
};

/// Label written into text cells that had no value.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Text columns become categories below this distinct/rows ratio.
pub const CATEGORY_RATIO_THRESHOLD: f64 = 0.5;

const SALES_CATEGORY_LABELS: [&str; 4] = ["Small", "Medium", "Large", "Very Large"];
const QUARTER_LABELS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum CleaningStrategy {
    /// Median for numeric columns, "Unknown" for text columns
    Auto,
    /// Remove every row with a missing value
    Drop,
    /// Zero for numeric columns, "Unknown" for text columns
    Fill,
}

impl FromStr for CleaningStrategy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(CleaningStrategy::Auto),
            "drop" => Ok(CleaningStrategy::Drop),
            "fill" => Ok(CleaningStrategy::Fill),
            _ => Err(PipelineError::UnknownStrategy(value.to_string())),
        }
    }
}

impl fmt::Display for CleaningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CleaningStrategy::Auto => "auto",
            CleaningStrategy::Drop => "drop",
            CleaningStrategy::Fill => "fill",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: DataType,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub duplicate_rows: usize,
    pub memory_usage_mb: f64,
    pub columns: Vec<ColumnProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleaningSummary {
    pub rows: usize,
    pub columns: usize,
    pub memory_usage_mb: f64,
    pub encoding: Option<String>,
    pub cleaning_log: Vec<String>,
    pub column_profiles: Vec<ColumnProfile>,
}

fn profile_columns(dataset: &Dataset) -> Vec<ColumnProfile> {
    dataset
        .columns()
        .iter()
        .map(|column| ColumnProfile {
            name: column.name.clone(),
            data_type: column.data_type(),
            missing: column.null_count(),
        })
        .collect()
}

fn loaded(dataset: &Option<Dataset>) -> Result<&Dataset> {
    dataset
        .as_ref()
        .ok_or_else(|| PipelineError::NotLoaded.into())
}

fn loaded_mut(dataset: &mut Option<Dataset>) -> Result<&mut Dataset> {
    dataset
        .as_mut()
        .ok_or_else(|| PipelineError::NotLoaded.into())
}

#[derive(Debug)]
pub struct SalesCleaner {
    source: PathBuf,
    dataset: Option<Dataset>,
    cleaning_log: Vec<String>,
    encoding: Option<String>,
}

impl SalesCleaner {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        info!("Cleaner initialised for {source:?}");
        Self {
            source,
            dataset: None,
            cleaning_log: Vec::new(),
            encoding: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn cleaning_log(&self) -> &[String] {
        &self.cleaning_log
    }

    /// Reads the source with the encoding fallback and infers column types.
    pub fn load(&mut self) -> Result<&Dataset> {
        let delimiter = io_utils::resolve_input_delimiter(&self.source, None);
        let table = io_utils::read_delimited(&self.source, delimiter)?;
        if table.headers.iter().all(|h| h.trim().is_empty()) || table.rows.is_empty() {
            return Err(PipelineError::EmptySource(self.source.clone()).into());
        }
        let dataset = Dataset::new(schema::infer_columns(&table.headers, &table.rows));
        info!(
            "Loaded {} row(s), {} column(s) from {:?} using encoding {}",
            dataset.row_count(),
            dataset.column_count(),
            self.source,
            table.encoding
        );
        if table.skipped_lines > 0 {
            warn!("Skipped {} malformed line(s)", table.skipped_lines);
        }
        self.encoding = Some(table.encoding);
        Ok(self.dataset.insert(dataset))
    }

    pub fn validate_structure(&self) -> Result<StructureReport> {
        let dataset = loaded(&self.dataset)?;
        let report = StructureReport {
            total_rows: dataset.row_count(),
            total_columns: dataset.column_count(),
            duplicate_rows: dataset.duplicate_count(),
            memory_usage_mb: bytes_to_mb(dataset.memory_bytes()),
            columns: profile_columns(dataset),
        };
        info!(
            "Structure: {} row(s), {} column(s), {} duplicate row(s), {:.2} MB",
            report.total_rows, report.total_columns, report.duplicate_rows, report.memory_usage_mb
        );
        Ok(report)
    }

    pub fn clean_missing_values(&mut self, strategy: CleaningStrategy) -> Result<usize> {
        let dataset = loaded_mut(&mut self.dataset)?;
        info!("Cleaning missing values with strategy {strategy}");
        let initial_missing = dataset.total_missing();

        match strategy {
            CleaningStrategy::Auto => {
                for column in dataset.columns_mut() {
                    let missing = column.null_count();
                    if missing == 0 {
                        continue;
                    }
                    let data_type = column.data_type();
                    if data_type.is_textual() {
                        fill_text(&mut column.data, UNKNOWN_LABEL);
                        self.cleaning_log.push(format!(
                            "{missing} missing values in column {} replaced with '{UNKNOWN_LABEL}'",
                            column.name
                        ));
                    } else if data_type.is_numeric() {
                        let median = ColumnStats::from_values(column.data.numeric_values())
                            .median()
                            .unwrap_or(0.0);
                        let applied = if data_type.is_integer() {
                            median.round()
                        } else {
                            median
                        };
                        fill_numeric(&mut column.data, applied);
                        self.cleaning_log.push(format!(
                            "{missing} missing values in column {} replaced with {applied:.2}",
                            column.name
                        ));
                    }
                }
            }
            CleaningStrategy::Drop => {
                let mask: Vec<bool> = (0..dataset.row_count())
                    .map(|row| dataset.columns().iter().all(|c| c.data.value(row).is_some()))
                    .collect();
                let dropped = mask.iter().filter(|keep| !**keep).count();
                dataset.retain_rows(&mask);
                self.cleaning_log
                    .push(format!("Rows with missing values dropped: {dropped} rows"));
            }
            CleaningStrategy::Fill => {
                for column in dataset.columns_mut() {
                    let data_type = column.data_type();
                    if data_type.is_textual() {
                        let filled = fill_text(&mut column.data, UNKNOWN_LABEL);
                        if filled > 0 {
                            self.cleaning_log.push(format!(
                                "{filled} missing values in column {} replaced with '{UNKNOWN_LABEL}'",
                                column.name
                            ));
                        }
                    } else if data_type.is_numeric() {
                        let filled = fill_numeric(&mut column.data, 0.0);
                        if filled > 0 {
                            self.cleaning_log.push(format!(
                                "{filled} missing values in column {} replaced with 0.00",
                                column.name
                            ));
                        }
                    }
                }
            }
        }

        let cleaned = initial_missing - dataset.total_missing();
        info!("Missing values cleaned: {cleaned}");
        self.cleaning_log
            .push(format!("Missing values cleaned: {cleaned} values"));
        Ok(cleaned)
    }

    /// Drops exact full-row repeats, keeping the first occurrence.
    pub fn remove_duplicates(&mut self) -> Result<usize> {
        let dataset = loaded_mut(&mut self.dataset)?;
        let mut seen = HashSet::with_capacity(dataset.row_count());
        let mask: Vec<bool> = (0..dataset.row_count())
            .map(|row| seen.insert(dataset.row_key(row)))
            .collect();
        let removed = mask.iter().filter(|keep| !**keep).count();
        dataset.retain_rows(&mask);
        info!("Duplicate rows removed: {removed}");
        self.cleaning_log
            .push(format!("Duplicates removed: {removed} rows"));
        Ok(removed)
    }

    pub fn optimize_data_types(&mut self) -> Result<f64> {
        let dataset = loaded_mut(&mut self.dataset)?;
        let rows = dataset.row_count();
        let initial_mb = bytes_to_mb(dataset.memory_bytes());

        for column in dataset.columns_mut() {
            let before = column.data_type();
            let replacement = match &column.data {
                ColumnData::Int64(values) => narrow_integers(values),
                ColumnData::Float64(values) => narrow_floats(values),
                ColumnData::Text(_) if rows > 0 => {
                    let ratio = column.data.distinct_count() as f64 / rows as f64;
                    (ratio < CATEGORY_RATIO_THRESHOLD).then(|| column.data.clone().into_category())
                }
                _ => None,
            };
            if let Some(data) = replacement {
                column.data = data;
                let after = column.data.data_type();
                let verb = if after == DataType::Category {
                    "converted"
                } else {
                    "downcast"
                };
                self.cleaning_log.push(format!(
                    "Column {} {verb} from {before} to {after}",
                    column.name
                ));
            }
        }

        let final_mb = bytes_to_mb(dataset.memory_bytes());
        let saved = initial_mb - final_mb;
        let percent = if initial_mb > 0.0 {
            saved / initial_mb * 100.0
        } else {
            0.0
        };
        info!("Memory optimized: {saved:.2} MB saved ({percent:.1}%)");
        self.cleaning_log
            .push(format!("Memory optimized: {saved:.2} MB saved"));
        Ok(saved)
    }

    /// Parses every text column whose name mentions DATE and appends
    /// year/month/day/day-of-week companions.
    pub fn transform_dates(&mut self) -> Result<usize> {
        let dataset = loaded_mut(&mut self.dataset)?;
        let rows = dataset.row_count();
        let date_columns: Vec<String> = dataset
            .columns()
            .iter()
            .filter(|c| c.name.to_uppercase().contains("DATE"))
            .filter(|c| c.data_type().is_textual() || c.data_type() == DataType::DateTime)
            .map(|c| c.name.clone())
            .collect();

        for name in &date_columns {
            let Some(column) = dataset.column(name) else {
                continue;
            };
            let mut invalid = 0usize;
            let parsed: Vec<Option<NaiveDateTime>> = (0..rows)
                .map(|row| match &column.data {
                    ColumnData::DateTime(_) => column.data.datetime_at(row),
                    data => {
                        let text = data.text_at(row)?;
                        let value = parse_timestamp(text);
                        if value.is_none() {
                            invalid += 1;
                        }
                        value
                    }
                })
                .collect();
            if invalid > 0 {
                warn!("Column {name}: {invalid} value(s) could not be parsed as dates");
            }

            let year = parsed
                .iter()
                .map(|dt| dt.and_then(|dt| i16::try_from(dt.year()).ok()))
                .collect();
            let part = |extract: fn(&NaiveDateTime) -> u32| -> Vec<Option<i8>> {
                parsed
                    .iter()
                    .map(|dt| dt.as_ref().and_then(|dt| i8::try_from(extract(dt)).ok()))
                    .collect()
            };
            let month = part(|dt| dt.month());
            let day = part(|dt| dt.day());
            let weekday = part(|dt| dt.weekday().num_days_from_monday());

            dataset.upsert_column(Column::new(name.clone(), ColumnData::DateTime(parsed)));
            dataset.upsert_column(Column::new(format!("{name}_YEAR"), ColumnData::Int16(year)));
            dataset.upsert_column(Column::new(format!("{name}_MONTH"), ColumnData::Int8(month)));
            dataset.upsert_column(Column::new(format!("{name}_DAY"), ColumnData::Int8(day)));
            dataset.upsert_column(Column::new(
                format!("{name}_DAYOFWEEK"),
                ColumnData::Int8(weekday),
            ));
            info!("Column {name} converted to datetime");
            self.cleaning_log.push(format!(
                "Column {name} converted to datetime ({invalid} invalid dates)"
            ));
        }

        self.cleaning_log.push(format!(
            "Date columns transformed: {} columns",
            date_columns.len()
        ));
        Ok(date_columns.len())
    }

    pub fn create_derived_features(&mut self) -> Result<Vec<String>> {
        let dataset = loaded_mut(&mut self.dataset)?;
        let rows = dataset.row_count();
        let mut created = Vec::new();

        let price = numeric_column(dataset, "PRICEEACH");
        let msrp = numeric_column(dataset, "MSRP");
        if let (Some(price), Some(msrp)) = (price, msrp) {
            let margin: Vec<Option<f64>> = (0..rows)
                .map(|row| Some(price.f64_at(row)? - msrp.f64_at(row)?))
                .collect();
            let margin_pct: Vec<Option<f64>> = (0..rows)
                .map(|row| {
                    let price = price.f64_at(row)?;
                    let margin = margin[row]?;
                    (price != 0.0).then(|| margin / price * 100.0)
                })
                .collect();
            dataset.upsert_column(Column::new("MARGIN", ColumnData::Float64(margin)));
            dataset.upsert_column(Column::new(
                "MARGIN_PERCENTAGE",
                ColumnData::Float64(margin_pct),
            ));
            created.extend(["MARGIN".to_string(), "MARGIN_PERCENTAGE".to_string()]);
        }

        if let Some(sales) = numeric_column(dataset, "SALES") {
            let codes = (0..rows)
                .map(|row| sales.f64_at(row).and_then(sales_category_code))
                .collect();
            dataset.upsert_column(Column::new(
                "SALES_CATEGORY",
                ordered_category(&SALES_CATEGORY_LABELS, codes),
            ));
            created.push("SALES_CATEGORY".to_string());
        }

        if let Some(month) = numeric_column(dataset, "MONTH_ID") {
            let codes = (0..rows)
                .map(|row| month.f64_at(row).and_then(quarter_code))
                .collect();
            dataset.upsert_column(Column::new(
                "QUARTER",
                ordered_category(&QUARTER_LABELS, codes),
            ));
            created.push("QUARTER".to_string());
        }

        let listed = if created.is_empty() {
            "none".to_string()
        } else {
            created.join(", ")
        };
        info!("Derived features created: {listed}");
        self.cleaning_log
            .push(format!("Derived features created: {listed}"));
        Ok(created)
    }

    /// Writes the cleaned table and `<stem>_cleaning_log.txt` beside it.
    /// Returns the path of the log file.
    pub fn save_cleaned_data(&self, output: &Path) -> Result<PathBuf> {
        let dataset = loaded(&self.dataset)?;
        io_utils::write_delimited(
            output,
            &dataset.headers(),
            (0..dataset.row_count()).map(|row| dataset.render_row(row)),
        )
        .with_context(|| format!("Saving cleaned data to {output:?}"))?;
        info!("Cleaned data saved to {output:?}");

        let log_path = cleaning_log_path(output);
        io_utils::write_atomically(&log_path, |writer| {
            writeln!(writer, "Sales Data Cleaning Log")?;
            writeln!(writer, "{}", "=".repeat(30))?;
            for entry in &self.cleaning_log {
                writeln!(writer, "{entry}")?;
            }
            Ok(())
        })
        .with_context(|| format!("Saving cleaning log to {log_path:?}"))?;
        info!("Cleaning log saved to {log_path:?}");
        Ok(log_path)
    }

    pub fn get_cleaning_summary(&self) -> Result<CleaningSummary> {
        let dataset = loaded(&self.dataset)?;
        Ok(CleaningSummary {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            memory_usage_mb: bytes_to_mb(dataset.memory_bytes()),
            encoding: self.encoding.clone(),
            cleaning_log: self.cleaning_log.clone(),
            column_profiles: profile_columns(dataset),
        })
    }
}

pub fn cleaning_log_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cleaned".to_string());
    output.with_file_name(format!("{stem}_cleaning_log.txt"))
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Option<&'a ColumnData> {
    dataset
        .column(name)
        .filter(|c| c.data_type().is_numeric())
        .map(|c| &c.data)
}

fn sales_category_code(sales: f64) -> Option<u32> {
    match sales {
        s if s < 0.0 => None,
        s if s < 1_000.0 => Some(0),
        s if s < 5_000.0 => Some(1),
        s if s < 10_000.0 => Some(2),
        _ => Some(3),
    }
}

fn quarter_code(month: f64) -> Option<u32> {
    match month as i64 {
        1..=3 => Some(0),
        4..=6 => Some(1),
        7..=9 => Some(2),
        10..=12 => Some(3),
        _ => None,
    }
}

fn ordered_category(labels: &[&str], codes: Vec<Option<u32>>) -> ColumnData {
    ColumnData::Category {
        categories: labels.iter().map(|l| l.to_string()).collect(),
        codes,
    }
}

fn fill_missing<T: Clone>(values: &mut [Option<T>], fill: T) -> usize {
    let mut filled = 0;
    for cell in values.iter_mut().filter(|cell| cell.is_none()) {
        *cell = Some(fill.clone());
        filled += 1;
    }
    filled
}

fn fill_numeric(data: &mut ColumnData, fill: f64) -> usize {
    match data {
        ColumnData::Int8(v) => fill_missing(v, fill.round() as i8),
        ColumnData::Int16(v) => fill_missing(v, fill.round() as i16),
        ColumnData::Int32(v) => fill_missing(v, fill.round() as i32),
        ColumnData::Int64(v) => fill_missing(v, fill.round() as i64),
        ColumnData::Float32(v) => fill_missing(v, fill as f32),
        ColumnData::Float64(v) => fill_missing(v, fill),
        _ => 0,
    }
}

fn fill_text(data: &mut ColumnData, label: &str) -> usize {
    match data {
        ColumnData::Text(v) => fill_missing(v, label.to_string()),
        ColumnData::Category { categories, codes } => {
            if codes.iter().all(Option::is_some) {
                return 0;
            }
            let code = match categories.iter().position(|c| c == label) {
                Some(idx) => idx,
                None => {
                    categories.push(label.to_string());
                    categories.len() - 1
                }
            };
            fill_missing(codes, code as u32)
        }
        _ => 0,
    }
}

fn narrow_integers(values: &[Option<i64>]) -> Option<ColumnData> {
    let min = values.iter().flatten().min().copied()?;
    let max = values.iter().flatten().max().copied()?;
    if i8::try_from(min).is_ok() && i8::try_from(max).is_ok() {
        Some(ColumnData::Int8(
            values.iter().map(|v| v.and_then(|x| i8::try_from(x).ok())).collect(),
        ))
    } else if i16::try_from(min).is_ok() && i16::try_from(max).is_ok() {
        Some(ColumnData::Int16(
            values.iter().map(|v| v.and_then(|x| i16::try_from(x).ok())).collect(),
        ))
    } else if i32::try_from(min).is_ok() && i32::try_from(max).is_ok() {
        Some(ColumnData::Int32(
            values.iter().map(|v| v.and_then(|x| i32::try_from(x).ok())).collect(),
        ))
    } else {
        None
    }
}

fn narrow_floats(values: &[Option<f64>]) -> Option<ColumnData> {
    let exact = values
        .iter()
        .flatten()
        .all(|v| f64::from(*v as f32) == *v);
    exact.then(|| ColumnData::Float32(values.iter().map(|v| v.map(|x| x as f32)).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parsing_rejects_unknown_names() {
        assert_eq!("AUTO".parse::<CleaningStrategy>().unwrap(), CleaningStrategy::Auto);
        let err = "median".parse::<CleaningStrategy>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStrategy(name) if name == "median"));
    }

    #[test]
    fn sales_categories_are_left_closed() {
        assert_eq!(sales_category_code(0.0), Some(0));
        assert_eq!(sales_category_code(999.99), Some(0));
        assert_eq!(sales_category_code(1_000.0), Some(1));
        assert_eq!(sales_category_code(10_000.0), Some(3));
        assert_eq!(sales_category_code(-1.0), None);
    }

    #[test]
    fn quarters_cover_calendar_months_only() {
        assert_eq!(quarter_code(1.0), Some(0));
        assert_eq!(quarter_code(12.0), Some(3));
        assert_eq!(quarter_code(0.0), None);
        assert_eq!(quarter_code(13.0), None);
    }

    #[test]
    fn narrow_integers_picks_smallest_width() {
        let small = narrow_integers(&[Some(1), Some(127), None]).unwrap();
        assert_eq!(small.data_type(), DataType::Int8);
        let year = narrow_integers(&[Some(2003), Some(2005)]).unwrap();
        assert_eq!(year.data_type(), DataType::Int16);
        assert!(narrow_integers(&[Some(i64::MAX)]).is_none());
    }

    #[test]
    fn narrow_floats_requires_exact_round_trip() {
        assert!(narrow_floats(&[Some(0.5), Some(2.25)]).is_some());
        assert!(narrow_floats(&[Some(95.7)]).is_none());
    }

    #[test]
    fn operations_require_loaded_data() {
        let mut cleaner = SalesCleaner::new("unused.csv");
        let err = cleaner.remove_duplicates().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NotLoaded)
        ));
    }

    #[test]
    fn cleaning_log_path_uses_stem() {
        let path = cleaning_log_path(Path::new("data/processed/sales_data_cleaned.csv"));
        assert_eq!(
            path,
            PathBuf::from("data/processed/sales_data_cleaned_cleaning_log.txt")
        );
    }
}
