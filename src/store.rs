//! Embedded SQLite store holding the cleaned sales table.
//!
//! The table is rebuilt from scratch on every load inside a single
//! transaction, so readers either see the previous table or the complete new
//! one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};

use crate::{
    data::{Value, format_float},
    dataset::Dataset,
    error::PipelineError,
    io_utils, schema, table,
};

pub const TABLE_NAME: &str = "sales_data";

#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Secondary indexes created after every load.
pub const INDEXES: &[IndexSpec] = &[
    IndexSpec { name: "idx_orderdate", columns: &["ORDERDATE"] },
    IndexSpec { name: "idx_productline", columns: &["PRODUCTLINE"] },
    IndexSpec { name: "idx_country", columns: &["COUNTRY"] },
    IndexSpec { name: "idx_status", columns: &["STATUS"] },
    IndexSpec { name: "idx_year_month", columns: &["YEAR_ID", "MONTH_ID"] },
    IndexSpec { name: "idx_sales", columns: &["SALES"] },
    IndexSpec { name: "idx_customer", columns: &["CUSTOMERNAME"] },
];

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: Option<Value>) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(Value::Integer(i)) => SqlValue::Integer(i),
        Some(Value::Float(f)) => SqlValue::Real(f),
        Some(other) => SqlValue::Text(other.as_display()),
    }
}

pub fn render_sql_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => format_float(*f),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

/// Column names plus rows of SQL values returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn f64(&self, row: usize, column: &str) -> Option<f64> {
        match self.value(row, column)? {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn i64(&self, row: usize, column: &str) -> Option<i64> {
        match self.value(row, column)? {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        match self.value(row, column)? {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(render_sql_value).collect())
            .collect()
    }

    pub fn preview(&self, limit: usize) -> String {
        table::render_preview(&self.columns, &self.rendered_rows(), limit)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        io_utils::write_delimited(path, &self.columns, self.rendered_rows())
    }
}

pub struct SalesStore {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SalesStore {
    pub fn open(path: &Path) -> Result<Self> {
        io_utils::ensure_parent_dir(path)?;
        let conn =
            Connection::open(path).with_context(|| format!("Opening database {path:?}"))?;
        info!("Connected to database {path:?}");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Opening in-memory database")?;
        Ok(Self { path: None, conn })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads a cleaned delimited file and materializes it as `sales_data`.
    pub fn load_csv(&mut self, csv_path: &Path) -> Result<usize> {
        let delimiter = io_utils::resolve_input_delimiter(csv_path, None);
        let decoded = io_utils::read_delimited(csv_path, delimiter)?;
        if decoded.rows.is_empty() {
            return Err(PipelineError::EmptySource(csv_path.to_path_buf()).into());
        }
        let dataset = Dataset::new(schema::infer_columns(&decoded.headers, &decoded.rows));
        self.load_dataset(&dataset)
            .with_context(|| format!("Loading {csv_path:?} into {TABLE_NAME}"))
    }

    /// Drops and recreates `sales_data` from `dataset` in one transaction.
    pub fn load_dataset(&mut self, dataset: &Dataset) -> Result<usize> {
        let table = quote_identifier(TABLE_NAME);
        let definitions = dataset
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.data_type().sql_affinity()))
            .join(", ");
        let placeholders = vec!["?"; dataset.column_count()].join(", ");
        let insert_sql = format!("INSERT INTO {table} VALUES ({placeholders})");

        let tx = self.conn.transaction().context("Starting load transaction")?;
        tx.execute(&format!("DROP TABLE IF EXISTS {table}"), [])
            .context("Dropping previous table")?;
        tx.execute(&format!("CREATE TABLE {table} ({definitions})"), [])
            .context("Creating table")?;
        {
            let mut stmt = tx.prepare(&insert_sql).context("Preparing insert")?;
            for row in 0..dataset.row_count() {
                let values = dataset
                    .columns()
                    .iter()
                    .map(|c| to_sql_value(c.data.value(row)));
                stmt.execute(params_from_iter(values))
                    .with_context(|| format!("Inserting row {}", row + 1))?;
            }
        }
        tx.commit().context("Committing load transaction")?;
        info!("Table {TABLE_NAME} created with {} row(s)", dataset.row_count());
        Ok(dataset.row_count())
    }

    pub fn table_columns(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(TABLE_NAME)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Creates the fixed secondary indexes; indexes over absent columns are
    /// skipped with a warning. Returns the names that were created.
    pub fn create_indexes(&self) -> Result<Vec<String>> {
        let available = self.table_columns()?;
        let mut created = Vec::new();
        for spec in INDEXES {
            let missing: Vec<&str> = spec
                .columns
                .iter()
                .copied()
                .filter(|col| !available.iter().any(|a| a == col))
                .collect();
            if !missing.is_empty() {
                warn!(
                    "Skipping index {}: column(s) {} not present",
                    spec.name,
                    missing.join(", ")
                );
                continue;
            }
            let columns = spec
                .columns
                .iter()
                .map(|c| quote_identifier(c))
                .join(", ");
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({columns})",
                spec.name,
                quote_identifier(TABLE_NAME)
            );
            match self.conn.execute(&sql, []) {
                Ok(_) => {
                    info!("Index created: {}", spec.name);
                    created.push(spec.name.to_string());
                }
                Err(err) => warn!("Could not create index {}: {err}", spec.name),
            }
        }
        Ok(created)
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_identifier(TABLE_NAME)),
                [],
                |row| row.get(0),
            )
            .context("Counting rows")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn query(&self, sql: &str) -> Result<ResultSet> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Preparing query: {}", first_line(sql)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut cursor = stmt.query([]).context("Executing query")?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().context("Fetching row")? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(row.get::<_, SqlValue>(idx)?);
            }
            rows.push(values);
        }
        Ok(ResultSet { columns, rows })
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("Closing database")?;
        info!("Database connection closed");
        Ok(())
    }
}

fn first_line(sql: &str) -> &str {
    sql.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}
