//! Dimension and metric extracts for downstream BI tooling.
//!
//! Every dataset excludes cancelled orders and lands as `<name>.csv` in the
//! export directory, next to `queries.json` with the analytical and extract
//! query texts.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::{io_utils, queries::CANNED_QUERIES, store::SalesStore};

pub const QUERIES_FILE: &str = "queries.json";

pub struct ExportSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub sql: &'static str,
}

pub const SALES_FACT_SQL: &str = r#"
SELECT
    ORDERNUMBER,
    ORDERDATE,
    CUSTOMERNAME,
    PRODUCTCODE,
    PRODUCTLINE,
    COUNTRY,
    CITY,
    SALES,
    QUANTITYORDERED,
    PRICEEACH,
    STATUS,
    DEALSIZE,
    YEAR_ID,
    MONTH_ID,
    QTR_ID,
    ORDERDATE_DAYOFWEEK,
    CASE WHEN ORDERDATE_DAYOFWEEK >= 5 THEN 1 ELSE 0 END AS IS_WEEKEND,
    ROUND(SALES / NULLIF(QUANTITYORDERED, 0), 2) AS SALES_PER_UNIT
FROM sales_data
WHERE STATUS != 'Cancelled'
ORDER BY ORDERDATE DESC
"#;

pub const DIM_CUSTOMERS_SQL: &str = r#"
SELECT
    CUSTOMERNAME,
    COUNTRY,
    CITY,
    COUNT(*) AS total_orders,
    ROUND(SUM(SALES), 2) AS total_sales,
    ROUND(AVG(SALES), 2) AS avg_order_value,
    MIN(ORDERDATE) AS first_order_date,
    MAX(ORDERDATE) AS last_order_date
FROM sales_data
WHERE STATUS != 'Cancelled'
GROUP BY CUSTOMERNAME, COUNTRY, CITY
ORDER BY total_sales DESC
"#;

pub const DIM_PRODUCTS_SQL: &str = r#"
SELECT
    PRODUCTCODE,
    PRODUCTLINE,
    COUNT(*) AS total_orders,
    ROUND(SUM(SALES), 2) AS total_sales,
    SUM(QUANTITYORDERED) AS total_quantity,
    ROUND(AVG(PRICEEACH), 2) AS avg_price,
    ROUND(AVG(SALES), 2) AS avg_order_value
FROM sales_data
WHERE STATUS != 'Cancelled'
GROUP BY PRODUCTCODE, PRODUCTLINE
ORDER BY total_sales DESC
"#;

pub const DIM_COUNTRIES_SQL: &str = r#"
SELECT
    COUNTRY,
    COUNT(DISTINCT CUSTOMERNAME) AS unique_customers,
    COUNT(*) AS total_orders,
    ROUND(SUM(SALES), 2) AS total_sales,
    ROUND(AVG(SALES), 2) AS avg_order_value,
    COUNT(DISTINCT PRODUCTCODE) AS unique_products
FROM sales_data
WHERE STATUS != 'Cancelled'
GROUP BY COUNTRY
ORDER BY total_sales DESC
"#;

pub const DIM_DATES_SQL: &str = r#"
WITH order_dates AS (
    SELECT DISTINCT
        ORDERDATE,
        CAST(strftime('%Y', ORDERDATE) AS INTEGER) AS YEAR,
        CAST(strftime('%m', ORDERDATE) AS INTEGER) AS MONTH,
        (CAST(strftime('%w', ORDERDATE) AS INTEGER) + 6) % 7 AS DAY_OF_WEEK
    FROM sales_data
    WHERE STATUS != 'Cancelled' AND ORDERDATE IS NOT NULL
)
SELECT
    ORDERDATE,
    YEAR,
    MONTH,
    (MONTH + 2) / 3 AS QUARTER,
    DAY_OF_WEEK,
    CASE WHEN DAY_OF_WEEK >= 5 THEN 1 ELSE 0 END AS IS_WEEKEND,
    CASE
        WHEN MONTH IN (12, 1, 2) THEN 'Winter'
        WHEN MONTH IN (3, 4, 5) THEN 'Spring'
        WHEN MONTH IN (6, 7, 8) THEN 'Summer'
        ELSE 'Fall'
    END AS SEASON
FROM order_dates
ORDER BY ORDERDATE
"#;

pub const SALES_METRICS_SQL: &str = r#"
WITH daily AS (
    SELECT
        DATE(ORDERDATE) AS period,
        SUM(SALES) AS total_sales,
        COUNT(*) AS order_count,
        COUNT(DISTINCT CUSTOMERNAME) AS customer_count
    FROM sales_data
    WHERE STATUS != 'Cancelled' AND ORDERDATE IS NOT NULL
    GROUP BY DATE(ORDERDATE)
),
monthly AS (
    SELECT
        printf('%04d-%02d-01', YEAR_ID, MONTH_ID) AS period,
        SUM(SALES) AS total_sales,
        COUNT(*) AS order_count,
        COUNT(DISTINCT CUSTOMERNAME) AS customer_count
    FROM sales_data
    WHERE STATUS != 'Cancelled'
    GROUP BY YEAR_ID, MONTH_ID
)
SELECT
    'Daily' AS aggregation_level,
    period,
    ROUND(total_sales, 2) AS total_sales,
    order_count,
    customer_count,
    ROUND(total_sales / NULLIF(order_count, 0), 2) AS avg_order_value
FROM daily
UNION ALL
SELECT
    'Monthly' AS aggregation_level,
    period,
    ROUND(total_sales, 2) AS total_sales,
    order_count,
    customer_count,
    ROUND(total_sales / NULLIF(order_count, 0), 2) AS avg_order_value
FROM monthly
ORDER BY period, aggregation_level
"#;

pub const CUSTOMER_METRICS_SQL: &str = r#"
WITH customer_totals AS (
    SELECT
        CUSTOMERNAME,
        COUNTRY,
        COUNT(*) AS order_count,
        ROUND(SUM(SALES), 2) AS total_sales,
        ROUND(AVG(SALES), 2) AS avg_order_value
    FROM sales_data
    WHERE STATUS != 'Cancelled'
    GROUP BY CUSTOMERNAME, COUNTRY
),
ranked AS (
    SELECT
        *,
        ROW_NUMBER() OVER (ORDER BY total_sales DESC) AS sales_rank,
        ROW_NUMBER() OVER (ORDER BY order_count DESC) AS order_rank
    FROM customer_totals
)
SELECT
    *,
    CASE
        WHEN sales_rank <= 10 THEN 'Top 10'
        WHEN sales_rank <= 50 THEN 'Top 50'
        WHEN sales_rank <= 100 THEN 'Top 100'
        ELSE 'Others'
    END AS customer_tier
FROM ranked
ORDER BY sales_rank
"#;

pub const PRODUCT_METRICS_SQL: &str = r#"
WITH product_totals AS (
    SELECT
        PRODUCTCODE,
        PRODUCTLINE,
        COUNT(*) AS order_count,
        ROUND(SUM(SALES), 2) AS total_sales,
        SUM(QUANTITYORDERED) AS total_quantity,
        ROUND(AVG(PRICEEACH), 2) AS avg_price
    FROM sales_data
    WHERE STATUS != 'Cancelled'
    GROUP BY PRODUCTCODE, PRODUCTLINE
),
ranked AS (
    SELECT
        *,
        ROW_NUMBER() OVER (ORDER BY total_sales DESC) AS sales_rank,
        ROW_NUMBER() OVER (ORDER BY total_quantity DESC) AS quantity_rank
    FROM product_totals
)
SELECT
    *,
    CASE
        WHEN sales_rank <= 10 THEN 'Top 10'
        WHEN sales_rank <= 25 THEN 'Top 25'
        WHEN sales_rank <= 50 THEN 'Top 50'
        ELSE 'Others'
    END AS product_tier
FROM ranked
ORDER BY sales_rank
"#;

pub const TEMPORAL_ANALYSIS_SQL: &str = r#"
SELECT
    YEAR_ID,
    MONTH_ID,
    QTR_ID,
    ORDERDATE_DAYOFWEEK,
    COUNT(*) AS order_count,
    ROUND(SUM(SALES), 2) AS total_sales,
    COUNT(DISTINCT CUSTOMERNAME) AS unique_customers,
    COUNT(DISTINCT PRODUCTCODE) AS unique_products,
    ROUND(AVG(SALES), 2) AS avg_order_value,
    SUM(QUANTITYORDERED) AS total_quantity
FROM sales_data
WHERE STATUS != 'Cancelled'
GROUP BY YEAR_ID, MONTH_ID, QTR_ID, ORDERDATE_DAYOFWEEK
ORDER BY YEAR_ID, MONTH_ID, ORDERDATE_DAYOFWEEK
"#;

pub const GEOGRAPHIC_ANALYSIS_SQL: &str = r#"
SELECT
    COUNTRY,
    CITY,
    COUNT(*) AS order_count,
    ROUND(SUM(SALES), 2) AS total_sales,
    COUNT(DISTINCT CUSTOMERNAME) AS unique_customers,
    COUNT(DISTINCT PRODUCTCODE) AS unique_products,
    ROUND(AVG(SALES), 2) AS avg_order_value,
    SUM(QUANTITYORDERED) AS total_quantity
FROM sales_data
WHERE STATUS != 'Cancelled'
GROUP BY COUNTRY, CITY
ORDER BY total_sales DESC
"#;

pub const EXPORTS: &[ExportSpec] = &[
    ExportSpec {
        name: "sales_fact",
        columns: &[
            "ORDERNUMBER",
            "ORDERDATE",
            "CUSTOMERNAME",
            "PRODUCTCODE",
            "PRODUCTLINE",
            "COUNTRY",
            "CITY",
            "SALES",
            "QUANTITYORDERED",
            "PRICEEACH",
            "STATUS",
            "DEALSIZE",
            "YEAR_ID",
            "MONTH_ID",
            "QTR_ID",
            "ORDERDATE_DAYOFWEEK",
        ],
        sql: SALES_FACT_SQL,
    },
    ExportSpec {
        name: "dim_customers",
        columns: &["CUSTOMERNAME", "COUNTRY", "CITY", "SALES", "ORDERDATE", "STATUS"],
        sql: DIM_CUSTOMERS_SQL,
    },
    ExportSpec {
        name: "dim_products",
        columns: &[
            "PRODUCTCODE",
            "PRODUCTLINE",
            "SALES",
            "QUANTITYORDERED",
            "PRICEEACH",
            "STATUS",
        ],
        sql: DIM_PRODUCTS_SQL,
    },
    ExportSpec {
        name: "dim_countries",
        columns: &["COUNTRY", "CUSTOMERNAME", "PRODUCTCODE", "SALES", "STATUS"],
        sql: DIM_COUNTRIES_SQL,
    },
    ExportSpec {
        name: "dim_dates",
        columns: &["ORDERDATE", "STATUS"],
        sql: DIM_DATES_SQL,
    },
    ExportSpec {
        name: "sales_metrics",
        columns: &[
            "ORDERDATE",
            "YEAR_ID",
            "MONTH_ID",
            "CUSTOMERNAME",
            "SALES",
            "STATUS",
        ],
        sql: SALES_METRICS_SQL,
    },
    ExportSpec {
        name: "customer_metrics",
        columns: &["CUSTOMERNAME", "COUNTRY", "SALES", "STATUS"],
        sql: CUSTOMER_METRICS_SQL,
    },
    ExportSpec {
        name: "product_metrics",
        columns: &[
            "PRODUCTCODE",
            "PRODUCTLINE",
            "SALES",
            "QUANTITYORDERED",
            "PRICEEACH",
            "STATUS",
        ],
        sql: PRODUCT_METRICS_SQL,
    },
    ExportSpec {
        name: "temporal_analysis",
        columns: &[
            "YEAR_ID",
            "MONTH_ID",
            "QTR_ID",
            "ORDERDATE_DAYOFWEEK",
            "CUSTOMERNAME",
            "PRODUCTCODE",
            "SALES",
            "QUANTITYORDERED",
            "STATUS",
        ],
        sql: TEMPORAL_ANALYSIS_SQL,
    },
    ExportSpec {
        name: "geographic_analysis",
        columns: &[
            "COUNTRY",
            "CITY",
            "CUSTOMERNAME",
            "PRODUCTCODE",
            "SALES",
            "QUANTITYORDERED",
            "STATUS",
        ],
        sql: GEOGRAPHIC_ANALYSIS_SQL,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct ExportedDataset {
    pub name: String,
    pub rows: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub datasets: Vec<ExportedDataset>,
    pub skipped: Vec<String>,
    pub queries: Option<PathBuf>,
}

/// Writes every extract whose source columns exist, then `queries.json`.
/// Extracts over absent columns are skipped with a warning.
pub fn export_all(store: &SalesStore, export_dir: &Path) -> Result<ExportSummary> {
    std::fs::create_dir_all(export_dir)
        .with_context(|| format!("Creating export directory {export_dir:?}"))?;
    let available = store.table_columns()?;
    let mut summary = ExportSummary::default();

    for spec in EXPORTS {
        let missing: Vec<&str> = spec
            .columns
            .iter()
            .copied()
            .filter(|col| !available.iter().any(|a| a == col))
            .collect();
        if !missing.is_empty() {
            warn!(
                "Skipping export {}: column(s) {} not present",
                spec.name,
                missing.join(", ")
            );
            summary.skipped.push(spec.name.to_string());
            continue;
        }
        let result = store
            .query(spec.sql)
            .with_context(|| format!("Building export {}", spec.name))?;
        let path = export_dir.join(format!("{}.csv", spec.name));
        result.write_csv(&path)?;
        info!("Exported {} ({} rows) to {path:?}", spec.name, result.len());
        summary.datasets.push(ExportedDataset {
            name: spec.name.to_string(),
            rows: result.len(),
            path,
        });
    }

    let queries_path = export_dir.join(QUERIES_FILE);
    write_queries(&queries_path)?;
    summary.queries = Some(queries_path);
    Ok(summary)
}

/// Canned analytical queries and extract queries keyed by name, pretty-printed.
pub fn write_queries(path: &Path) -> Result<()> {
    let queries: BTreeMap<&str, &str> = CANNED_QUERIES
        .iter()
        .copied()
        .chain(EXPORTS.iter().map(|spec| (spec.name, spec.sql)))
        .map(|(name, sql)| (name, sql.trim()))
        .collect();
    let json = serde_json::to_string_pretty(&queries).context("Serializing canned queries")?;
    io_utils::write_text_atomically(path, &json)?;
    info!("Query texts saved to {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData, Dataset};
    use tempfile::tempdir;

    fn text(values: &[&str]) -> ColumnData {
        ColumnData::Text(values.iter().map(|v| Some(v.to_string())).collect())
    }

    fn sample_store(with_city: bool) -> SalesStore {
        let mut columns = vec![
            Column::new("CUSTOMERNAME", text(&["A", "A", "B", "C"])),
            Column::new("COUNTRY", text(&["USA", "USA", "France", "France"])),
            Column::new("PRODUCTCODE", text(&["S1", "S2", "S1", "S3"])),
            Column::new("PRODUCTLINE", text(&["Ships", "Planes", "Ships", "Ships"])),
            Column::new(
                "SALES",
                ColumnData::Float64(vec![Some(100.0), Some(50.0), Some(70.0), Some(999.0)]),
            ),
            Column::new(
                "QUANTITYORDERED",
                ColumnData::Int64(vec![Some(2), Some(1), Some(3), Some(9)]),
            ),
            Column::new(
                "PRICEEACH",
                ColumnData::Float64(vec![Some(50.0), Some(50.0), Some(23.3), Some(111.0)]),
            ),
            Column::new(
                "ORDERDATE",
                text(&[
                    "2003-01-04 00:00:00",
                    "2003-07-07 00:00:00",
                    "2004-04-05 00:00:00",
                    "2004-12-01 00:00:00",
                ]),
            ),
            Column::new(
                "STATUS",
                text(&["Shipped", "Shipped", "Shipped", "Cancelled"]),
            ),
        ];
        columns.extend([
            Column::new(
                "ORDERNUMBER",
                ColumnData::Int64(vec![Some(10100), Some(10101), Some(10102), Some(10103)]),
            ),
            Column::new("DEALSIZE", text(&["Small", "Small", "Small", "Medium"])),
            Column::new(
                "YEAR_ID",
                ColumnData::Int64(vec![Some(2003), Some(2003), Some(2004), Some(2004)]),
            ),
            Column::new(
                "MONTH_ID",
                ColumnData::Int64(vec![Some(1), Some(7), Some(4), Some(12)]),
            ),
            Column::new(
                "QTR_ID",
                ColumnData::Int64(vec![Some(1), Some(3), Some(2), Some(4)]),
            ),
            Column::new(
                "ORDERDATE_DAYOFWEEK",
                ColumnData::Int64(vec![Some(5), Some(0), Some(0), Some(2)]),
            ),
        ]);
        if with_city {
            columns.push(Column::new("CITY", text(&["NYC", "NYC", "Paris", "Lyon"])));
        }
        let mut store = SalesStore::open_in_memory().unwrap();
        store.load_dataset(&Dataset::new(columns)).unwrap();
        store
    }

    #[test]
    fn dim_dates_assigns_seasons_and_weekends() {
        let store = sample_store(true);
        let dates = store.query(DIM_DATES_SQL).unwrap();
        assert_eq!(dates.len(), 3);
        assert_eq!(dates.text(0, "SEASON"), Some("Winter"));
        // 2003-01-04 was a Saturday.
        assert_eq!(dates.i64(0, "DAY_OF_WEEK"), Some(5));
        assert_eq!(dates.i64(0, "IS_WEEKEND"), Some(1));
        assert_eq!(dates.text(1, "SEASON"), Some("Summer"));
        assert_eq!(dates.i64(1, "QUARTER"), Some(3));
        assert_eq!(dates.text(2, "SEASON"), Some("Spring"));
    }

    #[test]
    fn customer_metrics_exclude_cancelled_orders() {
        let store = sample_store(true);
        let metrics = store.query(CUSTOMER_METRICS_SQL).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.text(0, "CUSTOMERNAME"), Some("A"));
        assert_eq!(metrics.f64(0, "total_sales"), Some(150.0));
        assert_eq!(metrics.i64(0, "sales_rank"), Some(1));
        assert_eq!(metrics.text(1, "customer_tier"), Some("Top 10"));
    }

    #[test]
    fn sales_fact_lists_open_lines_newest_first() {
        let store = sample_store(true);
        let fact = store.query(SALES_FACT_SQL).unwrap();
        assert_eq!(fact.len(), 3);
        assert_eq!(fact.text(0, "ORDERDATE"), Some("2004-04-05 00:00:00"));
        assert_eq!(fact.f64(0, "SALES_PER_UNIT"), Some(23.33));
        assert_eq!(fact.text(2, "CUSTOMERNAME"), Some("A"));
        assert_eq!(fact.i64(2, "IS_WEEKEND"), Some(1));
        assert_eq!(fact.i64(1, "IS_WEEKEND"), Some(0));
    }

    #[test]
    fn sales_metrics_interleaves_daily_and_monthly_rows() {
        let store = sample_store(true);
        let metrics = store.query(SALES_METRICS_SQL).unwrap();
        assert_eq!(metrics.len(), 6);
        assert_eq!(metrics.text(0, "aggregation_level"), Some("Monthly"));
        assert_eq!(metrics.text(0, "period"), Some("2003-01-01"));
        assert_eq!(metrics.text(1, "aggregation_level"), Some("Daily"));
        assert_eq!(metrics.text(1, "period"), Some("2003-01-04"));
        assert_eq!(metrics.f64(1, "avg_order_value"), Some(100.0));
        assert!(
            (0..metrics.len()).all(|row| metrics.text(row, "period") != Some("2004-12-01")),
            "cancelled order leaked into sales metrics"
        );
    }

    #[test]
    fn temporal_analysis_groups_by_calendar_slots() {
        let store = sample_store(true);
        let temporal = store.query(TEMPORAL_ANALYSIS_SQL).unwrap();
        assert_eq!(temporal.len(), 3);
        assert_eq!(temporal.i64(0, "YEAR_ID"), Some(2003));
        assert_eq!(temporal.i64(0, "MONTH_ID"), Some(1));
        assert_eq!(temporal.i64(0, "ORDERDATE_DAYOFWEEK"), Some(5));
        assert_eq!(temporal.i64(2, "QTR_ID"), Some(2));
        assert_eq!(temporal.i64(2, "total_quantity"), Some(3));
        assert_eq!(temporal.i64(2, "unique_customers"), Some(1));
    }

    #[test]
    fn export_all_writes_csvs_and_queries() {
        let store = sample_store(true);
        let dir = tempdir().unwrap();
        let summary = export_all(&store, dir.path()).unwrap();
        assert_eq!(summary.datasets.len(), EXPORTS.len());
        assert!(summary.skipped.is_empty());
        for name in [
            "sales_fact",
            "dim_products",
            "sales_metrics",
            "temporal_analysis",
        ] {
            assert!(dir.path().join(format!("{name}.csv")).exists(), "{name}");
        }

        let json = std::fs::read_to_string(dir.path().join(QUERIES_FILE)).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), CANNED_QUERIES.len() + EXPORTS.len());
        assert!(parsed["window_functions"].contains("ROW_NUMBER()"));
        assert!(parsed["sales_metrics"].contains("UNION ALL"));
    }

    #[test]
    fn export_all_skips_extracts_over_absent_columns() {
        let store = sample_store(false);
        let dir = tempdir().unwrap();
        let summary = export_all(&store, dir.path()).unwrap();
        assert_eq!(
            summary.skipped,
            vec!["sales_fact", "dim_customers", "geographic_analysis"]
        );
        assert!(!dir.path().join("dim_customers.csv").exists());
        assert!(summary.queries.is_some());
    }
}
