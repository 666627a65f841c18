//! Canned analytical queries over `sales_data`.
//!
//! Each demo returns a [`ResultSet`]; the stage driver previews the first
//! rows and logs the row counts.

use std::time::Instant;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::store::{ResultSet, SalesStore};

pub const WINDOW_FUNCTIONS_SQL: &str = r#"
WITH sales_ranked AS (
    SELECT
        ORDERNUMBER,
        CUSTOMERNAME,
        PRODUCTLINE,
        SALES,
        ORDERDATE,
        COUNTRY,
        ROW_NUMBER() OVER (PARTITION BY PRODUCTLINE ORDER BY SALES DESC) AS row_num,
        RANK() OVER (PARTITION BY COUNTRY ORDER BY SALES DESC) AS country_rank,
        DENSE_RANK() OVER (PARTITION BY YEAR_ID ORDER BY SALES DESC) AS year_dense_rank,
        LAG(SALES, 1) OVER (PARTITION BY CUSTOMERNAME ORDER BY ORDERDATE) AS prev_sale,
        LEAD(SALES, 1) OVER (PARTITION BY CUSTOMERNAME ORDER BY ORDERDATE) AS next_sale,
        AVG(SALES) OVER (
            PARTITION BY PRODUCTLINE
            ORDER BY ORDERDATE
            ROWS BETWEEN 2 PRECEDING AND CURRENT ROW
        ) AS moving_avg_3,
        SUM(SALES) OVER (PARTITION BY CUSTOMERNAME ORDER BY ORDERDATE) AS cumulative_sales,
        ROUND((SALES * 100.0) / SUM(SALES) OVER (PARTITION BY PRODUCTLINE), 2)
            AS pct_of_product_total
    FROM sales_data
    WHERE SALES > 0
)
SELECT
    ORDERNUMBER,
    CUSTOMERNAME,
    PRODUCTLINE,
    SALES,
    ORDERDATE,
    COUNTRY,
    row_num,
    country_rank,
    year_dense_rank,
    prev_sale,
    next_sale,
    ROUND(moving_avg_3, 2) AS moving_avg_3,
    ROUND(cumulative_sales, 2) AS cumulative_sales,
    pct_of_product_total
FROM sales_ranked
WHERE row_num <= 5
ORDER BY PRODUCTLINE, SALES DESC
"#;

pub const CTE_ANALYSIS_SQL: &str = r#"
WITH customer_product_sales AS (
    SELECT
        CUSTOMERNAME,
        PRODUCTLINE,
        COUNT(*) AS order_count,
        SUM(SALES) AS total_sales,
        AVG(SALES) AS avg_sales,
        MIN(SALES) AS min_sale,
        MAX(SALES) AS max_sale
    FROM sales_data
    WHERE STATUS = 'Shipped'
    GROUP BY CUSTOMERNAME, PRODUCTLINE
),
customer_ranking AS (
    SELECT
        CUSTOMERNAME,
        SUM(total_sales) AS customer_total_sales,
        COUNT(DISTINCT PRODUCTLINE) AS products_purchased,
        RANK() OVER (ORDER BY SUM(total_sales) DESC) AS customer_rank
    FROM customer_product_sales
    GROUP BY CUSTOMERNAME
),
quarterly_analysis AS (
    SELECT
        YEAR_ID,
        QTR_ID,
        PRODUCTLINE,
        COUNT(*) AS orders,
        SUM(SALES) AS quarterly_sales,
        AVG(SALES) AS avg_order_value,
        LAG(SUM(SALES)) OVER (PARTITION BY PRODUCTLINE ORDER BY YEAR_ID, QTR_ID)
            AS prev_quarter_sales
    FROM sales_data
    WHERE STATUS = 'Shipped'
    GROUP BY YEAR_ID, QTR_ID, PRODUCTLINE
),
growth_analysis AS (
    SELECT
        YEAR_ID,
        QTR_ID,
        PRODUCTLINE,
        orders,
        quarterly_sales,
        avg_order_value,
        prev_quarter_sales,
        CASE
            WHEN prev_quarter_sales IS NOT NULL
            THEN ROUND(((quarterly_sales - prev_quarter_sales) * 1.0 / prev_quarter_sales) * 100, 2)
            ELSE NULL
        END AS qoq_growth_pct
    FROM quarterly_analysis
)
SELECT
    cr.CUSTOMERNAME,
    cr.customer_total_sales,
    cr.customer_rank,
    cr.products_purchased,
    cps.PRODUCTLINE,
    cps.order_count,
    cps.total_sales AS product_sales,
    cps.avg_sales,
    ga.YEAR_ID,
    ga.QTR_ID,
    ga.quarterly_sales,
    ga.qoq_growth_pct
FROM customer_ranking cr
INNER JOIN customer_product_sales cps ON cr.CUSTOMERNAME = cps.CUSTOMERNAME
INNER JOIN growth_analysis ga ON cps.PRODUCTLINE = ga.PRODUCTLINE
WHERE cr.customer_rank <= 10
ORDER BY cr.customer_rank, cps.total_sales DESC
"#;

pub const SUBQUERIES_SQL: &str = r#"
SELECT
    s1.ORDERNUMBER,
    s1.CUSTOMERNAME,
    s1.PRODUCTLINE,
    s1.SALES,
    s1.ORDERDATE,
    (SELECT AVG(SALES) FROM sales_data s2
     WHERE s2.CUSTOMERNAME = s1.CUSTOMERNAME) AS customer_avg_sales,
    CASE
        WHEN EXISTS (
            SELECT 1 FROM sales_data s3
            WHERE s3.CUSTOMERNAME = s1.CUSTOMERNAME
              AND s3.SALES >= s1.SALES * 2
        ) THEN 'High Value Customer'
        ELSE 'Regular Customer'
    END AS customer_type,
    (SELECT COUNT(*) + 1 FROM sales_data s4
     WHERE s4.CUSTOMERNAME = s1.CUSTOMERNAME
       AND s4.SALES > s1.SALES) AS customer_rank,
    (SELECT COUNT(DISTINCT PRODUCTLINE) FROM sales_data s5
     WHERE s5.CUSTOMERNAME = s1.CUSTOMERNAME) AS unique_products,
    CASE
        WHEN s1.SALES > (
            SELECT AVG(SALES) FROM sales_data s6
            WHERE s6.CUSTOMERNAME != s1.CUSTOMERNAME
        ) THEN 'Above Average'
        ELSE 'Below Average'
    END AS performance_category
FROM sales_data s1
WHERE s1.STATUS = 'Shipped'
  AND s1.SALES > (SELECT AVG(SALES) FROM sales_data WHERE STATUS = 'Shipped')
ORDER BY s1.SALES DESC
LIMIT 50
"#;

pub const ADVANCED_JOINS_SQL: &str = r#"
WITH customer_summary AS (
    SELECT
        CUSTOMERNAME,
        COUNTRY,
        COUNT(*) AS total_orders,
        SUM(SALES) AS total_sales,
        AVG(SALES) AS avg_order_value
    FROM sales_data
    GROUP BY CUSTOMERNAME, COUNTRY
),
product_summary AS (
    SELECT
        PRODUCTLINE,
        COUNT(*) AS total_orders,
        SUM(SALES) AS total_revenue,
        AVG(SALES) AS avg_price
    FROM sales_data
    GROUP BY PRODUCTLINE
)
SELECT
    cs.CUSTOMERNAME,
    cs.COUNTRY,
    cs.total_orders AS customer_orders,
    cs.total_sales AS customer_sales,
    cs.avg_order_value,
    COUNT(cs2.CUSTOMERNAME) AS country_customers,
    AVG(cs2.total_sales) AS country_avg_sales,
    ps.PRODUCTLINE,
    ps.total_revenue AS product_revenue,
    ps.avg_price,
    ROUND((cs.total_sales * 100.0) / SUM(cs.total_sales) OVER (PARTITION BY cs.COUNTRY), 2)
        AS market_share_pct,
    CASE
        WHEN cs.total_sales > AVG(cs.total_sales) OVER (PARTITION BY cs.COUNTRY)
        THEN 'Above Country Average'
        ELSE 'Below Country Average'
    END AS country_performance
FROM customer_summary cs
LEFT JOIN customer_summary cs2
    ON cs.COUNTRY = cs2.COUNTRY
   AND cs.CUSTOMERNAME != cs2.CUSTOMERNAME
CROSS JOIN product_summary ps
WHERE cs.total_sales > (SELECT AVG(total_sales) FROM customer_summary)
GROUP BY cs.CUSTOMERNAME, cs.COUNTRY, cs.total_orders,
         cs.total_sales, cs.avg_order_value, ps.PRODUCTLINE,
         ps.total_revenue, ps.avg_price
ORDER BY cs.total_sales DESC
LIMIT 30
"#;

pub const PERFORMANCE_BASELINE_SQL: &str = r#"
SELECT
    CUSTOMERNAME,
    PRODUCTLINE,
    COUNT(*) AS orders,
    SUM(SALES) AS total_sales
FROM sales_data
WHERE STATUS = 'Shipped'
GROUP BY CUSTOMERNAME, PRODUCTLINE
ORDER BY total_sales DESC
"#;

pub const PERFORMANCE_OPTIMIZED_SQL: &str = r#"
WITH optimized_sales AS (
    SELECT CUSTOMERNAME, PRODUCTLINE, SALES
    FROM sales_data
    WHERE STATUS = 'Shipped'
      AND SALES > 0
)
SELECT
    CUSTOMERNAME,
    PRODUCTLINE,
    COUNT(*) AS orders,
    SUM(SALES) AS total_sales
FROM optimized_sales
GROUP BY CUSTOMERNAME, PRODUCTLINE
ORDER BY total_sales DESC
"#;

/// Every canned query keyed by name, in execution order.
pub const CANNED_QUERIES: &[(&str, &str)] = &[
    ("window_functions", WINDOW_FUNCTIONS_SQL),
    ("cte_complex_analysis", CTE_ANALYSIS_SQL),
    ("subqueries", SUBQUERIES_SQL),
    ("advanced_joins", ADVANCED_JOINS_SQL),
    ("performance_baseline", PERFORMANCE_BASELINE_SQL),
    ("performance_optimized", PERFORMANCE_OPTIMIZED_SQL),
];

fn run_named(store: &SalesStore, label: &str, sql: &str) -> Result<ResultSet> {
    let result = store
        .query(sql)
        .with_context(|| format!("Running {label} query"))?;
    info!("{label}: {} row(s)", result.len());
    Ok(result)
}

pub fn window_functions_demo(store: &SalesStore) -> Result<ResultSet> {
    run_named(store, "Window functions", WINDOW_FUNCTIONS_SQL)
}

pub fn cte_complex_analysis(store: &SalesStore) -> Result<ResultSet> {
    run_named(store, "CTE analysis", CTE_ANALYSIS_SQL)
}

pub fn subqueries_demo(store: &SalesStore) -> Result<ResultSet> {
    run_named(store, "Subqueries", SUBQUERIES_SQL)
}

pub fn advanced_joins_demo(store: &SalesStore) -> Result<ResultSet> {
    run_named(store, "Advanced joins", ADVANCED_JOINS_SQL)
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub query1_time: f64,
    pub query1_rows: usize,
    pub query2_time: f64,
    pub query2_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_pct: Option<f64>,
}

fn timed(store: &SalesStore, sql: &str) -> Result<(f64, usize)> {
    let started = Instant::now();
    let result = store.query(sql)?;
    Ok((started.elapsed().as_secs_f64(), result.len()))
}

/// Times the plain aggregate against the CTE-prefiltered one, once each.
pub fn performance_comparison(store: &SalesStore) -> Result<PerformanceReport> {
    let (query1_time, query1_rows) =
        timed(store, PERFORMANCE_BASELINE_SQL).context("Timing baseline query")?;
    let (query2_time, query2_rows) =
        timed(store, PERFORMANCE_OPTIMIZED_SQL).context("Timing optimized query")?;
    let improvement_pct = (query1_time > 0.0)
        .then(|| ((query1_time - query2_time) / query1_time * 100.0 * 100.0).round() / 100.0);
    let report = PerformanceReport {
        query1_time,
        query1_rows,
        query2_time,
        query2_rows,
        improvement_pct,
    };
    info!("Performance comparison: {report:?}");
    Ok(report)
}

pub fn query_plan(store: &SalesStore, sql: &str) -> Result<ResultSet> {
    store
        .query(&format!("EXPLAIN QUERY PLAN {}", sql.trim()))
        .context("Reading query plan")
}
