//! Markdown reports: the exploratory summary and the final project report.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::{
    data::DATETIME_OUTPUT_FORMAT,
    explore::{
        BasicStatistics, CorrelationAnalysis, CustomerAnalysis, ProductAnalysis,
        TemporalAnalysis,
    },
    stats::Describe,
    table,
};

/// Sections available to the exploratory report; only `basic` is mandatory.
pub struct AnalysisSections<'a> {
    pub basic: &'a BasicStatistics,
    pub temporal: Option<&'a TemporalAnalysis>,
    pub product: Option<&'a ProductAnalysis>,
    pub customer: Option<&'a CustomerAnalysis>,
    pub correlation: Option<&'a CorrelationAnalysis>,
}

/// Formats an amount with thousands separators and a fixed number of
/// decimals, e.g. `1234567.891` with 2 decimals as `1,234,567.89`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3);
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn money(value: f64) -> String {
    format!("${}", group_thousands(value, 2))
}

pub fn analysis_report(sections: &AnalysisSections<'_>) -> String {
    let info = &sections.basic.dataset_info;
    let mut out = String::new();
    let _ = writeln!(out, "# Sales Exploratory Analysis Report");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);

    let _ = writeln!(out, "## Executive Summary");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "- **Total records**: {}",
        group_thousands(info.total_rows as f64, 0)
    );
    let _ = writeln!(out, "- **Total columns**: {}", info.total_columns);
    let _ = writeln!(out, "- **Numeric columns**: {}", info.numeric_columns);
    let _ = writeln!(out, "- **Categorical columns**: {}", info.categorical_columns);
    if let Some(sales) = &sections.basic.sales_statistics {
        let _ = writeln!(out, "- **Total sales**: {}", money(sales.total_sales));
        if let Some(avg) = sales.avg_sales {
            let _ = writeln!(out, "- **Average sale**: {}", money(avg));
        }
        if let Some(median) = sales.median_sales {
            let _ = writeln!(out, "- **Median sale**: {}", money(median));
        }
        if let (Some(skew), Some(kurt)) = (sales.sales_skewness, sales.sales_kurtosis) {
            let _ = writeln!(
                out,
                "- **Distribution shape**: skewness {skew:.2}, excess kurtosis {kurt:.2}"
            );
        }
    }
    let _ = writeln!(out);

    if !sections.basic.numeric_summary.is_empty() {
        let _ = writeln!(out, "### Numeric Summary");
        let _ = writeln!(out);
        let rows: Vec<Vec<String>> = sections
            .basic
            .numeric_summary
            .iter()
            .map(Describe::render_row)
            .collect();
        out.push_str(&table::render_markdown_table(&Describe::headers(), &rows));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Key Insights");
    let _ = writeln!(out);

    if let Some(product) = sections.product {
        let _ = writeln!(out, "### Products");
        if !product.productline_summary.is_empty() {
            let _ = writeln!(
                out,
                "- Product line analysis completed for {} line(s)",
                product.productline_summary.len()
            );
            if let Some(best) = product
                .productline_summary
                .iter()
                .max_by(|a, b| a.sales_sum.total_cmp(&b.sales_sum))
            {
                let _ = writeln!(
                    out,
                    "- Top product line: **{}** ({})",
                    best.product_line,
                    money(best.sales_sum)
                );
            }
        }
        if let Some(top) = product.top_products.first() {
            let _ = writeln!(
                out,
                "- Best-selling product: **{}** ({})",
                top.product_code,
                money(top.sales)
            );
        }
        let _ = writeln!(out);
    }

    if let Some(customer) = sections.customer {
        let _ = writeln!(out, "### Customers");
        if let Some(top) = customer.top_customers.first() {
            let _ = writeln!(
                out,
                "- Highest-value customer: **{}** ({})",
                top.customer,
                money(top.sales)
            );
        }
        if let Some(country) = customer
            .country_analysis
            .iter()
            .max_by(|a, b| a.sales_sum.total_cmp(&b.sales_sum))
        {
            let _ = writeln!(
                out,
                "- Leading country: **{}** ({})",
                country.country,
                money(country.sales_sum)
            );
        }
        let _ = writeln!(
            out,
            "- {} customer(s) across {} country(ies)",
            customer.customer_summary.len(),
            customer.country_analysis.len()
        );
        let _ = writeln!(out);
    }

    if let Some(temporal) = sections.temporal {
        let _ = writeln!(out, "### Temporal Analysis");
        if let Some(year) = temporal
            .yearly_sales
            .iter()
            .max_by(|a, b| a.sum.total_cmp(&b.sum))
        {
            let _ = writeln!(out, "- Strongest year: **{}** ({})", year.year, money(year.sum));
        }
        if let Some((month, mean)) = temporal
            .monthly_average
            .iter()
            .filter_map(|m| Some((m.month, m.mean?)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            let _ = writeln!(
                out,
                "- Highest average sale by month: month {month} ({})",
                money(mean)
            );
        }
        if let Some(day) = temporal
            .day_of_week_sales
            .iter()
            .max_by(|a, b| a.sum.total_cmp(&b.sum))
        {
            let _ = writeln!(out, "- Busiest weekday: **{}** ({})", day.day, money(day.sum));
        }
        let _ = writeln!(out);
    }

    if let Some(correlation) = sections.correlation {
        let _ = writeln!(out, "### Correlations");
        let strongest = correlation
            .sales_correlations
            .iter()
            .filter(|c| c.column != "SALES")
            .filter_map(|c| Some((c.column.as_str(), c.correlation?)))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));
        match strongest {
            Some((column, r)) => {
                let _ = writeln!(out, "- Strongest relationship with SALES: **{column}** (r = {r:.2})");
            }
            None => {
                let _ = writeln!(out, "- No numeric column correlates with SALES");
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Recommendations");
    let _ = writeln!(out);
    let _ = writeln!(out, "1. **Focus on high-performing products**");
    let _ = writeln!(out, "2. **Develop retention strategies for top customers**");
    let _ = writeln!(out, "3. **Tune pricing using the correlation analysis**");
    let _ = writeln!(out, "4. **Plan inventory around seasonal demand**");
    out
}

/// One file the pipeline is expected to produce.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub description: &'static str,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, description: &'static str) -> Self {
        Self {
            path: path.into(),
            description,
        }
    }
}

pub struct FinalReport<'a> {
    pub generated_at: NaiveDateTime,
    pub version: &'a str,
    pub data: &'a [Artifact],
    pub visualizations: &'a [Artifact],
    pub reports: &'a [Artifact],
}

fn artifact_lines(out: &mut String, heading: &str, artifacts: &[Artifact]) {
    let _ = writeln!(out, "### {heading}");
    for artifact in artifacts {
        let marker = if artifact.path.exists() {
            ""
        } else {
            " (not generated)"
        };
        let _ = writeln!(
            out,
            "- `{}` - {}{marker}",
            artifact.path.display(),
            artifact.description
        );
    }
    let _ = writeln!(out);
}

pub fn final_project_report(report: &FinalReport<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Final Report - Sales Analysis Project");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Execution date**: {}",
        report.generated_at.format(DATETIME_OUTPUT_FORMAT)
    );
    let _ = writeln!(out, "**Project version**: {}", report.version);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Executive Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "This run exercised the following techniques:");
    let _ = writeln!(out);
    let _ = writeln!(out, "### Advanced SQL");
    let _ = writeln!(out, "- **Window functions**: ROW_NUMBER(), RANK(), DENSE_RANK(), LAG(), LEAD()");
    let _ = writeln!(out, "- **CTEs**: common table expressions for multi-step analysis");
    let _ = writeln!(out, "- **Subqueries**: correlated, EXISTS, IN and aggregate comparisons");
    let _ = writeln!(out, "- **Joins**: self joins and cross joins");
    let _ = writeln!(out, "- **Optimization**: secondary indexes and query plans");
    let _ = writeln!(out);
    let _ = writeln!(out, "### Data Processing");
    let _ = writeln!(out, "- **Cleaning**: automatic, drop and fill strategies for missing values");
    let _ = writeln!(out, "- **Type optimization**: integer and float narrowing, categorical encoding");
    let _ = writeln!(out, "- **Visualizations**: SVG charts and an interactive HTML dashboard");
    let _ = writeln!(out, "- **Exploratory analysis**: descriptive statistics and correlations");
    let _ = writeln!(out);
    let _ = writeln!(out, "### Engineering Practices");
    let _ = writeln!(out, "- **Logging**: structured, timestamped run log");
    let _ = writeln!(out, "- **Error handling**: typed domain errors with context");
    let _ = writeln!(out, "- **Testing**: unit, integration and property tests");
    let _ = writeln!(out, "- **Atomic outputs**: every artifact is replaced in a single rename");
    let _ = writeln!(out);

    let _ = writeln!(out, "## Generated Files");
    let _ = writeln!(out);
    artifact_lines(&mut out, "Data", report.data);
    artifact_lines(&mut out, "Visualizations", report.visualizations);
    artifact_lines(&mut out, "Reports", report.reports);

    let _ = writeln!(out, "## Key Business Insights");
    let _ = writeln!(out);
    let _ = writeln!(out, "1. **Temporal patterns**: seasonality in monthly sales");
    let _ = writeln!(out, "2. **Star products**: the most profitable product lines");
    let _ = writeln!(out, "3. **Key customers**: segmentation of customers by value");
    let _ = writeln!(out, "4. **Correlations**: relationships between sales variables");
    let _ = writeln!(out, "5. **Optimization**: opportunities in pricing and order quantities");
    let _ = writeln!(out);

    let _ = writeln!(out, "## Recommendations");
    let _ = writeln!(out);
    let _ = writeln!(out, "1. **Focus on high-performing products**");
    let _ = writeln!(out, "2. **Develop retention strategies for top customers**");
    let _ = writeln!(out, "3. **Tune pricing using the correlation analysis**");
    let _ = writeln!(out, "4. **Plan inventory around seasonal demand**");
    let _ = writeln!(out, "5. **Publish the dashboard exports to a BI tool**");
    let _ = writeln!(out);

    let _ = writeln!(out, "## Next Steps");
    let _ = writeln!(out);
    let _ = writeln!(out, "1. **BI dashboard**: build visuals on the exported dimension tables");
    let _ = writeln!(out, "2. **Predictive analysis**: forecast demand per product line");
    let _ = writeln!(out, "3. **Automation**: schedule the pipeline");
    let _ = writeln!(out, "4. **Monitoring**: alert on data quality regressions");
    let _ = writeln!(out, "5. **Scalability**: prepare for larger datasets");
    let _ = writeln!(out);

    let _ = writeln!(out, "## Conclusion");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "The pipeline cleaned the raw sales extract, loaded it into SQLite, ran the analytical"
    );
    let _ = writeln!(
        out,
        "queries and produced the exploratory charts and reports listed above."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "---");
    let _ = writeln!(out, "**Project completed successfully**");
    out
}
