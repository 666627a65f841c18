//! Exploratory analysis over the cleaned sales table.
//!
//! [`SalesExplorer`] re-reads the cleaned file, keeps every computed section
//! so the Markdown report can summarize whatever ran, and renders the SVG
//! charts and the HTML dashboard into its output directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Datelike, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregate::{GroupAccumulator, group_by_text},
    charts::{self, Panel, PanelKind, truncate_label},
    dashboard,
    data::parse_timestamp,
    dataset::{Column, ColumnData, Dataset},
    error::PipelineError,
    io_utils, report,
    schema::{self, DataType},
    stats::{ColumnStats, Describe, pearson},
};

pub const TEMPORAL_CHART: &str = "temporal_analysis.svg";
pub const PRODUCT_CHART: &str = "product_analysis.svg";
pub const CUSTOMER_CHART: &str = "customer_analysis.svg";
pub const CORRELATION_CHART: &str = "correlation_analysis.svg";
pub const DASHBOARD_FILE: &str = "interactive_dashboard.html";
pub const ANALYSIS_REPORT_FILE: &str = "analysis_report.md";

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SALES: &str = "SALES";
const ORDER_DATE: &str = "ORDERDATE";
const ORDER_NUMBER: &str = "ORDERNUMBER";
const PRODUCT_LINE: &str = "PRODUCTLINE";
const PRODUCT_CODE: &str = "PRODUCTCODE";
const QUANTITY: &str = "QUANTITYORDERED";
const PRICE: &str = "PRICEEACH";
const CUSTOMER: &str = "CUSTOMERNAME";
const COUNTRY: &str = "COUNTRY";

const TOP_N: usize = 10;
const HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetInfo {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnTally {
    pub column: String,
    pub missing: usize,
    pub unique: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesStatistics {
    pub total_sales: f64,
    pub avg_sales: Option<f64>,
    pub median_sales: Option<f64>,
    pub sales_std: Option<f64>,
    pub min_sales: Option<f64>,
    pub max_sales: Option<f64>,
    pub sales_skewness: Option<f64>,
    pub sales_kurtosis: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasicStatistics {
    pub dataset_info: DatasetInfo,
    pub numeric_summary: Vec<Describe>,
    pub columns: Vec<ColumnTally>,
    pub sales_statistics: Option<SalesStatistics>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearlySales {
    pub year: i32,
    pub sum: f64,
    pub mean: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub sum: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyAverage {
    pub month: u32,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdaySales {
    pub day: String,
    pub sum: f64,
    pub mean: Option<f64>,
    pub count: usize,
}

/// Sales grouped by calendar period. Weekdays are listed Monday first.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TemporalAnalysis {
    pub yearly_sales: Vec<YearlySales>,
    pub monthly_sales: Vec<MonthlySales>,
    pub monthly_average: Vec<MonthlyAverage>,
    pub day_of_week_sales: Vec<WeekdaySales>,
}

impl TemporalAnalysis {
    pub fn is_empty(&self) -> bool {
        self.yearly_sales.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductLineSummary {
    pub product_line: String,
    pub sales_sum: f64,
    pub sales_mean: Option<f64>,
    pub sales_count: usize,
    pub quantity_sum: f64,
    pub quantity_mean: Option<f64>,
    pub price_mean: Option<f64>,
    pub price_std: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopProduct {
    pub product_code: String,
    pub sales: f64,
    pub quantity: f64,
    pub product_line: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProductAnalysis {
    pub productline_summary: Vec<ProductLineSummary>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerSummary {
    pub customer: String,
    pub sales_sum: f64,
    pub sales_mean: Option<f64>,
    pub sales_count: usize,
    pub quantity_sum: f64,
    pub product_lines: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerTotal {
    pub customer: String,
    pub sales: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountrySummary {
    pub country: String,
    pub sales_sum: f64,
    pub sales_mean: Option<f64>,
    pub sales_count: usize,
    pub customers: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CustomerAnalysis {
    pub customer_summary: Vec<CustomerSummary>,
    pub top_customers: Vec<CustomerTotal>,
    pub country_analysis: Vec<CountrySummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesCorrelation {
    pub column: String,
    pub correlation: Option<f64>,
}

/// Pairwise-complete Pearson correlations; `None` where a column is constant.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CorrelationAnalysis {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
    pub sales_correlations: Vec<SalesCorrelation>,
}

impl CorrelationAnalysis {
    pub fn get(&self, left: &str, right: &str) -> Option<f64> {
        let row = self.columns.iter().position(|c| c == left)?;
        let col = self.columns.iter().position(|c| c == right)?;
        self.matrix.get(row)?.get(col).copied().flatten()
    }
}

pub struct SalesExplorer {
    source: PathBuf,
    output_dir: PathBuf,
    dataset: Option<Dataset>,
    basic: Option<BasicStatistics>,
    temporal: Option<TemporalAnalysis>,
    product: Option<ProductAnalysis>,
    customer: Option<CustomerAnalysis>,
    correlation: Option<CorrelationAnalysis>,
}

impl SalesExplorer {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            dataset: None,
            basic: None,
            temporal: None,
            product: None,
            customer: None,
            correlation: None,
        }
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn basic(&self) -> Option<&BasicStatistics> {
        self.basic.as_ref()
    }

    pub fn temporal(&self) -> Option<&TemporalAnalysis> {
        self.temporal.as_ref()
    }

    pub fn product(&self) -> Option<&ProductAnalysis> {
        self.product.as_ref()
    }

    pub fn customer(&self) -> Option<&CustomerAnalysis> {
        self.customer.as_ref()
    }

    pub fn correlation(&self) -> Option<&CorrelationAnalysis> {
        self.correlation.as_ref()
    }

    fn loaded(&self) -> Result<&Dataset> {
        self.dataset
            .as_ref()
            .ok_or_else(|| PipelineError::NotLoaded.into())
    }

    /// Reads the cleaned file, re-inferring column types and parsing every
    /// column whose name mentions DATE. Earlier results are discarded.
    pub fn load(&mut self) -> Result<&Dataset> {
        let delimiter = io_utils::resolve_input_delimiter(&self.source, None);
        let decoded = io_utils::read_delimited(&self.source, delimiter)?;
        let mut dataset = Dataset::new(schema::infer_columns(&decoded.headers, &decoded.rows));
        parse_date_columns(&mut dataset);
        info!(
            "Loaded {} row(s) and {} column(s) for exploration",
            dataset.row_count(),
            dataset.column_count()
        );
        self.basic = None;
        self.temporal = None;
        self.product = None;
        self.customer = None;
        self.correlation = None;
        let dataset: &Dataset = self.dataset.insert(dataset);
        Ok(dataset)
    }

    pub fn basic_statistics(&mut self) -> Result<BasicStatistics> {
        let dataset = self.loaded()?;
        let numeric: Vec<&Column> = dataset.numeric_columns().collect();
        let categorical = dataset
            .columns()
            .iter()
            .filter(|c| c.data_type().is_textual())
            .count();
        let numeric_summary = numeric
            .iter()
            .map(|c| ColumnStats::from_values(c.data.numeric_values()).describe(&c.name))
            .collect();
        let columns = dataset
            .columns()
            .iter()
            .map(|c| ColumnTally {
                column: c.name.clone(),
                missing: c.null_count(),
                unique: c.data.distinct_count(),
            })
            .collect();
        let sales_statistics = dataset
            .column(SALES)
            .filter(|c| c.data_type().is_numeric())
            .map(|c| {
                let stats = ColumnStats::from_values(c.data.numeric_values());
                SalesStatistics {
                    total_sales: stats.sum(),
                    avg_sales: stats.mean(),
                    median_sales: stats.median(),
                    sales_std: stats.std_dev(),
                    min_sales: stats.min(),
                    max_sales: stats.max(),
                    sales_skewness: stats.skewness(),
                    sales_kurtosis: stats.kurtosis(),
                }
            });

        let statistics = BasicStatistics {
            dataset_info: DatasetInfo {
                total_rows: dataset.row_count(),
                total_columns: dataset.column_count(),
                numeric_columns: numeric.len(),
                categorical_columns: categorical,
            },
            numeric_summary,
            columns,
            sales_statistics,
        };
        info!(
            "Basic statistics computed for {} row(s)",
            statistics.dataset_info.total_rows
        );
        self.basic = Some(statistics.clone());
        Ok(statistics)
    }

    /// Groups sales by year, year and month, calendar month and weekday.
    /// Without a parsed ORDERDATE column the result is empty and nothing is
    /// recorded.
    pub fn temporal_analysis(&mut self, save: bool) -> Result<TemporalAnalysis> {
        let dataset = self.loaded()?;
        let Some(dates) = dataset
            .column(ORDER_DATE)
            .filter(|c| c.data_type() == DataType::DateTime)
        else {
            warn!("Column {ORDER_DATE} not found; temporal analysis skipped");
            return Ok(TemporalAnalysis::default());
        };
        let sales = sales_column(dataset)?;

        let mut yearly = GroupAccumulator::new();
        let mut monthly = GroupAccumulator::new();
        let mut by_month = GroupAccumulator::new();
        let mut weekdays = GroupAccumulator::new();
        for row in 0..dataset.row_count() {
            let Some(date) = dates.data.datetime_at(row) else {
                continue;
            };
            let value = sales.f64_at(row);
            yearly.row(date.year()).add_metric(SALES, value);
            monthly.row((date.year(), date.month())).add_metric(SALES, value);
            by_month.row(date.month()).add_metric(SALES, value);
            weekdays
                .row(date.weekday().num_days_from_monday())
                .add_metric(SALES, value);
        }

        let analysis = TemporalAnalysis {
            yearly_sales: yearly
                .iter()
                .map(|(year, entry)| YearlySales {
                    year: *year,
                    sum: entry.sum(SALES),
                    mean: entry.mean(SALES),
                    count: entry.count(SALES),
                })
                .collect(),
            monthly_sales: monthly
                .iter()
                .map(|((year, month), entry)| MonthlySales {
                    year: *year,
                    month: *month,
                    sum: entry.sum(SALES),
                })
                .collect(),
            monthly_average: by_month
                .iter()
                .map(|(month, entry)| MonthlyAverage {
                    month: *month,
                    mean: entry.mean(SALES),
                })
                .collect(),
            day_of_week_sales: weekdays
                .iter()
                .map(|(day, entry)| WeekdaySales {
                    day: weekday_name(*day).to_string(),
                    sum: entry.sum(SALES),
                    mean: entry.mean(SALES),
                    count: entry.count(SALES),
                })
                .collect(),
        };

        if save {
            charts::render_grid(
                &self.output_path(TEMPORAL_CHART),
                "Temporal Sales Analysis",
                &temporal_panels(&analysis),
            )?;
        }
        info!("Temporal analysis completed");
        self.temporal = Some(analysis.clone());
        Ok(analysis)
    }

    pub fn product_analysis(&mut self, save: bool) -> Result<ProductAnalysis> {
        let dataset = self.loaded()?;
        let sales = sales_column(dataset)?;
        let quantity = dataset.column(QUANTITY);
        let price = dataset.column(PRICE);

        let lines = group_by_text(dataset, PRODUCT_LINE, |entry, row| {
            entry.add_metric(SALES, sales.f64_at(row));
            entry.add_metric(QUANTITY, metric_at(quantity, row));
            entry.add_metric(PRICE, metric_at(price, row));
        });
        let productline_summary = lines
            .iter()
            .map(|(line, entry)| ProductLineSummary {
                product_line: line.clone(),
                sales_sum: round2(entry.sum(SALES)),
                sales_mean: entry.mean(SALES).map(round2),
                sales_count: entry.count(SALES),
                quantity_sum: round2(entry.sum(QUANTITY)),
                quantity_mean: entry.mean(QUANTITY).map(round2),
                price_mean: entry.mean(PRICE).map(round2),
                price_std: entry.std_dev(PRICE).map(round2),
            })
            .collect();

        let top_products = if dataset.has_column(PRODUCT_LINE) {
            let line_column = dataset.column(PRODUCT_LINE);
            let products = group_by_text(dataset, PRODUCT_CODE, |entry, row| {
                entry.add_metric(SALES, sales.f64_at(row));
                entry.add_metric(QUANTITY, metric_at(quantity, row));
                entry.keep_first(PRODUCT_LINE, line_column.and_then(|c| c.data.text_at(row)));
            });
            products
                .ranked_by(SALES)
                .into_iter()
                .take(TOP_N)
                .map(|(code, entry)| TopProduct {
                    product_code: code.clone(),
                    sales: entry.sum(SALES),
                    quantity: entry.sum(QUANTITY),
                    product_line: entry.first(PRODUCT_LINE).map(str::to_string),
                })
                .collect()
        } else {
            Vec::new()
        };

        let analysis = ProductAnalysis {
            productline_summary,
            top_products,
        };
        if save {
            charts::render_grid(
                &self.output_path(PRODUCT_CHART),
                "Product Analysis",
                &product_panels(dataset, &analysis),
            )?;
        }
        info!("Product analysis completed");
        self.product = Some(analysis.clone());
        Ok(analysis)
    }

    pub fn customer_analysis(&mut self, save: bool) -> Result<CustomerAnalysis> {
        let dataset = self.loaded()?;
        let sales = sales_column(dataset)?;
        let quantity = dataset.column(QUANTITY);
        let line_column = dataset.column(PRODUCT_LINE);
        let order_column = dataset.column(ORDER_NUMBER);
        let customer_column = dataset.column(CUSTOMER);

        let customers = group_by_text(dataset, CUSTOMER, |entry, row| {
            entry.add_metric(SALES, sales.f64_at(row));
            entry.add_metric(QUANTITY, metric_at(quantity, row));
            entry.add_distinct(PRODUCT_LINE, line_column.and_then(|c| c.data.text_at(row)));
            let order = cell_text(order_column, row);
            entry.add_distinct(ORDER_NUMBER, order.as_deref());
        });
        let countries = group_by_text(dataset, COUNTRY, |entry, row| {
            entry.add_metric(SALES, sales.f64_at(row));
            entry.add_distinct(CUSTOMER, customer_column.and_then(|c| c.data.text_at(row)));
        });

        let analysis = CustomerAnalysis {
            customer_summary: customers
                .iter()
                .map(|(name, entry)| CustomerSummary {
                    customer: name.clone(),
                    sales_sum: round2(entry.sum(SALES)),
                    sales_mean: entry.mean(SALES).map(round2),
                    sales_count: entry.count(SALES),
                    quantity_sum: round2(entry.sum(QUANTITY)),
                    product_lines: entry.distinct_count(PRODUCT_LINE),
                })
                .collect(),
            top_customers: customers
                .ranked_by(SALES)
                .into_iter()
                .take(TOP_N)
                .map(|(name, entry)| CustomerTotal {
                    customer: name.clone(),
                    sales: entry.sum(SALES),
                })
                .collect(),
            country_analysis: countries
                .iter()
                .map(|(country, entry)| CountrySummary {
                    country: country.clone(),
                    sales_sum: round2(entry.sum(SALES)),
                    sales_mean: entry.mean(SALES).map(round2),
                    sales_count: entry.count(SALES),
                    customers: entry.distinct_count(CUSTOMER),
                })
                .collect(),
        };

        if save {
            let order_counts: Vec<(f64, f64)> = customers
                .iter()
                .map(|(_, entry)| (entry.distinct_count(ORDER_NUMBER) as f64, entry.sum(SALES)))
                .collect();
            charts::render_grid(
                &self.output_path(CUSTOMER_CHART),
                "Customer Analysis",
                &customer_panels(&analysis, order_counts),
            )?;
        }
        info!("Customer analysis completed");
        self.customer = Some(analysis.clone());
        Ok(analysis)
    }

    pub fn correlation_analysis(&mut self, save: bool) -> Result<CorrelationAnalysis> {
        let dataset = self.loaded()?;
        let rows = dataset.row_count();
        let numeric: Vec<&Column> = dataset.numeric_columns().collect();
        let series: Vec<Vec<Option<f64>>> = numeric
            .iter()
            .map(|c| (0..rows).map(|row| c.data.f64_at(row)).collect())
            .collect();

        let n = series.len();
        let mut matrix = vec![vec![None; n]; n];
        for i in 0..n {
            matrix[i][i] = pearson(&series[i], &series[i]).map(|_| 1.0);
            for j in (i + 1)..n {
                let r = pearson(&series[i], &series[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }
        let columns: Vec<String> = numeric.iter().map(|c| c.name.clone()).collect();

        let mut sales_correlations: Vec<SalesCorrelation> = columns
            .iter()
            .position(|c| c == SALES)
            .map(|idx| {
                columns
                    .iter()
                    .zip(&matrix[idx])
                    .map(|(column, r)| SalesCorrelation {
                        column: column.clone(),
                        correlation: *r,
                    })
                    .collect()
            })
            .unwrap_or_default();
        sales_correlations.sort_by(|a, b| match (a.correlation, b.correlation) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let analysis = CorrelationAnalysis {
            columns,
            matrix,
            sales_correlations,
        };
        if save {
            charts::render_heatmap(
                &self.output_path(CORRELATION_CHART),
                "Correlation Matrix of Numeric Variables",
                &analysis.columns,
                &analysis.matrix,
            )?;
        }
        info!(
            "Correlation matrix computed over {} numeric column(s)",
            analysis.columns.len()
        );
        self.correlation = Some(analysis.clone());
        Ok(analysis)
    }

    pub fn create_interactive_dashboard(&self) -> Result<PathBuf> {
        let dataset = self.loaded()?;
        let path = self.output_path(DASHBOARD_FILE);
        dashboard::write_dashboard(
            &path,
            "Interactive Sales Analysis Dashboard",
            &dashboard_panels(dataset),
        )?;
        Ok(path)
    }

    pub fn generate_analysis_report(&self) -> Result<PathBuf> {
        let basic = self
            .basic
            .as_ref()
            .ok_or(PipelineError::MissingPrerequisite("basic_statistics"))?;
        let contents = report::analysis_report(&report::AnalysisSections {
            basic,
            temporal: self.temporal.as_ref(),
            product: self.product.as_ref(),
            customer: self.customer.as_ref(),
            correlation: self.correlation.as_ref(),
        });
        let path = self.output_path(ANALYSIS_REPORT_FILE);
        io_utils::write_text_atomically(&path, &contents)?;
        info!("Analysis report saved to {path:?}");
        Ok(path)
    }
}

/// Converts text columns whose name mentions DATE into timestamps; cells
/// that do not parse become missing.
fn parse_date_columns(dataset: &mut Dataset) {
    let rows = dataset.row_count();
    let targets: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| c.name.to_uppercase().contains("DATE") && c.data_type().is_textual())
        .map(|c| c.name.clone())
        .collect();
    for name in targets {
        let Some(column) = dataset.column(&name) else {
            continue;
        };
        let mut invalid = 0usize;
        let parsed: Vec<Option<NaiveDateTime>> = (0..rows)
            .map(|row| {
                let text = column.data.text_at(row)?;
                let value = parse_timestamp(text);
                if value.is_none() {
                    invalid += 1;
                }
                value
            })
            .collect();
        if invalid > 0 {
            warn!("Column {name}: {invalid} value(s) could not be parsed as dates");
        }
        dataset.upsert_column(Column::new(name, ColumnData::DateTime(parsed)));
    }
}

fn sales_column(dataset: &Dataset) -> Result<&ColumnData> {
    dataset
        .column(SALES)
        .filter(|c| c.data_type().is_numeric())
        .map(|c| &c.data)
        .ok_or_else(|| PipelineError::MissingColumn(SALES.to_string()).into())
}

fn metric_at(column: Option<&Column>, row: usize) -> Option<f64> {
    column.and_then(|c| c.data.f64_at(row))
}

fn cell_text(column: Option<&Column>, row: usize) -> Option<String> {
    column.and_then(|c| c.data.value(row)).map(|value| value.as_display())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn weekday_name(day: u32) -> &'static str {
    usize::try_from(day)
        .ok()
        .and_then(|idx| WEEKDAY_NAMES.get(idx))
        .copied()
        .unwrap_or_default()
}

fn monthly_labels(monthly: &[MonthlySales]) -> (Vec<String>, Vec<f64>) {
    monthly
        .iter()
        .map(|m| (format!("{}-{:02}", m.year, m.month), m.sum))
        .unzip()
}

fn temporal_panels(analysis: &TemporalAnalysis) -> Vec<Panel> {
    let (years, yearly_totals): (Vec<String>, Vec<f64>) = analysis
        .yearly_sales
        .iter()
        .map(|y| (y.year.to_string(), y.sum))
        .unzip();
    let (months, monthly_means): (Vec<String>, Vec<f64>) = analysis
        .monthly_average
        .iter()
        .filter_map(|m| Some((m.month.to_string(), m.mean?)))
        .unzip();
    let weekday_totals: Vec<f64> = WEEKDAY_NAMES
        .iter()
        .map(|name| {
            analysis
                .day_of_week_sales
                .iter()
                .find(|d| d.day == *name)
                .map_or(0.0, |d| d.sum)
        })
        .collect();
    let weekday_labels: Vec<String> = WEEKDAY_NAMES.iter().map(|n| n[..3].to_string()).collect();
    let (periods, period_totals) = monthly_labels(&analysis.monthly_sales);

    vec![
        Panel::new(
            "Total Sales by Year",
            "Year",
            "Total Sales ($)",
            charts::SKY_BLUE,
            PanelKind::Bars {
                labels: years,
                values: yearly_totals,
                horizontal: false,
            },
        ),
        Panel::new(
            "Average Sales by Month",
            "Month",
            "Average Sales ($)",
            charts::ORANGE,
            PanelKind::Line {
                labels: months,
                values: monthly_means,
                markers: true,
            },
        ),
        Panel::new(
            "Sales by Day of Week",
            "Day of Week",
            "Total Sales ($)",
            charts::LIGHT_GREEN,
            PanelKind::Bars {
                labels: weekday_labels,
                values: weekday_totals,
                horizontal: false,
            },
        ),
        Panel::new(
            "Monthly Sales Time Series",
            "Period",
            "Monthly Sales ($)",
            charts::CRIMSON,
            PanelKind::Line {
                labels: periods,
                values: period_totals,
                markers: false,
            },
        ),
    ]
}

fn product_panels(dataset: &Dataset, analysis: &ProductAnalysis) -> Vec<Panel> {
    let mut lines: Vec<(&str, f64)> = analysis
        .productline_summary
        .iter()
        .map(|s| (s.product_line.as_str(), s.sales_sum))
        .collect();
    lines.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (line_labels, line_totals): (Vec<String>, Vec<f64>) =
        lines.iter().map(|(l, v)| (l.to_string(), *v)).unzip();

    let line_column = dataset.column(PRODUCT_LINE);
    let quantity = dataset.column(QUANTITY);
    let price = dataset.column(PRICE);
    let sales = dataset.column(SALES);
    let mut prices: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut points = Vec::new();
    let mut shades = Vec::new();
    for row in 0..dataset.row_count() {
        if let (Some(line), Some(p)) = (
            line_column.and_then(|c| c.data.text_at(row)),
            metric_at(price, row),
        ) {
            prices.entry(line.to_string()).or_default().push(p);
        }
        if let (Some(q), Some(p), Some(s)) = (
            metric_at(quantity, row),
            metric_at(price, row),
            metric_at(sales, row),
        ) {
            points.push((q, p));
            shades.push(s);
        }
    }

    let (codes, code_totals): (Vec<String>, Vec<f64>) = analysis
        .top_products
        .iter()
        .map(|p| {
            let head: String = p.product_code.chars().take(8).collect();
            (format!("{head}..."), p.sales)
        })
        .unzip();

    vec![
        Panel::new(
            "Total Sales by Product Line",
            "Total Sales ($)",
            "",
            charts::CORAL,
            PanelKind::Bars {
                labels: line_labels,
                values: line_totals,
                horizontal: true,
            },
        ),
        Panel::new(
            "Price Distribution by Product Line",
            "Product Line",
            "Unit Price ($)",
            charts::STEEL_BLUE,
            PanelKind::Boxplot {
                groups: prices.into_iter().collect(),
            },
        ),
        Panel::new(
            "Quantity vs Price (coloured by sales)",
            "Quantity Ordered",
            "Unit Price ($)",
            charts::STEEL_BLUE,
            PanelKind::Scatter {
                points,
                shades: Some(shades),
            },
        ),
        Panel::new(
            "Top 10 Products by Sales",
            "Product",
            "Total Sales ($)",
            charts::GOLD,
            PanelKind::Bars {
                labels: codes,
                values: code_totals,
                horizontal: false,
            },
        ),
    ]
}

fn customer_panels(analysis: &CustomerAnalysis, order_counts: Vec<(f64, f64)>) -> Vec<Panel> {
    let (top_labels, top_totals): (Vec<String>, Vec<f64>) = analysis
        .top_customers
        .iter()
        .rev()
        .map(|c| (truncate_label(&c.customer, 20), c.sales))
        .unzip();
    let customer_totals: Vec<f64> = analysis
        .customer_summary
        .iter()
        .map(|c| c.sales_sum)
        .collect();
    let mut countries: Vec<(&str, f64)> = analysis
        .country_analysis
        .iter()
        .map(|c| (c.country.as_str(), c.sales_sum))
        .collect();
    countries.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (country_labels, country_totals): (Vec<String>, Vec<f64>) =
        countries.iter().map(|(c, v)| (c.to_string(), *v)).unzip();

    vec![
        Panel::new(
            "Top 10 Customers by Sales",
            "Total Sales ($)",
            "",
            charts::LIGHT_BLUE,
            PanelKind::Bars {
                labels: top_labels,
                values: top_totals,
                horizontal: true,
            },
        ),
        Panel::new(
            "Sales Distribution by Customer",
            "Total Sales ($)",
            "Number of Customers",
            charts::LIGHT_GREEN,
            PanelKind::Histogram {
                values: customer_totals,
                bins: HISTOGRAM_BINS,
            },
        ),
        Panel::new(
            "Total Sales by Country",
            "Total Sales ($)",
            "",
            charts::ORANGE,
            PanelKind::Bars {
                labels: country_labels,
                values: country_totals,
                horizontal: true,
            },
        ),
        Panel::new(
            "Number of Orders vs Total Sales",
            "Number of Orders",
            "Total Sales ($)",
            charts::PURPLE,
            PanelKind::Scatter {
                points: order_counts,
                shades: None,
            },
        ),
    ]
}

/// Panels of the dashboard, computed straight from the table so the
/// dashboard does not depend on which analyses ran.
fn dashboard_panels(dataset: &Dataset) -> Vec<Panel> {
    let sales = dataset.column(SALES);
    let lines = group_by_text(dataset, PRODUCT_LINE, |entry, row| {
        entry.add_metric(SALES, metric_at(sales, row));
    });
    let (line_labels, line_totals): (Vec<String>, Vec<f64>) = lines
        .iter()
        .map(|(line, entry)| (line.clone(), entry.sum(SALES)))
        .unzip();

    let mut monthly = GroupAccumulator::new();
    if let Some(dates) = dataset
        .column(ORDER_DATE)
        .filter(|c| c.data_type() == DataType::DateTime)
    {
        for row in 0..dataset.row_count() {
            if let Some(date) = dates.data.datetime_at(row) {
                monthly
                    .row((date.year(), date.month()))
                    .add_metric(SALES, metric_at(sales, row));
            }
        }
    }
    let (periods, period_totals): (Vec<String>, Vec<f64>) = monthly
        .iter()
        .map(|((year, month), entry)| (format!("{year}-{month:02}"), entry.sum(SALES)))
        .unzip();

    let customers = group_by_text(dataset, CUSTOMER, |entry, row| {
        entry.add_metric(SALES, metric_at(sales, row));
    });
    let (customer_labels, customer_totals): (Vec<String>, Vec<f64>) = customers
        .ranked_by(SALES)
        .into_iter()
        .take(TOP_N)
        .map(|(name, entry)| (truncate_label(name, 20), entry.sum(SALES)))
        .unzip();

    let sales_values = sales
        .map(|c| c.data.numeric_values())
        .unwrap_or_default();

    vec![
        Panel::new(
            "Sales by Product Line",
            "Total Sales ($)",
            "",
            charts::STEEL_BLUE,
            PanelKind::Bars {
                labels: line_labels,
                values: line_totals,
                horizontal: true,
            },
        ),
        Panel::new(
            "Monthly Sales",
            "Period",
            "Sales ($)",
            charts::ORANGE,
            PanelKind::Line {
                labels: periods,
                values: period_totals,
                markers: true,
            },
        ),
        Panel::new(
            "Top Customers",
            "Customer",
            "Total Sales ($)",
            charts::LIGHT_BLUE,
            PanelKind::Bars {
                labels: customer_labels,
                values: customer_totals,
                horizontal: false,
            },
        ),
        Panel::new(
            "Sales Distribution",
            "Sales ($)",
            "Orders",
            charts::SKY_BLUE,
            PanelKind::Histogram {
                values: sales_values,
                bins: HISTOGRAM_BINS,
            },
        ),
    ]
}
