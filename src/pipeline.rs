//! Four-stage driver: clean, SQL analysis, exploration, final report.
//!
//! A failing stage is logged and reported on stdout; later stages still
//! run. The verdict only counts the stages that succeeded.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use log::{error, info};
use serde::Serialize;

use crate::{
    cleaner::{CleaningStrategy, CleaningSummary, SalesCleaner, cleaning_log_path},
    config::PipelineConfig,
    error::PipelineError,
    explore::{self, SalesExplorer},
    io_utils,
    queries::{self, PerformanceReport},
    report::{self, Artifact, FinalReport},
    stats::render_describe_table,
    store::{ResultSet, SalesStore},
};

pub const TOTAL_STEPS: usize = 4;
pub const FINAL_REPORT_FILE: &str = "final_project_report.md";
const PROGRESS_WIDTH: usize = 40;
const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Success,
    Partial,
    NoSuccess,
}

impl Verdict {
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        match succeeded {
            0 => Verdict::NoSuccess,
            n if n >= total => Verdict::Success,
            _ => Verdict::Partial,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Success => 0,
            Verdict::Partial | Verdict::NoSuccess => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub verdict: Verdict,
}

/// `[████----] 50.0% - Step 2/4`
pub fn progress_line(step: usize, total: usize) -> String {
    let total = total.max(1);
    let filled = (PROGRESS_WIDTH * step / total).min(PROGRESS_WIDTH);
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    );
    let pct = step as f64 / total as f64 * 100.0;
    format!("[{bar}] {pct:.1}% - Step {step}/{total}")
}

fn print_progress(step: usize, message: &str) {
    println!();
    println!("{}", progress_line(step, TOTAL_STEPS));
    println!("{message}");
    println!("{}", "-".repeat(60));
}

/// Runs one stage body, turning its error into a logged failure.
fn run_stage<F>(step: usize, name: &str, message: &str, body: F) -> bool
where
    F: FnOnce() -> Result<()>,
{
    print_progress(step, message);
    info!("Starting step: {name}");
    match body() {
        Ok(()) => {
            info!("Step completed: {name}");
            println!("✅ {name} completed successfully");
            true
        }
        Err(err) => {
            error!("Error in {name}: {err:#}");
            println!("❌ Error in {name}: {err}");
            false
        }
    }
}

fn require_cleaned(config: &PipelineConfig) -> Result<&Path> {
    let path = config.cleaned_data.as_path();
    if !path.exists() {
        return Err(PipelineError::SourceNotFound(path.to_path_buf()).into());
    }
    Ok(path)
}

pub fn clean_stage(config: &PipelineConfig, strategy: CleaningStrategy) -> Result<CleaningSummary> {
    if !config.raw_data.exists() {
        return Err(PipelineError::SourceNotFound(config.raw_data.clone()).into());
    }
    let mut cleaner = SalesCleaner::new(&config.raw_data);
    let dataset = cleaner.load()?;
    info!(
        "Loaded {} row(s) and {} column(s)",
        dataset.row_count(),
        dataset.column_count()
    );
    let structure = cleaner.validate_structure()?;
    info!(
        "Initial validation: {} duplicate row(s), {:.2} MB",
        structure.duplicate_rows, structure.memory_usage_mb
    );
    let cleaned = cleaner.clean_missing_values(strategy)?;
    info!("Missing values handled with {strategy} strategy ({cleaned} affected)");
    let removed = cleaner.remove_duplicates()?;
    info!("Duplicates removed: {removed}");
    let saved = cleaner.optimize_data_types()?;
    info!("Data types optimized ({saved:.2} MB saved)");
    cleaner.transform_dates()?;
    cleaner.create_derived_features()?;
    let log_path = cleaner.save_cleaned_data(&config.cleaned_data)?;
    info!("Cleaning log written to {log_path:?}");
    let summary = cleaner.get_cleaning_summary()?;
    info!(
        "Final shape: {} row(s), {} column(s)",
        summary.rows, summary.columns
    );
    Ok(summary)
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub rows_loaded: usize,
    pub indexes: Vec<String>,
    pub query_rows: Vec<(String, usize)>,
    pub performance: PerformanceReport,
}

pub fn analyze_stage(config: &PipelineConfig) -> Result<AnalysisOutcome> {
    let cleaned = require_cleaned(config)?;
    let mut store = SalesStore::open(&config.database)?;
    let rows_loaded = store.load_csv(cleaned)?;
    let indexes = store.create_indexes()?;

    let demos: [(&str, fn(&SalesStore) -> Result<ResultSet>); 4] = [
        ("Window functions", queries::window_functions_demo),
        ("CTE analysis", queries::cte_complex_analysis),
        ("Subqueries", queries::subqueries_demo),
        ("Advanced joins", queries::advanced_joins_demo),
    ];
    let mut query_rows = Vec::with_capacity(demos.len());
    for (label, demo) in demos {
        let result = demo(&store)?;
        println!("{label}: {} row(s)", result.len());
        if !result.is_empty() {
            println!("{}", result.preview(PREVIEW_ROWS));
        }
        query_rows.push((label.to_string(), result.len()));
    }

    let performance = queries::performance_comparison(&store)?;
    let plan = queries::query_plan(&store, queries::PERFORMANCE_OPTIMIZED_SQL)?;
    info!("Optimized query plan has {} step(s)", plan.len());
    store.close()?;
    Ok(AnalysisOutcome {
        rows_loaded,
        indexes,
        query_rows,
        performance,
    })
}

/// Runs every exploratory section and returns the analysis report path.
pub fn explore_stage(config: &PipelineConfig) -> Result<PathBuf> {
    let cleaned = require_cleaned(config)?;
    let charts = &config.charts;
    let mut explorer = SalesExplorer::new(cleaned, &config.output_dir);
    explorer.load()?;
    let basic = explorer.basic_statistics()?;
    info!(
        "Statistics computed for {} row(s)",
        basic.dataset_info.total_rows
    );
    if !basic.numeric_summary.is_empty() {
        println!("{}", render_describe_table(&basic.numeric_summary));
    }
    explorer.temporal_analysis(charts.temporal)?;
    explorer.product_analysis(charts.product)?;
    explorer.customer_analysis(charts.customer)?;
    explorer.correlation_analysis(charts.correlation)?;
    if charts.dashboard {
        explorer.create_interactive_dashboard()?;
    }
    let report_path = explorer.generate_analysis_report()?;
    info!("Analysis report generated: {report_path:?}");
    Ok(report_path)
}

pub fn final_report_stage(config: &PipelineConfig) -> Result<PathBuf> {
    let out = &config.output_dir;
    let data = [
        Artifact::new(&config.raw_data, "Original data"),
        Artifact::new(&config.cleaned_data, "Cleaned data"),
        Artifact::new(&config.database, "SQLite database"),
    ];
    let visualizations = [
        Artifact::new(out.join(explore::TEMPORAL_CHART), "Temporal analysis"),
        Artifact::new(out.join(explore::PRODUCT_CHART), "Product analysis"),
        Artifact::new(out.join(explore::CUSTOMER_CHART), "Customer analysis"),
        Artifact::new(out.join(explore::CORRELATION_CHART), "Correlation matrix"),
        Artifact::new(out.join(explore::DASHBOARD_FILE), "Interactive dashboard"),
    ];
    let reports = [
        Artifact::new(out.join(explore::ANALYSIS_REPORT_FILE), "Analysis report"),
        Artifact::new(cleaning_log_path(&config.cleaned_data), "Cleaning log"),
    ];
    let contents = report::final_project_report(&FinalReport {
        generated_at: Local::now().naive_local(),
        version: env!("CARGO_PKG_VERSION"),
        data: &data,
        visualizations: &visualizations,
        reports: &reports,
    });
    let path = out.join(FINAL_REPORT_FILE);
    io_utils::write_text_atomically(&path, &contents)
        .with_context(|| format!("Saving final report to {path:?}"))?;
    info!("Final report saved to {path:?}");
    Ok(path)
}

fn print_summary(config: &PipelineConfig, summary: &RunSummary) {
    println!();
    println!("{}", "=".repeat(60));
    println!("FINAL SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Steps completed: {}/{}", summary.succeeded, summary.total);
    println!("Total time: {:.2} seconds", summary.elapsed.as_secs_f64());
    println!("Output files in: {}", config.output_dir.display());
    println!("Logs available in: {}", config.log_file.display());
    match summary.verdict {
        Verdict::Success => println!("\nAll steps completed successfully."),
        Verdict::Partial => println!(
            "\nPipeline completed partially ({}/{} steps); check the log for details.",
            summary.succeeded, summary.total
        ),
        Verdict::NoSuccess => println!("\nNo step completed; check the log for details."),
    }
    println!("{}", "=".repeat(60));
}

/// Runs all four stages in order and prints the final summary.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    let strategy = config.strategy()?;
    config.validate()?;
    let started = Instant::now();
    info!("Starting sales analysis pipeline");

    let outcomes = [
        run_stage(1, "Data cleaning", "Cleaning and processing data", || {
            clean_stage(config, strategy).map(|_| ())
        }),
        run_stage(2, "SQL analysis", "Running advanced SQL queries", || {
            analyze_stage(config).map(|_| ())
        }),
        run_stage(3, "Exploratory analysis", "Running exploratory analysis", || {
            explore_stage(config).map(|_| ())
        }),
        run_stage(4, "Final report", "Generating the final project report", || {
            final_report_stage(config).map(|_| ())
        }),
    ];

    let succeeded = outcomes.iter().filter(|ok| **ok).count();
    let summary = RunSummary {
        succeeded,
        total: TOTAL_STEPS,
        elapsed: started.elapsed(),
        verdict: Verdict::from_counts(succeeded, TOTAL_STEPS),
    };
    print_summary(config, &summary);
    info!("Pipeline finished: {succeeded}/{TOTAL_STEPS} step(s) succeeded");
    Ok(summary)
}
