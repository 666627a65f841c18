pub mod aggregate;
pub mod charts;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod dataset;
pub mod error;
pub mod explore;
pub mod export;
pub mod io_utils;
pub mod pipeline;
pub mod queries;
pub mod report;
pub mod schema;
pub mod stats;
pub mod store;
pub mod table;

use std::{
    env,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Target;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
    error::PipelineError,
    pipeline::Verdict,
    store::SalesStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Mirrors every log record to stderr and the run log.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    io_utils::ensure_parent_dir(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Opening log file {path:?}"))
}

fn init_logging(log_file: Option<&Path>) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_pipeline", LevelFilter::Info);
        }
        if let Some(path) = log_file {
            match open_log_file(path) {
                Ok(file) => {
                    builder.target(Target::Pipe(Box::new(TeeWriter { file })));
                }
                Err(err) => eprintln!("warning: {err:#}"),
            }
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => {
            override_with(&mut config.raw_data, args.input);
            override_with(&mut config.output_dir, args.output_dir);
            override_with(&mut config.log_file, args.log_file);
            if let Some(strategy) = args.strategy {
                config.cleaning_strategy = strategy.to_string();
            }
            handle_run(&config)
        }
        Commands::Clean(args) => {
            init_logging(None);
            override_with(&mut config.raw_data, args.input);
            override_with(&mut config.cleaned_data, args.output);
            let strategy = match args.strategy {
                Some(strategy) => strategy,
                None => config.strategy()?,
            };
            handle_clean(&config, strategy, args.json)
        }
        Commands::Analyze(args) => {
            init_logging(None);
            override_with(&mut config.cleaned_data, args.input);
            override_with(&mut config.database, args.database);
            handle_analyze(&config, args.json)
        }
        Commands::Explore(args) => {
            init_logging(None);
            override_with(&mut config.cleaned_data, args.input);
            override_with(&mut config.output_dir, args.output_dir);
            if args.no_charts {
                config.charts = config::ChartToggles {
                    temporal: false,
                    product: false,
                    customer: false,
                    correlation: false,
                    dashboard: false,
                };
            }
            let report = pipeline::explore_stage(&config)?;
            println!("Analysis report written to {}", report.display());
            Ok(())
        }
        Commands::Report(args) => {
            init_logging(None);
            override_with(&mut config.output_dir, args.output_dir);
            let report = pipeline::final_report_stage(&config)?;
            println!("Final report written to {}", report.display());
            Ok(())
        }
        Commands::Export(args) => {
            init_logging(None);
            override_with(&mut config.database, args.database);
            let export_dir = args.output_dir.unwrap_or_else(|| config.export_dir());
            handle_export(&config, &export_dir)
        }
    }
}

fn handle_run(config: &PipelineConfig) -> Result<()> {
    init_logging(Some(&config.log_file));
    info!("Validating project configuration");
    let summary = pipeline::run_pipeline(config)?;
    if summary.verdict != Verdict::Success {
        bail!(
            "pipeline completed {}/{} step(s)",
            summary.succeeded,
            summary.total
        );
    }
    Ok(())
}

fn handle_clean(
    config: &PipelineConfig,
    strategy: cleaner::CleaningStrategy,
    json: bool,
) -> Result<()> {
    let summary = pipeline::clean_stage(config, strategy)?;
    if json {
        let rendered =
            serde_json::to_string_pretty(&summary).context("Serializing cleaning summary")?;
        println!("{rendered}");
        return Ok(());
    }
    let headers = vec![
        "column".to_string(),
        "type".to_string(),
        "missing".to_string(),
    ];
    let rows: Vec<Vec<String>> = summary
        .column_profiles
        .iter()
        .map(|profile| {
            vec![
                profile.name.clone(),
                profile.data_type.to_string(),
                profile.missing.to_string(),
            ]
        })
        .collect();
    table::print_table(&headers, &rows);
    println!(
        "{} row(s), {} column(s), {:.2} MB written to {}",
        summary.rows,
        summary.columns,
        summary.memory_usage_mb,
        config.cleaned_data.display()
    );
    Ok(())
}

fn handle_analyze(config: &PipelineConfig, json: bool) -> Result<()> {
    let outcome = pipeline::analyze_stage(config)?;
    if json {
        let rendered = serde_json::to_string_pretty(&outcome.performance)
            .context("Serializing performance report")?;
        println!("{rendered}");
    } else {
        println!(
            "Loaded {} row(s); {} index(es) created",
            outcome.rows_loaded,
            outcome.indexes.len()
        );
    }
    Ok(())
}

fn handle_export(config: &PipelineConfig, export_dir: &Path) -> Result<()> {
    if !config.database.exists() {
        return Err(PipelineError::SourceNotFound(config.database.clone()).into());
    }
    let store = SalesStore::open(&config.database)?;
    let summary = export::export_all(&store, export_dir)?;
    store.close()?;
    for dataset in &summary.datasets {
        println!(
            "{}: {} row(s) -> {}",
            dataset.name,
            dataset.rows,
            dataset.path.display()
        );
    }
    for skipped in &summary.skipped {
        println!("{skipped}: skipped (missing columns)");
    }
    if let Some(queries) = &summary.queries {
        println!("Canned queries -> {}", queries.display());
    }
    Ok(())
}
