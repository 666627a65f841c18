mod common;

use std::fs;

use common::TestWorkspace;
use sales_pipeline::{
    cleaner::CleaningStrategy,
    config::PipelineConfig,
    error::PipelineError,
    explore::{self, SalesExplorer},
    export, pipeline,
    store::SalesStore,
};

const FOUR_NUMERIC: &str = "QUANTITYORDERED,PRICEEACH,SALES,MSRP,PRODUCTLINE,CUSTOMERNAME\n\
30,95.5,2865,95,Motorcycles,Land of Toys Inc.\n\
34,81.25,2762.5,214,Motorcycles,Reims Collectables\n\
41,94.75,3884.75,118,Classic Cars,Land of Toys Inc.\n\
45,83.25,3746.25,136,Classic Cars,Baane Mini Imports\n\
49,100.5,4924.5,147,Ships,Reims Collectables\n\
22,60.5,1331,80,Ships,Baane Mini Imports\n";

fn config_in(workspace: &TestWorkspace) -> PipelineConfig {
    let root = workspace.path();
    PipelineConfig {
        raw_data: workspace.write_sales("raw/sales_data_sample.csv", 60),
        cleaned_data: root.join("processed/sales_data_cleaned.csv"),
        database: root.join("processed/sales_analysis.db"),
        output_dir: root.join("final"),
        log_file: root.join("logs/sales_analysis.log"),
        ..PipelineConfig::default()
    }
}

#[test]
fn correlation_matrix_is_symmetric_with_unit_diagonal() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("cleaned.csv", FOUR_NUMERIC);
    let mut explorer = SalesExplorer::new(&source, workspace.path().join("final"));
    explorer.load().expect("load");
    let analysis = explorer.correlation_analysis(true).expect("correlation");

    assert_eq!(analysis.columns.len(), 4);
    assert_eq!(analysis.matrix.len(), 4);
    for i in 0..4 {
        assert_eq!(analysis.matrix[i].len(), 4);
        assert_eq!(analysis.matrix[i][i], Some(1.0));
        for j in 0..4 {
            assert_eq!(analysis.matrix[i][j], analysis.matrix[j][i]);
            if let Some(r) = analysis.matrix[i][j] {
                assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r));
            }
        }
    }
    assert_eq!(analysis.sales_correlations[0].column, "SALES");
    let quantity = analysis.get("SALES", "QUANTITYORDERED").expect("defined");
    assert!(quantity > 0.8, "sales should track quantity, got {quantity}");
    assert!(
        workspace
            .path()
            .join("final")
            .join(explore::CORRELATION_CHART)
            .exists()
    );
}

#[test]
fn analysis_report_requires_basic_statistics() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("cleaned.csv", FOUR_NUMERIC);
    let mut explorer = SalesExplorer::new(&source, workspace.path());
    explorer.load().expect("load");
    let err = explorer.generate_analysis_report().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingPrerequisite("basic_statistics"))
    ));

    explorer.basic_statistics().expect("basic");
    let path = explorer.generate_analysis_report().expect("report");
    let report = fs::read_to_string(path).expect("read report");
    assert!(report.starts_with("# Sales Exploratory Analysis Report"));
}

#[test]
fn stages_produce_every_artifact() {
    let workspace = TestWorkspace::new();
    let config = config_in(&workspace);
    config.validate().expect("validate");

    let summary = pipeline::clean_stage(&config, CleaningStrategy::Auto).expect("clean");
    assert_eq!(summary.rows, 60);
    let outcome = pipeline::analyze_stage(&config).expect("analyze");
    assert_eq!(outcome.rows_loaded, 60);
    assert_eq!(outcome.query_rows.len(), 4);
    let report = pipeline::explore_stage(&config).expect("explore");
    assert!(report.exists());

    for file in [
        explore::TEMPORAL_CHART,
        explore::PRODUCT_CHART,
        explore::CUSTOMER_CHART,
        explore::CORRELATION_CHART,
    ] {
        let svg = fs::read_to_string(config.output_dir.join(file)).expect("chart");
        assert!(svg.contains("<svg"), "{file} is not an SVG document");
    }
    let dashboard =
        fs::read_to_string(config.output_dir.join(explore::DASHBOARD_FILE)).expect("dashboard");
    assert!(dashboard.contains("Interactive Sales Analysis Dashboard"));
    assert!(dashboard.contains("class=\"hotspot\""));

    let final_report = pipeline::final_report_stage(&config).expect("final report");
    let text = fs::read_to_string(final_report).expect("read final report");
    assert!(!text.contains("(not generated)"), "{text}");
    assert!(text.ends_with("**Project completed successfully**\n"));
}

#[test]
fn export_writes_one_csv_per_dataset() {
    let workspace = TestWorkspace::new();
    let config = config_in(&workspace);
    pipeline::clean_stage(&config, CleaningStrategy::Auto).expect("clean");
    pipeline::analyze_stage(&config).expect("analyze");

    let store = SalesStore::open(&config.database).expect("open");
    let summary = export::export_all(&store, &config.export_dir()).expect("export");
    assert_eq!(summary.datasets.len(), export::EXPORTS.len());
    assert!(summary.skipped.is_empty());

    let seasons = fs::read_to_string(config.export_dir().join("dim_dates.csv")).expect("dates");
    assert!(seasons.lines().next().expect("header").ends_with("SEASON"));
    assert!(seasons.contains("Winter"));
    let customers = summary
        .datasets
        .iter()
        .find(|d| d.name == "customer_metrics")
        .expect("customer metrics");
    assert_eq!(customers.rows, 4);
    assert!(config.export_dir().join(export::QUERIES_FILE).exists());
}

#[test]
fn explore_without_cleaned_file_is_a_missing_source() {
    let workspace = TestWorkspace::new();
    let config = config_in(&workspace);
    let err = pipeline::explore_stage(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SourceNotFound(_))
    ));
}
