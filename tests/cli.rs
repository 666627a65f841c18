mod common;

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::prelude::*;
use predicates::str::contains;

fn write_config(workspace: &TestWorkspace, raw: &Path, extra: &str) -> std::path::PathBuf {
    let root = workspace.path();
    let yaml = format!(
        "raw_data: {}\ncleaned_data: {}\ndatabase: {}\noutput_dir: {}\nlog_file: {}\n{extra}",
        raw.display(),
        root.join("processed/cleaned.csv").display(),
        root.join("processed/sales.db").display(),
        root.join("final").display(),
        root.join("logs/run.log").display(),
    );
    workspace.write("pipeline.yaml", &yaml)
}

fn pipeline_cmd(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("sales-pipeline").expect("binary exists");
    cmd.current_dir(workspace.path());
    cmd
}

#[test]
fn clean_prints_json_summary_and_writes_outputs() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_sales("raw.csv", 20);
    let cleaned = workspace.path().join("out").join("cleaned.csv");
    let output = pipeline_cmd(&workspace)
        .args([
            "clean",
            "-i",
            raw.to_str().unwrap(),
            "-o",
            cleaned.to_str().unwrap(),
            "--strategy",
            "fill",
            "--json",
        ])
        .output()
        .expect("run clean");
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(summary["rows"], 20);
    assert!(cleaned.exists());
    assert!(
        workspace
            .path()
            .join("out")
            .join("cleaned_cleaning_log.txt")
            .exists()
    );
}

#[test]
fn clean_rejects_unknown_strategy_flag() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_sales("raw.csv", 3);
    pipeline_cmd(&workspace)
        .args(["clean", "-i", raw.to_str().unwrap(), "--strategy", "interpolate"])
        .assert()
        .failure()
        .stderr(contains("interpolate"));
}

#[test]
fn config_with_unknown_strategy_fails_before_running() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_sales("raw.csv", 3);
    let config = write_config(&workspace, &raw, "cleaning_strategy: median\n");
    pipeline_cmd(&workspace)
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .failure()
        .stderr(contains("Unknown cleaning strategy 'median'"));
    assert!(!workspace.path().join("processed/cleaned.csv").exists());
}

#[test]
fn run_completes_all_four_steps() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_sales("raw.csv", 48);
    let config = write_config(&workspace, &raw, "");
    pipeline_cmd(&workspace)
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .success()
        .stdout(contains("100.0% - Step 4/4"))
        .stdout(contains("Steps completed: 4/4"));

    let root = workspace.path();
    assert!(root.join("final/final_project_report.md").exists());
    assert!(root.join("final/interactive_dashboard.html").exists());
    let log = fs::read_to_string(root.join("logs/run.log")).expect("run log");
    assert!(log.contains("Pipeline finished: 4/4"));
}

#[test]
fn run_without_raw_data_is_partial_and_fails() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent.csv");
    let config = write_config(&workspace, &missing, "");
    pipeline_cmd(&workspace)
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .failure()
        .stdout(contains("❌ Error in Data cleaning"))
        .stdout(contains("Steps completed: 1/4"))
        .stderr(contains("error: pipeline completed 1/4 step(s)"));
}

#[test]
fn export_requires_an_existing_database() {
    let workspace = TestWorkspace::new();
    pipeline_cmd(&workspace)
        .args([
            "export",
            "--database",
            workspace.path().join("none.db").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Source file not found"));
}

#[test]
fn analyze_then_export_lists_every_dataset() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_sales("raw.csv", 30);
    let config = write_config(&workspace, &raw, "");
    let config = config.to_str().unwrap();
    pipeline_cmd(&workspace)
        .args(["--config", config, "clean"])
        .assert()
        .success();
    pipeline_cmd(&workspace)
        .args(["--config", config, "analyze", "--json"])
        .assert()
        .success()
        .stdout(contains("query1_rows"));
    pipeline_cmd(&workspace)
        .args(["--config", config, "export"])
        .assert()
        .success()
        .stdout(contains("dim_customers:"))
        .stdout(contains("geographic_analysis:"))
        .stdout(contains("queries.json").and(contains("skipped").not()));
}
