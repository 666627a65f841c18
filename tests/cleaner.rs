mod common;

use common::TestWorkspace;
use sales_pipeline::{
    cleaner::{CleaningStrategy, SalesCleaner, UNKNOWN_LABEL, cleaning_log_path},
    data::Value,
    error::PipelineError,
    schema::DataType,
};

const FIVE_ROWS_WITH_GAPS: &str = "ORDERNUMBER,CUSTOMERNAME,PRODUCTLINE,SALES,ORDERDATE\n\
10100,Land of Toys Inc.,Motorcycles,2871.0,2/24/2003 0:00\n\
10101,,Motorcycles,2765.9,5/7/2003 0:00\n\
10102,Reims Collectables,Classic Cars,,7/1/2003 0:00\n\
10103,Baane Mini Imports,Ships,3746.7,8/25/2003 0:00\n\
10104,Euro Shopping Channel,Ships,5205.27,10/10/2003 0:00\n\
10100,Land of Toys Inc.,Motorcycles,2871.0,2/24/2003 0:00\n";

#[test]
fn auto_cleaning_fills_gaps_and_drops_the_duplicate() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("raw.csv", FIVE_ROWS_WITH_GAPS);
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");

    let report = cleaner.validate_structure().expect("validate");
    assert_eq!(report.total_rows, 6);
    assert_eq!(report.duplicate_rows, 1);

    let cleaned = cleaner
        .clean_missing_values(CleaningStrategy::Auto)
        .expect("clean");
    assert_eq!(cleaned, 2);
    let removed = cleaner.remove_duplicates().expect("dedupe");
    assert_eq!(removed, 1);

    let dataset = cleaner.dataset().expect("dataset");
    assert_eq!(dataset.total_missing(), 0);
    assert_eq!(dataset.row_count(), 5);
    let customers = &dataset.column("CUSTOMERNAME").expect("customer").data;
    assert_eq!(customers.text_at(1), Some(UNKNOWN_LABEL));
    // Median of the present SALES values, duplicate row included.
    let sales = &dataset.column("SALES").expect("sales").data;
    assert_eq!(sales.f64_at(2), Some(2871.0));
}

#[test]
fn drop_strategy_removes_incomplete_rows() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("raw.csv", FIVE_ROWS_WITH_GAPS);
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");
    cleaner
        .clean_missing_values(CleaningStrategy::Drop)
        .expect("clean");
    let dataset = cleaner.dataset().expect("dataset");
    assert_eq!(dataset.row_count(), 4);
    assert_eq!(dataset.total_missing(), 0);
}

#[test]
fn fill_strategy_zero_fills_numbers_and_labels_text() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("raw.csv", FIVE_ROWS_WITH_GAPS);
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");
    let cleaned = cleaner
        .clean_missing_values(CleaningStrategy::Fill)
        .expect("clean");
    assert_eq!(cleaned, 2);

    let dataset = cleaner.dataset().expect("dataset");
    assert_eq!(dataset.row_count(), 6);
    assert_eq!(dataset.total_missing(), 0);
    let sales = &dataset.column("SALES").expect("sales").data;
    assert_eq!(sales.f64_at(2), Some(0.0));
    let customers = &dataset.column("CUSTOMERNAME").expect("customer").data;
    assert_eq!(customers.text_at(1), Some(UNKNOWN_LABEL));
    let orders = dataset.column("ORDERNUMBER").expect("order number");
    assert_eq!(orders.data_type(), DataType::Int64);

    let log = cleaner.cleaning_log();
    assert!(log.contains(&"1 missing values in column SALES replaced with 0.00".to_string()));
    assert!(log.contains(&format!(
        "1 missing values in column CUSTOMERNAME replaced with '{UNKNOWN_LABEL}'"
    )));
}

#[test]
fn nan_literals_count_as_missing_and_get_filled() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("raw.csv", "ID,SALES\n1,10.5\n2,NaN\n3,20.5\n4,nan\n");
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");
    assert_eq!(cleaner.dataset().expect("dataset").total_missing(), 2);

    let cleaned = cleaner
        .clean_missing_values(CleaningStrategy::Auto)
        .expect("clean");
    assert_eq!(cleaned, 2);
    let sales = &cleaner
        .dataset()
        .expect("dataset")
        .column("SALES")
        .expect("sales")
        .data;
    let values: Vec<Option<f64>> = (0..4).map(|row| sales.f64_at(row)).collect();
    assert_eq!(values, vec![Some(10.5), Some(15.5), Some(20.5), Some(15.5)]);
}

#[test]
fn unparseable_date_becomes_missing_with_missing_companions() {
    let workspace = TestWorkspace::new();
    let source = workspace.write(
        "raw.csv",
        "ORDERNUMBER,ORDERDATE\n10100,2/24/2003 0:00\n10101,not a date\n10102,2003-07-01\n",
    );
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");
    assert_eq!(cleaner.transform_dates().expect("dates"), 1);

    let dataset = cleaner.dataset().expect("dataset");
    let dates = &dataset.column("ORDERDATE").expect("date").data;
    assert_eq!(dates.data_type(), DataType::DateTime);
    assert!(dates.datetime_at(0).is_some());
    assert!(dates.datetime_at(1).is_none());
    for companion in ["YEAR", "MONTH", "DAY", "DAYOFWEEK"] {
        let column = dataset
            .column(&format!("ORDERDATE_{companion}"))
            .expect("companion column");
        assert!(column.data.value(1).is_none(), "{companion} should be missing");
    }
    let year = &dataset.column("ORDERDATE_YEAR").expect("year").data;
    assert_eq!(year.value(2), Some(Value::Integer(2003)));
    // 2003-02-24 was a Monday.
    let weekday = &dataset.column("ORDERDATE_DAYOFWEEK").expect("weekday").data;
    assert_eq!(weekday.f64_at(0), Some(0.0));
}

#[test]
fn saved_table_reloads_with_the_same_shape() {
    let workspace = TestWorkspace::new();
    let source = workspace.write_sales("raw.csv", 40);
    let output = workspace.path().join("processed").join("cleaned.csv");

    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load");
    cleaner
        .clean_missing_values(CleaningStrategy::Auto)
        .expect("clean");
    cleaner.remove_duplicates().expect("dedupe");
    let saved = cleaner.optimize_data_types().expect("optimize");
    assert!(saved >= 0.0);
    cleaner.transform_dates().expect("dates");
    let derived = cleaner.create_derived_features().expect("derive");
    assert_eq!(
        derived,
        vec!["MARGIN", "MARGIN_PERCENTAGE", "SALES_CATEGORY", "QUARTER"]
    );
    let log_path = cleaner.save_cleaned_data(&output).expect("save");
    assert_eq!(log_path, cleaning_log_path(&output));

    let summary = cleaner.get_cleaning_summary().expect("summary");
    let mut reloaded = SalesCleaner::new(&output);
    let dataset = reloaded.load().expect("reload");
    assert_eq!(dataset.row_count(), summary.rows);
    assert_eq!(dataset.column_count(), summary.columns);

    let log = std::fs::read_to_string(log_path).expect("read log");
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("Sales Data Cleaning Log"));
    assert_eq!(lines.next(), Some("=".repeat(30).as_str()));
    assert!(log.contains("Date columns transformed: 1 columns"));
}

#[test]
fn missing_and_empty_sources_are_reported() {
    let workspace = TestWorkspace::new();
    let mut missing = SalesCleaner::new(workspace.path().join("absent.csv"));
    let err = missing.load().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SourceNotFound(_))
    ));

    let header_only = workspace.write("empty.csv", "ORDERNUMBER,SALES\n");
    let mut empty = SalesCleaner::new(&header_only);
    let err = empty.load().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::EmptySource(_))
    ));
}
