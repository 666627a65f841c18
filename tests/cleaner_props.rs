mod common;

use common::TestWorkspace;
use proptest::prelude::*;
use sales_pipeline::cleaner::{CleaningStrategy, SalesCleaner};

type Row = (Option<i64>, Option<String>, Option<f64>);

fn row_strategy() -> impl Strategy<Value = Row> {
    (
        proptest::option::of(-50_000i64..50_000),
        proptest::option::of("[a-c]{1,3}"),
        proptest::option::of((-100_000i64..100_000).prop_map(|cents| cents as f64 / 100.0)),
    )
}

fn render(rows: &[Row]) -> String {
    let mut out = String::from("ID,LABEL,AMOUNT\n");
    for (id, label, amount) in rows {
        let id = id.map(|v| v.to_string()).unwrap_or_default();
        let label = label.clone().unwrap_or_default();
        let amount = amount.map(|v| v.to_string()).unwrap_or_default();
        out.push_str(&format!("{id},{label},{amount}\n"));
    }
    out
}

fn loaded(rows: &[Row]) -> (TestWorkspace, SalesCleaner) {
    let workspace = TestWorkspace::new();
    let source = workspace.write("raw.csv", &render(rows));
    let mut cleaner = SalesCleaner::new(&source);
    cleaner.load().expect("load generated rows");
    (workspace, cleaner)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn auto_strategy_leaves_no_missing_values(
        rows in proptest::collection::vec(row_strategy(), 1..40)
    ) {
        let (_workspace, mut cleaner) = loaded(&rows);
        cleaner.clean_missing_values(CleaningStrategy::Auto).expect("clean");
        let dataset = cleaner.dataset().expect("dataset");
        prop_assert_eq!(dataset.total_missing(), 0);
        prop_assert_eq!(dataset.row_count(), rows.len());
    }

    #[test]
    fn remove_duplicates_reports_the_row_difference(
        base in proptest::collection::vec(row_strategy(), 1..20),
        repeats in proptest::collection::vec(0usize..20, 0..10)
    ) {
        let mut rows = base.clone();
        rows.extend(repeats.iter().map(|idx| base[idx % base.len()].clone()));
        let (_workspace, mut cleaner) = loaded(&rows);
        let before = cleaner.dataset().expect("dataset").row_count();
        let removed = cleaner.remove_duplicates().expect("dedupe");
        let dataset = cleaner.dataset().expect("dataset");
        prop_assert_eq!(dataset.duplicate_count(), 0);
        prop_assert_eq!(removed, before - dataset.row_count());
    }

    #[test]
    fn optimize_keeps_every_value_and_never_grows(
        rows in proptest::collection::vec(row_strategy(), 1..40)
    ) {
        let (_workspace, mut cleaner) = loaded(&rows);
        let before = cleaner.dataset().expect("dataset").clone();
        cleaner.optimize_data_types().expect("optimize");
        let after = cleaner.dataset().expect("dataset");
        prop_assert!(after.memory_bytes() <= before.memory_bytes());
        for column in before.columns() {
            let optimized = after.column(&column.name).expect("column kept");
            for row in 0..before.row_count() {
                prop_assert_eq!(column.data.value(row), optimized.data.value(row));
            }
        }
    }
}
