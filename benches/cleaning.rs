use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sales_pipeline::cleaner::{CleaningStrategy, SalesCleaner};
use tempfile::TempDir;

fn generate_sales(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("sales.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(
        file,
        "ORDERNUMBER,QUANTITYORDERED,PRICEEACH,SALES,ORDERDATE,STATUS,MONTH_ID,PRODUCTLINE,MSRP,CUSTOMERNAME,COUNTRY"
    )
    .expect("header");
    for i in 0..rows {
        let line = match i % 3 {
            0 => "Classic Cars",
            1 => "Motorcycles",
            _ => "Ships",
        };
        let quantity = 20 + i % 30;
        let price = 40.0 + (i % 60) as f64;
        let month = i % 12 + 1;
        // Every 50th row misses its customer.
        let customer = if i % 50 == 0 {
            String::new()
        } else {
            format!("Customer {}", i % 40)
        };
        writeln!(
            file,
            "{},{quantity},{price},{:.2},{month}/{}/2004 0:00,Shipped,{month},{line},{},{customer},USA",
            10100 + i,
            quantity as f64 * price,
            i % 28 + 1,
            price + 15.0,
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn full_cleaning_pass(c: &mut Criterion) {
    let (_dir, csv_path) = generate_sales(20_000);
    let output = csv_path.with_file_name("cleaned.csv");

    c.bench_function("clean_20k_rows", |b| {
        b.iter_batched(
            || SalesCleaner::new(&csv_path),
            |mut cleaner| {
                cleaner.load().expect("load");
                cleaner
                    .clean_missing_values(CleaningStrategy::Auto)
                    .expect("clean");
                cleaner.remove_duplicates().expect("dedupe");
                cleaner.optimize_data_types().expect("optimize");
                cleaner.transform_dates().expect("dates");
                cleaner.create_derived_features().expect("derive");
                cleaner.save_cleaned_data(&output).expect("save");
            },
            BatchSize::SmallInput,
        );
    });
}

fn load_only(c: &mut Criterion) {
    let (_dir, csv_path) = generate_sales(20_000);
    c.bench_function("load_20k_rows", |b| {
        b.iter(|| {
            let mut cleaner = SalesCleaner::new(&csv_path);
            cleaner.load().expect("load").row_count()
        });
    });
}

criterion_group!(benches, full_cleaning_pass, load_only);
criterion_main!(benches);
