#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const SALES_HEADER: &str = "ORDERNUMBER,QUANTITYORDERED,PRICEEACH,ORDERLINENUMBER,SALES,ORDERDATE,STATUS,QTR_ID,MONTH_ID,YEAR_ID,PRODUCTLINE,MSRP,PRODUCTCODE,CUSTOMERNAME,CITY,COUNTRY,DEALSIZE";

pub const PRODUCT_LINES: [&str; 3] = ["Classic Cars", "Motorcycles", "Ships"];

const CUSTOMERS: [(&str, &str, &str); 4] = [
    ("Land of Toys Inc.", "NYC", "USA"),
    ("Reims Collectables", "Reims", "France"),
    ("Baane Mini Imports", "Stavern", "Norway"),
    ("Euro Shopping Channel", "Madrid", "Spain"),
];

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Writes a raw sales extract with `rows` generated order lines.
    pub fn write_sales(&self, name: &str, rows: usize) -> PathBuf {
        self.write(name, &sales_csv(rows))
    }
}

/// Deterministic raw extract in the source layout: month-first dates, every
/// tenth line cancelled, product lines and customers in rotation.
pub fn sales_csv(rows: usize) -> String {
    let mut out = String::from(SALES_HEADER);
    out.push('\n');
    for i in 0..rows {
        let quantity = 20 + (i * 7) % 30;
        let price = 50.5 + ((i * 13) % 50) as f64;
        let sales = (quantity as f64 * price * 100.0).round() / 100.0;
        let month = i % 12 + 1;
        let day = i % 28 + 1;
        let year = 2003 + i % 3;
        let status = if i % 10 == 9 { "Cancelled" } else { "Shipped" };
        let (customer, city, country) = CUSTOMERS[i % CUSTOMERS.len()];
        let deal = if sales < 3000.0 {
            "Small"
        } else if sales < 7000.0 {
            "Medium"
        } else {
            "Large"
        };
        let _ = writeln!(
            out,
            "{},{quantity},{price},{},{sales},{month}/{day}/{year} 0:00,{status},{},{month},{year},{},{},S{}_{},{customer},{city},{country},{deal}",
            10100 + i / 2,
            i % 2 + 1,
            (month - 1) / 3 + 1,
            PRODUCT_LINES[i % PRODUCT_LINES.len()],
            price + 10.0,
            10 + i % 3,
            1000 + i % 5,
        );
    }
    out
}
