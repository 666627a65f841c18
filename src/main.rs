fn main() {
    if let Err(err) = sales_pipeline::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
