fn main() {
    if let Err(err) = coinflow_cli::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
