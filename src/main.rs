fn main() {
    if let Err(err) = csv_unify::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
