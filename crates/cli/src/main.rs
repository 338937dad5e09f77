fn main() {
    if let Err(e) = uscope_cli::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
