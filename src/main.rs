fn main() {
    if let Err(err) = teabrew_lib::run() {
        eprintln!("teabrew: {err:#}");
        std::process::exit(1);
    }
}
