fn main() {
    if let Err(err) = reelpilot_lib::run() {
        eprintln!("reelpilot: {err:#}");
        std::process::exit(1);
    }
}
