fn main() {
    if let Err(err) = readlog::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
