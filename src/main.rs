fn main() {
    if let Err(e) = hazel::get_config().and_then(hazel::run) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
