#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = keytouch_harness::run_from_env() {
        tracing::error!(%error, exit_code = error.exit_code(), "replay failed");
        eprintln!("{error}");
        std::process::exit(error.exit_code());
    }
}
