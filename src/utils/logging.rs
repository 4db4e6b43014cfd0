/// Initialize tracing for the application.
///
/// Unknown level strings fall back to `info`. Uses `try_init` so tests and
/// embedding libraries can call this more than once without panicking.
pub fn init(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
