use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Verbosity comes from `RUST_LOG`
/// and defaults to `info`, e.g. `RUST_LOG=becathlon=debug,actix_web=info`.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
