use tracing_subscriber::{EnvFilter, FmtSubscriber};

// CSV goes to stdout, so logs go to stderr. Records from the `log` macros
// are bridged into the subscriber.
pub fn init_logging(verbose: bool) {
    let filter = std::env::var("STATSHAPE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| {
                if verbose {
                    EnvFilter::new("debug")
                } else {
                    EnvFilter::new("info")
                }
            },
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let result = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = result {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
