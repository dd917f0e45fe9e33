use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; enabling debug in the
/// settings file raises it to `debug` and lets `RUST_LOG` override it.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        // Force `info` regardless of RUST_LOG so a stray environment
        // variable cannot flood release output.
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
