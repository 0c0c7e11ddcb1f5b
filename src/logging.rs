use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber for applications that do not bring
/// their own.
///
/// The filter is taken from the `BLOFIN_LOG` environment variable and falls
/// back to `info`. Calling this twice is harmless; the second call is a
/// no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("BLOFIN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
