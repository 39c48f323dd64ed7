use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SZ_LOG";

/// Installs a stderr subscriber. `SZ_LOG` directives win over the verbosity flag.
///
/// A second call is a no-op so tests and embedders can call it freely.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
