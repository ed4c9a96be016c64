//! Logging setup.
//!
//! The library logs through `tracing`. Output is off unless the `DEBUG`
//! environment variable is set, in which case events go to stderr filtered
//! by `RUST_LOG` (default `debug`).

use std::env;

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber if the `DEBUG` environment variable is set.
///
/// Does nothing when `DEBUG` is unset or a global subscriber already exists.
///
/// # Examples
///
/// ```
/// ttymode::init_logging();
/// tracing::debug!("terminal session starting");
/// ```
pub fn init() {
    if env::var_os("DEBUG").is_none() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        // The second call finds the global subscriber already installed.
        init();
        init();
        tracing::debug!("Test debug message");
    }
}
