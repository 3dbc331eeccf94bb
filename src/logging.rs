//! Shared tracing setup for the binaries.
//!
//! Log lines go to stderr so they never interleave with a binary's regular
//! output on stdout. `RUST_LOG` overrides the level chosen by `--verbose`.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Level used when `RUST_LOG` is not set
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false), "info");
        assert_eq!(default_level(true), "debug");
    }

    #[test]
    fn test_default_level_parses_as_filter() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_level(verbose)).is_ok());
        }
    }

    #[test]
    fn test_init_twice_reports_error() {
        // The first call may lose to another test that already installed one.
        let _ = init(false);
        assert!(init(false).is_err());
    }
}
