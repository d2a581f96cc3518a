//! Logging setup shared by the worker binaries
//!
//! `RUST_LOG` wins over `LOG_LEVEL` when both are set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogArgs;

/// Install the global tracing subscriber
pub fn init(args: &LogArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&args.log_level)));

    let (text, json) = if args.json() {
        (None, Some(fmt::layer().json().with_current_span(false)))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

fn default_directives(level: &str) -> String {
    format!("scan_fleet={},async_nats=warn,info", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_crate_level() {
        assert_eq!(
            default_directives("debug"),
            "scan_fleet=debug,async_nats=warn,info"
        );
        assert!(EnvFilter::try_new(default_directives("trace")).is_ok());
    }
}
