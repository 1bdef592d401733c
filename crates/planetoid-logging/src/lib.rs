//! # planetoid-logging
//!
//! Structured logging with `tracing`.
//!
//! `RUST_LOG` wins over the configured level. Output is either the
//! human-readable `fmt` layer or JSON lines with span context.

#![deny(unsafe_code)]

use planetoid_settings::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Crates whose events follow the configured level.
const OWN_CRATES: &[&str] = &[
    "planetoid",
    "planetoid_server",
    "planetoid_store",
    "planetoid_settings",
];

/// Build the filter directive for a base level.
///
/// Third-party crates stay at `warn` unless the level is `trace`, so a
/// `debug` run is not flooded with hyper/tungstenite frames.
pub fn filter_directive(level: &str) -> String {
    let level = normalize_level(level);
    let mut directive = if level == "trace" {
        "trace".to_string()
    } else {
        "warn".to_string()
    };
    for krate in OWN_CRATES {
        directive.push_str(&format!(",{krate}={level}"));
    }
    directive
}

fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed (tests, or a
/// second call).
pub fn init_subscriber(settings: &LoggingSettings) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&settings.level)));

    let fmt_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let installed = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(
            target: "planetoid",
            level = %settings.level,
            json = settings.json,
            "logging initialized"
        );
    }
    installed
}
