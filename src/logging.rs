//! Structured logging initialization.
//!
//! One call at process start wires the global `tracing` subscriber; the rest
//! of the crate only ever emits through the `tracing` macros. Mode and level
//! arrive as explicit arguments — nothing in the request pipeline reads the
//! environment at call sites.
//!
//! - **non-production**: human-readable output, ANSI color when stdout is a
//!   terminal, `debug` default verbosity;
//! - **production**: line-oriented JSON for log collectors, no color,
//!   `info` default verbosity.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the process-wide subscriber.
///
/// `level` overrides the mode's default verbosity; `RUST_LOG` overrides
/// both. Calling twice is a silent no-op — logging setup must never abort
/// the process, and a second subscriber cannot be installed anyway.
pub fn init(production: bool, level: Option<&str>) {
    let fallback = if production { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(fallback)));

    let result = if production {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_ansi(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(std::io::stdout().is_terminal()),
            )
            .try_init()
    };
    // Already initialized (tests, embedders) — keep the existing subscriber.
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_init_does_not_panic() {
        init(false, Some("debug"));
        init(true, None);
    }
}
