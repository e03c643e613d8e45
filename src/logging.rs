//! Diagnostic logging for the `agent-chat` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. Output goes to stderr so it never mixes with replies printed
//! on stdout.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Filter used when `RUST_LOG` is unset and verbose output was requested.
pub const VERBOSE_LOG_FILTER: &str = "agent_chat=debug,agent_stream=debug,agent_run=debug,conversation_store=debug";

pub fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(io::stderr)
                .with_target(verbose),
        )
        .with(env_filter(verbose));

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return;
    }
    tracing::debug!(verbose, "tracing initialized; filter configured via RUST_LOG");
}
