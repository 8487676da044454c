pub mod analyses;
pub mod config;
pub mod db;
pub mod errors;
pub mod evaluation;
pub mod llm_client;
pub mod models;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod requirements;
pub mod resumes;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: the library plus the calling binary.
pub fn filter_directive(bin_target: &str, level: &str) -> String {
    format!("{}={level},{bin_target}={level}", env!("CARGO_CRATE_NAME"))
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the configured level.
/// Binaries pass their own `CARGO_CRATE_NAME` so their events pass the filter.
pub fn init_tracing(bin_target: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter_directive(bin_target, default_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_covers_library_and_binary() {
        let directive = filter_directive("worker", "debug");
        assert_eq!(directive, "screener=debug,worker=debug");

        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
