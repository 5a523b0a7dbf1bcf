//! Log setup for the `issue-triage` binary.
//!
//! Lines go to stderr so stdout stays free for the run summary and the
//! `tree` output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates whose events follow the requested level. Everything else
/// (HTTP stack, walkers) is held at `warn`.
const TRIAGE_TARGETS: [&str; 3] = ["triage_core", "triage_store", "issue_triage"];

fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        TRIAGE_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
///
/// Returns `false` when a subscriber was already installed; the existing
/// one is kept.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let output = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if json {
        output.json().boxed()
    } else {
        output.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_ok()
}
