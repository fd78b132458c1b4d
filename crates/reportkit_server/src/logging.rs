//! tracing subscriber setup.

use tracing_subscriber::EnvFilter;

const C_FILTER_DEFAULT: &str = "reportkit_server=info,tower_http=warn,warn";
const C_FILTER_VERBOSE: &str = "reportkit_server=debug,tower_http=debug,warn";

/// Install the global fmt subscriber. `RUST_LOG` wins over `verbose`.
pub fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            C_FILTER_VERBOSE
        } else {
            C_FILTER_DEFAULT
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
