//! Log subscriber setup
//!
//! Library crates emit `tracing` events; this installs the subscriber that
//! prints them. Logs go to stderr so console output on stdout stays clean.

use tracing::metadata::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set and valid; otherwise the level is `warn`, or
/// `debug` with `--debug`.
pub fn setup_logging(debug: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let default_level = if debug { Level::DEBUG } else { Level::WARN };
    let default_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy("");

    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => {
            match EnvFilter::builder().parse(&directive) {
                Ok(filter) => filter,
                Err(err) => {
                    eprintln!("invalid log filter: {err}");
                    eprintln!("falling back to default logging");
                    default_filter
                }
            }
        }
        _ => default_filter,
    };

    let use_color = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let fmt_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .without_time()
        .with_target(debug)
        .with_ansi(use_color)
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)
}
