// Tracing setup shared by the binaries: console output plus an optional JSON file
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use eyre::WrapErr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Keeps the non-blocking file writer flushing until process exit
static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const CRATE_TARGET: &str = "news_impact_scorer";

/// Dependencies at `warn`; the library and the calling binary at `level`.
///
/// Events written in a binary carry the binary's own target, so it needs a
/// directive of its own.
fn filter_directives(bin_name: &str, level: &str) -> String {
    let bin_target = bin_name.replace('-', "_");
    format!("warn,{CRATE_TARGET}={level},{bin_target}={level}")
}

fn crate_filter(bin_name: &str, level: &str) -> EnvFilter {
    EnvFilter::try_new(filter_directives(bin_name, level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(bin_name, "info")))
}

/// Installs the global subscriber.
///
/// `CONSOLE_LOG_LEVEL` and `FILE_LOG_LEVEL` set the level for this crate and
/// the binary (dependencies stay at `warn`). With `LOG_TO_FILE=true` a JSON
/// copy goes to `logs/<bin_name>_<timestamp>.log`. Span closes are logged
/// with timings.
pub fn init_logging(bin_name: &str) -> eyre::Result<()> {
    let console_log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let file_log_level = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_to_file = env::var("LOG_TO_FILE").map(|v| v == "true").unwrap_or(false);

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(crate_filter(bin_name, &console_log_level));

    if log_to_file {
        let log_dir = Path::new("logs");
        fs::create_dir_all(log_dir).wrap_err("Failed to create log directory")?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let file_name = format!("{bin_name}_{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        FILE_GUARD.set(guard).ok();

        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(non_blocking)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(crate_filter(bin_name, &file_log_level));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .wrap_err("Failed to install tracing subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .wrap_err("Failed to install tracing subscriber")?;
    }
    Ok(())
}
