//! Logging Infrastructure
//!
//! Structured logging setup for the dispatcher:
//! - Console output, pretty for development or JSON for production
//! - Optional daily rotating application logs (14 files kept)
//! - Optional daily rotating print audit logs, one line per submitted job

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Tracing target for print audit records
pub const PRINT_AUDIT_TARGET: &str = "print_audit";

/// Rotated files kept per log stream
const MAX_LOG_FILES: usize = 14;

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug"); `RUST_LOG` takes precedence
/// * `json_format` - JSON console output (production) instead of pretty output
/// * `log_dir` - Optional directory for rotating log files
///
/// # Examples
/// ```no_run
/// // Development setup (console only)
/// galley_dispatch::logger::init_logger_with_file("debug", false, None)?;
///
/// // Production setup (console + files)
/// galley_dispatch::logger::init_logger_with_file("info", true, Some("./logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console layer
    let (json_console, pretty_console) = if json_format {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true);
        (None, Some(layer))
    };

    // File layers
    let (app_layer, audit_layer) = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            let app_log_dir = log_dir.join("app");
            let audit_log_dir = log_dir.join("print");
            fs::create_dir_all(&app_log_dir)?;
            fs::create_dir_all(&audit_log_dir)?;

            let app_log = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("app")
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(app_log_dir)?;

            let audit_log = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("print")
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(audit_log_dir)?;

            // Everything except audit records goes to the app log
            let app_layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(app_log))
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() != PRINT_AUDIT_TARGET
                }));

            let audit_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::sync::Mutex::new(audit_log))
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() == PRINT_AUDIT_TARGET
                }));

            (Some(app_layer), Some(audit_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(pretty_console)
        .with(app_layer)
        .with(audit_layer)
        .try_init()?;

    Ok(())
}

/// Print audit helper - one record per device job handed to the bridge
///
/// ```ignore
/// print_audit!("EPSON-TM88", "kitchen", 512, "submitted");
/// ```
macro_rules! print_audit {
    ($printer:expr, $target:expr, $bytes:expr, $outcome:expr) => {
        tracing::info!(
            target: "print_audit",
            printer = $printer,
            target_desc = $target,
            bytes = $bytes,
            outcome = $outcome,
            timestamp = chrono::Local::now().to_rfc3339(),
            "PRINT"
        );
    };
}

pub(crate) use print_audit;
