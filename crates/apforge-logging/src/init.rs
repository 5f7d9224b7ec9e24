use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the non-blocking file writer alive; drop it last in `main`.
pub struct LoggingGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber for `component`.
///
/// Log records go to stderr so stdout stays free for command output. When
/// file logging is enabled a daily-rolling `<component>.log` is written under
/// `<root>/logs`; failure to create that directory only disables the file
/// layer.
pub fn init(
    component: &str,
    root: &Path,
    cfg: &LoggingConfig,
    force_debug: bool,
) -> Result<LoggingGuards> {
    let filter = build_filter(cfg, force_debug);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact();

    let log_dir = root.join("logs");
    let mut warn_msg: Option<String> = None;

    let file_writer = if cfg.enabled && cfg.file_logging {
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender =
                    tracing_appender::rolling::daily(&log_dir, log_file_name(component));
                Some(tracing_appender::non_blocking(appender))
            }
            Err(err) => {
                warn_msg = Some(format!(
                    "File logging disabled ({}): {}",
                    log_dir.display(),
                    err
                ));
                None
            }
        }
    } else {
        None
    };

    let (file_layer, file_guard) = match file_writer {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .with_ansi(false)
                .compact()
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A second init in the same process (tests, embedding) is not an error.
    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    if let Some(message) = warn_msg {
        tracing::warn!("{message}");
    }

    Ok(LoggingGuards {
        _file_guard: file_guard,
    })
}

fn build_filter(cfg: &LoggingConfig, force_debug: bool) -> EnvFilter {
    if cfg.enabled && !force_debug {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::try_new(cfg.directive(force_debug)).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub(crate) fn log_file_name(component: &str) -> String {
    format!("{component}.log")
}
