//! Tracing setup.
//!
//! Terminal filter: `DOCDESK_LOG` env > `[logging].level` (default "warn").
//! The optional file layer uses the same filter with ANSI disabled.

use std::{fs, io};

use docdesk_core::config::{LoggingConfig, paths};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "DOCDESK_LOG";
const LOG_FILE: &str = "docdesk.log";

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

pub fn init(config: &LoggingConfig) {
    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(filter(config));

    let file_layer = if config.file {
        let dir = paths::logs_dir();
        match fs::create_dir_all(&dir) {
            Ok(()) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(rolling::never(&dir, LOG_FILE))
                    .with_filter(filter(config)),
            ),
            Err(err) => {
                eprintln!("Warning: cannot create log dir {}: {err}", dir.display());
                None
            }
        }
    } else {
        None
    };

    // Keep any subscriber that is already installed.
    let _ = tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init();

    if config.file {
        tracing::info!(path = %paths::logs_dir().join(LOG_FILE).display(), "File logging enabled");
    }
}
