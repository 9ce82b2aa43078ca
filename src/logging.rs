//! Tracing subscriber setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::LoggingConfig;

/// Log file name prefix inside `log_dir`.
const LOG_FILE_PREFIX: &str = "scout.log";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides `config.filter`. Output goes to stderr, and also to
/// a daily-rotated file when `config.log_dir` is set; keep the returned
/// guard alive to flush that file. Calling this again once a subscriber is
/// installed does nothing.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (file, guard) = tracing_appender::non_blocking(appender);
            let installed = builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(file))
                .try_init()
                .is_ok();
            installed.then_some(guard)
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
            None
        }
    }
}
