use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tr4ction_core::Config;

pub const LOG_ENV: &str = "TR4CTION_LOG";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// The TUI owns stderr, so interactive sessions log to a daily file under
/// the config dir. Keep the guard alive until exit or buffered lines are lost.
pub fn init_file() -> Result<WorkerGuard> {
    let dir = Config::config_dir()?.join("logs");
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::daily(&dir, "tr4ction.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

/// One-shot commands log warnings and errors to stderr.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .init();
}
