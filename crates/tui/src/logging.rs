use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    if let Ok(level) = std::env::var("OML_LOG") {
        if let Ok(filter) = EnvFilter::try_new(level) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to `<data_dir>/oml/logs/oml.log`. The terminal is in raw mode while the
/// UI runs, so nothing is written to stdout/stderr.
///
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the whole run. Returns `None` when no data directory is known.
pub fn init() -> Option<WorkerGuard> {
    let dir = BaseDirs::new()?.data_dir().join("oml").join("logs");
    std::fs::create_dir_all(&dir).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "oml.log"));
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);
    tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init()
        .ok()?;
    Some(guard)
}
