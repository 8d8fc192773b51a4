mod app;
mod events;
mod logging;
mod strings;
mod terminal;
mod theme;
mod ui;

use std::time::Duration;

use anyhow::Result;
use providers::ollama::OllamaConfig;
use providers::Session;
use terminal::TerminalGuard;
use tracing::info;

fn main() -> Result<()> {
    let _log_guard = logging::init();
    let runtime = tokio::runtime::Runtime::new()?;
    let cfg = OllamaConfig::from_env_and_file()?;
    info!(target: "tui", "starting host={} model={}", cfg.host(), cfg.model);

    let (session, updates) = Session::with_channel(cfg, runtime.handle().clone())?;
    let mut app = app::App::new(session, updates);
    app.pull_current_model();

    let res = {
        let mut term = TerminalGuard::new()?;
        events::run(&mut term.terminal, &mut app)
    };
    // Streams still open are abandoned on exit.
    runtime.shutdown_timeout(Duration::from_millis(200));
    res
}
