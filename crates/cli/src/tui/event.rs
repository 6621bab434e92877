//! Async event loop for the TUI: interleaves terminal input, catalog
//! completions and the process output tick.

use std::sync::Arc;
use std::time::Duration;

use catalog::ModelCatalog;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use process::{OutputReceiver, OutputSender, ProcessSupervisor, drain_ready, output_channel};
use proto::LaunchOverrides;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::action::{Action, Command};
use super::app::TuiApp;
use super::render;
use crate::config::Config;
use crate::discover::LocalModel;

/// How often queued process output is folded into the log.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

/// Everything commands act on, owned by the event loop.
struct Effects {
    supervisor: ProcessSupervisor,
    output_tx: OutputSender,
    catalog: Arc<dyn ModelCatalog>,
    done_tx: mpsc::UnboundedSender<Action>,
}

impl Effects {
    /// Runs one command. Results of process calls are applied to `app`
    /// directly; catalog calls run in the background and report through
    /// `done_tx`.
    async fn execute(&self, command: Command, app: &mut TuiApp) {
        match command {
            Command::None | Command::Quit => {}
            Command::Launch(request) => {
                let result = match self.supervisor.start(&request).await {
                    Ok(started) => {
                        self.supervisor.attach_relay(&self.output_tx).await;
                        info!(
                            target = %request.target.label(),
                            mode = %request.mode,
                            pid = ?started.pid,
                            argv = ?started.argv,
                            "Process launched"
                        );
                        Ok(started.pid)
                    }
                    Err(err) => {
                        warn!(target = %request.target.label(), error = %err, "Launch failed");
                        Err(err.to_string())
                    }
                };
                app.update(Action::LaunchFinished { request, result });
            }
            Command::SendInput(text) => {
                if let Err(err) = self.supervisor.write_input(&text).await {
                    debug!(error = %err, "Relay write failed");
                    app.update(Action::InputFailed(err.to_string()));
                }
            }
            Command::Search(query) => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let result = catalog.search(&query).await.map_err(|e| e.to_string());
                    let _ = tx.send(Action::SearchFinished { query, result });
                });
            }
            Command::FetchQuantizations(model_id) => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let result = catalog
                        .list_quantizations(&model_id)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(Action::QuantizationsFinished { model_id, result });
                });
            }
            Command::FetchDetails(model_id) => {
                let catalog = Arc::clone(&self.catalog);
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let result = catalog.describe(&model_id).await.map_err(|e| e.to_string());
                    let _ = tx.send(Action::DetailsFinished { model_id, result });
                });
            }
        }
    }

    /// Collects everything the process produced since the last tick.
    async fn tick(&self, output_rx: &mut OutputReceiver) -> Action {
        let exited = self.supervisor.reap().await.map(|status| status.to_string());
        Action::Tick {
            output: drain_ready(output_rx),
            running: self.supervisor.is_running().await,
            exited,
        }
    }
}

/// Run the full-screen TUI until the user quits.
pub async fn run_tui(
    config: &Config,
    local_models: Vec<LocalModel>,
    catalog: Arc<dyn ModelCatalog>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard; // Drop restores terminal

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (output_tx, mut output_rx) = output_channel();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let effects = Effects {
        supervisor: ProcessSupervisor::new(config.templates()),
        output_tx,
        catalog,
        done_tx,
    };

    let mut app = TuiApp::new(
        local_models,
        LaunchOverrides {
            ngl: config.default_ngl,
            ctx_size: config.default_ctx_size,
        },
    );
    let size = terminal.size()?;
    app.update(Action::Resize {
        width: size.width,
        height: size.height,
    });
    app.update(Action::Initialized);
    debug!(models = app.local_models.len(), "TUI started");

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| render::render(&app, frame))?;

        let action = tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => Action::Key(key),
                Some(Ok(Event::Resize(width, height))) => Action::Resize { width, height },
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    warn!(error = %err, "Terminal event error");
                    continue;
                }
                None => break,
            },
            Some(action) = done_rx.recv() => action,
            _ = tick.tick() => effects.tick(&mut output_rx).await,
        };

        let command = app.update(action);
        effects.execute(command, &mut app).await;

        if app.should_quit {
            break;
        }
    }

    effects.supervisor.stop().await;
    // TerminalGuard::drop handles cleanup
    Ok(())
}
