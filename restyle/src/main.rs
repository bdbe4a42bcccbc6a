//! restyle: format a file into a throwaway copy, review the difference
//! side by side, then apply it, fix it by hand, or dismiss it.
//!
//! # Startup sequence (terminal UI)
//!
//! 1. Load settings from XDG config, read-only and safe before terminal init.
//! 2. Start logging into `<temp root>/restyle.log`.
//! 3. Open the session journal and run startup cleanup.
//! 4. `install_panic_hook()`, `register_sigterm()`, `init_tui()`.
//! 5. Spawn the event task and, when no files were named, the workspace worker.
//!
//! `restore_tui()` is reached on every exit path of the event loop; the panic
//! hook covers the rest.

mod app;
mod event;
mod explain;
mod headless;
mod highlight;
mod logging;
mod presenter;
mod theme;
mod tui;
mod ui;
mod watch;
mod workspace;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedSender;

use restyle_core::artifacts::TempRoot;
use restyle_core::config::{config_path, Settings};
use restyle_core::db;
use restyle_core::formatter::{CommandFormatter, Formatter};
use restyle_core::lifecycle::{Outcome, SessionLifecycle};
use restyle_core::store::SessionStore;
use restyle_core::telemetry::{LogSink, Telemetry};

use crate::event::{AppEvent, FormatDone};
use crate::ui::keybindings::KeyAction;

#[derive(Parser)]
#[command(name = "restyle", version, about = "Review formatter changes before they touch your code")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/restyle/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,

    /// Files to list in the terminal UI; with exactly one, it is checked at once
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Check one file and print the diff; exits with status 1 when it differs
    Check {
        file: PathBuf,
        /// Apply the formatted copy (a backup of the original is kept)
        #[arg(long)]
        apply: bool,
    },
    /// Show recent sessions from the journal
    History {
        /// Maximum number of sessions
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Remove artifacts and close sessions left behind by a previous run
    Cleanup,
    /// Lint a Python file and print the linter's JSON report
    Lint { file: PathBuf },
}

type Lifecycle = SessionLifecycle<CommandFormatter>;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_path);
    let settings = Settings::load(&path);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("restyle: cannot start runtime: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli, settings, &path)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            eprintln!("restyle: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn dispatch(
    cli: Cli,
    settings: Settings,
    config: &Path,
) -> anyhow::Result<std::process::ExitCode> {
    let root = TempRoot::new(&settings.temp_root);
    root.ensure()
        .with_context(|| format!("creating temp root {}", root.path().display()))?;

    match cli.cmd {
        Some(Command::Check { file, apply }) => {
            logging::init_stderr()?;
            tracing::debug!(config = %config.display(), "settings loaded");
            let mut lifecycle = open_lifecycle(&settings, root).await?;
            headless::check(&mut lifecycle, &file, apply).await
        }
        Some(Command::History { limit }) => {
            logging::init_stderr()?;
            let lifecycle = open_lifecycle(&settings, root).await?;
            headless::history(&lifecycle, limit).await
        }
        Some(Command::Cleanup) => {
            logging::init_stderr()?;
            let mut lifecycle = open_lifecycle(&settings, root).await?;
            headless::cleanup(&mut lifecycle).await
        }
        Some(Command::Lint { file }) => {
            logging::init_stderr()?;
            headless::lint(&file).await
        }
        None => {
            logging::init_file(&root.path().join(logging::LOG_FILE))?;
            tracing::info!(config = %config.display(), "restyle starting");
            let lifecycle = open_lifecycle(&settings, root).await?;
            run_tui(lifecycle, &settings, cli.files).await?;
            Ok(std::process::ExitCode::SUCCESS)
        }
    }
}

async fn open_lifecycle(settings: &Settings, root: TempRoot) -> anyhow::Result<Lifecycle> {
    let journal = db::open_db(&root.journal_path())
        .await
        .with_context(|| format!("opening journal {}", root.journal_path().display()))?;
    let telemetry = Telemetry::spawn(settings.telemetry, LogSink);
    Ok(SessionLifecycle::new(
        SessionStore::new(root),
        CommandFormatter::new(settings.clone()),
        journal,
        telemetry,
    ))
}

async fn run_tui(
    mut lifecycle: Lifecycle,
    settings: &Settings,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let theme = theme::Theme::from_name(&settings.theme);
    let mut explainer = explain::CommandExplainer::new(settings.explain_command.clone());
    let mut state = app::AppState::default();

    lifecycle.startup(&mut state).await;

    let cwd = std::env::current_dir().context("reading current directory")?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let tx = handler.tx.clone();
    let mut rx = handler.rx;

    // Keeps the worker alive for the whole loop; dropping it ends the thread.
    let workspace = if files.is_empty() {
        state.files_loading = true;
        Some(workspace::spawn(cwd, tx.clone()))
    } else {
        state.set_files(workspace::explicit_files(&files));
        None
    };
    if let [only] = files.as_slice() {
        start_session(&mut lifecycle, &mut state, &tx, only).await;
    }

    let mut watch: Option<watch::Watch> = None;
    let mut result = Ok(());

    // Exits only via `break`, so `restore_tui()` below is always reached.
    'event_loop: loop {
        tokio::select! {
            // Heartbeat so SIGTERM is noticed even when the terminal is quiet.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                            result = Err(e.into());
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Key(key)) => {
                        let action = ui::keybindings::handle_key(key, &mut state);
                        let keep_going = perform(
                            action,
                            &mut lifecycle,
                            &mut state,
                            &mut explainer,
                            &tx,
                            &mut watch,
                            workspace.as_ref(),
                        )
                        .await;
                        if !keep_going {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        ui::keybindings::handle_mouse(mouse, &mut state);
                    }
                    Some(AppEvent::Resize(_, _)) => {
                        // frame.area() picks up the new size on the next Render.
                    }
                    Some(AppEvent::Tick) => {
                        if let Some(w) = watch.as_mut() {
                            poll_watch(w, &mut lifecycle, &mut state).await;
                        }
                        if state.bound.is_none() {
                            watch = None;
                        }
                    }
                    Some(AppEvent::FormatFinished(done)) => {
                        let FormatDone { job, result: formatted } = *done;
                        let handle = job.handle;
                        state.clear_pending(handle);
                        if let Ok(Outcome::Presenting) =
                            lifecycle.complete(job, formatted, &mut state).await
                        {
                            watch = lifecycle.current().map(watch::Watch::new);
                        }
                    }
                    Some(AppEvent::WorkspaceFiles(files)) => {
                        state.set_files(files);
                    }
                    Some(AppEvent::Quit) | None => break 'event_loop,
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    // Whatever is still open is dismissed so no artifact outlives the process.
    if let Some(handle) = state.active_handle() {
        state.dismiss_view(handle);
        if let Err(e) = lifecycle.presentation_closed(handle, &mut state).await {
            tracing::warn!(error = %e, "cannot close session on exit");
        }
    }

    tui::restore_tui()?;
    tracing::info!("restyle exiting");
    result
}

/// Carries out a key action. Returns false when the loop should stop.
async fn perform(
    action: KeyAction,
    lifecycle: &mut Lifecycle,
    state: &mut app::AppState,
    explainer: &mut explain::CommandExplainer,
    tx: &UnboundedSender<AppEvent>,
    watch: &mut Option<watch::Watch>,
    workspace: Option<&workspace::Workspace>,
) -> bool {
    match action {
        KeyAction::Continue => {}
        KeyAction::Quit => return false,
        KeyAction::Run => match state.selected_path() {
            Some(path) => start_session(lifecycle, state, tx, &path).await,
            None => tracing::debug!("run requested with no file selected"),
        },
        KeyAction::Apply => {
            if let Some(handle) = state.bound {
                if lifecycle.apply(handle, state).await.is_ok() && state.bound.is_none() {
                    *watch = None;
                    if let Some(ws) = workspace {
                        ws.refresh();
                    }
                }
            }
        }
        KeyAction::Explain => {
            if let Some(handle) = state.bound {
                if let Some(request) = lifecycle.explain(handle, explainer, state) {
                    tracing::info!(chars = request.payload.diff.len(), "diff sent for explanation");
                }
            }
        }
        KeyAction::Close => {
            if let Some(handle) = state.active_handle() {
                state.dismiss_view(handle);
                if let Err(e) = lifecycle.presentation_closed(handle, state).await {
                    tracing::warn!(error = %e, "close failed");
                }
                *watch = None;
            }
        }
    }
    true
}

/// `request` on the loop, then the formatter on its own task. The result comes
/// back as [`AppEvent::FormatFinished`].
async fn start_session(
    lifecycle: &mut Lifecycle,
    state: &mut app::AppState,
    tx: &UnboundedSender<AppEvent>,
    path: &Path,
) {
    let Ok(job) = lifecycle.request(path, state).await else {
        return;
    };
    state.set_pending(job.handle, path);
    let formatter = lifecycle.formatter();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = formatter.format(&job).await;
        let _ = tx.send(AppEvent::FormatFinished(Box::new(FormatDone { job, result })));
    });
}

async fn poll_watch(w: &mut watch::Watch, lifecycle: &mut Lifecycle, state: &mut app::AppState) {
    let handle = w.handle();
    for change in w.poll() {
        match change {
            watch::Change::Source(bytes) => {
                match lifecycle.source_edited(handle, &bytes, state).await {
                    Ok(Outcome::Presenting) => {
                        state.refresh_original(handle, &String::from_utf8_lossy(&bytes));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "cannot resolve source edit"),
                }
            }
            watch::Change::Artifact(bytes) => {
                if let Some(restored) = lifecycle.artifact_edited(handle, &bytes) {
                    w.accept_artifact(restored);
                }
            }
        }
    }
}
