//! File list source for the terminal UI.
//!
//! With no files on the command line, a background thread scans the git work
//! tree for changed files restyle can format. `git2::Repository` is `!Send`, so
//! the thread opens it itself and never hands it out.
pub mod types;
pub mod worker;

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use tokio::sync::mpsc::UnboundedSender;

use restyle_core::types::Language;

use crate::event::AppEvent;
use types::{WorkspaceFile, WorkspaceRequest};

/// Owner of the worker thread. Dropping it closes the request channel, which
/// ends the thread.
pub struct Workspace {
    tx: Sender<WorkspaceRequest>,
}

impl Workspace {
    /// Asks for a fresh scan; the result arrives as `AppEvent::WorkspaceFiles`.
    pub fn refresh(&self) {
        let _ = self.tx.send(WorkspaceRequest::Scan);
    }
}

/// Starts the worker for the repository containing `dir` and queues the first scan.
pub fn spawn(dir: PathBuf, event_tx: UnboundedSender<AppEvent>) -> Workspace {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || worker::workspace_worker_loop(dir, rx, event_tx));
    let workspace = Workspace { tx };
    workspace.refresh();
    workspace
}

/// File list entries for paths given on the command line.
pub fn explicit_files(paths: &[PathBuf]) -> Vec<WorkspaceFile> {
    paths
        .iter()
        .map(|p| WorkspaceFile {
            path: p.canonicalize().unwrap_or_else(|_| p.clone()),
            label: p.display().to_string(),
            status: if p.exists() { ' ' } else { '!' },
        })
        .collect()
}

/// True for files a bundled formatter handles.
pub fn is_supported(path: &Path) -> bool {
    Language::from_path(path).is_some()
}
