//! Background thread that owns `git2::Repository` for its lifetime.
//!
//! All communication is via channels: `WorkspaceRequest` in,
//! `AppEvent::WorkspaceFiles` out.

use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use git2::{Repository, Status, StatusOptions};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use crate::workspace::is_supported;
use crate::workspace::types::{WorkspaceFile, WorkspaceRequest};

/// Opens the repository containing `dir` and answers scan requests until the
/// channel closes. Outside a repository every scan reports an empty list.
pub fn workspace_worker_loop(
    dir: PathBuf,
    rx: Receiver<WorkspaceRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let repo = match Repository::discover(&dir) {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::info!(dir = %dir.display(), error = %e, "not a git work tree, file list stays empty");
            None
        }
    };

    for request in rx {
        let files = match (&repo, request) {
            (Some(repo), WorkspaceRequest::Scan) => scan(repo).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "workspace scan failed");
                Vec::new()
            }),
            (None, WorkspaceRequest::Scan) => Vec::new(),
        };
        if event_tx.send(AppEvent::WorkspaceFiles(files)).is_err() {
            break;
        }
    }
}

/// Changed and untracked files restyle can format, sorted by path.
fn scan(repo: &Repository) -> Result<Vec<WorkspaceFile>, git2::Error> {
    let Some(workdir) = repo.workdir() else {
        return Ok(Vec::new());
    };
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut files: Vec<WorkspaceFile> = statuses
        .iter()
        .filter_map(|entry| {
            let rel = entry.path()?.to_owned();
            let status = status_char(entry.status())?;
            let path = workdir.join(&rel);
            (is_supported(Path::new(&rel)) && path.is_file())
                .then(|| WorkspaceFile { path, label: rel, status })
        })
        .collect();
    files.sort_by(|a, b| a.label.cmp(&b.label));
    tracing::debug!(count = files.len(), "workspace scanned");
    Ok(files)
}

fn status_char(status: Status) -> Option<char> {
    if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
        None
    } else if status.contains(Status::WT_NEW) {
        Some('?')
    } else if status.contains(Status::INDEX_NEW) {
        Some('A')
    } else if status.intersects(
        Status::WT_MODIFIED | Status::INDEX_MODIFIED | Status::WT_RENAMED | Status::INDEX_RENAMED,
    ) {
        Some('M')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_files_are_skipped() {
        assert_eq!(status_char(Status::WT_DELETED), None);
        assert_eq!(status_char(Status::WT_NEW), Some('?'));
        assert_eq!(status_char(Status::INDEX_NEW | Status::WT_MODIFIED), Some('A'));
        assert_eq!(status_char(Status::WT_MODIFIED), Some('M'));
        assert_eq!(status_char(Status::CURRENT), None);
    }

    #[test]
    fn scan_lists_supported_untracked_files() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("main.c"), "int x;\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "hi\n").unwrap();
        std::fs::create_dir(tmp.path().join("web")).unwrap();
        std::fs::write(tmp.path().join("web").join("app.js"), "let a;\n").unwrap();

        let files = scan(&repo).unwrap();
        let labels: Vec<&str> = files.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["main.c", "web/app.js"]);
        assert!(files.iter().all(|f| f.status == '?'));
        assert!(files[0].path.is_absolute());
    }
}
