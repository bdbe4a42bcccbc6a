//! Owned, `Send` data passed between the workspace thread and the UI.

use std::path::PathBuf;

/// One entry of the file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    /// Absolute path handed to the lifecycle.
    pub path: PathBuf,
    /// Path as shown in the list, relative to the work tree when scanned.
    pub label: String,
    /// `'M'` modified, `'A'` staged new, `'?'` untracked, `' '` named on the
    /// command line, `'!'` missing.
    pub status: char,
}

/// Commands sent from the main thread to the workspace worker.
#[derive(Debug)]
pub enum WorkspaceRequest {
    Scan,
}
