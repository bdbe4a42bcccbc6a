//! Tick-driven polling of the two files behind the open comparison.
//!
//! A changed source may mean the user fixed the formatting by hand; a changed
//! artifact is an edit to the read-only side and gets reverted.

use std::path::PathBuf;

use restyle_core::types::{DiffSession, SessionHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Source(Vec<u8>),
    Artifact(Vec<u8>),
}

#[derive(Debug)]
pub struct Watch {
    handle: SessionHandle,
    source: PathBuf,
    artifact: PathBuf,
    last_source: Option<Vec<u8>>,
    last_artifact: Option<Vec<u8>>,
}

impl Watch {
    pub fn new(session: &DiffSession) -> Self {
        Self {
            handle: session.handle(),
            last_source: std::fs::read(&session.source_path).ok(),
            last_artifact: std::fs::read(&session.formatted_path).ok(),
            source: session.source_path.clone(),
            artifact: session.formatted_path.clone(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Reads both files and reports those whose contents changed since the
    /// last poll. Unreadable files are skipped until they come back.
    pub fn poll(&mut self) -> Vec<Change> {
        let mut changes = Vec::new();
        if let Some(bytes) = changed(&self.source, &mut self.last_source) {
            changes.push(Change::Source(bytes));
        }
        if let Some(bytes) = changed(&self.artifact, &mut self.last_artifact) {
            changes.push(Change::Artifact(bytes));
        }
        changes
    }

    /// Records the artifact bytes the lifecycle restored, so the revert
    /// itself is not reported as another edit.
    pub fn accept_artifact(&mut self, restored: Vec<u8>) {
        self.last_artifact = Some(restored);
    }
}

fn changed(path: &std::path::Path, last: &mut Option<Vec<u8>>) -> Option<Vec<u8>> {
    let now = std::fs::read(path).ok()?;
    if last.as_deref() == Some(now.as_slice()) {
        return None;
    }
    *last = Some(now.clone());
    Some(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use restyle_core::types::{Language, SessionId, SessionState};

    fn session(dir: &std::path::Path) -> DiffSession {
        let source = dir.join("main.c");
        let artifact = dir.join("formatted.c");
        std::fs::write(&source, "int a;\n").unwrap();
        std::fs::write(&artifact, "INT A;\n").unwrap();
        DiffSession {
            id: SessionId::new(),
            source_path: source,
            formatted_path: artifact,
            title: "restyle main.c".to_owned(),
            language: Language::C,
            created_at: 0,
            state: SessionState::Presenting,
        }
    }

    #[test]
    fn reports_each_change_once() {
        let tmp = tempfile::tempdir().unwrap();
        let s = session(tmp.path());
        let mut watch = Watch::new(&s);
        assert!(watch.poll().is_empty());

        std::fs::write(&s.source_path, "INT a;\n").unwrap();
        assert_eq!(watch.poll(), vec![Change::Source(b"INT a;\n".to_vec())]);
        assert!(watch.poll().is_empty());

        std::fs::write(&s.formatted_path, "oops").unwrap();
        assert_eq!(watch.poll(), vec![Change::Artifact(b"oops".to_vec())]);
    }

    #[test]
    fn accepted_restore_is_not_an_edit() {
        let tmp = tempfile::tempdir().unwrap();
        let s = session(tmp.path());
        let mut watch = Watch::new(&s);

        std::fs::write(&s.formatted_path, "oops").unwrap();
        assert_eq!(watch.poll().len(), 1);
        std::fs::write(&s.formatted_path, "INT A;\n").unwrap();
        watch.accept_artifact(b"INT A;\n".to_vec());
        assert!(watch.poll().is_empty());
    }

    #[test]
    fn changes_carry_raw_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let s = session(tmp.path());
        let mut watch = Watch::new(&s);

        std::fs::write(&s.source_path, b"/* caf\xE9 */\n").unwrap();
        assert_eq!(watch.poll(), vec![Change::Source(b"/* caf\xE9 */\n".to_vec())]);
    }

    #[test]
    fn vanished_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let s = session(tmp.path());
        let mut watch = Watch::new(&s);
        std::fs::remove_file(&s.formatted_path).unwrap();
        assert!(watch.poll().is_empty());
    }
}
