//! On-disk layout of the temp root.
//!
//! ```text
//! <root>/
//!   backup/<millis>[-n]_<file name>   append-only copies of sources taken before apply
//!   diff/<millis>[-n]/<file name>     one directory per session, exactly one artifact
//!   state.db                          session journal
//! ```
//!
//! Directories and backups are created with create-new semantics, so two
//! sessions started within the same millisecond get distinct paths instead of
//! sharing one.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Debug, Clone)]
pub struct TempRoot {
    root: PathBuf,
}

impl TempRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backup")
    }

    pub fn diff_dir(&self) -> PathBuf {
        self.root.join("diff")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join("state.db")
    }

    /// Creates `backup/` and `diff/` if missing.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.backup_dir())?;
        fs::create_dir_all(self.diff_dir())?;
        Ok(())
    }

    /// Creates a fresh session directory and returns the artifact path inside it.
    ///
    /// The artifact file itself is not created; the formatter writes it.
    pub fn allocate(&self, file_name: &str) -> io::Result<PathBuf> {
        let diff_dir = self.diff_dir();
        fs::create_dir_all(&diff_dir)?;
        let stamp = now_millis();
        let mut n = 0u32;
        loop {
            let name = if n == 0 { stamp.to_string() } else { format!("{stamp}-{n}") };
            let dir = diff_dir.join(name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir.join(file_name)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Deletes an artifact together with its session directory.
    ///
    /// Returns `NotFound` when the artifact was already removed, so callers can
    /// tell an external deletion apart from a clean teardown. Paths outside
    /// `diff/` are refused.
    pub fn discard(&self, artifact: &Path) -> io::Result<()> {
        let dir = self.session_dir_of(artifact)?;
        let artifact_existed = artifact.exists();
        match fs::remove_dir_all(&dir) {
            Ok(()) if artifact_existed => Ok(()),
            Ok(()) => Err(io::Error::new(ErrorKind::NotFound, "artifact already removed")),
            Err(e) => Err(e),
        }
    }

    /// Like [`TempRoot::discard`] but treats an already-missing artifact as done.
    pub fn discard_quietly(&self, artifact: &Path) -> io::Result<()> {
        match self.discard(artifact) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Copies `source` into `backup/` under a timestamped name. Never overwrites.
    pub fn backup(&self, source: &Path) -> io::Result<PathBuf> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir)?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_owned());
        let stamp = now_millis();
        let mut reader = fs::File::open(source)?;
        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{stamp}_{file_name}")
            } else {
                format!("{stamp}-{n}_{file_name}")
            };
            let target = backup_dir.join(name);
            match fs::OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(mut out) => {
                    io::copy(&mut reader, &mut out)?;
                    out.sync_all()?;
                    return Ok(target);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// Removes every session directory under `diff/`. Backups are untouched.
    pub fn purge(&self) -> io::Result<()> {
        let entries = match fs::read_dir(self.diff_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let path = entry?.path();
            let res = if path.is_dir() { fs::remove_dir_all(&path) } else { fs::remove_file(&path) };
            match res {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }

    fn session_dir_of(&self, artifact: &Path) -> io::Result<PathBuf> {
        let dir = artifact
            .parent()
            .filter(|dir| dir.parent() == Some(self.diff_dir().as_path()))
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("{} is not a session artifact", artifact.display()),
                )
            })?;
        Ok(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_never_reuses_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path());
        root.ensure().unwrap();
        let a = root.allocate("main.c").unwrap();
        let b = root.allocate("main.c").unwrap();
        assert_ne!(a.parent(), b.parent());
        assert!(a.parent().unwrap().is_dir());
        assert!(b.parent().unwrap().is_dir());
        assert_eq!(a.file_name().unwrap(), "main.c");
    }

    #[test]
    fn discard_reports_external_removal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path());
        let artifact = root.allocate("x.py").unwrap();
        fs::write(&artifact, "x = 1\n").unwrap();
        root.discard(&artifact).unwrap();
        assert!(!artifact.parent().unwrap().exists());

        let artifact = root.allocate("x.py").unwrap();
        let err = root.discard(&artifact).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!artifact.parent().unwrap().exists(), "directory still removed");
        root.discard_quietly(&artifact).unwrap();
    }

    #[test]
    fn discard_refuses_paths_outside_diff_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path().join("root"));
        let outside = tmp.path().join("user").join("main.c");
        fs::create_dir_all(outside.parent().unwrap()).unwrap();
        fs::write(&outside, "int main(){}").unwrap();
        let err = root.discard(&outside).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(outside.exists());
    }

    #[test]
    fn backups_are_append_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path().join("root"));
        let source = tmp.path().join("main.c");
        fs::write(&source, "one").unwrap();
        let first = root.backup(&source).unwrap();
        fs::write(&source, "two").unwrap();
        let second = root.backup(&source).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "one");
        assert_eq!(fs::read_to_string(&second).unwrap(), "two");
        assert!(second.file_name().unwrap().to_string_lossy().ends_with("_main.c"));
    }

    #[test]
    fn purge_empties_diff_but_keeps_backups() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path());
        root.ensure().unwrap();
        let artifact = root.allocate("a.sql").unwrap();
        fs::write(&artifact, "select 1;").unwrap();
        let source = tmp.path().join("a.sql");
        fs::write(&source, "select 1;").unwrap();
        root.backup(&source).unwrap();

        root.purge().unwrap();
        assert_eq!(fs::read_dir(root.diff_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(root.backup_dir()).unwrap().count(), 1);
    }

    #[test]
    fn purge_tolerates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = TempRoot::new(tmp.path().join("never-created"));
        root.purge().unwrap();
    }
}
