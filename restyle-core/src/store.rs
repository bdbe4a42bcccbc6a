//! Single-slot owner of the active session and of the temp-artifact tree.
//!
//! Every filesystem mutation under the temp root goes through this type, and
//! the slot holds at most one [`DiffSession`]. Replacing a session tears the
//! old one down completely before the new artifact directory is created.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::artifacts::{now_millis, TempRoot};
use crate::error::LifecycleError;
use crate::presenter::DiffPresenter;
use crate::types::{DiffSession, SessionHandle, SessionId, SessionRequest, SessionState};

/// Result of [`SessionStore::begin`].
#[derive(Debug, Clone)]
pub struct Begun {
    pub handle: SessionHandle,
    /// Copy of the installed session, still `Requesting`.
    pub session: DiffSession,
    /// The session that was active before and has now been torn down.
    pub superseded: Option<SessionId>,
}

#[derive(Debug)]
pub struct SessionStore {
    root: TempRoot,
    active: Option<DiffSession>,
}

impl SessionStore {
    pub fn new(root: TempRoot) -> Self {
        Self { root, active: None }
    }

    pub fn root(&self) -> &TempRoot {
        &self.root
    }

    pub fn current(&self) -> Option<&DiffSession> {
        self.active.as_ref()
    }

    pub fn is_current(&self, handle: SessionHandle) -> bool {
        self.active.as_ref().is_some_and(|s| s.handle() == handle)
    }

    /// State of the session behind `handle`, `None` when the handle is stale.
    pub fn state_of(&self, handle: SessionHandle) -> Option<SessionState> {
        self.active.as_ref().filter(|s| s.handle() == handle).map(|s| s.state)
    }

    /// Installs a new session for `request`, terminating any active one first.
    ///
    /// A prior session whose artifact is already gone is a conflict: it is
    /// logged and the new session still begins. The only error returned is a
    /// failure to create the new artifact directory, in which case the slot
    /// is left empty.
    pub fn begin(
        &mut self,
        request: SessionRequest,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Begun, LifecycleError> {
        let superseded = match self.terminate_active(presenter) {
            Some((prior, Ok(()))) => Some(prior.id),
            Some((prior, Err(e))) => {
                tracing::warn!(session = %prior.id, error = %e, "superseded session teardown conflict");
                Some(prior.id)
            }
            None => None,
        };

        let formatted_path = self
            .root
            .allocate(&request.file_name())
            .map_err(|e| LifecycleError::artifact_io("allocating artifact directory", self.root.diff_dir(), e))?;

        let session = DiffSession {
            id: SessionId::new(),
            title: request.title(),
            source_path: request.source_path,
            formatted_path,
            language: request.language,
            created_at: now_millis(),
            state: SessionState::Requesting,
        };
        let handle = session.handle();
        tracing::debug!(
            session = %session.id,
            artifact = %session.formatted_path.display(),
            "session begun"
        );
        self.active = Some(session.clone());
        Ok(Begun { handle, session, superseded })
    }

    /// Clears the slot if `handle` is current. Idempotent; stale handles are ignored.
    pub fn end(&mut self, handle: SessionHandle) -> Option<DiffSession> {
        if self.is_current(handle) {
            self.active.take()
        } else {
            None
        }
    }

    /// Moves the current session to `state`. Returns false for a stale handle.
    pub fn set_state(&mut self, handle: SessionHandle, state: SessionState) -> bool {
        match self.active.as_mut() {
            Some(session) if session.handle() == handle => {
                session.state = state;
                true
            }
            _ => false,
        }
    }

    /// Closes the presentation, releases bindings, deletes the artifact and
    /// clears the slot. The session is returned even when deletion fails.
    pub fn terminate(
        &mut self,
        handle: SessionHandle,
        presenter: &mut dyn DiffPresenter,
    ) -> Option<(DiffSession, Result<(), LifecycleError>)> {
        if !self.is_current(handle) {
            return None;
        }
        self.terminate_active(presenter)
    }

    fn terminate_active(
        &mut self,
        presenter: &mut dyn DiffPresenter,
    ) -> Option<(DiffSession, Result<(), LifecycleError>)> {
        let session = self.active.take()?;
        let handle = session.handle();
        if session.state == SessionState::Presenting {
            presenter.close(handle);
        }
        presenter.bind(None);
        let res = self
            .root
            .discard(&session.formatted_path)
            .map_err(|source| LifecycleError::Conflict { session: session.id, source });
        Some((session, res))
    }

    /// Deletes an artifact and its session directory; already-missing is fine.
    pub fn discard_artifact(&self, artifact: &Path) -> io::Result<()> {
        self.root.discard_quietly(artifact)
    }

    /// Rewrites an artifact in place, used to revert edits to the formatted side.
    pub fn restore_artifact(&self, artifact: &Path, contents: &[u8]) -> io::Result<()> {
        if artifact.parent().and_then(Path::parent) != Some(self.root.diff_dir().as_path()) {
            return Err(io::Error::new(ErrorKind::InvalidInput, "not a session artifact"));
        }
        std::fs::write(artifact, contents)
    }

    pub fn backup(&self, source: &Path) -> io::Result<PathBuf> {
        self.root.backup(source)
    }

    /// Deletes a backup taken by [`SessionStore::backup`]. Anything outside
    /// `backup/` is refused.
    pub fn discard_backup(&self, backup: &Path) -> io::Result<()> {
        if backup.parent() != Some(self.root.backup_dir().as_path()) {
            return Err(io::Error::new(ErrorKind::InvalidInput, "not a backup"));
        }
        std::fs::remove_file(backup)
    }

    pub fn ensure_layout(&self) -> io::Result<()> {
        self.root.ensure()
    }

    /// Removes every session directory. Refused while a session is active.
    pub fn purge(&self) -> io::Result<()> {
        if self.active.is_some() {
            return Err(io::Error::new(ErrorKind::WouldBlock, "a session is active"));
        }
        self.root.purge()
    }
}
