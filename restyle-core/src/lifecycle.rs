//! The session state machine.
//!
//! ```text
//! Requesting -> Formatting -> Presenting -> Resolved(Applied | Fixed | Dismissed) -> Closed
//!                    |   \-> Resolved(NoDiff) -> Closed
//!                    \-> Closed (formatter failed, or cancelled)
//! ```
//!
//! All transitions run on the caller's event loop. The formatter call is the
//! only suspension point of a session; its result comes back through
//! [`SessionLifecycle::complete`], which drops it unless the job's handle is
//! still current and still `Formatting`.

use std::path::Path;
use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::db;
use crate::diff;
use crate::error::{ExplainError, FormatError, LifecycleError};
use crate::explain::{ExplainRequest, Explainer};
use crate::formatter::{FormatJob, Formatter};
use crate::presenter::{DiffPresenter, Notice, Presentation};
use crate::store::SessionStore;
use crate::telemetry::{Telemetry, TelemetryEventKind};
use crate::types::{
    CloseReason, DiffSession, Language, Resolution, SessionHandle, SessionId, SessionRecord,
    SessionRequest, SessionState,
};

pub const NOTICE_LOOKS_GOOD: &str = "Looks good!";
pub const NOTICE_FIXED: &str = "Good job fixing the formatting!";
pub const NOTICE_APPLIED: &str = "Formatting applied. A backup of the original was saved.";
pub const NOTICE_NO_EXPLAINER: &str = "No explanation service is configured.";
pub const NOTICE_EXPLAIN_FAILED: &str = "Could not reach the explanation service.";

/// What a lifecycle call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The comparison is on screen and apply/explain are bound.
    Presenting,
    /// The session resolved and has been closed.
    Resolved(Resolution),
    /// Closed while the formatter was still running.
    Cancelled,
    /// A formatter result arrived for a session that is no longer waiting for it.
    Discarded,
    /// Stale handle or wrong state; nothing changed.
    Ignored,
}

/// Formatter output captured when the presentation opened, byte for byte.
#[derive(Debug)]
struct Snapshot {
    handle: SessionHandle,
    formatted: Vec<u8>,
}

pub struct SessionLifecycle<F: Formatter> {
    store: SessionStore,
    formatter: Arc<F>,
    journal: Connection,
    telemetry: Telemetry,
    snapshot: Option<Snapshot>,
}

impl<F: Formatter> SessionLifecycle<F> {
    pub fn new(store: SessionStore, formatter: F, journal: Connection, telemetry: Telemetry) -> Self {
        Self { store, formatter: Arc::new(formatter), journal, telemetry, snapshot: None }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn current(&self) -> Option<&DiffSession> {
        self.store.current()
    }

    /// Shared formatter, for hosts that run jobs on their own tasks.
    pub fn formatter(&self) -> Arc<F> {
        Arc::clone(&self.formatter)
    }

    /// Clears what a crash or forced quit left behind. Never fails.
    ///
    /// Sessions still open in the journal get their presentation re-opened
    /// and closed at once (when both files still exist) and are marked
    /// abandoned; then every session directory is purged.
    pub async fn startup(&mut self, presenter: &mut dyn DiffPresenter) {
        if let Err(e) = self.store.ensure_layout() {
            tracing::warn!(root = %self.store.root().path().display(), error = %e, "cannot create temp layout");
        }

        match db::load_dangling(&self.journal).await {
            Ok(records) => {
                for record in records {
                    clear_stale_presentation(&record, presenter);
                    self.journal_close(&record.id, CloseReason::Abandoned).await;
                }
            }
            Err(e) => tracing::warn!(error = %e, "cannot read dangling sessions"),
        }
        presenter.bind(None);

        if let Err(e) = self.store.purge() {
            tracing::warn!(error = %e, "cannot purge stale artifacts");
        }
    }

    /// `Requesting -> Formatting`. Returns the job the formatter must run.
    ///
    /// On rejection the presenter has already been told why.
    pub async fn request(
        &mut self,
        path: &Path,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<FormatJob, LifecycleError> {
        match self.try_request(path, presenter).await {
            Ok(job) => Ok(job),
            Err(e) => Err(self.report(e, presenter)),
        }
    }

    async fn try_request(
        &mut self,
        path: &Path,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<FormatJob, LifecycleError> {
        if let Some(active) = self.store.current() {
            if active.state.is_busy() {
                return Err(LifecycleError::Busy { state: active.state.as_str() });
            }
        }
        if !path.is_file() {
            return Err(LifecycleError::SourceMissing { path: path.to_path_buf() });
        }
        let language = Language::from_path(path)
            .ok_or_else(|| LifecycleError::Unsupported { path: path.to_path_buf() })?;
        let source = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let begun = self.store.begin(SessionRequest::new(source, language), presenter)?;
        if let Some(prior) = begun.superseded {
            self.snapshot = None;
            self.journal_close(&prior.to_string(), CloseReason::Superseded).await;
        }
        self.store.set_state(begun.handle, SessionState::Formatting);

        let mut session = begun.session;
        session.state = SessionState::Formatting;
        if let Err(e) = db::record_session(&self.journal, &session).await {
            tracing::warn!(session = %session.id, error = %e, "cannot journal session");
        }
        tracing::info!(session = %session.id, source = %session.source_path.display(), "formatting");

        Ok(FormatJob {
            handle: begun.handle,
            source: session.source_path,
            artifact: session.formatted_path,
            language,
        })
    }

    /// Applies a formatter result: `Formatting -> Presenting`,
    /// `Formatting -> Resolved(NoDiff)`, or `Formatting -> Closed`.
    pub async fn complete(
        &mut self,
        job: FormatJob,
        result: Result<(), FormatError>,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        let handle = job.handle;
        if self.store.state_of(handle) != Some(SessionState::Formatting) {
            tracing::debug!(session = %handle.id(), "discarding stale formatter result");
            if let Err(e) = self.store.discard_artifact(&job.artifact) {
                tracing::warn!(artifact = %job.artifact.display(), error = %e, "cannot remove stale artifact");
            }
            return Ok(Outcome::Discarded);
        }

        if let Err(e) = result {
            let err = LifecycleError::from(e);
            self.finish(handle, CloseReason::Failed, presenter).await;
            return Err(self.report(err, presenter));
        }

        let (original, formatted) = match read_pair(&job.source, &job.artifact) {
            Ok(pair) => pair,
            Err(err) => {
                self.finish(handle, CloseReason::Failed, presenter).await;
                return Err(self.report(err, presenter));
            }
        };

        if original == formatted {
            self.finish(handle, CloseReason::Resolved(Resolution::NoDiff), presenter).await;
            presenter.notify(Notice::Info(NOTICE_LOOKS_GOOD.to_owned()));
            self.telemetry.emit(TelemetryEventKind::SessionNoDiff, handle.id());
            return Ok(Outcome::Resolved(Resolution::NoDiff));
        }

        // display only; the snapshot below keeps the exact bytes
        let original_text = String::from_utf8_lossy(&original).into_owned();
        let formatted_text = String::from_utf8_lossy(&formatted).into_owned();
        let title = self.store.current().map(|s| s.title.clone()).unwrap_or_default();
        let opened = presenter.open(Presentation {
            handle,
            title: &title,
            source_path: &job.source,
            artifact_path: &job.artifact,
            original: &original_text,
            formatted: &formatted_text,
        });
        if let Err(e) = opened {
            self.finish(handle, CloseReason::Failed, presenter).await;
            return Err(self.report(e.into(), presenter));
        }

        self.store.set_state(handle, SessionState::Presenting);
        self.snapshot = Some(Snapshot { handle, formatted });
        presenter.bind(Some(handle));
        if let Err(e) = db::update_state(&self.journal, handle.id(), SessionState::Presenting).await {
            tracing::warn!(session = %handle.id(), error = %e, "cannot journal state");
        }
        self.telemetry.emit(TelemetryEventKind::SessionPresented, handle.id());
        tracing::info!(session = %handle.id(), "presenting diff");
        Ok(Outcome::Presenting)
    }

    /// `request`, format, `complete` in one go.
    pub async fn run(
        &mut self,
        path: &Path,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        let job = self.request(path, presenter).await?;
        let result = self.formatter.format(&job).await;
        self.complete(job, result, presenter).await
    }

    /// [`SessionLifecycle::run`] on the presenter's focused document.
    pub async fn run_interactive(
        &mut self,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        match presenter.focused_document() {
            Some(path) => self.run(&path, presenter).await,
            None => Ok(Outcome::Ignored),
        }
    }

    /// The user changed the source while the comparison is shown.
    ///
    /// When `live` equals the formatted snapshot byte for byte the diff is
    /// resolved by hand: the bytes are saved to the source and the session
    /// closes as Fixed.
    pub async fn source_edited(
        &mut self,
        handle: SessionHandle,
        live: &[u8],
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        if self.store.state_of(handle) != Some(SessionState::Presenting) {
            return Ok(Outcome::Ignored);
        }
        let resolved = self
            .snapshot
            .as_ref()
            .is_some_and(|snap| snap.handle == handle && snap.formatted == live);
        if !resolved {
            return Ok(Outcome::Presenting);
        }

        let source = match self.store.current() {
            Some(session) => session.source_path.clone(),
            None => return Ok(Outcome::Ignored),
        };
        if let Err(e) = std::fs::write(&source, live) {
            let err = LifecycleError::artifact_io("saving fixed source", &source, e);
            return Err(self.abort(handle, err, presenter).await);
        }

        self.finish(handle, CloseReason::Resolved(Resolution::Fixed), presenter).await;
        presenter.notify(Notice::Info(NOTICE_FIXED.to_owned()));
        self.telemetry.emit(TelemetryEventKind::SessionFixed, handle.id());
        Ok(Outcome::Resolved(Resolution::Fixed))
    }

    /// The formatted side is read-only. Returns the bytes the host must put
    /// back when `live` deviates from the snapshot; the artifact on disk has
    /// already been restored.
    pub fn artifact_edited(&mut self, handle: SessionHandle, live: &[u8]) -> Option<Vec<u8>> {
        if self.store.state_of(handle) != Some(SessionState::Presenting) {
            return None;
        }
        let snap = self.snapshot.as_ref().filter(|snap| snap.handle == handle)?;
        if snap.formatted == live {
            return None;
        }
        let artifact = self.store.current()?.formatted_path.clone();
        if let Err(e) = self.store.restore_artifact(&artifact, &snap.formatted) {
            tracing::warn!(artifact = %artifact.display(), error = %e, "cannot revert artifact edit");
        }
        tracing::debug!(session = %handle.id(), "reverted edit to formatted copy");
        Some(snap.formatted.clone())
    }

    /// `Presenting -> Resolved(Applied)`.
    ///
    /// Re-diffs the files on disk first: when they still differ the source is
    /// backed up and overwritten with the artifact; when they already match
    /// nothing is copied. The session closes either way.
    pub async fn apply(
        &mut self,
        handle: SessionHandle,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        if self.store.state_of(handle) != Some(SessionState::Presenting) {
            return Ok(Outcome::Ignored);
        }
        let (source, artifact) = match self.store.current() {
            Some(session) => (session.source_path.clone(), session.formatted_path.clone()),
            None => return Ok(Outcome::Ignored),
        };

        let differs = match diff::files_differ(&source, &artifact) {
            Ok(differs) => differs,
            Err(e) => {
                let err = LifecycleError::artifact_io("comparing before apply", &artifact, e);
                return Err(self.abort(handle, err, presenter).await);
            }
        };

        if differs {
            let backup = match self.store.backup(&source) {
                Ok(path) => path,
                Err(e) => {
                    let err = LifecycleError::artifact_io("backing up source", &source, e);
                    return Err(self.abort(handle, err, presenter).await);
                }
            };
            if let Err(e) = std::fs::copy(&artifact, &source) {
                self.roll_back_apply(&source, &backup);
                let err = LifecycleError::artifact_io("copying formatted file over source", &source, e);
                return Err(self.abort(handle, err, presenter).await);
            }
            if let Err(e) = db::record_backup(&self.journal, handle.id(), &backup).await {
                tracing::warn!(session = %handle.id(), error = %e, "cannot journal backup");
            }
            tracing::info!(session = %handle.id(), backup = %backup.display(), "applied formatting");
            presenter.notify(Notice::Info(NOTICE_APPLIED.to_owned()));
            self.telemetry.emit(TelemetryEventKind::SessionApplied, handle.id());
        } else {
            tracing::debug!(session = %handle.id(), "diff already resolved, nothing to copy");
        }

        self.finish(handle, CloseReason::Resolved(Resolution::Applied), presenter).await;
        Ok(Outcome::Resolved(Resolution::Applied))
    }

    /// The host closed the comparison.
    ///
    /// While presenting this dismisses the session. While formatting it
    /// cancels: the session ends now and the late formatter result is
    /// discarded by [`SessionLifecycle::complete`].
    pub async fn presentation_closed(
        &mut self,
        handle: SessionHandle,
        presenter: &mut dyn DiffPresenter,
    ) -> Result<Outcome, LifecycleError> {
        match self.store.state_of(handle) {
            Some(SessionState::Presenting) => {
                // already gone on the host side, so finish must not close it again
                self.store.set_state(handle, SessionState::Resolved(Resolution::Dismissed));
                self.finish(handle, CloseReason::Resolved(Resolution::Dismissed), presenter).await;
                self.telemetry.emit(TelemetryEventKind::PresentationClosed, handle.id());
                Ok(Outcome::Resolved(Resolution::Dismissed))
            }
            Some(SessionState::Formatting) => {
                self.finish(handle, CloseReason::Cancelled, presenter).await;
                Ok(Outcome::Cancelled)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    /// Sends a bounded prefix of the current diff to `explainer`.
    ///
    /// Returns the request that was sent, or `None` when the handle is not
    /// presenting, nothing differs any more, or the service failed.
    pub fn explain(
        &self,
        handle: SessionHandle,
        explainer: &mut dyn Explainer,
        presenter: &mut dyn DiffPresenter,
    ) -> Option<ExplainRequest> {
        if self.store.state_of(handle) != Some(SessionState::Presenting) {
            return None;
        }
        let session = self.store.current()?;
        let (original, formatted) = match read_pair(&session.source_path, &session.formatted_path) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(session = %handle.id(), error = %e, "cannot read files for explain");
                return None;
            }
        };
        let name = session
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = diff::unified(
            &String::from_utf8_lossy(&original),
            &String::from_utf8_lossy(&formatted),
            &name,
            &format!("{name} (restyled)"),
        );
        if text.is_empty() {
            return None;
        }

        let request = ExplainRequest::new(diff::bounded_prefix(&text, diff::EXPLAIN_CHAR_BUDGET));
        match explainer.explain(request.clone()) {
            Ok(()) => Some(request),
            Err(ExplainError::Unconfigured) => {
                presenter.notify(Notice::Info(NOTICE_NO_EXPLAINER.to_owned()));
                None
            }
            Err(e) => {
                tracing::warn!(session = %handle.id(), error = %e, "explain request failed");
                presenter.notify(Notice::Error(NOTICE_EXPLAIN_FAILED.to_owned()));
                None
            }
        }
    }

    /// Recent journal rows, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<SessionRecord>, tokio_rusqlite::Error> {
        db::recent_sessions(&self.journal, limit).await
    }

    /// `Resolved(*)` or failure `-> Closed`: closes the presentation when one
    /// is open, releases bindings, deletes the artifact, clears the slot and
    /// closes the journal row.
    async fn finish(
        &mut self,
        handle: SessionHandle,
        reason: CloseReason,
        presenter: &mut dyn DiffPresenter,
    ) {
        if let CloseReason::Resolved(resolution) = reason {
            if self.store.state_of(handle) == Some(SessionState::Presenting) {
                presenter.close(handle);
            }
            self.store.set_state(handle, SessionState::Resolved(resolution));
        }
        if let Some((session, Err(e))) = self.store.terminate(handle, presenter) {
            tracing::warn!(session = %session.id, error = %e, "artifact was already gone at teardown");
        }
        if self.snapshot.as_ref().is_some_and(|snap| snap.handle == handle) {
            self.snapshot = None;
        }
        self.journal_close(&handle.id().to_string(), reason).await;
        tracing::debug!(session = %handle.id(), outcome = reason.as_str(), "session closed");
    }

    /// Ends the session as Failed after an I/O error, then reports it.
    async fn abort(
        &mut self,
        handle: SessionHandle,
        err: LifecycleError,
        presenter: &mut dyn DiffPresenter,
    ) -> LifecycleError {
        self.finish(handle, CloseReason::Failed, presenter).await;
        self.report(err, presenter)
    }

    /// Puts the backed-up original back after a failed copy and drops the
    /// backup. The backup stays when the source cannot be restored.
    fn roll_back_apply(&self, source: &Path, backup: &Path) {
        if let Err(e) = std::fs::copy(backup, source) {
            tracing::error!(
                source = %source.display(),
                backup = %backup.display(),
                error = %e,
                "cannot restore source after failed apply; original kept in backup"
            );
            return;
        }
        if let Err(e) = self.store.discard_backup(backup) {
            tracing::warn!(backup = %backup.display(), error = %e, "cannot remove rolled-back backup");
        }
    }

    async fn journal_close(&self, id: &str, reason: CloseReason) {
        if let Err(e) = db::close_session(&self.journal, id, reason).await {
            tracing::warn!(session = id, error = %e, "cannot journal session close");
        }
    }

    /// Logs the diagnostic, shows the friendly message, hands the error back.
    fn report(&self, err: LifecycleError, presenter: &mut dyn DiffPresenter) -> LifecycleError {
        match &err {
            LifecycleError::Busy { .. }
            | LifecycleError::SourceMissing { .. }
            | LifecycleError::Unsupported { .. } => {
                tracing::info!(error = %err, "request rejected");
            }
            LifecycleError::Conflict { .. } => tracing::warn!(error = %err, "session conflict"),
            _ => tracing::error!(error = %err, "session aborted"),
        }
        presenter.notify(Notice::Error(err.user_message()));
        err
    }
}

fn read_pair(source: &Path, artifact: &Path) -> Result<(Vec<u8>, Vec<u8>), LifecycleError> {
    let original = std::fs::read(source)
        .map_err(|e| LifecycleError::artifact_io("reading source", source, e))?;
    let formatted = std::fs::read(artifact)
        .map_err(|e| LifecycleError::artifact_io("reading formatted copy", artifact, e))?;
    Ok((original, formatted))
}

/// Re-opens and immediately closes a presentation left over from a previous
/// run, so a host that restores its views drops the stale one.
fn clear_stale_presentation(record: &SessionRecord, presenter: &mut dyn DiffPresenter) {
    let source = Path::new(&record.source_path);
    let artifact = Path::new(&record.artifact_path);
    let (Ok(original), Ok(formatted)) =
        (std::fs::read_to_string(source), std::fs::read_to_string(artifact))
    else {
        tracing::debug!(session = %record.id, "stale session files are gone, nothing to re-open");
        return;
    };
    let handle = SessionHandle::new(SessionId::parse(&record.id).unwrap_or_default());
    let view = Presentation {
        handle,
        title: &record.title,
        source_path: source,
        artifact_path: artifact,
        original: &original,
        formatted: &formatted,
    };
    match presenter.open(view) {
        Ok(()) => presenter.close(handle),
        Err(e) => tracing::debug!(session = %record.id, error = %e, "cannot re-open stale session"),
    }
}
