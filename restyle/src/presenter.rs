//! The terminal UI as a session host.

use std::path::PathBuf;

use restyle_core::error::PresenterError;
use restyle_core::presenter::{DiffPresenter, Notice, Presentation};
use restyle_core::types::SessionHandle;

use crate::app::{AppState, DiffView, PanelFocus};
use crate::highlight::build_rows;

impl DiffPresenter for AppState {
    fn open(&mut self, view: Presentation<'_>) -> Result<(), PresenterError> {
        let extension = view
            .source_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (rows, change_offsets) = build_rows(view.original, view.formatted, &extension);
        tracing::debug!(session = %view.handle.id(), rows = rows.len(), "comparison opened");

        self.view = Some(DiffView {
            handle: view.handle,
            title: view.title.to_owned(),
            source_path: view.source_path.to_path_buf(),
            extension,
            formatted: view.formatted.to_owned(),
            rows,
            change_offsets,
        });
        self.clear_pending(view.handle);
        self.diff_scroll = 0;
        self.change_cursor = 0;
        self.focus = PanelFocus::Diff;
        Ok(())
    }

    fn close(&mut self, handle: SessionHandle) {
        self.dismiss_view(handle);
    }

    fn bind(&mut self, handle: Option<SessionHandle>) {
        self.bound = handle;
    }

    fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    fn focused_document(&self) -> Option<PathBuf> {
        self.selected_path()
    }
}

impl AppState {
    /// Rebuilds the left side after the source changed on disk without
    /// resolving the diff.
    pub fn refresh_original(&mut self, handle: SessionHandle, original: &str) {
        let Some(view) = self.view.as_mut().filter(|v| v.handle == handle) else {
            return;
        };
        let (rows, change_offsets) = build_rows(original, &view.formatted, &view.extension);
        view.rows = rows;
        view.change_offsets = change_offsets;
        self.change_cursor = 0;
        self.diff_scroll = self.diff_scroll.min(view.rows.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restyle_core::types::SessionId;
    use std::path::Path;

    fn presentation<'a>(handle: SessionHandle, original: &'a str, formatted: &'a str) -> Presentation<'a> {
        Presentation {
            handle,
            title: "restyle main.c",
            source_path: Path::new("/w/main.c"),
            artifact_path: Path::new("/tmp/restyle/diff/1/main.c"),
            original,
            formatted,
        }
    }

    #[test]
    fn open_close_and_stale_close() {
        let mut state = AppState::default();
        let handle = SessionHandle::new(SessionId::new());
        state.set_pending(handle, Path::new("/w/main.c"));

        state.open(presentation(handle, "int a;\n", "int  a;\n")).unwrap();
        assert!(state.pending.is_none());
        assert_eq!(state.focus, PanelFocus::Diff);
        assert_eq!(state.view.as_ref().unwrap().change_offsets, vec![0]);

        state.close(SessionHandle::new(SessionId::new()));
        assert!(state.view.is_some(), "unknown handles are ignored");
        state.close(handle);
        assert!(state.view.is_none());
    }

    #[test]
    fn refresh_original_recomputes_rows() {
        let mut state = AppState::default();
        let handle = SessionHandle::new(SessionId::new());
        state.open(presentation(handle, "a\nb\n", "A\nB\n")).unwrap();
        assert_eq!(state.view.as_ref().unwrap().change_offsets, vec![0]);

        state.refresh_original(handle, "A\nb\n");
        let view = state.view.as_ref().unwrap();
        assert_eq!(view.change_offsets, vec![1]);
        assert!(!view.rows[0].left.as_ref().unwrap().changed);
    }
}
