//! Central application state for restyle.
//!
//! Pure state: the mode, which panel has focus, scroll offsets, the file list
//! and the open comparison. Rendering reads it, the keybinding dispatcher and
//! the [`restyle_core::presenter::DiffPresenter`] impl mutate it.

use std::path::{Path, PathBuf};

use ratatui::layout::Rect;
use ratatui::text::Span;
use ratatui::widgets::ListState;

use restyle_core::presenter::Notice;
use restyle_core::types::SessionHandle;

use crate::workspace::types::WorkspaceFile;

/// Which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    FileList,
    Diff,
}

impl PanelFocus {
    /// Two panels, so next and previous coincide.
    pub fn toggle(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Diff,
            PanelFocus::Diff => PanelFocus::FileList,
        }
    }
}

/// One side of a comparison row, syntax highlighted.
#[derive(Debug, Clone)]
pub struct ViewLine {
    pub lineno: usize,
    pub changed: bool,
    pub spans: Vec<Span<'static>>,
}

#[derive(Debug, Clone)]
pub struct ViewRow {
    pub left: Option<ViewLine>,
    pub right: Option<ViewLine>,
}

/// The comparison currently on screen.
#[derive(Debug, Clone)]
pub struct DiffView {
    pub handle: SessionHandle,
    pub title: String,
    pub source_path: PathBuf,
    /// Extension used to pick the syntax for highlighting.
    pub extension: String,
    pub formatted: String,
    pub rows: Vec<ViewRow>,
    /// Row indices where a run of changed rows starts, for `[` / `]`.
    pub change_offsets: Vec<usize>,
}

/// A session waiting on its formatter.
#[derive(Debug, Clone)]
pub struct Pending {
    pub handle: SessionHandle,
    pub name: String,
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    pub file_list_state: ListState,
    pub files: Vec<WorkspaceFile>,
    /// True until the workspace worker reports its first scan.
    pub files_loading: bool,

    pub view: Option<DiffView>,
    pub pending: Option<Pending>,
    /// Handle the apply and explain keys act on; set through `DiffPresenter::bind`.
    pub bound: Option<SessionHandle>,
    pub notice: Option<Notice>,

    /// Vertical scroll offset for the diff panel, in rows.
    pub diff_scroll: usize,
    pub change_cursor: usize,
    pub help_scroll: u16,

    /// Inner heights after borders, cached after each render for page scrolling.
    pub diff_viewport_height: u16,
    pub file_list_viewport_height: u16,
    /// `[file list, diff]` outer rects from the last render, for mouse focus.
    pub panel_rects: [Rect; 2],
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            file_list_state: ListState::default(),
            files: Vec::new(),
            files_loading: false,
            view: None,
            pending: None,
            bound: None,
            notice: None,
            diff_scroll: 0,
            change_cursor: 0,
            help_scroll: 0,
            diff_viewport_height: 0,
            file_list_viewport_height: 0,
            panel_rects: [Rect::default(); 2],
        }
    }
}

impl AppState {
    /// Replaces the file list, keeping the selection on the same path if it survives.
    pub fn set_files(&mut self, files: Vec<WorkspaceFile>) {
        let selected = self.selected_path();
        self.files = files;
        self.files_loading = false;
        let index = selected
            .and_then(|p| self.files.iter().position(|f| f.path == p))
            .or(if self.files.is_empty() { None } else { Some(0) });
        self.file_list_state.select(index);
    }

    /// Path of the highlighted entry in the file list.
    pub fn selected_path(&self) -> Option<PathBuf> {
        self.file_list_state
            .selected()
            .and_then(|i| self.files.get(i))
            .map(|f| f.path.clone())
    }

    pub fn set_pending(&mut self, handle: SessionHandle, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.pending = Some(Pending { handle, name });
        self.notice = None;
    }

    pub fn clear_pending(&mut self, handle: SessionHandle) {
        if self.pending.as_ref().is_some_and(|p| p.handle == handle) {
            self.pending = None;
        }
    }

    /// The session the close key acts on: the comparison on screen, else the
    /// one still formatting.
    pub fn active_handle(&self) -> Option<SessionHandle> {
        self.view
            .as_ref()
            .map(|v| v.handle)
            .or_else(|| self.pending.as_ref().map(|p| p.handle))
    }

    /// Takes the comparison (or pending job) for `handle` off the screen.
    pub fn dismiss_view(&mut self, handle: SessionHandle) {
        if self.view.as_ref().is_some_and(|v| v.handle == handle) {
            self.view = None;
            self.diff_scroll = 0;
            self.change_cursor = 0;
            self.focus = PanelFocus::FileList;
        }
        self.clear_pending(handle);
    }

    /// Scrolls the focused panel down by `lines` rows.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_down_by(lines),
            PanelFocus::Diff => {
                let max = self.view_len().saturating_sub(1);
                self.diff_scroll = self.diff_scroll.saturating_add(lines as usize).min(max);
            }
        }
    }

    /// Scrolls the focused panel up by `lines` rows.
    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_up_by(lines),
            PanelFocus::Diff => self.diff_scroll = self.diff_scroll.saturating_sub(lines as usize),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_first(),
            PanelFocus::Diff => self.diff_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_last(),
            PanelFocus::Diff => self.diff_scroll = self.view_len().saturating_sub(1),
        }
    }

    /// Half the cached viewport height; 1 before the first frame.
    pub fn half_page_down(&mut self) {
        let half = self.focused_viewport_height() / 2;
        self.scroll_down(half.max(1));
    }

    pub fn half_page_up(&mut self) {
        let half = self.focused_viewport_height() / 2;
        self.scroll_up(half.max(1));
    }

    /// Jumps to the previous run of changed rows.
    pub fn prev_change(&mut self) {
        let Some(view) = &self.view else { return };
        if view.change_offsets.is_empty() {
            return;
        }
        self.change_cursor = self.change_cursor.saturating_sub(1);
        self.diff_scroll = view.change_offsets[self.change_cursor];
    }

    /// Jumps to the next run of changed rows.
    pub fn next_change(&mut self) {
        let Some(view) = &self.view else { return };
        if view.change_offsets.is_empty() {
            return;
        }
        self.change_cursor = (self.change_cursor + 1).min(view.change_offsets.len() - 1);
        self.diff_scroll = view.change_offsets[self.change_cursor];
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::FileList => self.file_list_viewport_height,
            PanelFocus::Diff => self.diff_viewport_height,
        }
    }

    fn view_len(&self) -> usize {
        self.view.as_ref().map_or(0, |v| v.rows.len())
    }
}
