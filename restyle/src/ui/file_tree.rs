//! File list panel.
//!
//! Each entry shows a status badge and the workspace-relative path. The
//! entry whose comparison is open is marked with `*`.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;
use crate::workspace::types::WorkspaceFile;

/// Longest label shown before the front is elided.
const MAX_LABEL_CHARS: usize = 40;

pub fn render_file_list(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &mut AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::FileList;
    let title = if state.files.is_empty() {
        "Files".to_owned()
    } else {
        format!("Files ({})", state.files.len())
    };
    let block = panel_block(&title, is_focused, theme);

    let open = state.view.as_ref().map(|v| v.source_path.as_path());
    let items: Vec<ListItem> = if state.files.is_empty() {
        let msg = if state.files_loading { "Scanning…" } else { "No supported files" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        state
            .files
            .iter()
            .map(|f| ListItem::new(file_line(f, open == Some(f.path.as_path()), theme)))
            .collect()
    };

    let list = List::new(items).block(block).highlight_style(
        Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut state.file_list_state);
}

/// `[M] src/main.c`, with `*` in front when the comparison for it is open.
fn file_line(f: &WorkspaceFile, is_open: bool, theme: &Theme) -> Line<'static> {
    let badge_color = match f.status {
        'A' => theme.file_added,
        '?' => theme.file_untracked,
        'M' | 'R' => theme.file_modified,
        _ => theme.diff_context,
    };
    let open_mark = if is_open { "* " } else { "  " };
    Line::from(vec![
        Span::raw(open_mark),
        Span::styled(format!("[{}] ", f.status), Style::default().fg(badge_color)),
        Span::raw(elide_front(&f.label, MAX_LABEL_CHARS)),
    ])
}

fn elide_front(label: &str, max: usize) -> String {
    let count = label.chars().count();
    if count <= max {
        return label.to_owned();
    }
    let tail: String = label.chars().skip(count - (max - 1)).collect();
    format!("…{tail}")
}
