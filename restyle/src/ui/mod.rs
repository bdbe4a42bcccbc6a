//! UI rendering for restyle.
//!
//! `render()` is the single entry point, called from the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`.

mod layout;
pub mod diff_view;
pub mod file_tree;
pub mod help;
pub mod keybindings;

use ratatui::{Frame, style::Style, widgets::Block};

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame.
///
/// Viewport heights and panel rects are written back into `state` so the
/// next keypress or click can use them. The one-frame lag is not noticeable.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), frame.area());

    let [files, diff, status_bar] = compute_layout(frame, state);
    state.file_list_viewport_height = inner_rect(files).height;
    state.diff_viewport_height = inner_rect(diff).height;
    state.panel_rects = [files, diff];

    let focus = state.focus;
    if files.width > 0 {
        file_tree::render_file_list(frame, files, focus, state, theme);
    }
    if diff.width > 0 {
        diff_view::render_diff(frame, diff, focus, state, theme);
    }
    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}
