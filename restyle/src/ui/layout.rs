//! Two-panel layout engine for restyle.
//!
//! Pure layout arithmetic, recomputed inside `terminal.draw()` on every render
//! so each frame reflects the current terminal size.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes the two panel borders share one column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use restyle_core::presenter::Notice;

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Below this width only one panel is shown: the comparison when one is
/// open, otherwise the file list.
const SPLIT_MIN_WIDTH: u16 = 100;

/// Returns `[file_list, diff, status_bar]` for the current frame. A collapsed
/// panel has zero width.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 3] {
    let area = frame.area();
    let [main_area, status_bar] =
        area.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = if area.width >= SPLIT_MIN_WIDTH {
        Layout::horizontal([Constraint::Percentage(25), Constraint::Fill(1)])
    } else if state.view.is_some() {
        Layout::horizontal([Constraint::Length(0), Constraint::Fill(1)])
    } else {
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(0)])
    }
    .spacing(Spacing::Overlap(1));

    let [files, diff] = main_area.layout(&horizontal);
    [files, diff, status_bar]
}

/// The inner `Rect` of a panel after removing its 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered block for a panel; thick border when focused.
///
/// `MergeStrategy::Fuzzy` because `Exact` draws wrong junctions between
/// `Thick` and `Plain` borders.
pub fn panel_block<'a>(title: &'a str, is_focused: bool, theme: &'a Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar: mode, then the formatting indicator or the
/// latest notice, then the keys that act on the open comparison.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let mode_text = match state.mode {
        Mode::Normal => " NORMAL ",
        Mode::HelpOverlay => " HELP ",
    };
    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(theme.status_mode).add_modifier(Modifier::BOLD),
    )];

    if let Some(pending) = &state.pending {
        spans.push(Span::raw(format!(" Formatting {}…", pending.name)));
    } else if let Some(notice) = &state.notice {
        let fg = match notice {
            Notice::Info(_) => theme.notice_info,
            Notice::Error(_) => theme.notice_error,
        };
        spans.push(Span::styled(format!(" {}", notice.text()), Style::default().fg(fg)));
    }

    if state.bound.is_some() {
        spans.push(Span::raw("  a apply  e explain  x close"));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
