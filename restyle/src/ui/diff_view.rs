//! Side-by-side comparison panel.
//!
//! Original on the left, formatted copy on the right. Only
//! `rows[diff_scroll..diff_scroll + viewport_height]` are turned into list
//! items per frame, so long files render in O(viewport).

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus, ViewLine};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

#[derive(Clone, Copy)]
enum Side {
    Original,
    Formatted,
}

pub fn render_diff(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::Diff;
    let inner = inner_rect(area);

    let Some(view) = &state.view else {
        let block = panel_block("Diff", is_focused, theme);
        frame.render_widget(block, area);
        let msg = match &state.pending {
            Some(p) => format!("Formatting {}…", p.name),
            None => "Select a file and press Enter to check its style.".to_owned(),
        };
        frame.render_widget(List::new(vec![ListItem::new(Line::raw(msg))]), inner);
        return;
    };

    let title = format!("{}  (original | formatted)", view.title);
    frame.render_widget(panel_block(&title, is_focused, theme), area);

    let total = view.rows.len();
    let start = state.diff_scroll.min(total.saturating_sub(1));
    let end = (start + inner.height as usize).min(total);
    let visible = &view.rows[start..end];

    let max_lineno = view
        .rows
        .iter()
        .flat_map(|r| [r.left.as_ref(), r.right.as_ref()])
        .flatten()
        .map(|l| l.lineno)
        .max()
        .unwrap_or(1);
    let gutter = max_lineno.to_string().len();

    let [left, right] = inner.layout(
        &Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).spacing(1),
    );

    let left_items: Vec<ListItem> = visible
        .iter()
        .map(|r| ListItem::new(side_line(r.left.as_ref(), Side::Original, gutter, theme)))
        .collect();
    let right_items: Vec<ListItem> = visible
        .iter()
        .map(|r| ListItem::new(side_line(r.right.as_ref(), Side::Formatted, gutter, theme)))
        .collect();

    frame.render_widget(List::new(left_items), left);
    frame.render_widget(List::new(right_items), right);
}

/// One half-row: gutter with line number and change marker, then the
/// highlighted text. Rows with no line on this side render blank.
fn side_line(line: Option<&ViewLine>, side: Side, gutter: usize, theme: &Theme) -> Line<'static> {
    let Some(line) = line else {
        return Line::raw("");
    };

    let (marker, marker_fg, bg) = match (line.changed, side) {
        (false, _) => (' ', theme.line_number, None),
        (true, Side::Original) => ('-', theme.diff_removed, Some(theme.diff_removed_bg)),
        (true, Side::Formatted) => ('+', theme.diff_added, Some(theme.diff_added_bg)),
    };

    let mut spans = Vec::with_capacity(line.spans.len() + 1);
    spans.push(Span::styled(
        format!("{:>gutter$} {marker} ", line.lineno),
        Style::default().fg(marker_fg),
    ));
    if line.changed || line.spans.is_empty() {
        spans.extend(line.spans.iter().cloned());
    } else {
        // unchanged lines keep syntax colors but fall back to the context color
        spans.extend(line.spans.iter().cloned().map(|s| {
            if s.style.fg.is_none() {
                s.style(Style::default().fg(theme.diff_context))
            } else {
                s
            }
        }));
    }

    let mut rendered = Line::from(spans);
    if let Some(bg) = bg {
        rendered = rendered.style(Style::default().bg(bg));
    }
    rendered
}
