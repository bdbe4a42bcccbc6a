//! Help overlay: a centred modal drawn over the panels after a `Clear`.

use ratatui::{
    Frame,
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Draws the overlay, scrolled by `help_scroll` rows. Skipped on terminals
/// narrower than 60 columns.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help  (j/k scroll, ? or Esc to dismiss) ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Checking style"),
        Line::from("  Enter / r     Format the selected file and compare"),
        Line::from("  a             Apply the formatted version (original is backed up)"),
        Line::from("  e             Explain the changes"),
        Line::from("  x / Esc       Close the comparison without changing anything"),
        Line::from("  Editing the file until it matches the formatted side also resolves it."),
        Line::from(""),
        Line::from("Navigation"),
        Line::from("  j / k         Scroll down / up one line"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Scroll half page down / up"),
        Line::from("  [ / ]         Previous / next change"),
        Line::from("  Tab           Switch between file list and comparison"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q             Quit (an open comparison is dismissed)"),
    ])
}
