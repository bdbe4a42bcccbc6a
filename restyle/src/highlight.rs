//! Syntax highlighting and row building for the side-by-side view.
//!
//! syntect carries parser state from line to line, so each side is
//! highlighted as a whole text first and the rows pick lines out by number.

use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;

use restyle_core::diff::{side_by_side, SideLine};

use crate::app::{ViewLine, ViewRow};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Rows for a comparison of `original` against `formatted`, plus the row
/// indices where each run of changed rows begins.
pub fn build_rows(original: &str, formatted: &str, extension: &str) -> (Vec<ViewRow>, Vec<usize>) {
    let left = highlight_text(original, extension);
    let right = highlight_text(formatted, extension);

    let mut rows = Vec::new();
    let mut change_offsets = Vec::new();
    let mut in_change = false;
    for (i, row) in side_by_side(original, formatted).into_iter().enumerate() {
        let changed = row.left.as_ref().is_some_and(|l| l.changed)
            || row.right.as_ref().is_some_and(|l| l.changed);
        if changed && !in_change {
            change_offsets.push(i);
        }
        in_change = changed;
        rows.push(ViewRow {
            left: row.left.map(|l| view_line(l, &left)),
            right: row.right.map(|l| view_line(l, &right)),
        });
    }
    (rows, change_offsets)
}

fn view_line(line: SideLine, highlighted: &[Vec<Span<'static>>]) -> ViewLine {
    let spans = line
        .lineno
        .checked_sub(1)
        .and_then(|i| highlighted.get(i))
        .cloned()
        .unwrap_or_else(|| vec![Span::raw(line.text.clone())]);
    ViewLine { lineno: line.lineno, changed: line.changed, spans }
}

/// Highlights every line of `text`. Falls back to plain spans when no theme
/// or syntax is available.
pub fn highlight_text(text: &str, extension: &str) -> Vec<Vec<Span<'static>>> {
    let syntax = PS
        .find_syntax_by_extension(extension)
        .unwrap_or_else(|| PS.find_syntax_plain_text());
    let Some(theme) = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next()) else {
        return text.lines().map(|l| vec![Span::raw(l.to_owned())]).collect();
    };
    let mut h = HighlightLines::new(syntax, theme);

    text.split_inclusive('\n')
        .map(|line| match h.highlight_line(line, &PS) {
            Ok(ranges) => {
                let spans: Vec<Span<'static>> = ranges
                    .into_iter()
                    .map(|(style, part)| syntect_to_span(style, part.trim_end_matches(['\n', '\r'])))
                    .filter(|s| !s.content.is_empty())
                    .collect();
                spans
            }
            Err(_) => vec![Span::raw(line.trim_end_matches(['\n', '\r']).to_owned())],
        })
        .collect()
}

/// Converts a syntect (Style, &str) pair to an owned ratatui Span.
///
/// Only the foreground is kept; the view paints its own background for
/// changed lines.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    let fg = style.foreground;
    let mut ratatui_style = Style::default();
    if fg.a > 0 {
        ratatui_style = ratatui_style.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.to_owned(), ratatui_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &ViewLine) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn rows_pair_rewritten_lines() {
        let original = "int main() {\n  return 0;\n}\n";
        let formatted = "int main()\n{\n    return 0;\n}\n";
        let (rows, offsets) = build_rows(original, formatted, "c");

        assert_eq!(offsets, vec![0]);
        let first = &rows[0];
        assert_eq!(text_of(first.left.as_ref().unwrap()), "int main() {");
        assert!(first.left.as_ref().unwrap().changed);
        let last = rows.last().unwrap();
        assert_eq!(text_of(last.right.as_ref().unwrap()), "}");
        assert!(!last.right.as_ref().unwrap().changed);
    }

    #[test]
    fn unknown_extension_still_highlights_as_plain_text() {
        let lines = highlight_text("a\nb\n", "no-such-ext");
        assert_eq!(lines.len(), 2);
        let joined: String = lines[1].iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "b");
    }
}
