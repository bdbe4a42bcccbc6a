//! Text comparison helpers built on `similar`.

use std::fs;
use std::io;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

/// Upper bound on the diff text forwarded to the explanation service.
pub const EXPLAIN_CHAR_BUDGET: usize = 950;

/// Maximum number of hunks forwarded to the explanation service.
pub const EXPLAIN_MAX_HUNKS: usize = 3;

/// Reads both files and reports whether their bytes differ.
pub fn files_differ(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::read(a)? != fs::read(b)?)
}

/// Unified diff of `original` against `formatted` with three lines of context.
///
/// Returns an empty string when the inputs are equal.
pub fn unified(original: &str, formatted: &str, original_name: &str, formatted_name: &str) -> String {
    if original == formatted {
        return String::new();
    }
    TextDiff::from_lines(original, formatted)
        .unified_diff()
        .context_radius(3)
        .header(original_name, formatted_name)
        .to_string()
}

/// Splits a unified diff into its `@@` hunks, dropping the file header lines.
pub fn hunks(unified: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in unified.split_inclusive('\n') {
        if line.starts_with("@@") {
            out.push(String::new());
        }
        if let Some(current) = out.last_mut() {
            current.push_str(line);
        }
    }
    out
}

/// Bounded prefix of a diff for the explanation service.
///
/// Takes whole hunks from the front, at most [`EXPLAIN_MAX_HUNKS`], stopping
/// before the first hunk that would push the total past `budget` characters.
/// A first hunk that alone exceeds the budget is cut at a line boundary.
pub fn bounded_prefix(unified: &str, budget: usize) -> String {
    let mut text = String::new();
    let mut used = 0usize;
    for hunk in hunks(unified).into_iter().take(EXPLAIN_MAX_HUNKS) {
        let len = hunk.chars().count();
        if used + len > budget {
            if used == 0 {
                for line in hunk.split_inclusive('\n') {
                    let len = line.chars().count();
                    if used + len > budget {
                        break;
                    }
                    used += len;
                    text.push_str(line);
                }
            }
            break;
        }
        used += len;
        text.push_str(&hunk);
    }
    text
}

/// One row of a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideBySideRow {
    pub left: Option<SideLine>,
    pub right: Option<SideLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideLine {
    pub lineno: usize,
    pub text: String,
    pub changed: bool,
}

/// Aligns `original` and `formatted` into side-by-side rows.
///
/// Deleted and inserted runs inside one change group are zipped so a
/// reformatted line sits next to its replacement.
pub fn side_by_side(original: &str, formatted: &str) -> Vec<SideBySideRow> {
    let diff = TextDiff::from_lines(original, formatted);
    let mut rows = Vec::new();

    for op in diff.ops() {
        let mut deleted: Vec<SideLine> = Vec::new();
        let mut inserted: Vec<SideLine> = Vec::new();
        for change in diff.iter_changes(op) {
            let text = change.value().trim_end_matches(['\n', '\r']).to_owned();
            match change.tag() {
                ChangeTag::Equal => rows.push(SideBySideRow {
                    left: change.old_index().map(|i| SideLine { lineno: i + 1, text: text.clone(), changed: false }),
                    right: change.new_index().map(|i| SideLine { lineno: i + 1, text, changed: false }),
                }),
                ChangeTag::Delete => deleted.push(SideLine {
                    lineno: change.old_index().map_or(0, |i| i + 1),
                    text,
                    changed: true,
                }),
                ChangeTag::Insert => inserted.push(SideLine {
                    lineno: change.new_index().map_or(0, |i| i + 1),
                    text,
                    changed: true,
                }),
            }
        }
        let height = deleted.len().max(inserted.len());
        let mut deleted = deleted.into_iter();
        let mut inserted = inserted.into_iter();
        for _ in 0..height {
            rows.push(SideBySideRow { left: deleted.next(), right: inserted.next() });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRACES: &str = "int main() {\n  return 0;\n}\n";
    const ALLMAN: &str = "int main()\n{\n    return 0;\n}\n";

    #[test]
    fn unified_is_empty_for_equal_inputs() {
        assert_eq!(unified(BRACES, BRACES, "a", "b"), "");
    }

    #[test]
    fn unified_has_headers_and_hunks() {
        let text = unified(BRACES, ALLMAN, "main.c", "main.c (formatted)");
        assert!(text.starts_with("--- main.c\n+++ main.c (formatted)\n"));
        assert_eq!(hunks(&text).len(), 1);
        assert!(hunks(&text)[0].starts_with("@@"));
    }

    #[test]
    fn bounded_prefix_respects_hunk_and_char_limits() {
        let original: String = (0..200).map(|i| format!("line {i}\n")).collect();
        let formatted: String = original
            .lines()
            .enumerate()
            .map(|(i, l)| if i % 20 == 0 { format!("{l};\n") } else { format!("{l}\n") })
            .collect();
        let text = unified(&original, &formatted, "a", "b");
        assert!(hunks(&text).len() > EXPLAIN_MAX_HUNKS);

        let prefix = bounded_prefix(&text, EXPLAIN_CHAR_BUDGET);
        assert!(prefix.chars().count() <= EXPLAIN_CHAR_BUDGET);
        assert_eq!(hunks(&prefix).len(), EXPLAIN_MAX_HUNKS);

        let tiny = bounded_prefix(&text, 40);
        assert!(tiny.starts_with("@@"));
        assert!(tiny.chars().count() <= 40);
        assert!(tiny.ends_with('\n'), "cut on a line boundary");
    }

    #[test]
    fn side_by_side_pairs_replacements() {
        let rows = side_by_side(BRACES, ALLMAN);
        assert!(rows.iter().any(|r| r.left.as_ref().is_some_and(|l| l.changed)
            && r.right.as_ref().is_some_and(|l| l.changed)));
        let last = rows.last().unwrap();
        assert_eq!(last.left.as_ref().unwrap().text, "}");
        assert_eq!(last.right.as_ref().unwrap().text, "}");
        assert!(!last.left.as_ref().unwrap().changed);
    }

    #[test]
    fn files_differ_compares_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::write(&a, BRACES).unwrap();
        fs::write(&b, BRACES).unwrap();
        assert!(!files_differ(&a, &b).unwrap());
        fs::write(&b, ALLMAN).unwrap();
        assert!(files_differ(&a, &b).unwrap());
    }
}
