use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Opaque identifier of one format-and-review session.
///
/// Generated as UUID v4 when a session begins. Doubles as the telemetry
/// correlation key and the primary key of the journal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an id read back from the journal. Returns `None` for malformed text.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Token handed to hosts for a live session.
///
/// Every event and command carries one. The lifecycle ignores handles that do
/// not match the active session, which is how late formatter results and
/// clicks on a stale "apply" button are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(SessionId);

impl SessionHandle {
    pub fn new(id: SessionId) -> Self {
        Self(id)
    }

    pub fn id(self) -> SessionId {
        self.0
    }
}

/// How a presented session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The user invoked apply; the formatted copy replaced the source.
    Applied,
    /// The user edited the source until it matched the formatted copy.
    Fixed,
    /// The presentation was closed without apply and without a fix.
    Dismissed,
    /// The formatter output was byte-identical to the source.
    NoDiff,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Applied => "applied",
            Resolution::Fixed => "fixed",
            Resolution::Dismissed => "dismissed",
            Resolution::NoDiff => "no_diff",
        }
    }
}

/// Why a session's journal row was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Resolved(Resolution),
    /// The formatter failed or an artifact operation aborted the session.
    Failed,
    /// The presentation was closed while the formatter was still running.
    Cancelled,
    /// A newer session replaced this one.
    Superseded,
    /// Found open at startup after a crash or forced quit.
    Abandoned,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Resolved(r) => r.as_str(),
            CloseReason::Failed => "failed",
            CloseReason::Cancelled => "cancelled",
            CloseReason::Superseded => "superseded",
            CloseReason::Abandoned => "abandoned",
        }
    }
}

/// Lifecycle state of a [`DiffSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Requesting,
    Formatting,
    Presenting,
    Resolved(Resolution),
    Closed,
}

impl SessionState {
    /// Text stored in the journal's `state` column.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Requesting => "requesting",
            SessionState::Formatting => "formatting",
            SessionState::Presenting => "presenting",
            SessionState::Resolved(_) => "resolved",
            SessionState::Closed => "closed",
        }
    }

    /// True while the session blocks new format requests.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Formatting | SessionState::Presenting)
    }
}

/// Source languages with a bundled formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
    Html,
    Css,
    JavaScript,
    Sql,
}

impl Language {
    /// Detects the language from the file extension (case-sensitive, as the
    /// formatters themselves are).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Some(match ext {
            "py" => Language::Python,
            "c" | "h" => Language::C,
            "cpp" | "hpp" => Language::Cpp,
            "java" => Language::Java,
            "html" => Language::Html,
            "css" => Language::Css,
            "js" => Language::JavaScript,
            "sql" => Language::Sql,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Html => "html",
            Language::Css => "css",
            Language::JavaScript => "javascript",
            Language::Sql => "sql",
        }
    }

    /// Inverse of [`Language::as_str`], used when reading journal rows.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "python" => Language::Python,
            "c" => Language::C,
            "cpp" => Language::Cpp,
            "java" => Language::Java,
            "html" => Language::Html,
            "css" => Language::Css,
            "javascript" => Language::JavaScript,
            "sql" => Language::Sql,
            _ => return None,
        })
    }
}

/// One user-initiated format-and-review cycle for a single source file.
#[derive(Debug, Clone)]
pub struct DiffSession {
    pub id: SessionId,
    pub source_path: PathBuf,
    /// Formatter output; lives alone in its own directory under `diff/`.
    pub formatted_path: PathBuf,
    pub title: String,
    pub language: Language,
    pub created_at: i64, // Unix timestamp millis
    pub state: SessionState,
}

impl DiffSession {
    pub fn handle(&self) -> SessionHandle {
        SessionHandle(self.id)
    }
}

/// Everything needed to begin a session, before an artifact path exists.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub source_path: PathBuf,
    pub language: Language,
}

impl SessionRequest {
    pub fn new(source_path: impl Into<PathBuf>, language: Language) -> Self {
        Self { source_path: source_path.into(), language }
    }

    /// The artifact keeps the source's file name so formatters that dispatch
    /// on extension behave identically on the copy.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_owned())
    }

    pub fn title(&self) -> String {
        format!("restyle {}", self.file_name())
    }
}

/// A session row as stored in the journal.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub source_path: String,
    pub artifact_path: String,
    pub title: String,
    pub language: String,
    pub created_at: i64,
    pub state: String,
    pub outcome: Option<String>,
    pub backup_path: Option<String>,
    pub closed_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection_follows_extension() {
        assert_eq!(Language::from_path(Path::new("main.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("x/y.hpp")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("script.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("query.sql")), Some(Language::Sql));
        assert_eq!(Language::from_path(Path::new("notes.txt")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn language_names_survive_the_journal() {
        for lang in [
            Language::Python,
            Language::C,
            Language::Cpp,
            Language::Java,
            Language::Html,
            Language::Css,
            Language::JavaScript,
            Language::Sql,
        ] {
            assert_eq!(Language::parse(lang.as_str()), Some(lang));
        }
    }

    #[test]
    fn only_formatting_and_presenting_block_new_requests() {
        assert!(SessionState::Formatting.is_busy());
        assert!(SessionState::Presenting.is_busy());
        assert!(!SessionState::Requesting.is_busy());
        assert!(!SessionState::Resolved(Resolution::Applied).is_busy());
        assert!(!SessionState::Closed.is_busy());
    }

    #[test]
    fn request_title_uses_file_name() {
        let req = SessionRequest::new("/home/u/proj/main.c", Language::C);
        assert_eq!(req.file_name(), "main.c");
        assert_eq!(req.title(), "restyle main.c");
    }
}
