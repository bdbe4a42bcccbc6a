use std::path::PathBuf;

use thiserror::Error;

use crate::types::SessionId;

/// Typed failure reported by a [`crate::formatter::Formatter`].
#[derive(Debug, Error)]
pub enum FormatError {
    /// The source does not parse or compile; formatting was not attempted.
    #[error("source failed the syntax check: {diagnostic}")]
    SyntaxInvalid { diagnostic: String },

    #[error("formatter tool `{tool}` is not installed")]
    ToolMissing { tool: String },

    #[error("`{tool}` exited with {status}: {diagnostic}")]
    ToolError {
        tool: String,
        status: String,
        diagnostic: String,
    },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { operation, path: path.into(), source }
    }
}

/// Failure raised by a [`crate::presenter::DiffPresenter`].
#[derive(Debug, Error)]
#[error("presentation failed: {0}")]
pub struct PresenterError(pub String);

/// Failure raised by an [`crate::explain::Explainer`].
#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("no explanation service is configured")]
    Unconfigured,

    #[error("explanation service failed: {0}")]
    Service(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors normalised at the lifecycle boundary.
///
/// `Display` carries the diagnostic for the log; [`LifecycleError::user_message`]
/// is the fixed string a user gets to see.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("formatter unavailable: {tool}")]
    FormatterUnavailable { tool: String },

    #[error("source is invalid: {diagnostic}")]
    SourceInvalid { diagnostic: String },

    #[error("formatter `{tool}` failed: {diagnostic}")]
    FormatFailed { tool: String, diagnostic: String },

    #[error("artifact I/O error while {operation} at {path}: {source}")]
    ArtifactIo {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not terminate superseded session {session}: {source}")]
    Conflict {
        session: SessionId,
        #[source]
        source: std::io::Error,
    },

    #[error("a session is already {state}")]
    Busy { state: &'static str },

    #[error("source file {path} does not exist")]
    SourceMissing { path: PathBuf },

    #[error("unsupported file type: {path}")]
    Unsupported { path: PathBuf },

    #[error(transparent)]
    Presentation(#[from] PresenterError),
}

impl LifecycleError {
    #[must_use]
    pub fn artifact_io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::ArtifactIo { operation, path: path.into(), source }
    }

    /// Fixed, friendly text for the user. Raw diagnostics never appear here.
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::FormatterUnavailable { tool } => format!(
                "restyle needs `{tool}` to check this file, but it is not installed."
            ),
            LifecycleError::SourceInvalid { .. } | LifecycleError::FormatFailed { .. } => {
                "Can't check your style just yet! Try compiling or running your code, \
                 fix any errors, then check its style again!"
                    .to_owned()
            }
            LifecycleError::ArtifactIo { .. } | LifecycleError::Presentation(_) => {
                "restyle ran into an error. Please try again.".to_owned()
            }
            LifecycleError::Conflict { .. } => {
                "The previous restyle window was already gone; starting fresh.".to_owned()
            }
            LifecycleError::Busy { .. } => {
                "Please close the current restyle window first.".to_owned()
            }
            LifecycleError::SourceMissing { path } => {
                format!("File {} does not exist.", path.display())
            }
            LifecycleError::Unsupported { path } => {
                let ext = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| "this kind of".to_owned());
                format!("restyle does not support {ext} files yet.")
            }
        }
    }
}

impl From<FormatError> for LifecycleError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::SyntaxInvalid { diagnostic } => {
                LifecycleError::SourceInvalid { diagnostic }
            }
            FormatError::ToolMissing { tool } => LifecycleError::FormatterUnavailable { tool },
            FormatError::ToolError { tool, status, diagnostic } => LifecycleError::FormatFailed {
                tool,
                diagnostic: format!("{status}: {diagnostic}"),
            },
            FormatError::Io { operation, path, source } => {
                LifecycleError::ArtifactIo { operation, path, source }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_diagnostics() {
        let err = LifecycleError::from(FormatError::SyntaxInvalid {
            diagnostic: "main.c:3:1: error: expected ';'".to_owned(),
        });
        assert!(matches!(err, LifecycleError::SourceInvalid { .. }));
        assert!(!err.user_message().contains("expected ';'"));
        assert!(err.to_string().contains("expected ';'"));
    }

    #[test]
    fn missing_tool_names_the_tool() {
        let err = LifecycleError::from(FormatError::ToolMissing { tool: "black".to_owned() });
        assert!(err.user_message().contains("black"));
    }

    #[test]
    fn unsupported_mentions_extension() {
        let err = LifecycleError::Unsupported { path: PathBuf::from("notes.txt") };
        assert_eq!(err.user_message(), "restyle does not support .txt files yet.");
    }
}
