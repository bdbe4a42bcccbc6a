//! Explainer that pipes the request as JSON into a configured command.

use std::io::Write;
use std::process::{Command, Stdio};

use restyle_core::error::ExplainError;
use restyle_core::explain::{ExplainRequest, Explainer};

/// Runs `explain_command` from the settings with the request on stdin.
///
/// The child is not waited on by the caller; a detached thread reaps it and
/// logs a non-zero exit.
#[derive(Debug, Clone)]
pub struct CommandExplainer {
    argv: Vec<String>,
}

impl CommandExplainer {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Explainer for CommandExplainer {
    fn explain(&mut self, request: ExplainRequest) -> Result<(), ExplainError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(ExplainError::Unconfigured);
        };
        let body = serde_json::to_vec(&request)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&body)?;
        }

        let program = program.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(program = %program, %status, "explain command failed");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(program = %program, error = %e, "explain command lost"),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_unconfigured() {
        let mut explainer = CommandExplainer::new(Vec::new());
        let err = explainer.explain(ExplainRequest::new("@@\n".to_owned())).unwrap_err();
        assert!(matches!(err, ExplainError::Unconfigured));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let mut explainer = CommandExplainer::new(vec!["restyle-no-such-explainer".to_owned()]);
        let err = explainer.explain(ExplainRequest::new("@@\n".to_owned())).unwrap_err();
        assert!(matches!(err, ExplainError::Io(_)));
    }
}
