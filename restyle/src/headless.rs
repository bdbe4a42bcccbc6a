//! Subcommands that run without the terminal UI.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;

use restyle_core::artifacts::now_millis;
use restyle_core::diff;
use restyle_core::error::PresenterError;
use restyle_core::lifecycle::Outcome;
use restyle_core::presenter::{DiffPresenter, Notice, Presentation};
use restyle_core::types::{SessionHandle, SessionRecord};

use crate::Lifecycle;

/// Exit status of `check` when the file is not formatted.
const EXIT_DIFFERS: u8 = 1;
/// Exit status of `check` when no diff could be produced.
const EXIT_ERROR: u8 = 2;
/// Python linter behind `lint`.
const LINT_PROGRAM: &str = "pylint";

/// Prints the comparison as a unified diff on stdout and notices on stderr.
struct StdoutPresenter {
    file: PathBuf,
    out: Vec<u8>,
}

impl StdoutPresenter {
    fn new(file: &Path) -> Self {
        Self { file: file.to_path_buf(), out: Vec::new() }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&self.out)?;
        self.out.clear();
        stdout.flush()
    }
}

impl DiffPresenter for StdoutPresenter {
    fn open(&mut self, view: Presentation<'_>) -> Result<(), PresenterError> {
        let name = view.source_path.display().to_string();
        let text = diff::unified(view.original, view.formatted, &name, &format!("{name} (restyled)"));
        self.out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn close(&mut self, _handle: SessionHandle) {}

    fn bind(&mut self, _handle: Option<SessionHandle>) {}

    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::Info(text) => eprintln!("{text}"),
            Notice::Error(text) => eprintln!("error: {text}"),
        }
    }

    fn focused_document(&self) -> Option<PathBuf> {
        Some(self.file.clone())
    }
}

/// Formats `file` into a scratch copy and prints the diff.
///
/// Exits 0 when the file is already formatted (or `--apply` wrote it),
/// [`EXIT_DIFFERS`] when a diff was printed, [`EXIT_ERROR`] when the
/// formatter could not run.
pub async fn check(lifecycle: &mut Lifecycle, file: &Path, apply: bool) -> anyhow::Result<ExitCode> {
    let mut presenter = StdoutPresenter::new(file);
    let outcome = match lifecycle.run_interactive(&mut presenter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(error = %e, "check failed");
            return Ok(ExitCode::from(EXIT_ERROR));
        }
    };
    presenter.flush().context("writing diff")?;

    let Outcome::Presenting = outcome else {
        return Ok(ExitCode::SUCCESS);
    };
    let handle = lifecycle
        .current()
        .map(|s| s.handle())
        .context("session vanished while presenting")?;

    if apply {
        lifecycle.apply(handle, &mut presenter).await?;
        Ok(ExitCode::SUCCESS)
    } else {
        lifecycle.presentation_closed(handle, &mut presenter).await?;
        Ok(ExitCode::from(EXIT_DIFFERS))
    }
}

pub async fn history(lifecycle: &Lifecycle, limit: usize) -> anyhow::Result<ExitCode> {
    let records = lifecycle.history(limit).await.context("reading session journal")?;
    let now = now_millis();
    let mut stdout = std::io::stdout().lock();
    for record in &records {
        writeln!(stdout, "{}", history_line(record, now))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Closes what a previous run left open and purges every artifact.
pub async fn cleanup(lifecycle: &mut Lifecycle) -> anyhow::Result<ExitCode> {
    let mut presenter = StdoutPresenter::new(Path::new(""));
    lifecycle.startup(&mut presenter).await;
    tracing::info!("cleanup finished");
    Ok(ExitCode::SUCCESS)
}

/// Runs the Python linter on `file` and prints its JSON report on stdout as is.
///
/// The linter's own exit status only encodes which message categories were
/// found, so it is not passed on.
pub async fn lint(file: &Path) -> anyhow::Result<ExitCode> {
    let report = lint_report(LINT_PROGRAM, file).await?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&report)?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}

async fn lint_report(program: &str, file: &Path) -> anyhow::Result<Vec<u8>> {
    let output = tokio::process::Command::new(program)
        .args(["-f", "json"])
        .arg(file)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("running {program}"))?;
    tracing::debug!(program, status = %output.status, bytes = output.stdout.len(), "lint finished");
    if output.stdout.is_empty() && !output.status.success() {
        anyhow::bail!(
            "{program} failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}

fn history_line(record: &SessionRecord, now: i64) -> String {
    let outcome = record.outcome.as_deref().unwrap_or(record.state.as_str());
    let mut line = format!(
        "{:>8}  {:<10} {:<11} {}",
        age(now - record.created_at),
        outcome,
        record.language,
        record.source_path
    );
    if let Some(backup) = &record.backup_path {
        line.push_str(&format!("  (backup: {backup})"));
    }
    line
}

fn age(millis: i64) -> String {
    let secs = millis.max(0) / 1000;
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restyle_core::types::SessionId;

    fn record(outcome: Option<&str>, backup: Option<&str>) -> SessionRecord {
        SessionRecord {
            id: "x".to_owned(),
            source_path: "/w/main.c".to_owned(),
            artifact_path: "/tmp/restyle/diff/x/main.c".to_owned(),
            title: "restyle main.c".to_owned(),
            language: "c".to_owned(),
            created_at: 1_000,
            state: "closed".to_owned(),
            outcome: outcome.map(str::to_owned),
            backup_path: backup.map(str::to_owned),
            closed_at: None,
        }
    }

    #[test]
    fn open_renders_a_unified_diff() {
        let mut presenter = StdoutPresenter::new(Path::new("main.c"));
        presenter
            .open(Presentation {
                handle: SessionHandle::new(SessionId::new()),
                title: "restyle main.c",
                source_path: Path::new("main.c"),
                artifact_path: Path::new("/tmp/x/main.c"),
                original: "int  a;\n",
                formatted: "int a;\n",
            })
            .unwrap();
        let text = String::from_utf8(presenter.out.clone()).unwrap();
        assert!(text.contains("--- main.c"));
        assert!(text.contains("+++ main.c (restyled)"));
        assert!(text.contains("-int  a;"));
        assert!(text.contains("+int a;"));
        assert_eq!(presenter.focused_document(), Some(PathBuf::from("main.c")));
    }

    #[tokio::test]
    async fn lint_passes_the_report_through() {
        // echo stands in for the linter and reports its own arguments
        let report = lint_report("echo", Path::new("hello.py")).await.unwrap();
        assert_eq!(report, b"-f json hello.py\n");
    }

    #[tokio::test]
    async fn lint_reports_a_missing_linter() {
        let err = lint_report("restyle-no-such-linter", Path::new("hello.py")).await.unwrap_err();
        assert!(format!("{err:#}").contains("running restyle-no-such-linter"), "{err:#}");

        let err = lint_report("false", Path::new("hello.py")).await.unwrap_err();
        assert!(err.to_string().starts_with("false failed"), "{err}");
    }

    #[test]
    fn history_lines_show_outcome_and_backup() {
        let applied = history_line(&record(Some("applied"), Some("/b/main.c")), 61_000);
        assert!(applied.contains("1m ago"));
        assert!(applied.contains("applied"));
        assert!(applied.ends_with("(backup: /b/main.c)"));

        let open = history_line(&record(None, None), 1_000);
        assert!(open.contains("0s ago"));
        assert!(open.contains("closed"));
    }
}
