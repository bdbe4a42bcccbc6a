//! The host side of a session: whatever shows the comparison to the user.
//!
//! The lifecycle drives a presenter through this trait and the host reports
//! back by calling lifecycle methods (`source_edited`, `presentation_closed`,
//! `apply`, ...) with the handle it was given in [`DiffPresenter::open`].

use std::path::{Path, PathBuf};

use crate::error::PresenterError;
use crate::types::SessionHandle;

/// Content of one side-by-side comparison.
#[derive(Debug, Clone, Copy)]
pub struct Presentation<'a> {
    pub handle: SessionHandle,
    pub title: &'a str,
    pub source_path: &'a Path,
    pub artifact_path: &'a Path,
    pub original: &'a str,
    pub formatted: &'a str,
}

/// A user-visible message. Text is always one of the fixed friendly strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(t) | Notice::Error(t) => t,
        }
    }
}

pub trait DiffPresenter {
    /// Shows the comparison. The presenter owns no files; it only displays.
    fn open(&mut self, view: Presentation<'_>) -> Result<(), PresenterError>;

    /// Removes the comparison for `handle`. Unknown handles are ignored.
    fn close(&mut self, handle: SessionHandle);

    /// Enables the apply and explain actions for `handle`, or disables them.
    fn bind(&mut self, handle: Option<SessionHandle>);

    fn notify(&mut self, notice: Notice);

    /// The document the user is looking at, target of `run_interactive`.
    fn focused_document(&self) -> Option<PathBuf>;
}
