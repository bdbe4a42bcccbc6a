//! User settings read from `config.toml`.
//!
//! Every field has a default so a partial (or absent) file is always valid.
//! Loading never fails: problems are logged and the defaults are used.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Fallback style name that selects the built-in clang-format style.
pub const VISUAL_STUDIO_STYLE: &str = "Visual Studio";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Opt-in for telemetry events. Off unless the user turns it on.
    pub telemetry: bool,
    /// Root for backups, diff artifacts, the journal and the log file.
    pub temp_root: PathBuf,
    pub theme: String,
    /// Program plus arguments that receives the explain payload as JSON on stdin.
    pub explain_command: Vec<String>,
    pub editor: EditorSettings,
    pub clang_format: ClangFormatSettings,
    pub sql: SqlSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry: false,
            temp_root: std::env::temp_dir().join("restyle"),
            theme: "catppuccin-mocha".to_owned(),
            explain_command: Vec::new(),
            editor: EditorSettings::default(),
            clang_format: ClangFormatSettings::default(),
            sql: SqlSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub use_tabs: bool,
    pub tab_size: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self { use_tabs: false, tab_size: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClangFormatSettings {
    /// Editor-wide default used when no `.clang-format` file is found.
    pub fallback_style: String,
}

impl Default for ClangFormatSettings {
    fn default() -> Self {
        Self { fallback_style: VISUAL_STUDIO_STYLE.to_owned() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Dialect passed to `sql-formatter --language`.
    pub language: String,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self { language: "sql".to_owned() }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Loads `path`, returning defaults when it is missing or malformed.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no config file, using defaults");
                return Self::default();
            }
        };
        match Self::from_toml(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                Self::default()
            }
        }
    }
}

/// Returns the path to the restyle config file.
///
/// Prefers `$XDG_CONFIG_HOME/restyle/config.toml`; falls back to
/// `~/.config/restyle/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("restyle").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::from_toml("telemetry = true\n[editor]\ntab_size = 2\n").unwrap();
        assert!(s.telemetry);
        assert_eq!(s.editor.tab_size, 2);
        assert!(!s.editor.use_tabs);
        assert_eq!(s.clang_format.fallback_style, VISUAL_STUDIO_STYLE);
        assert_eq!(s.sql.language, "sql");
    }

    #[test]
    fn telemetry_is_opt_in() {
        assert!(!Settings::default().telemetry);
        assert!(!Settings::from_toml("").unwrap().telemetry);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "telemetry = \"maybe\"").unwrap();
        let s = Settings::load(&path);
        assert!(!s.telemetry);
    }

    #[test]
    fn explain_command_is_a_list() {
        let s = Settings::from_toml("explain_command = [\"explainer\", \"--stdin\"]").unwrap();
        assert_eq!(s.explain_command, vec!["explainer", "--stdin"]);
    }
}
