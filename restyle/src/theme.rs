//! Color theme system for restyle.
//!
//! Two built-in themes:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions without truecolor.
//! - `catppuccin_mocha` is the Catppuccin Mocha palette in RGB; needs truecolor.

use ratatui::style::Color;

/// All color values used across restyle's UI surfaces.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Side-by-side view
    /// Marker and line number color for lines the formatter removes or rewrites.
    pub diff_removed: Color,
    /// Marker and line number color for lines the formatter adds or rewrites.
    pub diff_added: Color,
    /// Background tint behind a changed original line.
    pub diff_removed_bg: Color,
    /// Background tint behind a changed formatted line.
    pub diff_added_bg: Color,
    pub diff_context: Color,
    pub line_number: Color,

    // File list
    pub file_modified: Color,
    pub file_added: Color,
    pub file_untracked: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode: Color,
    pub notice_info: Color,
    pub notice_error: Color,

    pub background: Color,
}

impl Theme {
    /// The built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_removed: Color::Red,
            diff_added: Color::Green,
            diff_removed_bg: Color::Reset,
            diff_added_bg: Color::Reset,
            diff_context: Color::Reset,
            line_number: Color::DarkGray,

            file_modified: Color::Yellow,
            file_added: Color::Green,
            file_untracked: Color::Blue,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode: Color::Cyan,
            notice_info: Color::Green,
            notice_error: Color::Red,

            background: Color::Reset,
        }
    }

    /// The Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_removed: red,
            diff_added: green,
            diff_removed_bg: Color::Rgb(64, 40, 54),
            diff_added_bg: Color::Rgb(40, 60, 48),
            diff_context: text,
            line_number: overlay1,

            file_modified: yellow,
            file_added: green,
            file_untracked: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode: lavender,
            notice_info: green,
            notice_error: red,

            background: base,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark()`
    /// so a typo never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
