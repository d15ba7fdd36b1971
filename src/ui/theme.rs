//! Terminal colors for the run summary

use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub path: Style,
    pub muted: Style,
}

impl Theme {
    /// Colored only when stderr, where the summary goes, is a terminal
    pub fn detect() -> Self {
        if !console::Term::stderr().is_term() || std::env::var_os("NO_COLOR").is_some() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            path: Style::new().yellow(),
            muted: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            path: Style::new(),
            muted: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
