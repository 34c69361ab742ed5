//! Terminal styles for scope, reference and check reports

use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    /// Report headings and per-node picker sections
    pub heading: Style,
    /// Clean snapshots and tokens that resolve
    pub clean: Style,
    /// Dangling references and snapshots that fail to load
    pub dangling: Style,
    /// Snapshots with problems, unreadable files
    pub notice: Style,
    pub accent: Style,
    pub label: Style,
    /// Snapshots reported as unchanged
    pub faded: Style,
    /// Reference tokens such as `3.result`
    pub token: Style,
    pub data_type: Style,
    /// Nodes only reachable through failure handlers
    pub exception: Style,
    /// Nodes inside the body of a Loop target
    pub loop_body: Style,
}

impl Theme {
    /// Colored on a terminal, unless `NO_COLOR` is set
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() || std::env::var_os("NO_COLOR").is_some() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            clean: Style::new().green().bold(),
            dangling: Style::new().red().bold(),
            notice: Style::new().yellow().bold(),
            accent: Style::new().magenta(),
            label: Style::new().white().dimmed(),
            faded: Style::new().bright_black(),
            token: Style::new().blue().bold(),
            data_type: Style::new().bright_black().italic(),
            exception: Style::new().yellow().italic(),
            loop_body: Style::new().cyan().italic(),
        }
    }

    pub fn plain() -> Self {
        Self {
            heading: Style::new(),
            clean: Style::new(),
            dangling: Style::new(),
            notice: Style::new(),
            accent: Style::new(),
            label: Style::new(),
            faded: Style::new(),
            token: Style::new(),
            data_type: Style::new(),
            exception: Style::new(),
            loop_body: Style::new(),
        }
    }

    pub fn paint(&self, style: Style, text: &str) -> String {
        text.style(style).to_string()
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
