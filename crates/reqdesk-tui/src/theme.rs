//! Color theme support

use ratatui::style::{Color, Modifier, Style};
use reqdesk_api::{Role, ToolStatus};

/// Color theme for the workbench
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    /// Secondary text, timestamps, hints
    pub dim: Color,
    /// Prompts, focused borders, user role
    pub accent: Color,
    pub error: Color,
    pub success: Color,
    pub warning: Color,
    pub border: Color,
    pub selection_bg: Color,
    pub code: Color,
    pub link: Color,
    /// Border of proposal and signal cards
    pub card: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            selection_bg: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
            card: Color::LightBlue,
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
            success: Color::Rgb(0, 128, 0),
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
            selection_bg: Color::LightBlue,
            code: Color::Magenta,
            link: Color::Blue,
            card: Color::Rgb(40, 90, 160),
        }
    }

    /// Look up a theme by config name; unknown names fall back to dark
    pub fn by_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent_style().add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn card_style(&self) -> Style {
        Style::default().fg(self.card)
    }

    /// Highlighted row in lists and popups
    pub fn selected_style(&self) -> Style {
        Style::default()
            .bg(self.accent)
            .fg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Header style for a message role
    pub fn role_style(&self, role: Role) -> Style {
        match role {
            Role::User => self.accent_bold(),
            Role::Assistant => self.success_style().add_modifier(Modifier::BOLD),
            Role::System => self.dim_style(),
        }
    }

    /// Style and glyph for a tool-call row
    pub fn tool_status(&self, status: ToolStatus) -> (&'static str, Style) {
        match status {
            ToolStatus::Pending => ("○", self.dim_style()),
            ToolStatus::Running => ("◐", self.warning_style()),
            ToolStatus::Complete => ("✓", self.success_style()),
            ToolStatus::Error => ("✗", self.error_style()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(Theme::by_name("Light").bg, Color::White);
        assert_eq!(Theme::by_name("solarized").bg, Color::Reset);
    }

    #[test]
    fn test_tool_status_glyphs_distinct() {
        let theme = Theme::dark();
        let glyphs: Vec<_> = [
            ToolStatus::Pending,
            ToolStatus::Running,
            ToolStatus::Complete,
            ToolStatus::Error,
        ]
        .into_iter()
        .map(|s| theme.tool_status(s).0)
        .collect();
        let mut deduped = glyphs.clone();
        deduped.dedup();
        assert_eq!(glyphs.len(), deduped.len());
    }
}
