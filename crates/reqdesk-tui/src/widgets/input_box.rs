//! Single-line composer input with a slash-command suggestion popup

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use reqdesk_chat::CommandDefinition;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Editable line. The cursor is a char index.
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    cursor: usize,
    /// Display column of the first visible char
    offset: usize,
    placeholder: String,
    /// Border title, e.g. the active structured prompt
    title: Option<String>,
    disabled: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the text and move the cursor to the end
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.content.chars().count();
    }

    pub fn clear(&mut self) {
        self.set_content(String::new());
        self.offset = 0;
    }

    pub fn set_title(&mut self, title: Option<&str>) {
        self.title = title.map(String::from);
    }

    /// Show the box greyed out while a send is in flight; typing still works
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    fn byte_at(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }

    fn cursor_column(&self) -> usize {
        self.content[..self.byte_at(self.cursor)].width()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove chars in `[from, to)` and leave the cursor at `from`
    fn remove_range(&mut self, from: usize, to: usize) {
        let (start, end) = (self.byte_at(from), self.byte_at(to));
        self.content.replace_range(start..end, "");
        self.cursor = from;
    }

    /// Apply an editing action. Returns true if the text or cursor changed.
    pub fn handle_action(&mut self, action: &Action) -> bool {
        let len = self.content.chars().count();
        match action {
            Action::Char(c) => self.insert(*c),
            Action::Paste(text) => {
                for c in text.chars() {
                    match c {
                        '\r' => {}
                        '\n' if self.content.ends_with(' ') || self.cursor == 0 => {}
                        '\n' => self.insert(' '),
                        c => self.insert(c),
                    }
                }
            }
            Action::Backspace if self.cursor > 0 => self.remove_range(self.cursor - 1, self.cursor),
            Action::Delete if self.cursor < len => {
                let at = self.cursor;
                self.remove_range(at, at + 1);
            }
            Action::Left if self.cursor > 0 => self.cursor -= 1,
            Action::Right if self.cursor < len => self.cursor += 1,
            Action::Home => self.cursor = 0,
            Action::End => self.cursor = len,
            Action::ClearLine => self.clear(),
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().take(self.cursor).collect();
                let trimmed = chars.iter().rposition(|c| !c.is_whitespace()).map_or(0, |i| i + 1);
                let start = chars[..trimmed]
                    .iter()
                    .rposition(|c| c.is_whitespace())
                    .map_or(0, |i| i + 1);
                if start == self.cursor {
                    return false;
                }
                self.remove_range(start, self.cursor);
            }
            _ => return false,
        }
        true
    }

    fn keep_cursor_visible(&mut self, visible: usize) {
        let column = self.cursor_column();
        if column < self.offset {
            self.offset = column;
        } else if visible > 0 && column >= self.offset + visible {
            self.offset = column + 1 - visible;
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let mut block = Block::default().borders(Borders::ALL).border_style(if self.disabled {
            theme.border_style()
        } else {
            theme.accent_style()
        });
        if let Some(title) = &self.title {
            block = block
                .title(format!(" {} ", title))
                .title_style(theme.accent_bold());
        }
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let visible = inner.width as usize;
        self.keep_cursor_visible(visible);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            let mut column = 0;
            let mut shown = String::new();
            for c in self.content.chars() {
                let w = c.width().unwrap_or(0);
                if column >= self.offset && column + w <= self.offset + visible {
                    shown.push(c);
                }
                column += w;
            }
            let style = if self.disabled {
                theme.dim_style()
            } else {
                theme.base_style()
            };
            (shown, style)
        };
        Paragraph::new(text).style(style).render(inner, buf);

        let x = self.cursor_column().saturating_sub(self.offset);
        if x < visible {
            if let Some(cell) = buf.cell_mut((inner.x + x as u16, inner.y)) {
                cell.set_style(Style::default().bg(theme.accent));
            }
        }
    }
}

/// Draw command suggestions in the rows directly above `input_area`
pub fn render_suggestions(
    suggestions: &[CommandDefinition],
    input_area: Rect,
    buf: &mut Buffer,
    theme: &Theme,
) {
    if suggestions.is_empty() {
        return;
    }
    let rows = (suggestions.len() as u16).min(6);
    let height = (rows + 2).min(input_area.y);
    if height < 3 {
        return;
    }
    let area = Rect::new(input_area.x, input_area.y - height, input_area.width, height);
    Clear.render(area, buf);

    let lines: Vec<Line> = suggestions
        .iter()
        .take(rows as usize)
        .enumerate()
        .map(|(i, cmd)| {
            let name_style = if i == 0 {
                theme.selected_style()
            } else {
                theme.accent_style()
            };
            let mut name = cmd.slash_name();
            if let Some(usage) = &cmd.usage {
                name.push(' ');
                name.push_str(usage);
            }
            Line::from(vec![
                Span::styled(format!(" {} ", name), name_style),
                Span::styled(format!("  {}", cmd.description), theme.dim_style()),
            ])
        })
        .collect();

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Tab to complete · Esc to dismiss ")
                .title_style(theme.dim_style()),
        )
        .render(area, buf);
}
