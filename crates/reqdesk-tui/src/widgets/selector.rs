//! Popup list for choosing one option: memory categories, next actions,
//! field-editor modes

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, StatefulWidget, Widget},
};
use unicode_width::UnicodeWidthStr;

const MAX_WIDTH: u16 = 72;
const MAX_HEIGHT: u16 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorItem {
    pub label: String,
    pub description: Option<String>,
}

impl SelectorItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Which item is highlighted and whether the popup is open
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorState {
    pub selected: usize,
    pub visible: bool,
}

impl SelectorState {
    pub fn show(&mut self) {
        self.selected = 0;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn up(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            count - 1
        } else {
            self.selected - 1
        };
    }

    pub fn down(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.selected = (self.selected + 1) % count;
    }
}

pub struct Selector<'a> {
    title: &'a str,
    items: &'a [SelectorItem],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> Selector<'a> {
    pub fn new(title: &'a str, items: &'a [SelectorItem], theme: &'a Theme) -> Self {
        Self {
            title,
            items,
            selected: 0,
            theme,
        }
    }

    pub fn with_selected(mut self, index: usize) -> Self {
        self.selected = index.min(self.items.len().saturating_sub(1));
        self
    }

    /// Popup size for these items, before clamping to the screen
    fn size(&self) -> (u16, u16) {
        let widest = self
            .items
            .iter()
            .map(|item| {
                let desc = item.description.as_deref().map(|d| d.width() + 3).unwrap_or(0);
                item.label.width() + desc + 4
            })
            .chain(std::iter::once(self.title.width() + 4))
            .max()
            .unwrap_or(20);
        let width = (widest as u16).clamp(24, MAX_WIDTH);
        let height = (self.items.len() as u16 + 2).min(MAX_HEIGHT);
        (width, height)
    }

    pub fn render_centered(&self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.size();
        let width = width.min(area.width);
        let height = height.min(area.height);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        Clear.render(popup, buf);

        let rows: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if i == self.selected {
                    self.theme.selected_style()
                } else {
                    self.theme.base_style()
                };
                let mut spans = vec![Span::styled(format!(" {}", item.label), style)];
                if let Some(desc) = &item.description {
                    spans.push(Span::styled(format!(" · {}", desc), self.theme.dim_style()));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(rows)
            .block(
                Block::default()
                    .title(format!(" {} ", self.title))
                    .title_style(self.theme.accent_bold())
                    .borders(Borders::ALL)
                    .border_style(self.theme.accent_style()),
            )
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(Some(self.selected));
        StatefulWidget::render(list, popup, buf, &mut state);
    }
}
