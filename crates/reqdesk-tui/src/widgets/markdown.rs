//! Markdown to styled, width-wrapped lines for assistant messages

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Text runs of the block being built, flushed into wrapped lines
#[derive(Default)]
struct Block {
    runs: Vec<(String, Style)>,
    /// Prefix for the first line, e.g. a bullet
    lead: String,
}

impl Block {
    fn is_empty(&self) -> bool {
        self.runs.iter().all(|(t, _)| t.trim().is_empty())
    }
}

struct Renderer<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    block: Block,
    styles: Vec<Style>,
    /// One entry per open list: next number for ordered lists
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code: Option<String>,
}

impl<'t> Renderer<'t> {
    fn new(theme: &'t Theme, width: usize) -> Self {
        Self {
            theme,
            width: width.max(8),
            lines: Vec::new(),
            block: Block::default(),
            styles: vec![theme.base_style()],
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn indent(&self) -> String {
        let mut indent = "│ ".repeat(self.quote_depth);
        indent.push_str(&"  ".repeat(self.lists.len().saturating_sub(1)));
        indent
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::from(""));
        }
    }

    /// Word-wrap the pending runs into lines
    fn flush(&mut self) {
        let block = std::mem::take(&mut self.block);
        if block.is_empty() && block.lead.is_empty() {
            return;
        }
        let indent = self.indent();
        let hang = " ".repeat(block.lead.width());
        let dim = self.theme.dim_style();

        let mut line: Vec<Span<'static>> = vec![
            Span::styled(indent.clone(), dim),
            Span::styled(block.lead.clone(), dim),
        ];
        let mut used = indent.width() + block.lead.width();
        let start = used;

        for (text, style) in block.runs {
            for (i, word) in text.split(' ').enumerate() {
                let space = if i > 0 { 1 } else { 0 };
                let w = word.width();
                if used + space + w > self.width && used > start {
                    self.lines.push(Line::from(std::mem::take(&mut line)));
                    line.push(Span::styled(format!("{}{}", indent, hang), dim));
                    used = start;
                } else if space == 1 {
                    line.push(Span::styled(" ", style));
                    used += 1;
                }
                if !word.is_empty() {
                    line.push(Span::styled(word.to_string(), style));
                    used += w;
                }
            }
        }
        self.lines.push(Line::from(line));
    }

    fn code_block(&mut self, content: &str) {
        let style = self.theme.code_style().add_modifier(Modifier::DIM);
        let room = self.width.saturating_sub(3);
        for raw in content.lines() {
            let text: String = if raw.width() > room {
                let mut cut = String::new();
                for c in raw.chars() {
                    if cut.width() + 2 > room {
                        break;
                    }
                    cut.push(c);
                }
                format!("{}…", cut)
            } else {
                raw.to_string()
            };
            self.lines.push(Line::from(vec![
                Span::styled(self.indent(), self.theme.dim_style()),
                Span::styled(format!("  {}", text), style),
            ]));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match &mut self.code {
                Some(buf) => buf.push_str(&text),
                None => {
                    let style = self.style();
                    self.block.runs.push((text.replace('\n', " "), style));
                }
            },
            Event::Code(code) => {
                let style = self.theme.code_style().add_modifier(Modifier::BOLD);
                self.block.runs.push((code.to_string(), style));
            }
            Event::SoftBreak => {
                let style = self.style();
                self.block.runs.push((" ".to_string(), style));
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                let rule = "─".repeat(self.width.min(40));
                self.lines.push(Line::from(Span::styled(rule, self.theme.dim_style())));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                let accent = self.theme.accent_style();
                self.styles.push(match level {
                    HeadingLevel::H1 => accent.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    HeadingLevel::H2 => accent.add_modifier(Modifier::BOLD),
                    _ => accent,
                });
            }
            Tag::Paragraph => {
                if !self.block.is_empty() {
                    self.flush();
                }
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(|s| s.add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code = Some(String::new());
            }
            Tag::List(first) => {
                self.flush();
                self.lists.push(first);
            }
            Tag::Item => {
                self.flush();
                self.block.lead = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let lead = format!("{}. ", n);
                        *n += 1;
                        lead
                    }
                    _ => "• ".to_string(),
                };
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { .. } => {
                let link = self.theme.link;
                self.push_style(|s| s.fg(link).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.flush();
                self.pop_style();
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank();
            }
            TagEnd::CodeBlock => {
                if let Some(content) = self.code.take() {
                    self.code_block(&content);
                }
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style()
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Render markdown into lines no wider than `width` (except unbreakable words)
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(theme, width);
    for event in Parser::new(text) {
        renderer.event(event);
    }
    renderer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_paragraph_wraps() {
        let theme = Theme::dark();
        let lines = render_markdown("alpha beta gamma delta epsilon", &theme, 12);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width() <= 12));
    }

    #[test]
    fn test_lists() {
        let theme = Theme::dark();
        let text = plain(&render_markdown("- one\n- two\n\n1. first\n2. second", &theme, 40));
        assert!(text.contains(&"• one".to_string()));
        assert!(text.contains(&"2. second".to_string()));
    }

    #[test]
    fn test_code_block_truncates_on_char_boundary() {
        let theme = Theme::dark();
        let md = "```\nlet name = \"Zoë Ångström über lange Zeilen\";\n```";
        let lines = render_markdown(md, &theme, 20);
        assert_eq!(lines.len(), 1);
        assert!(plain(&lines)[0].ends_with('…'));
    }

    #[test]
    fn test_no_trailing_blank_lines() {
        let theme = Theme::dark();
        let lines = render_markdown("# Title\n\nBody text.\n\n", &theme, 40);
        assert!(lines.last().is_some_and(|l| l.width() > 0));
    }

    #[test]
    fn test_block_quote_prefix() {
        let theme = Theme::dark();
        let text = plain(&render_markdown("> quoted", &theme, 40));
        assert_eq!(text[0], "│ quoted");
    }
}
