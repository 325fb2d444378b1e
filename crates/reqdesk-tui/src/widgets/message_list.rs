//! Chat transcript: merged messages with tool-call progress and cards

use crate::theme::Theme;
use crate::widgets::cards::card_lines;
use crate::widgets::markdown::render_markdown;
use crate::widgets::spinner::frame_at;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use reqdesk_api::Role;
use reqdesk_chat::{
    MergedMessage, MessageSource, ToolCallSummary, merge::renderable, projector::project,
    tool_calls::tool_call_views,
};
use std::time::Duration;

/// Lines for one message, including its tool calls and cards
pub fn message_lines(
    merged: &MergedMessage,
    theme: &Theme,
    width: usize,
    busy: &dyn Fn(&str) -> bool,
    elapsed: Duration,
) -> Vec<Line<'static>> {
    let msg = &merged.message;
    let mut lines = Vec::new();

    let (name, glyph) = match msg.role {
        Role::User => ("You", "▶ "),
        Role::Assistant if merged.source == MessageSource::Context => ("Workbench", "◆ "),
        Role::Assistant => ("Assistant", "◀ "),
        Role::System => ("System", "● "),
    };
    let mut header = vec![
        Span::styled(format!("{}{}", glyph, name), theme.role_style(msg.role)),
        Span::styled(
            format!("  {}", merged.timestamp.format("%H:%M")),
            theme.dim_style(),
        ),
    ];
    if msg.is_streaming {
        header.push(Span::styled(" ▌", theme.warning_style()));
    }
    lines.push(Line::from(header));

    let content_width = width.saturating_sub(2);
    if msg.content.is_empty() && msg.is_streaming {
        lines.push(Line::from(Span::styled(
            format!("  {} thinking…", frame_at(elapsed)),
            theme.warning_style(),
        )));
    } else if msg.role == Role::Assistant {
        for line in render_markdown(&msg.content, theme, content_width) {
            let mut spans = vec![Span::raw("  ")];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
    } else {
        for row in textwrap::wrap(&msg.content, content_width.max(1)) {
            lines.push(Line::from(Span::styled(
                format!("  {}", row),
                theme.base_style(),
            )));
        }
    }

    let views = tool_call_views(msg);
    if !views.is_empty() {
        for view in &views {
            let (glyph, style) = theme.tool_status(view.status);
            let mut row = vec![
                Span::styled(format!("  {} ", glyph), style),
                Span::styled(view.label.clone(), theme.dim_style()),
            ];
            if let Some(error) = &view.error {
                row.push(Span::styled(format!(": {}", error), theme.error_style()));
            }
            lines.push(Line::from(row));
        }
        let summary = ToolCallSummary::of(msg);
        if let Some(label) = summary.label() {
            let style = if summary.is_busy() {
                theme.warning_style()
            } else {
                theme.dim_style()
            };
            lines.push(Line::from(Span::styled(format!("  {}", label), style)));
        }
    }

    lines.extend(card_lines(&project(msg), busy, theme));
    lines.push(Line::from(""));
    lines
}

/// Every renderable message, flattened to lines
pub fn transcript_lines(
    messages: &[MergedMessage],
    theme: &Theme,
    width: usize,
    busy: &dyn Fn(&str) -> bool,
    elapsed: Duration,
) -> Vec<Line<'static>> {
    renderable(messages)
        .flat_map(|m| message_lines(m, theme, width, busy, elapsed))
        .collect()
}

/// Widget showing a window of pre-built transcript lines
pub struct MessageList<'a> {
    lines: &'a [Line<'static>],
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(lines: &'a [Line<'static>]) -> Self {
        Self { lines, scroll: 0 }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let visible: Vec<Line> = self
            .lines
            .iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .cloned()
            .collect();
        Paragraph::new(visible).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqdesk_api::{Message, ToolCall};
    use reqdesk_chat::MessageMerger;
    use serde_json::json;

    fn joined(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_system_messages_hidden() {
        let theme = Theme::dark();
        let external = vec![Message::system("hidden notice"), Message::user("visible question")];
        let merged = MessageMerger::new().merge(&external, &[]);
        let text = joined(&transcript_lines(&merged, &theme, 60, &|_| false, Duration::ZERO));
        assert!(!text.contains("hidden notice"));
        assert!(text.contains("visible question"));
    }

    #[test]
    fn test_tool_rows_and_summary() {
        let theme = Theme::dark();
        let mut done = ToolCall::running("search_project");
        done.complete(json!({})).unwrap();
        let mut failed = ToolCall::running("draft_email");
        failed.fail("quota exceeded").unwrap();
        let running = ToolCall::running("propose_features");
        let msg = Message::assistant("Working").with_tool_calls(vec![done, failed, running]);
        let merged = MessageMerger::new().merge(&[msg], &[]);
        let text = joined(&transcript_lines(&merged, &theme, 60, &|_| false, Duration::ZERO));
        assert!(text.contains("Draft Email: quota exceeded"));
        assert!(text.contains("1/3 tools complete, 1 failed"));
    }

    #[test]
    fn test_proposal_card_under_message() {
        let theme = Theme::dark();
        let mut call = ToolCall::running("propose_features");
        call.complete(json!({"proposal_id": "p1", "creates": 1, "changes_by_type": {"feature": [1]}}))
            .unwrap();
        let msg = Message::assistant("Proposal ready").with_tool_calls(vec![call]);
        let merged = MessageMerger::new().merge(&[msg], &[]);
        let text = joined(&transcript_lines(&merged, &theme, 60, &|_| false, Duration::ZERO));
        assert!(text.contains("Feature proposal"));
        assert!(text.contains("[Apply]"));
    }

    #[test]
    fn test_streaming_placeholder() {
        let theme = Theme::dark();
        let mut msg = Message::assistant("");
        msg.is_streaming = true;
        let merged = MessageMerger::new().merge(&[msg], &[]);
        let text = joined(&transcript_lines(&merged, &theme, 60, &|_| false, Duration::ZERO));
        assert!(text.contains("thinking…"));
    }

    #[test]
    fn test_scroll_window() {
        let lines: Vec<Line<'static>> = (0..10).map(|i| Line::from(format!("row {}", i))).collect();
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        MessageList::new(&lines).scroll(4).render(area, &mut buf);
        let first: String = (0..5).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert_eq!(first, "row 4");
    }
}
