//! Animated busy indicator

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_TIME: Duration = Duration::from_millis(80);

/// Frame for a given time since the animation started
pub fn frame_at(elapsed: Duration) -> &'static str {
    let index = (elapsed.as_millis() / FRAME_TIME.as_millis()) as usize;
    FRAMES[index % FRAMES.len()]
}

/// One-line spinner followed by a label
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    started: Instant,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            theme,
            started: Instant::now(),
        }
    }

    /// Share a start time so redraws continue the same animation
    pub fn started_at(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        let text = format!("{} {}", frame_at(self.started.elapsed()), self.label);
        buf.set_span(area.x, area.y, &Span::styled(text, self.theme.warning_style()), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_cycles() {
        assert_eq!(frame_at(Duration::ZERO), FRAMES[0]);
        assert_eq!(frame_at(Duration::from_millis(85)), FRAMES[1]);
        assert_eq!(frame_at(FRAME_TIME * FRAMES.len() as u32), FRAMES[0]);
    }

    #[test]
    fn test_renders_label() {
        let theme = Theme::dark();
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        Spinner::new("Sending", &theme).render(area, &mut buf);
        let row: String = (0..20).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(row.contains("Sending"));
    }
}
