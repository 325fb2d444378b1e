//! Key handling for the workbench

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// What a key press means to the workbench
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Char(char),
    /// Enter: submit the composer, or confirm a popup selection
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    /// Accept the top command suggestion
    Tab,
    /// Switch the side panel tab
    BackTab,
    /// Dismiss suggestions, cancel a flow, or close a popup
    Escape,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    Paste(String),
    /// Ctrl+Y: apply the newest proposal card
    ApplyProposal,
    /// Ctrl+N: discard the newest proposal card
    DiscardProposal,
    /// Ctrl+O: ask for the newest proposal's details
    ViewProposal,
    /// Ctrl+T: pick one of the suggested next actions
    NextActions,
    /// Ctrl+L: clear local notices
    Clear,
    /// Ctrl+Q
    Quit,
    Unknown,
}

pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('y') => Action::ApplyProposal,
            KeyCode::Char('n') => Action::DiscardProposal,
            KeyCode::Char('o') => Action::ViewProposal,
            KeyCode::Char('t') => Action::NextActions,
            KeyCode::Char('l') => Action::Clear,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => Action::BackTab,
        KeyCode::Tab => Action::Tab,
        KeyCode::BackTab => Action::BackTab,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
