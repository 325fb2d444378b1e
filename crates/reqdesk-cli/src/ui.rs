//! TUI implementation for reqdesk

use chrono::{DateTime, Utc};
use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use reqdesk_api::{MemoryCategory, NextAction};
use reqdesk_chat::actions::command_for;
use reqdesk_chat::field_editor::Effect;
use reqdesk_chat::projector::project;
use reqdesk_chat::{
    Composer, DetailState, Dispatch, EditTarget, EditorEvent, EditorState, EntityDrawer,
    EntityKind, FieldEditor, MergedMessage, MessageMerger, Prepared, ProposalAction, StructuredCommand,
};
use reqdesk_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{
        InputBox, MessageList, PanelTab, Selector, SelectorItem, SelectorState, SidePanel,
        Spinner,
        input_box::render_suggestions,
        message_list::transcript_lines,
        side_panel::{drawer_lines, editor_lines, next_action_lines},
    },
};
use std::collections::VecDeque;
use std::mem::Discriminant;
use std::time::Instant;

use crate::commands::UiRequest;
use crate::prefs::{PANEL_TAB_KEY, Prefs};
use crate::workspace::{Outcome, Task, Workspace};

/// Side panel appears only when the terminal is at least this wide
const PANEL_MIN_WIDTH: u16 = 100;
const PANEL_WIDTH: u16 = 42;

const EDITOR_CHOICES: [(&str, &str); 3] = [
    ("Edit manually", "Start from the current text"),
    ("AI rewrite", "Ask for a better version"),
    ("AI rewrite with notes", "Guide the rewrite first"),
];

/// TUI application state
pub struct TuiState {
    merger: MessageMerger,
    composer: Composer,
    input: InputBox,
    /// usize::MAX sticks to the bottom
    scroll: usize,
    status: String,
    theme: Theme,
    spinner_start: Instant,
    /// Messages at or before this instant are hidden
    cleared_at: Option<DateTime<Utc>>,
    next_actions: Vec<NextAction>,
    panel_tab: PanelTab,
    prefs: Prefs,
    drawer: Option<EntityDrawer>,
    editor: Option<FieldEditor>,
    /// Composer draft put aside while the input edits the field editor's text
    stashed_draft: Option<String>,
    editor_input: Option<Discriminant<EditorState>>,
    category_selector: SelectorState,
    action_selector: SelectorState,
    editor_selector: SelectorState,
    queue: VecDeque<Task>,
    is_processing: bool,
    /// The running task came from the composer
    sending: bool,
    /// Proposal id of the most recent card
    newest_card: Option<String>,
}

impl TuiState {
    pub fn new(theme: Theme, prefs: Prefs) -> Self {
        let panel_tab = prefs
            .get(PANEL_TAB_KEY)
            .and_then(PanelTab::from_name)
            .unwrap_or_default();

        Self {
            merger: MessageMerger::new(),
            composer: Composer::new(),
            input: InputBox::new().with_placeholder("Ask anything, or type / for commands"),
            scroll: 0,
            status: "Ready".to_string(),
            theme,
            spinner_start: Instant::now(),
            cleared_at: None,
            next_actions: Vec::new(),
            panel_tab,
            prefs,
            drawer: None,
            editor: None,
            stashed_draft: None,
            editor_input: None,
            category_selector: SelectorState::default(),
            action_selector: SelectorState::default(),
            editor_selector: SelectorState::default(),
            queue: VecDeque::from([Task::NextActions]),
            is_processing: false,
            sending: false,
            newest_card: None,
        }
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll = usize::MAX;
    }

    fn set_tab(&mut self, tab: PanelTab) {
        self.panel_tab = tab;
        if let Err(e) = self.prefs.set(PANEL_TAB_KEY, tab.name()) {
            tracing::warn!("Failed to save panel tab: {}", e);
        }
    }

    fn visible_messages(&mut self, ws: &Workspace) -> Vec<MergedMessage> {
        let merged = ws.merged(&mut self.merger);
        match self.cleared_at {
            Some(cutoff) => merged.into_iter().filter(|m| m.timestamp > cutoff).collect(),
            None => merged,
        }
    }

    fn editor_text_mode(&self) -> bool {
        self.editor.as_ref().is_some_and(|e| {
            matches!(
                e.state(),
                EditorState::Manual { .. }
                    | EditorState::AiNotes { .. }
                    | EditorState::AiSuggestion { .. }
            )
        })
    }

    /// Point the input box at the editor's text when the editor enters a
    /// text state, and give the composer its draft back when it leaves
    fn sync_editor_input(&mut self) {
        if self.editor_text_mode() {
            let Some(editor) = &self.editor else { return };
            let kind = std::mem::discriminant(editor.state());
            if self.editor_input != Some(kind) {
                if self.stashed_draft.is_none() {
                    self.stashed_draft = Some(self.input.content().to_string());
                }
                self.input
                    .set_content(editor.state().text().unwrap_or_default());
                self.editor_input = Some(kind);
            }
        } else if self.editor_input.take().is_some() {
            let draft = self.stashed_draft.take().unwrap_or_default();
            self.input.set_content(draft);
        }
    }

    fn editor_event(&mut self, event: EditorEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let target = editor.target().clone();
        match editor.handle(event) {
            Some(Effect::FetchSuggestion { notes }) => {
                self.queue.push_back(Task::Suggest { target, notes });
            }
            Some(Effect::Commit(value)) => {
                self.queue.push_back(Task::Commit { target, value });
            }
            Some(Effect::ShowError(e)) => self.status = format!("Error: {}", e),
            None => {}
        }
        if self.editor.as_ref().is_some_and(|e| e.state().is_idle() && e.last_error().is_none())
        {
            self.editor = None;
        }
        self.sync_editor_input();
    }

    fn handle_request(&mut self, request: UiRequest, ws: &Workspace) -> bool {
        match request {
            UiRequest::Clear => {
                self.cleared_at = Some(Utc::now());
                self.status = "Cleared".to_string();
            }
            UiRequest::Exit => return false,
            UiRequest::OpenDetail(kind, id) => {
                if let Some(old) = self.drawer.take() {
                    old.close();
                }
                self.drawer = Some(EntityDrawer::open(
                    kind,
                    ws.backend.clone(),
                    ws.project_id.clone(),
                    id,
                ));
                self.set_tab(PanelTab::Details);
            }
            UiRequest::Edit(target) => {
                let mut editor = FieldEditor::new(target);
                editor.handle(EditorEvent::OpenMenu);
                self.editor = Some(editor);
                self.editor_selector.show();
                self.set_tab(PanelTab::Details);
            }
            UiRequest::NextActions(actions) => {
                self.next_actions = actions;
                if !self.next_actions.is_empty() {
                    self.action_selector.show();
                }
            }
        }
        true
    }

    /// Apply a finished task. Returns false to quit.
    fn handle_outcome(&mut self, outcome: Outcome, ws: &Workspace) -> bool {
        let sent = matches!(outcome, Outcome::Sent(_) | Outcome::CardAction(_));
        match outcome {
            Outcome::Sent(result) | Outcome::CardAction(result) => {
                if let Err(e) = result {
                    self.status = format!("Error: {}", e.user_message());
                } else {
                    self.status = "Ready".to_string();
                }
            }
            Outcome::Suggestion(event) => self.editor_event(event),
            Outcome::Committed(target, result) => match result {
                Ok(()) => {
                    self.status = format!("Saved {}", target.label());
                    self.refresh_driver(&target, ws);
                }
                Err(e) => self.status = format!("Error: {}", e),
            },
            Outcome::NextActions(actions) => self.next_actions = actions,
        }

        if sent {
            for request in ws.engine.take_requests() {
                if !self.handle_request(request, ws) {
                    return false;
                }
            }
            self.queue.push_back(Task::NextActions);
            self.scroll_to_bottom();
        }
        true
    }

    /// Reload the open driver drawer after one of its fields changed
    fn refresh_driver(&mut self, target: &EditTarget, ws: &Workspace) {
        let EditTarget::Driver { driver_id, .. } = target else {
            return;
        };
        let open = self
            .drawer
            .as_ref()
            .is_some_and(|d| d.entity_id() == driver_id.as_str());
        if open {
            self.drawer = Some(EntityDrawer::open(
                EntityKind::Driver,
                ws.backend.clone(),
                ws.project_id.clone(),
                driver_id.clone(),
            ));
        }
    }

    fn submit(&mut self, ws: &Workspace) {
        if self.editor_text_mode() {
            let text = self.input.content().to_string();
            let accept = matches!(
                self.editor.as_ref().map(|e| e.state()),
                Some(EditorState::AiSuggestion { .. })
            );
            self.editor_event(EditorEvent::EditText(text));
            self.editor_event(if accept {
                EditorEvent::Accept
            } else {
                EditorEvent::Request
            });
            return;
        }

        self.composer.set_draft(self.input.content());
        match self.composer.prepare_submit(ws.ctx.engine.as_ref()) {
            Prepared::Ignored => {
                if self.composer.is_loading() {
                    self.status = "Still working on the last message".to_string();
                }
            }
            Prepared::FlowStarted(command) => {
                self.input.clear();
                if command == StructuredCommand::Remember {
                    self.category_selector.show();
                }
            }
            Prepared::FlowAdvanced => self.input.clear(),
            Prepared::Dispatch(dispatch) => {
                self.input.clear();
                self.queue.push_back(Task::Send(dispatch));
                self.scroll_to_bottom();
            }
        }
    }

    fn card_action(&mut self, action: ProposalAction, ws: &Workspace) {
        let Some(id) = self.newest_card.clone() else {
            self.status = "No proposal to act on".to_string();
            return;
        };
        if ws.engine.in_flight().contains(&id) {
            return;
        }
        self.queue.push_back(Task::CardAction {
            action,
            proposal_id: id,
        });
    }

    fn after_edit(&mut self, ws: &Workspace) {
        if self.editor_text_mode() {
            return;
        }
        self.composer.set_draft(self.input.content());
        self.composer.refresh_suggestions(ws.ctx.engine.as_ref());
    }

    /// Handle one key action. Returns false to quit.
    pub fn handle_action(&mut self, action: Action, ws: &Workspace) -> bool {
        if self.category_selector.visible {
            let count = MemoryCategory::ALL.len();
            match action {
                Action::Up => self.category_selector.up(count),
                Action::Down => self.category_selector.down(count),
                Action::Submit => {
                    self.category_selector.hide();
                    let category = MemoryCategory::ALL[self.category_selector.selected];
                    self.composer.choose_category(category);
                }
                Action::Escape => {
                    // keep the flow; the category can still be typed
                    self.category_selector.hide();
                }
                _ => {}
            }
            return true;
        }

        if self.action_selector.visible {
            let count = self.next_actions.len();
            match action {
                Action::Up => self.action_selector.up(count),
                Action::Down => self.action_selector.down(count),
                Action::Submit => {
                    self.action_selector.hide();
                    if let Some(chosen) = self.next_actions.get(self.action_selector.selected) {
                        self.input.set_content(command_for(chosen));
                        self.after_edit(ws);
                    }
                }
                Action::Escape | Action::NextActions => self.action_selector.hide(),
                _ => {}
            }
            return true;
        }

        if self.editor_selector.visible {
            match action {
                Action::Up => self.editor_selector.up(EDITOR_CHOICES.len()),
                Action::Down => self.editor_selector.down(EDITOR_CHOICES.len()),
                Action::Submit => {
                    self.editor_selector.hide();
                    let event = match self.editor_selector.selected {
                        0 => EditorEvent::ChooseManual {
                            current: self.current_field_value(),
                        },
                        1 => EditorEvent::ChooseAiRewrite,
                        _ => EditorEvent::ChooseAiWithNotes,
                    };
                    self.editor_event(event);
                }
                Action::Escape => {
                    self.editor_selector.hide();
                    self.editor_event(EditorEvent::Cancel);
                }
                _ => {}
            }
            return true;
        }

        match action {
            Action::Submit => self.submit(ws),
            Action::Quit | Action::Interrupt => return false,
            Action::Escape => {
                if self.composer.autocomplete().is_visible() {
                    self.composer.dismiss_suggestions();
                } else if self.editor.is_some() {
                    self.editor_event(EditorEvent::Cancel);
                    self.editor = None;
                    self.sync_editor_input();
                } else if self.composer.flow().is_active() {
                    self.composer.cancel_flow();
                    self.input.clear();
                } else if let Some(drawer) = self.drawer.take() {
                    drawer.close();
                }
            }
            Action::Tab => {
                if self.composer.accept_suggestion() {
                    self.input.set_content(self.composer.draft());
                } else {
                    self.set_tab(self.panel_tab.next());
                }
            }
            Action::BackTab => self.set_tab(self.panel_tab.next()),
            Action::PageUp => self.scroll = self.scroll.saturating_sub(10),
            Action::PageDown => self.scroll = self.scroll.saturating_add(10),
            Action::Up => self.scroll = self.scroll.saturating_sub(1),
            Action::Down => self.scroll = self.scroll.saturating_add(1),
            Action::Clear => {
                self.cleared_at = Some(Utc::now());
                self.status = "Cleared".to_string();
            }
            Action::NextActions => {
                if self.next_actions.is_empty() {
                    self.status = "Nothing suggested right now".to_string();
                } else {
                    self.action_selector.show();
                }
            }
            Action::ApplyProposal => self.card_action(ProposalAction::Apply, ws),
            Action::DiscardProposal => self.card_action(ProposalAction::Discard, ws),
            Action::ViewProposal => self.card_action(ProposalAction::ViewDetails, ws),
            other => {
                if self.input.handle_action(&other) {
                    self.after_edit(ws);
                }
            }
        }
        true
    }

    /// Value of the field being edited, read from the open driver drawer
    fn current_field_value(&self) -> String {
        let Some(EditTarget::Driver { driver_id, field }) = self.editor.as_ref().map(|e| e.target())
        else {
            return String::new();
        };
        match &self.drawer {
            Some(EntityDrawer::Driver(drawer)) if drawer.entity_id() == driver_id.as_str() => {
                drawer.with_state(|state| match state {
                    DetailState::Loaded(d) => {
                        field.value_of(d).unwrap_or_default().to_string()
                    }
                    _ => String::new(),
                })
            }
            _ => String::new(),
        }
    }

    fn input_title(&self) -> Option<String> {
        if let Some(editor) = &self.editor {
            let label = editor.target().label();
            return match editor.state() {
                EditorState::Manual { .. } => Some(format!("Edit {} · Enter to save", label)),
                EditorState::AiNotes { .. } => Some(format!("Notes for the {} rewrite", label)),
                EditorState::AiSuggestion { .. } => {
                    Some(format!("Suggested {} · Enter to accept, Esc to discard", label))
                }
                _ => self.composer.flow().prompt().map(String::from),
            };
        }
        self.composer.flow().prompt().map(String::from)
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame, ws: &Workspace) {
        let size = frame.area();

        let (main, panel) = if size.width >= PANEL_MIN_WIDTH {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(40), Constraint::Length(PANEL_WIDTH)])
                .split(size);
            (columns[0], Some(columns[1]))
        } else {
            (size, None)
        };

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(main);

        self.render_messages(frame, chunks[0], ws);
        self.render_status(frame, chunks[1]);

        let title = self.input_title();
        self.input.set_title(title.as_deref());
        self.input.set_disabled(self.composer.is_loading());
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme);

        if self.composer.autocomplete().is_visible() {
            render_suggestions(
                self.composer.autocomplete().suggestions(),
                chunks[2],
                frame.buffer_mut(),
                &self.theme,
            );
        }

        if let Some(panel) = panel {
            self.render_panel(frame, panel);
        }

        if self.category_selector.visible {
            let items: Vec<SelectorItem> = MemoryCategory::ALL
                .iter()
                .map(|c| SelectorItem::new(c.as_str()))
                .collect();
            Selector::new("What kind of memory?", &items, &self.theme)
                .with_selected(self.category_selector.selected)
                .render_centered(size, frame.buffer_mut());
        }

        if self.action_selector.visible {
            let items: Vec<SelectorItem> = self
                .next_actions
                .iter()
                .map(|a| match &a.description {
                    Some(desc) => SelectorItem::new(a.title.clone()).with_description(desc.clone()),
                    None => SelectorItem::new(a.title.clone()),
                })
                .collect();
            Selector::new("Next actions", &items, &self.theme)
                .with_selected(self.action_selector.selected)
                .render_centered(size, frame.buffer_mut());
        }

        if self.editor_selector.visible {
            let items: Vec<SelectorItem> = EDITOR_CHOICES
                .iter()
                .map(|(label, desc)| SelectorItem::new(*label).with_description(*desc))
                .collect();
            let title = self
                .editor
                .as_ref()
                .map(|e| format!("Edit {}", e.target().label()))
                .unwrap_or_default();
            Selector::new(&title, &items, &self.theme)
                .with_selected(self.editor_selector.selected)
                .render_centered(size, frame.buffer_mut());
        }
    }

    fn render_panel(&self, frame: &mut Frame, area: Rect) {
        let body = match self.panel_tab {
            PanelTab::NextActions => next_action_lines(&self.next_actions, &self.theme),
            PanelTab::Details => {
                let mut lines = match &self.drawer {
                    Some(drawer) => drawer_lines(drawer, &self.theme),
                    None => vec![Line::from(Span::styled(
                        "Open an item with /stakeholder, /driver or /entity",
                        self.theme.dim_style(),
                    ))],
                };
                if let Some(editor) = &self.editor {
                    lines.extend(editor_lines(editor, &self.theme));
                }
                lines
            }
        };
        frame.render_widget(SidePanel::new(self.panel_tab, body, &self.theme), area);
    }

    fn render_welcome(&self, frame: &mut Frame, area: Rect, ws: &Workspace) {
        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("    {:<10}", k), self.theme.accent_style()),
                Span::styled(what, self.theme.base_style()),
            ])
        };
        let mut lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  ◆ ", self.theme.accent_bold()),
                Span::styled("reqdesk", self.theme.base_style()),
                Span::styled(" - requirements workbench", self.theme.dim_style()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  Project: {}", ws.project_id),
                self.theme.dim_style(),
            )),
            Line::from(""),
            Line::from(Span::styled("  Keybindings", self.theme.warning_style())),
            Line::from(""),
            key("Enter", "Send message"),
            key("/", "Commands (Tab to complete)"),
            key("Ctrl+T", "Pick a next action"),
            key("Ctrl+Y/N/O", "Apply / discard / view the latest proposal"),
            key("Shift+Tab", "Switch side panel tab"),
            key("Ctrl+L", "Clear conversation view"),
            key("Ctrl+Q", "Quit"),
            Line::from(""),
        ];
        if !self.next_actions.is_empty() {
            lines.push(Line::from(Span::styled(
                "  Suggested next",
                self.theme.warning_style(),
            )));
            lines.push(Line::from(""));
            for action in self.next_actions.iter().take(3) {
                lines.push(Line::from(Span::styled(
                    format!("    • {}", action.title),
                    self.theme.base_style(),
                )));
            }
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect, ws: &Workspace) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" reqdesk │ {} ", ws.project_id));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let messages = self.visible_messages(ws);
        self.newest_card = messages
            .iter()
            .rev()
            .find_map(|m| project(&m.message).proposal_id().map(String::from));

        if inner.height == 0 || messages.iter().all(|m| !m.is_renderable()) {
            self.render_welcome(frame, inner, ws);
            return;
        }

        let in_flight = ws.engine.in_flight();
        let busy = |id: &str| in_flight.contains(id);
        let lines = transcript_lines(
            &messages,
            &self.theme,
            inner.width.saturating_sub(1) as usize,
            &busy,
            self.spinner_start.elapsed(),
        );
        let content_height = lines.len();

        if self.scroll == usize::MAX {
            self.scroll = content_height.saturating_sub(inner.height as usize);
        } else {
            self.scroll = self
                .scroll
                .min(content_height.saturating_sub(inner.height as usize));
        }

        frame.render_widget(MessageList::new(&lines).scroll(self.scroll), inner);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_processing {
            let spinner = Spinner::new(&self.status, &self.theme).started_at(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left = format!("{} │ {}", self.panel_tab.title(), self.status);
        let right = "/help │ Ctrl+T: next │ Ctrl+Q: quit";
        let available = area.width as usize;
        let (lw, rw) = (left.chars().count(), right.chars().count());

        let line = if lw + rw + 2 <= available {
            Line::from(vec![
                Span::styled(left, self.theme.dim_style()),
                Span::raw(" ".repeat(available - lw - rw)),
                Span::styled(right, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left, self.theme.dim_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn begin_task(&mut self, task: &Task) {
        self.is_processing = true;
        self.sending = matches!(task, Task::Send(_));
        self.spinner_start = Instant::now();
        self.status = match task {
            Task::Send(Dispatch::Remote(_))
            | Task::CardAction {
                action: ProposalAction::ViewDetails,
                ..
            } => "Thinking...".to_string(),
            Task::Send(_) | Task::CardAction { .. } => "Working...".to_string(),
            Task::Suggest { .. } => "Asking for a suggestion...".to_string(),
            Task::Commit { .. } => "Saving...".to_string(),
            Task::NextActions => "Loading next actions...".to_string(),
        };
    }

    fn end_task(&mut self) {
        self.is_processing = false;
        if std::mem::take(&mut self.sending) {
            self.composer.finish();
        }
    }
}

fn mouse_scroll(state: &mut TuiState, kind: MouseEventKind) {
    match kind {
        MouseEventKind::ScrollUp => state.scroll = state.scroll.saturating_sub(3),
        MouseEventKind::ScrollDown => state.scroll = state.scroll.saturating_add(3),
        _ => {}
    }
}

/// Run the TUI application
pub async fn run_tui(ws: &Workspace, theme: Theme, prefs: Prefs) -> anyhow::Result<()> {
    use crossterm::{
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = TuiState::new(theme, prefs);
    let mut event_stream = EventStream::new();

    // Tick interval for animations and background drawer loads
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    let result: anyhow::Result<()> = 'outer: loop {
        // One network task at a time; input keeps working while it runs
        if let Some(task) = state.queue.pop_front() {
            state.begin_task(&task);
            let mut pending = std::pin::pin!(ws.perform(task));

            let outcome = loop {
                terminal.draw(|frame| state.render(frame, ws))?;

                tokio::select! {
                    biased;

                    outcome = &mut pending => break outcome,

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Mouse(mouse))) => mouse_scroll(&mut state, mouse.kind),
                            Some(Ok(event)) => {
                                let quit = event_to_action(event)
                                    .is_some_and(|action| !state.handle_action(action, ws));
                                if quit {
                                    break 'outer Ok(());
                                }
                            }
                            Some(Err(e)) => break 'outer Err(anyhow::anyhow!("Event error: {}", e)),
                            None => break 'outer Ok(()),
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            };

            state.end_task();
            if !state.handle_outcome(outcome, ws) {
                break Ok(());
            }
            continue;
        }

        terminal.draw(|frame| state.render(frame, ws))?;

        tokio::select! {
            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Mouse(mouse))) => mouse_scroll(&mut state, mouse.kind),
                    Some(Ok(event)) => {
                        let quit = event_to_action(event)
                            .is_some_and(|action| !state.handle_action(action, ws));
                        if quit {
                            break Ok(());
                        }
                    }
                    Some(Err(e)) => break Err(anyhow::anyhow!("Event error: {}", e)),
                    None => break Ok(()),
                }
            }

            _ = tick_interval.tick() => {}
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use std::sync::Arc;

    fn setup(name: &str) -> (TuiState, Workspace, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("reqdesk-ui-{}-{}", std::process::id(), name));
        let prefs = Prefs::load_from(dir.join("prefs.json"));
        let ws = Workspace::new(Arc::new(FakeBackend::default()), "proj-1");
        let mut state = TuiState::new(Theme::dark(), prefs);
        state.queue.clear();
        (state, ws, dir)
    }

    fn type_text(state: &mut TuiState, ws: &Workspace, text: &str) {
        for c in text.chars() {
            assert!(state.handle_action(Action::Char(c), ws));
        }
    }

    #[test]
    fn test_tab_accepts_suggestion() {
        let (mut state, ws, _) = setup("tab");
        type_text(&mut state, &ws, "/he");
        assert!(state.composer.autocomplete().is_visible());

        state.handle_action(Action::Tab, &ws);
        assert_eq!(state.input.content(), "/help ");
        assert!(!state.composer.autocomplete().is_visible());
        assert_eq!(state.panel_tab, PanelTab::NextActions);
    }

    #[test]
    fn test_submit_queues_send_and_locks_composer() {
        let (mut state, ws, _) = setup("submit");
        type_text(&mut state, &ws, "What are the risks?");
        state.handle_action(Action::Submit, &ws);

        assert_eq!(state.input.content(), "");
        assert!(state.composer.is_loading());
        assert!(matches!(
            state.queue.back(),
            Some(Task::Send(Dispatch::Remote(text))) if text == "What are the risks?"
        ));

        // a second submit while loading is ignored
        type_text(&mut state, &ws, "again");
        state.handle_action(Action::Submit, &ws);
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn test_back_tab_persists_panel() {
        let (mut state, ws, dir) = setup("backtab");
        state.handle_action(Action::BackTab, &ws);
        assert_eq!(state.panel_tab, PanelTab::Details);

        let reloaded = Prefs::load_from(dir.join("prefs.json"));
        assert_eq!(reloaded.get(PANEL_TAB_KEY), Some("details"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_remember_flow_uses_category_picker() {
        let (mut state, ws, _) = setup("remember");
        type_text(&mut state, &ws, "/remember");
        state.handle_action(Action::Submit, &ws);
        assert!(state.category_selector.visible);
        assert!(state.composer.flow().awaiting_category());

        state.handle_action(Action::Down, &ws);
        state.handle_action(Action::Submit, &ws);
        assert!(!state.category_selector.visible);
        assert_eq!(state.input_title().as_deref(), Some("What did you learn?"));

        type_text(&mut state, &ws, "Users skim");
        state.handle_action(Action::Submit, &ws);
        assert!(matches!(
            state.queue.back(),
            Some(Task::Send(Dispatch::Local(cmd))) if cmd == "/remember learning \"Users skim\""
        ));
    }

    #[test]
    fn test_escape_cancels_flow() {
        let (mut state, ws, _) = setup("escape");
        type_text(&mut state, &ws, "/new-task");
        state.handle_action(Action::Submit, &ws);
        assert!(state.composer.flow().is_active());

        state.handle_action(Action::Escape, &ws);
        assert!(!state.composer.flow().is_active());
        assert!(state.queue.is_empty());
    }

    #[test]
    fn test_manual_edit_commits() {
        let (mut state, ws, _) = setup("edit");
        state.handle_request(UiRequest::Edit(EditTarget::Vision), &ws);
        assert!(state.editor_selector.visible);

        // first choice edits manually
        state.handle_action(Action::Submit, &ws);
        assert!(state.editor_text_mode());

        type_text(&mut state, &ws, "Faster requirements");
        state.handle_action(Action::Submit, &ws);

        assert!(state.editor.is_none());
        assert!(matches!(
            state.queue.back(),
            Some(Task::Commit { target: EditTarget::Vision, value }) if value == "Faster requirements"
        ));
    }

    #[test]
    fn test_editor_gives_draft_back() {
        let (mut state, ws, _) = setup("stash");
        type_text(&mut state, &ws, "half a thought");
        state.handle_request(UiRequest::Edit(EditTarget::Vision), &ws);
        state.handle_action(Action::Submit, &ws);
        assert_eq!(state.input.content(), "");

        state.handle_action(Action::Escape, &ws);
        assert!(state.editor.is_none());
        assert_eq!(state.input.content(), "half a thought");
    }

    #[test]
    fn test_sent_outcome_drains_requests() {
        let (mut state, ws, _) = setup("outcome");
        state.composer.set_draft("/next");
        let Prepared::Dispatch(dispatch) = state.composer.prepare_submit(ws.ctx.engine.as_ref())
        else {
            panic!("expected a dispatch");
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = rt.block_on(ws.perform(Task::Send(dispatch)));

        state.sending = true;
        state.end_task();
        assert!(state.handle_outcome(outcome, &ws));
        assert!(!state.composer.is_loading());
        assert_eq!(state.next_actions.len(), 2);
        assert!(state.action_selector.visible);
        assert!(matches!(state.queue.back(), Some(Task::NextActions)));
    }

    #[test]
    fn test_card_apply_posts_follow_up_message() {
        let backend = Arc::new(FakeBackend::default());
        let (mut state, _, _) = setup("card");
        let ws = Workspace::new(backend.clone(), "proj-1");
        state.newest_card = Some("p1".to_string());

        assert!(state.handle_action(Action::ApplyProposal, &ws));
        let task = state.queue.pop_front().unwrap();
        assert!(matches!(
            &task,
            Task::CardAction { action: ProposalAction::Apply, proposal_id } if proposal_id == "p1"
        ));
        assert_eq!(state.input.content(), "");

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = rt.block_on(ws.perform(task));
        assert!(state.handle_outcome(outcome, &ws));

        let mut merger = MessageMerger::new();
        let user_messages: Vec<String> = ws
            .merged(&mut merger)
            .into_iter()
            .filter(|m| m.message.role == reqdesk_api::Role::User)
            .map(|m| m.message.content)
            .collect();
        assert_eq!(user_messages, vec!["Apply proposal p1".to_string()]);
        assert_eq!(backend.applied(), vec!["p1".to_string()]);
        assert_eq!(state.status, "Ready");
    }

    #[test]
    fn test_exit_request_quits() {
        let (mut state, ws, _) = setup("exit");
        assert!(!state.handle_request(UiRequest::Exit, &ws));
    }
}
