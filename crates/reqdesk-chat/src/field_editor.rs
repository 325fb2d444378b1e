//! Inline editor for a single business-driver field or the project vision.
//!
//! The state machine is a pure function over [`EditorState`] and
//! [`EditorEvent`]; side effects come back as an [`Effect`] for the caller to
//! perform. [`fetch_suggestion`] is the async half that talks to the backend
//! and turns the outcome into the event to feed back in.

use reqdesk_api::{Backend, DriverField, DriverUpdate};

use crate::error::Result;

/// What is being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Driver { driver_id: String, field: DriverField },
    Vision,
}

impl EditTarget {
    pub fn label(&self) -> String {
        match self {
            EditTarget::Driver { field, .. } => field.as_str().replace('_', " "),
            EditTarget::Vision => "vision".to_string(),
        }
    }

    /// The update to send when a value is committed; the vision has no
    /// direct update call
    pub fn update_for(&self, value: &str) -> Option<DriverUpdate> {
        match self {
            EditTarget::Driver { field, .. } => Some(DriverUpdate::field(*field, value)),
            EditTarget::Vision => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    /// Choosing between manual edit and AI assistance
    Menu,
    Manual { draft: String },
    /// Collecting guidance for the AI rewrite
    AiNotes { notes: String },
    AiLoading { notes: Option<String> },
    /// Suggestion shown for review; the text stays editable
    AiSuggestion { suggestion: String },
}

impl EditorState {
    pub fn is_idle(&self) -> bool {
        *self == EditorState::Idle
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, EditorState::AiLoading { .. })
    }

    /// Text currently under edit, if the state has any
    pub fn text(&self) -> Option<&str> {
        match self {
            EditorState::Manual { draft } => Some(draft),
            EditorState::AiNotes { notes } => Some(notes),
            EditorState::AiSuggestion { suggestion } => Some(suggestion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    OpenMenu,
    /// Start a manual edit seeded with the current value
    ChooseManual { current: String },
    /// AI rewrite without notes; goes straight to loading
    ChooseAiRewrite,
    ChooseAiWithNotes,
    EditText(String),
    /// Save the manual draft, or send the notes
    Request,
    SuggestionArrived(String),
    RequestFailed(String),
    Accept,
    Cancel,
}

/// Work the caller must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchSuggestion { notes: Option<String> },
    Commit(String),
    ShowError(String),
}

/// Apply one event. Events that make no sense in the current state leave it
/// unchanged and produce no effect.
pub fn transition(state: &EditorState, event: EditorEvent) -> (EditorState, Option<Effect>) {
    use EditorEvent as Ev;
    use EditorState as St;

    match (state, event) {
        (_, Ev::Cancel) => (St::Idle, None),

        (St::Idle, Ev::OpenMenu) => (St::Menu, None),

        (St::Menu, Ev::ChooseManual { current }) => (St::Manual { draft: current }, None),
        (St::Menu, Ev::ChooseAiRewrite) => (
            St::AiLoading { notes: None },
            Some(Effect::FetchSuggestion { notes: None }),
        ),
        (St::Menu, Ev::ChooseAiWithNotes) => (
            St::AiNotes {
                notes: String::new(),
            },
            None,
        ),

        (St::Manual { .. }, Ev::EditText(draft)) => (St::Manual { draft }, None),
        (St::Manual { draft }, Ev::Request) => {
            let value = draft.trim();
            if value.is_empty() {
                (state.clone(), None)
            } else {
                (St::Idle, Some(Effect::Commit(value.to_string())))
            }
        }

        (St::AiNotes { .. }, Ev::EditText(notes)) => (St::AiNotes { notes }, None),
        (St::AiNotes { notes }, Ev::Request) => {
            let notes = Some(notes.trim())
                .filter(|n| !n.is_empty())
                .map(String::from);
            (
                St::AiLoading {
                    notes: notes.clone(),
                },
                Some(Effect::FetchSuggestion { notes }),
            )
        }

        (St::AiLoading { .. }, Ev::SuggestionArrived(suggestion)) => {
            (St::AiSuggestion { suggestion }, None)
        }
        (St::AiLoading { .. }, Ev::RequestFailed(error)) => {
            (St::Idle, Some(Effect::ShowError(error)))
        }

        (St::AiSuggestion { .. }, Ev::EditText(suggestion)) => {
            (St::AiSuggestion { suggestion }, None)
        }
        (St::AiSuggestion { suggestion }, Ev::Accept) => {
            (St::Idle, Some(Effect::Commit(suggestion.trim().to_string())))
        }

        (state, _) => (state.clone(), None),
    }
}

/// Stateful wrapper bound to one target
#[derive(Debug, Clone)]
pub struct FieldEditor {
    target: EditTarget,
    state: EditorState,
    last_error: Option<String>,
}

impl FieldEditor {
    pub fn new(target: EditTarget) -> Self {
        Self {
            target,
            state: EditorState::Idle,
            last_error: None,
        }
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn handle(&mut self, event: EditorEvent) -> Option<Effect> {
        let (next, effect) = transition(&self.state, event);
        if next != self.state {
            tracing::debug!("Field editor {:?}: {:?} -> {:?}", self.target, self.state, next);
        }
        self.state = next;
        match &effect {
            Some(Effect::ShowError(e)) => self.last_error = Some(e.clone()),
            Some(_) => self.last_error = None,
            None => {}
        }
        effect
    }

    /// Feed an event and, if it asks for a suggestion, await it inline.
    /// Returns the value to commit, if the event produced one.
    pub async fn drive(
        &mut self,
        event: EditorEvent,
        backend: &dyn Backend,
        project_id: &str,
    ) -> Option<String> {
        let mut effect = self.handle(event);
        loop {
            match effect {
                Some(Effect::FetchSuggestion { notes }) => {
                    let reply =
                        fetch_suggestion(backend, project_id, &self.target, notes.as_deref())
                            .await;
                    effect = self.handle(reply);
                }
                Some(Effect::Commit(value)) => return Some(value),
                Some(Effect::ShowError(_)) | None => return None,
            }
        }
    }
}

/// Call the enhancement endpoint for `target` and map the outcome to an event
pub async fn fetch_suggestion(
    backend: &dyn Backend,
    project_id: &str,
    target: &EditTarget,
    notes: Option<&str>,
) -> EditorEvent {
    match request(backend, project_id, target, notes).await {
        Ok(suggestion) => EditorEvent::SuggestionArrived(suggestion),
        Err(e) => {
            tracing::warn!("Enhancement for {} failed: {}", target.label(), e);
            EditorEvent::RequestFailed(e.user_message())
        }
    }
}

async fn request(
    backend: &dyn Backend,
    project_id: &str,
    target: &EditTarget,
    notes: Option<&str>,
) -> Result<String> {
    let suggestion = match target {
        EditTarget::Driver { driver_id, field } => {
            backend
                .enhance_driver_field(project_id, driver_id, *field, notes)
                .await?
        }
        EditTarget::Vision => backend.enhance_vision(project_id, notes).await?,
    };
    Ok(suggestion.suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn driver_target() -> EditTarget {
        EditTarget::Driver {
            driver_id: "d1".to_string(),
            field: DriverField::Measurement,
        }
    }

    #[test]
    fn test_manual_path() {
        let mut editor = FieldEditor::new(driver_target());
        assert_eq!(editor.handle(EditorEvent::OpenMenu), None);
        editor.handle(EditorEvent::ChooseManual {
            current: "Old".to_string(),
        });
        assert_eq!(editor.state().text(), Some("Old"));
        editor.handle(EditorEvent::EditText("  New value ".to_string()));
        assert_eq!(
            editor.handle(EditorEvent::Request),
            Some(Effect::Commit("New value".to_string()))
        );
        assert!(editor.state().is_idle());
    }

    #[test]
    fn test_empty_manual_draft_not_committed() {
        let state = EditorState::Manual {
            draft: "   ".to_string(),
        };
        assert_eq!(transition(&state, EditorEvent::Request), (state.clone(), None));
    }

    #[test]
    fn test_ai_rewrite_goes_straight_to_loading() {
        let (state, effect) = transition(&EditorState::Menu, EditorEvent::ChooseAiRewrite);
        assert!(state.is_loading());
        assert_eq!(effect, Some(Effect::FetchSuggestion { notes: None }));
    }

    #[test]
    fn test_notes_path_and_blank_notes() {
        let (state, _) = transition(&EditorState::Menu, EditorEvent::ChooseAiWithNotes);
        let (state, _) = transition(&state, EditorEvent::EditText("focus on cost".to_string()));
        let (_, effect) = transition(&state, EditorEvent::Request);
        assert_eq!(
            effect,
            Some(Effect::FetchSuggestion {
                notes: Some("focus on cost".to_string())
            })
        );

        let blank = EditorState::AiNotes {
            notes: "  ".to_string(),
        };
        let (_, effect) = transition(&blank, EditorEvent::Request);
        assert_eq!(effect, Some(Effect::FetchSuggestion { notes: None }));
    }

    #[test]
    fn test_invalid_events_leave_state() {
        for event in [
            EditorEvent::Accept,
            EditorEvent::Request,
            EditorEvent::SuggestionArrived("late".to_string()),
            EditorEvent::ChooseAiRewrite,
        ] {
            assert_eq!(transition(&EditorState::Idle, event), (EditorState::Idle, None));
        }
        let loading = EditorState::AiLoading { notes: None };
        assert_eq!(
            transition(&loading, EditorEvent::Accept),
            (loading.clone(), None)
        );
    }

    #[test]
    fn test_cancel_discards_late_suggestion() {
        let mut editor = FieldEditor::new(EditTarget::Vision);
        editor.handle(EditorEvent::OpenMenu);
        editor.handle(EditorEvent::ChooseAiRewrite);
        editor.handle(EditorEvent::Cancel);
        assert_eq!(
            editor.handle(EditorEvent::SuggestionArrived("too late".to_string())),
            None
        );
        assert!(editor.state().is_idle());
    }

    #[test]
    fn test_failure_returns_to_idle_with_error() {
        let mut editor = FieldEditor::new(driver_target());
        editor.handle(EditorEvent::OpenMenu);
        editor.handle(EditorEvent::ChooseAiRewrite);
        let effect = editor.handle(EditorEvent::RequestFailed("model busy".to_string()));
        assert_eq!(effect, Some(Effect::ShowError("model busy".to_string())));
        assert!(editor.state().is_idle());
        assert_eq!(editor.last_error(), Some("model busy"));
    }

    #[tokio::test]
    async fn test_drive_with_backend() {
        let backend = FakeBackend {
            suggestion: Some("Reduce churn to 2%".to_string()),
            ..Default::default()
        };
        let mut editor = FieldEditor::new(driver_target());
        editor.handle(EditorEvent::OpenMenu);
        editor.handle(EditorEvent::ChooseAiWithNotes);
        editor.handle(EditorEvent::EditText("quarterly".to_string()));

        let committed = editor.drive(EditorEvent::Request, &backend, "p1").await;
        assert_eq!(committed, None);
        assert_eq!(
            editor.state().text(),
            Some("Reduce churn to 2% [measurement|quarterly]")
        );

        let committed = editor.drive(EditorEvent::Accept, &backend, "p1").await;
        assert_eq!(
            committed.as_deref(),
            Some("Reduce churn to 2% [measurement|quarterly]")
        );
        let update = editor.target().update_for(committed.as_deref().unwrap());
        assert!(update.is_some());
    }

    #[tokio::test]
    async fn test_drive_failure() {
        let backend = FakeBackend::default();
        let mut editor = FieldEditor::new(EditTarget::Vision);
        editor.handle(EditorEvent::OpenMenu);
        let committed = editor
            .drive(EditorEvent::ChooseAiRewrite, &backend, "p1")
            .await;
        assert_eq!(committed, None);
        assert!(editor.state().is_idle());
        assert_eq!(editor.last_error(), Some("model busy"));
        assert_eq!(EditTarget::Vision.update_for("x"), None);
    }
}
