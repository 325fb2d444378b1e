//! Input-box controller: draft, loading flag, structured flow, autocomplete.
//!
//! Submission is split in two so a UI loop can keep handling input while a
//! dispatch is outstanding: [`Composer::prepare_submit`] does all synchronous
//! work and hands back at most one [`Dispatch`], which the caller runs and
//! then reports with [`Composer::finish`]. [`Composer::submit`] does all
//! three in one call.

use reqdesk_api::MemoryCategory;

use crate::context::{AssistantContext, AssistantEngine, CommandDefinition};
use crate::error::Result;
use crate::router::{Route, StructuredCommand, StructuredFlow, route};

/// Exactly one outbound call produced by a submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Run through the local engine
    Local(String),
    /// Forward to the remote assistant
    Remote(String),
}

impl Dispatch {
    pub fn text(&self) -> &str {
        match self {
            Dispatch::Local(t) | Dispatch::Remote(t) => t,
        }
    }

    /// Perform the call
    pub async fn run(&self, ctx: &AssistantContext) -> Result<()> {
        match self {
            Dispatch::Local(text) => ctx.engine.execute(text).await,
            Dispatch::Remote(text) => ctx.sender.send_message(text).await,
        }
    }
}

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Empty input, or a dispatch is already outstanding
    Ignored,
    /// Entered a structured flow
    FlowStarted(StructuredCommand),
    /// Moved a structured flow to its next step without sending anything
    FlowAdvanced,
    /// Something must be sent; call [`Composer::finish`] afterwards
    Dispatch(Dispatch),
}

/// Ranked slash-command suggestions for the current draft
#[derive(Debug, Clone, Default)]
pub struct Autocomplete {
    suggestions: Vec<CommandDefinition>,
}

impl Autocomplete {
    pub fn is_visible(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub fn suggestions(&self) -> &[CommandDefinition] {
        &self.suggestions
    }

    pub fn top(&self) -> Option<&CommandDefinition> {
        self.suggestions.first()
    }

    fn clear(&mut self) {
        self.suggestions.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    draft: String,
    is_loading: bool,
    flow: StructuredFlow,
    autocomplete: Autocomplete,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn flow(&self) -> StructuredFlow {
        self.flow
    }

    pub fn autocomplete(&self) -> &Autocomplete {
        &self.autocomplete
    }

    /// Whether the submit control should be enabled
    pub fn can_submit(&self) -> bool {
        !self.is_loading && !self.draft.trim().is_empty()
    }

    /// Re-query suggestions after the draft changed
    pub fn refresh_suggestions(&mut self, engine: &dyn AssistantEngine) {
        let draft = self.draft.trim_start();
        if self.flow.is_active() || !draft.starts_with('/') || draft.contains(char::is_whitespace)
        {
            self.autocomplete.clear();
            return;
        }
        self.autocomplete.suggestions = engine.command_suggestions(draft);
    }

    /// Replace the draft with the top suggestion plus a trailing space
    pub fn accept_suggestion(&mut self) -> bool {
        let Some(top) = self.autocomplete.top() else {
            return false;
        };
        self.draft = format!("{} ", top.slash_name());
        self.autocomplete.clear();
        true
    }

    /// Hide suggestions; the draft is left as typed
    pub fn dismiss_suggestions(&mut self) {
        self.autocomplete.clear();
    }

    /// Choose the `/remember` category
    pub fn choose_category(&mut self, category: MemoryCategory) -> bool {
        self.flow.choose_category(category)
    }

    pub fn cancel_flow(&mut self) {
        self.flow.cancel();
    }

    /// Validate and route the current draft without awaiting anything
    pub fn prepare_submit(&mut self, engine: &dyn AssistantEngine) -> Prepared {
        if self.is_loading {
            tracing::debug!("Submit ignored: a request is already in flight");
            return Prepared::Ignored;
        }
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return Prepared::Ignored;
        }

        if self.flow.is_active() {
            return self.advance_flow(&text);
        }

        match route(&text, engine) {
            Route::Ignore => Prepared::Ignored,
            Route::Structured(cmd) => {
                self.flow = StructuredFlow::start(cmd);
                self.draft.clear();
                self.autocomplete.clear();
                Prepared::FlowStarted(cmd)
            }
            Route::Local(text) => self.begin(Dispatch::Local(text)),
            Route::Remote(text) => self.begin(Dispatch::Remote(text)),
        }
    }

    fn advance_flow(&mut self, text: &str) -> Prepared {
        if self.flow.awaiting_category() {
            return match text.parse::<MemoryCategory>() {
                Ok(category) => {
                    self.flow.choose_category(category);
                    self.draft.clear();
                    Prepared::FlowAdvanced
                }
                Err(_) => Prepared::Ignored,
            };
        }
        match self.flow.submit(text) {
            Some(command) => self.begin(Dispatch::Local(command)),
            None => Prepared::Ignored,
        }
    }

    fn begin(&mut self, dispatch: Dispatch) -> Prepared {
        self.draft.clear();
        self.autocomplete.clear();
        self.is_loading = true;
        Prepared::Dispatch(dispatch)
    }

    /// Re-enable the composer after a dispatch settled, successfully or not
    pub fn finish(&mut self) {
        self.is_loading = false;
    }

    /// Prepare, run and finish in one go
    pub async fn submit(&mut self, ctx: &AssistantContext) -> Result<Prepared> {
        let prepared = self.prepare_submit(ctx.engine.as_ref());
        if let Prepared::Dispatch(dispatch) = &prepared {
            let outcome = dispatch.run(ctx).await;
            self.finish();
            if let Err(e) = outcome {
                tracing::error!("Dispatch of {:?} failed: {}", dispatch.text(), e);
                return Err(e);
            }
        }
        Ok(prepared)
    }
}
