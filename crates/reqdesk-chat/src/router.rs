//! Classify composer input and drive the structured-prompt flows

use regex::Regex;
use reqdesk_api::MemoryCategory;
use std::sync::LazyLock;

use crate::context::AssistantEngine;

/// Commands that collect structured input before anything is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuredCommand {
    CreateTask,
    CreateStakeholder,
    Remember,
}

/// Whole-input patterns, case-insensitive. Aliases share one entry.
static STRUCTURED_PATTERNS: LazyLock<Vec<(Regex, StructuredCommand)>> = LazyLock::new(|| {
    [
        (r"(?i)^/(?:create|add|new)-task$", StructuredCommand::CreateTask),
        (
            r"(?i)^/(?:create|add|new)-stakeholder$",
            StructuredCommand::CreateStakeholder,
        ),
        (r"(?i)^/remember$", StructuredCommand::Remember),
    ]
    .into_iter()
    .filter_map(|(p, cmd)| Regex::new(p).ok().map(|re| (re, cmd)))
    .collect()
});

/// Match the entire trimmed input against the structured-prompt patterns
pub fn structured_command(input: &str) -> Option<StructuredCommand> {
    let input = input.trim();
    STRUCTURED_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(input))
        .map(|(_, cmd)| *cmd)
}

/// Where a submitted input goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Empty or whitespace-only input
    Ignore,
    /// Enter a structured-prompt flow; nothing is sent
    Structured(StructuredCommand),
    /// Slash command executed by the local engine
    Local(String),
    /// Free text forwarded to the remote assistant
    Remote(String),
}

/// Decide the path for one input
pub fn route(input: &str, engine: &dyn AssistantEngine) -> Route {
    let text = input.trim();
    if text.is_empty() {
        return Route::Ignore;
    }
    if let Some(cmd) = structured_command(text) {
        tracing::debug!("Routing {:?} to structured flow {:?}", text, cmd);
        return Route::Structured(cmd);
    }
    if text.starts_with('/') && engine.is_command(text) {
        tracing::debug!("Routing {:?} to local engine", text);
        return Route::Local(text.to_string());
    }
    Route::Remote(text.to_string())
}

/// Step within the `/remember` flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RememberStep {
    /// Waiting for decision / learning / question
    ChooseCategory,
    /// Waiting for the memory text
    Content(MemoryCategory),
}

/// Inline multi-step prompt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuredFlow {
    #[default]
    Inactive,
    CreateTask,
    CreateStakeholder,
    Remember(RememberStep),
}

impl StructuredFlow {
    pub fn start(command: StructuredCommand) -> Self {
        match command {
            StructuredCommand::CreateTask => StructuredFlow::CreateTask,
            StructuredCommand::CreateStakeholder => StructuredFlow::CreateStakeholder,
            StructuredCommand::Remember => StructuredFlow::Remember(RememberStep::ChooseCategory),
        }
    }

    pub fn is_active(&self) -> bool {
        *self != StructuredFlow::Inactive
    }

    /// Prompt text for the current step
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            StructuredFlow::Inactive => None,
            StructuredFlow::CreateTask => Some("Task title"),
            StructuredFlow::CreateStakeholder => Some("Stakeholder name"),
            StructuredFlow::Remember(RememberStep::ChooseCategory) => {
                Some("What kind of memory? decision / learning / question")
            }
            StructuredFlow::Remember(RememberStep::Content(MemoryCategory::Decision)) => {
                Some("Describe the decision")
            }
            StructuredFlow::Remember(RememberStep::Content(MemoryCategory::Learning)) => {
                Some("What did you learn?")
            }
            StructuredFlow::Remember(RememberStep::Content(MemoryCategory::Question)) => {
                Some("What is the open question?")
            }
        }
    }

    /// Whether the flow is waiting for a memory category
    pub fn awaiting_category(&self) -> bool {
        *self == StructuredFlow::Remember(RememberStep::ChooseCategory)
    }

    /// Pick the memory category. Returns false outside the category step.
    pub fn choose_category(&mut self, category: MemoryCategory) -> bool {
        if !self.awaiting_category() {
            return false;
        }
        *self = StructuredFlow::Remember(RememberStep::Content(category));
        true
    }

    /// Supply the collected text. On success returns the assembled command
    /// and resets the flow; empty text or a flow still choosing its
    /// category returns `None` and leaves the flow unchanged.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let command = match self {
            StructuredFlow::Inactive | StructuredFlow::Remember(RememberStep::ChooseCategory) => {
                return None;
            }
            StructuredFlow::CreateTask => format!("/create-task {}", quote(text)),
            StructuredFlow::CreateStakeholder => format!("/create-stakeholder {}", quote(text)),
            StructuredFlow::Remember(RememberStep::Content(category)) => {
                format!("/remember {} {}", category.as_str(), quote(text))
            }
        };
        *self = StructuredFlow::Inactive;
        Some(command)
    }

    pub fn cancel(&mut self) {
        *self = StructuredFlow::Inactive;
    }
}

/// Wrap in double quotes, escaping backslashes and quotes
pub fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Inverse of [`quote`] for a single leading argument. Returns the unquoted
/// text and the remainder, or the first whitespace-separated word when the
/// input is not quoted.
pub fn split_quoted(input: &str) -> (String, &str) {
    let input = input.trim_start();
    let Some(rest) = input.strip_prefix('"') else {
        return match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word.to_string(), rest.trim_start()),
            None => (input.to_string(), ""),
        };
    };

    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' => return (out, rest[i + 1..].trim_start()),
            other => out.push(other),
        }
    }
    (out, "")
}
