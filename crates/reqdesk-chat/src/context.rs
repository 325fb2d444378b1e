//! The assistant context injected into chat components.
//!
//! Components never reach for a global engine. They receive an
//! [`AssistantContext`] holding the capabilities they may call.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqdesk_api::Message;
use std::sync::Arc;

use crate::error::Result;

/// A slash command known to the local engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Name without the leading slash, e.g. `create-task`
    pub name: String,
    /// Alternative names without the leading slash
    pub aliases: Vec<String>,
    /// One-line description for suggestion popups
    pub description: String,
    /// Usage hint shown after the name, e.g. `<proposal-id>`
    pub usage: Option<String>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: vec![],
            description: description.into(),
            usage: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// `/name`
    pub fn slash_name(&self) -> String {
        format!("/{}", self.name)
    }

    /// Whether `name` (without slash, any case) names this command
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// The local command engine: recognizes and executes slash commands.
///
/// Results are reported by appending to the engine's [`ContextLog`].
#[async_trait]
pub trait AssistantEngine: Send + Sync {
    /// Whether `text` starts with a command this engine knows
    fn is_command(&self, text: &str) -> bool;

    /// Ranked suggestions for a partial command such as `/cre`
    fn command_suggestions(&self, partial: &str) -> Vec<CommandDefinition>;

    /// Execute a command string
    async fn execute(&self, text: &str) -> Result<()>;
}

/// Forwards free text to the remote assistant
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Capabilities shared by every chat component of one workspace
#[derive(Clone)]
pub struct AssistantContext {
    pub engine: Arc<dyn AssistantEngine>,
    pub sender: Arc<dyn MessageSender>,
}

impl AssistantContext {
    pub fn new(engine: Arc<dyn AssistantEngine>, sender: Arc<dyn MessageSender>) -> Self {
        Self { engine, sender }
    }
}

/// A cloneable handle to an append-only message list.
///
/// Used both for the engine's context messages and for a host's durable
/// conversation log. All clones share one list.
#[derive(Clone, Default)]
pub struct ContextLog {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl ContextLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&self, message: Message) {
        self.messages.lock().push(message);
    }

    /// Append several messages in order
    pub fn extend(&self, messages: impl IntoIterator<Item = Message>) {
        self.messages.lock().extend(messages);
    }

    /// Copy of the current messages
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Apply an in-place update (streaming flip, tool status) to the message with `id`.
    /// Returns false if no message has that id.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let mut messages = self.messages.lock();
        match messages.iter_mut().find(|m| m.id.as_deref() == Some(id)) {
            Some(message) => {
                f(message);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqdesk_api::ToolCall;

    #[test]
    fn test_command_definition_matches_aliases() {
        let def = CommandDefinition::new("create-task", "Create a task")
            .with_aliases(&["add-task", "new-task"]);
        assert!(def.matches_name("create-task"));
        assert!(def.matches_name("NEW-TASK"));
        assert!(!def.matches_name("task"));
        assert_eq!(def.slash_name(), "/create-task");
    }

    #[test]
    fn test_context_log_shared_between_clones() {
        let log = ContextLog::new();
        let clone = log.clone();
        clone.push(Message::assistant("hello"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.snapshot()[0].content, "hello");
    }

    #[test]
    fn test_context_log_update_by_id() {
        let log = ContextLog::new();
        let msg = Message::assistant("").with_tool_calls(vec![ToolCall::running("search").with_id("t1")]);
        let id = msg.id.clone().unwrap();
        log.push(msg);

        let updated = log.update(&id, |m| {
            m.tool_call_mut("t1")
                .unwrap()
                .complete(serde_json::json!({}))
                .unwrap();
        });
        assert!(updated);
        assert!(!log.snapshot()[0].is_busy());
        assert!(!log.update("missing", |_| {}));
    }
}
