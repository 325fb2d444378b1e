//! Local command engine backed by the workbench API

use async_trait::async_trait;
use parking_lot::Mutex;
use reqdesk_api::{Backend, Message, NextAction};
use reqdesk_chat::actions::ranked;
use reqdesk_chat::{
    AssistantEngine, CommandDefinition, ContextLog, EditTarget, EntityKind, Error, InFlight,
    ProposalAction, Result,
};
use std::sync::Arc;

use super::{CommandResult, definitions, parse_command};

/// Follow-ups only the host can perform
#[derive(Debug, Clone, PartialEq)]
pub enum UiRequest {
    Clear,
    Exit,
    OpenDetail(EntityKind, String),
    Edit(EditTarget),
    NextActions(Vec<NextAction>),
}

/// Executes slash commands and reports into its context log
pub struct LocalEngine {
    backend: Arc<dyn Backend>,
    project_id: String,
    context: ContextLog,
    in_flight: InFlight,
    definitions: Vec<CommandDefinition>,
    requests: Mutex<Vec<UiRequest>>,
}

impl LocalEngine {
    pub fn new(backend: Arc<dyn Backend>, project_id: impl Into<String>) -> Self {
        Self {
            backend,
            project_id: project_id.into(),
            context: ContextLog::new(),
            in_flight: InFlight::new(),
            definitions: definitions(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The engine's context messages
    pub fn context(&self) -> &ContextLog {
        &self.context
    }

    /// Proposal ids with an apply or discard outstanding
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Drain host follow-ups queued by executed commands
    pub fn take_requests(&self) -> Vec<UiRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    fn request(&self, request: UiRequest) {
        self.requests.lock().push(request);
    }

    fn reply(&self, text: impl Into<String>) {
        self.context.push(Message::assistant(text));
    }

    /// Apply, discard or view a proposal from its card. The transcript shows
    /// the action's follow-up message rather than a slash command.
    pub async fn act_on_proposal(&self, action: ProposalAction, id: &str) -> Result<()> {
        let text = action.follow_up_message(id);
        let command = match action {
            ProposalAction::Apply => CommandResult::Apply(id.to_string()),
            ProposalAction::Discard => CommandResult::Discard(id.to_string()),
            ProposalAction::ViewDetails => {
                return Err(Error::Command(format!("Not a local action: {}", text)));
            }
        };
        self.context.push(Message::user(text.as_str()));
        self.run_reported(&text, command).await
    }

    async fn run_reported(&self, text: &str, command: CommandResult) -> Result<()> {
        let result = self.run(command).await;
        if let Err(e) = &result {
            tracing::warn!("Command {:?} failed: {}", text, e);
            self.reply(format!("That didn't work: {}", e.user_message()));
        }
        result
    }

    async fn run(&self, command: CommandResult) -> Result<()> {
        let project = self.project_id.as_str();
        match command {
            CommandResult::Message(text) => self.reply(text),
            CommandResult::Clear => self.request(UiRequest::Clear),
            CommandResult::Exit => self.request(UiRequest::Exit),
            CommandResult::CreateTask(title) => {
                let created = self.backend.create_task(project, &title).await?;
                self.reply(format!("Created task \"{}\" ({}).", title, created.id));
            }
            CommandResult::CreateStakeholder(name) => {
                let created = self.backend.create_stakeholder(project, &name).await?;
                self.reply(format!("Added stakeholder {} ({}).", name, created.id));
            }
            CommandResult::Remember(category, text) => {
                self.backend.remember(project, category, &text).await?;
                self.reply(format!("Saved {}: {}", category.as_str(), text));
            }
            CommandResult::Apply(id) => {
                let Some(_guard) = self.in_flight.begin(id.as_str()) else {
                    return Err(Error::InFlight(id));
                };
                self.backend.apply_proposal(&id).await?;
                self.reply(format!("Applied proposal {}.", id));
            }
            CommandResult::Discard(id) => {
                let Some(_guard) = self.in_flight.begin(id.as_str()) else {
                    return Err(Error::InFlight(id));
                };
                self.backend.discard_proposal(&id).await?;
                self.reply(format!("Discarded proposal {}.", id));
            }
            CommandResult::OpenDetail(kind, id) => self.request(UiRequest::OpenDetail(kind, id)),
            CommandResult::Edit(target) => self.request(UiRequest::Edit(target)),
            CommandResult::NextActions => {
                let actions = ranked(self.backend.get_next_actions(project).await?);
                if actions.is_empty() {
                    self.reply("Nothing suggested right now.");
                }
                self.request(UiRequest::NextActions(actions));
            }
            CommandResult::Unknown(name) => {
                return Err(Error::Command(format!("Unknown command: /{}", name)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AssistantEngine for LocalEngine {
    fn is_command(&self, text: &str) -> bool {
        let Some(rest) = text.trim().strip_prefix('/') else {
            return false;
        };
        let name = rest.split_whitespace().next().unwrap_or("");
        self.definitions.iter().any(|d| d.matches_name(name))
    }

    fn command_suggestions(&self, partial: &str) -> Vec<CommandDefinition> {
        let partial = partial.trim().trim_start_matches('/').to_lowercase();
        let by_name = self
            .definitions
            .iter()
            .filter(|d| d.name.starts_with(&partial));
        let by_alias = self.definitions.iter().filter(|d| {
            !d.name.starts_with(&partial) && d.aliases.iter().any(|a| a.starts_with(&partial))
        });
        by_name.chain(by_alias).cloned().collect()
    }

    async fn execute(&self, text: &str) -> Result<()> {
        let Some(command) = parse_command(text) else {
            return Err(Error::Command(format!("Not a command: {}", text)));
        };
        tracing::debug!("Executing {:?}", command);
        self.context.push(Message::user(text.trim()));
        self.run_reported(text, command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use reqdesk_api::{MemoryCategory, Role};

    fn engine(backend: FakeBackend) -> (LocalEngine, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (LocalEngine::new(backend.clone(), "proj-1"), backend)
    }

    fn last_reply(engine: &LocalEngine) -> String {
        let messages = engine.context().snapshot();
        let last = messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        last.content.clone()
    }

    #[test]
    fn test_is_command() {
        let (engine, _) = engine(FakeBackend::default());
        assert!(engine.is_command("/help"));
        assert!(engine.is_command("/Apply p1"));
        assert!(engine.is_command("/new-task"));
        assert!(!engine.is_command("/deploy"));
        assert!(!engine.is_command("help"));
    }

    #[test]
    fn test_suggestions_rank_names_before_aliases() {
        let (engine, _) = engine(FakeBackend::default());
        let names: Vec<String> = engine
            .command_suggestions("/e")
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["entity", "enhance", "enhance-vision", "quit"]);
        assert_eq!(engine.command_suggestions("/").len(), definitions().len());
        assert!(engine.command_suggestions("/zzz").is_empty());
    }

    #[tokio::test]
    async fn test_remember_records_and_replies() {
        let (engine, backend) = engine(FakeBackend::default());
        engine
            .execute("/remember learning \"Client prefers mockups\"")
            .await
            .unwrap();
        assert_eq!(
            backend.remembered(),
            vec![(MemoryCategory::Learning, "Client prefers mockups".to_string())]
        );
        let messages = engine.context().snapshot();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(last_reply(&engine), "Saved learning: Client prefers mockups");
    }

    #[tokio::test]
    async fn test_apply_releases_in_flight() {
        let (engine, backend) = engine(FakeBackend::default());
        engine.execute("/apply prop-3").await.unwrap();
        assert_eq!(backend.applied(), vec!["prop-3".to_string()]);
        assert!(engine.in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_apply_rejected_while_in_flight() {
        let (engine, backend) = engine(FakeBackend::default());
        let _held = engine.in_flight().begin("prop-3").unwrap();
        let err = engine.execute("/apply prop-3").await.unwrap_err();
        assert!(matches!(err, Error::InFlight(_)));
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn test_card_apply_shows_follow_up_message() {
        let (engine, backend) = engine(FakeBackend::default());
        engine
            .act_on_proposal(ProposalAction::Apply, "prop-3")
            .await
            .unwrap();
        assert_eq!(backend.applied(), vec!["prop-3".to_string()]);
        assert!(engine.in_flight().is_empty());

        let messages = engine.context().snapshot();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Apply proposal prop-3");
        assert_eq!(last_reply(&engine), "Applied proposal prop-3.");
    }

    #[tokio::test]
    async fn test_card_apply_rejected_while_in_flight() {
        let (engine, backend) = engine(FakeBackend::default());
        let _held = engine.in_flight().begin("prop-3").unwrap();
        let err = engine
            .act_on_proposal(ProposalAction::Discard, "prop-3")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InFlight(_)));
        assert!(backend.applied().is_empty());
        assert!(last_reply(&engine).starts_with("That didn't work"));
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let (engine, _) = engine(FakeBackend {
            fail_writes: true,
            ..Default::default()
        });
        assert!(engine.execute("/create-task \"Write PRD\"").await.is_err());
        assert!(last_reply(&engine).starts_with("That didn't work"));
    }

    #[tokio::test]
    async fn test_host_requests() {
        let (engine, _) = engine(FakeBackend::default());
        engine.execute("/driver drv-1").await.unwrap();
        engine.execute("/clear").await.unwrap();
        assert_eq!(
            engine.take_requests(),
            vec![
                UiRequest::OpenDetail(EntityKind::Driver, "drv-1".to_string()),
                UiRequest::Clear,
            ]
        );
        assert!(engine.take_requests().is_empty());
    }

    #[tokio::test]
    async fn test_next_actions_ranked() {
        let (engine, _) = engine(FakeBackend::default());
        engine.execute("/next").await.unwrap();
        match engine.take_requests().as_slice() {
            [UiRequest::NextActions(actions)] => {
                let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
                assert_eq!(titles, vec!["Add a stakeholder", "Write a vision"]);
            }
            other => panic!("unexpected requests: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_help_is_local_only() {
        let (engine, backend) = engine(FakeBackend::default());
        engine.execute("/help").await.unwrap();
        assert!(last_reply(&engine).contains("Available commands"));
        assert!(backend.applied().is_empty());
    }
}
