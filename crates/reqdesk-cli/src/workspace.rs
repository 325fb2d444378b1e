//! One open project: backend, engine, conversation log, and the async work
//! the front ends hand off

use reqdesk_api::{Attachment, Backend, Message, NextAction};
use reqdesk_chat::actions::ranked;
use reqdesk_chat::field_editor::fetch_suggestion;
use reqdesk_chat::intake::ingest;
use reqdesk_chat::{
    AssistantContext, ContextLog, Dispatch, EditTarget, EditorEvent, IntakeReport, MergedMessage,
    MessageMerger, ProposalAction,
};
use std::sync::Arc;

use crate::commands::LocalEngine;
use crate::remote::RemoteChat;

/// Work that suspends on the network
#[derive(Debug, Clone)]
pub enum Task {
    /// A composer submission
    Send(Dispatch),
    /// A proposal-card shortcut; does not touch the composer
    CardAction {
        action: ProposalAction,
        proposal_id: String,
    },
    Suggest {
        target: EditTarget,
        notes: Option<String>,
    },
    Commit {
        target: EditTarget,
        value: String,
    },
    NextActions,
}

#[derive(Debug)]
pub enum Outcome {
    Sent(reqdesk_chat::Result<()>),
    CardAction(reqdesk_chat::Result<()>),
    Suggestion(EditorEvent),
    Committed(EditTarget, Result<(), String>),
    NextActions(Vec<NextAction>),
}

pub struct Workspace {
    pub backend: Arc<dyn Backend>,
    pub project_id: String,
    pub engine: Arc<LocalEngine>,
    /// Durable conversation with the remote assistant
    pub conversation: ContextLog,
    pub ctx: AssistantContext,
}

impl Workspace {
    pub fn new(backend: Arc<dyn Backend>, project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let engine = Arc::new(LocalEngine::new(backend.clone(), project_id.clone()));
        let conversation = ContextLog::new();
        let sender = Arc::new(RemoteChat::new(
            backend.clone(),
            project_id.clone(),
            conversation.clone(),
        ));
        let ctx = AssistantContext::new(engine.clone(), sender);
        Self {
            backend,
            project_id,
            engine,
            conversation,
            ctx,
        }
    }

    /// Conversation and engine messages as one ordered list
    pub fn merged(&self, merger: &mut MessageMerger) -> Vec<MergedMessage> {
        merger.merge(
            &self.conversation.snapshot(),
            &self.engine.context().snapshot(),
        )
    }

    /// Upload a batch of attachments; the summary lands in the engine context
    pub async fn attach(&self, files: Vec<Attachment>) -> IntakeReport {
        let report = ingest(self.backend.as_ref(), &self.project_id, files).await;
        self.engine.context().extend(report.messages.clone());
        report
    }

    pub async fn perform(&self, task: Task) -> Outcome {
        match task {
            Task::Send(dispatch) => Outcome::Sent(dispatch.run(&self.ctx).await),
            Task::CardAction {
                action,
                proposal_id,
            } => Outcome::CardAction(match action {
                ProposalAction::ViewDetails => {
                    Dispatch::Remote(action.follow_up_message(&proposal_id))
                        .run(&self.ctx)
                        .await
                }
                _ => self.engine.act_on_proposal(action, &proposal_id).await,
            }),
            Task::Suggest { target, notes } => Outcome::Suggestion(
                fetch_suggestion(
                    self.backend.as_ref(),
                    &self.project_id,
                    &target,
                    notes.as_deref(),
                )
                .await,
            ),
            Task::Commit { target, value } => {
                let result = self.commit(&target, &value).await;
                Outcome::Committed(target, result)
            }
            Task::NextActions => match self.backend.get_next_actions(&self.project_id).await {
                Ok(actions) => Outcome::NextActions(ranked(actions)),
                Err(e) => {
                    tracing::warn!("Failed to load next actions: {}", e);
                    Outcome::NextActions(Vec::new())
                }
            },
        }
    }

    async fn commit(&self, target: &EditTarget, value: &str) -> Result<(), String> {
        let context = self.engine.context();
        match (target, target.update_for(value)) {
            (EditTarget::Driver { driver_id, .. }, Some(update)) => {
                match self
                    .backend
                    .update_business_driver(&self.project_id, driver_id, &update)
                    .await
                {
                    Ok(_) => {
                        context.push(Message::assistant(format!(
                            "Updated {}: {}",
                            target.label(),
                            value
                        )));
                        Ok(())
                    }
                    Err(e) => {
                        tracing::error!("Driver update for {} failed: {}", driver_id, e);
                        Err(e.user_message())
                    }
                }
            }
            _ => {
                context.push(Message::assistant(format!("New vision: {}", value)));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use reqdesk_api::DriverField;

    fn workspace() -> Workspace {
        Workspace::new(Arc::new(FakeBackend::default()), "proj-1")
    }

    #[tokio::test]
    async fn test_send_merges_both_logs() {
        let ws = workspace();
        let mut merger = MessageMerger::new();
        ws.perform(Task::Send(Dispatch::Remote("hi".to_string()))).await;
        ws.perform(Task::Send(Dispatch::Local("/help".to_string()))).await;

        let merged = ws.merged(&mut merger);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[1].message.content, "You said: hi");
        assert!(merged[3].message.content.contains("Available commands"));
    }

    #[tokio::test]
    async fn test_view_details_asks_the_assistant() {
        let ws = workspace();
        let mut merger = MessageMerger::new();
        ws.perform(Task::CardAction {
            action: ProposalAction::ViewDetails,
            proposal_id: "p1".to_string(),
        })
        .await;

        let merged = ws.merged(&mut merger);
        assert_eq!(merged[0].message.content, "Show details for proposal p1");
        assert!(ws.engine.context().is_empty());
    }

    #[tokio::test]
    async fn test_suggest_and_commit() {
        let ws = workspace();
        let target = EditTarget::Driver {
            driver_id: "drv-1".to_string(),
            field: DriverField::Measurement,
        };
        match ws
            .perform(Task::Suggest {
                target: target.clone(),
                notes: None,
            })
            .await
        {
            Outcome::Suggestion(EditorEvent::SuggestionArrived(s)) => {
                assert_eq!(s, "better measurement")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // the fake has no drivers, so the update is rejected
        match ws
            .perform(Task::Commit {
                target,
                value: "Weekly active teams".to_string(),
            })
            .await
        {
            Outcome::Committed(_, Err(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_vision_commit_reports_locally() {
        let ws = workspace();
        ws.perform(Task::Commit {
            target: EditTarget::Vision,
            value: "Faster requirements".to_string(),
        })
        .await;
        let context = ws.engine.context().snapshot();
        assert_eq!(context[0].content, "New vision: Faster requirements");
    }

    #[tokio::test]
    async fn test_attach_reports_into_context() {
        let ws = workspace();
        let report = ws
            .attach(vec![Attachment::new("brief.pdf", "application/pdf", vec![1])])
            .await;
        assert_eq!(report.succeeded(), 1);
        assert!(!ws.engine.context().is_empty());
    }
}
