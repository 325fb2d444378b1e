//! Free-text path to the remote assistant

use async_trait::async_trait;
use reqdesk_api::{Backend, Message};
use reqdesk_chat::{ContextLog, MessageSender, Result};
use std::sync::Arc;

/// Sends chat text to the backend and records both turns in the durable
/// conversation log
pub struct RemoteChat {
    backend: Arc<dyn Backend>,
    project_id: String,
    conversation: ContextLog,
}

impl RemoteChat {
    pub fn new(
        backend: Arc<dyn Backend>,
        project_id: impl Into<String>,
        conversation: ContextLog,
    ) -> Self {
        Self {
            backend,
            project_id: project_id.into(),
            conversation,
        }
    }
}

#[async_trait]
impl MessageSender for RemoteChat {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.conversation.push(Message::user(text));

        // streaming placeholder until the reply lands
        let mut pending = Message::assistant("");
        pending.is_streaming = true;
        let pending_id = pending.id.clone().unwrap_or_default();
        self.conversation.push(pending);

        match self.backend.send_chat_message(&self.project_id, text).await {
            Ok(mut reply) => {
                reply.finish_streaming();
                self.conversation.update(&pending_id, |m| *m = reply);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Chat send failed: {}", e);
                let notice = format!("Message not delivered: {}", e.user_message());
                self.conversation.update(&pending_id, |m| {
                    m.content = notice;
                    m.finish_streaming();
                });
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use reqdesk_api::Role;

    #[tokio::test]
    async fn test_reply_replaces_placeholder() {
        let backend = Arc::new(FakeBackend::default());
        let log = ContextLog::new();
        let chat = RemoteChat::new(backend.clone(), "proj-1", log.clone());

        chat.send_message("What are the top risks?").await.unwrap();

        let messages = log.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "You said: What are the top risks?");
        assert!(!messages[1].is_streaming);
        assert_eq!(backend.chats(), vec!["What are the top risks?".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_leaves_notice() {
        let backend = Arc::new(FakeBackend {
            fail_chat: true,
            ..Default::default()
        });
        let log = ContextLog::new();
        let chat = RemoteChat::new(backend, "proj-1", log.clone());

        assert!(chat.send_message("hello").await.is_err());
        let messages = log.snapshot();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.starts_with("Message not delivered"));
        assert!(!messages[1].is_streaming);
    }
}
