//! In-memory fakes shared by the unit tests of this crate

use async_trait::async_trait;
use parking_lot::Mutex;
use reqdesk_api::{
    Attachment, Backend, CreatedEntity, DataEntityDetail, DriverDetail, DriverField,
    DriverFinancials, DriverUpdate, MemoryCategory, Message, NextAction, StakeholderDetail,
    Suggestion, UploadedDocument,
};
use std::collections::HashSet;

use crate::context::{AssistantEngine, CommandDefinition, MessageSender};
use crate::error::{Error, Result};

/// Engine that knows a fixed set of commands and records executions
#[derive(Default)]
pub struct FakeEngine {
    pub commands: Vec<CommandDefinition>,
    pub executed: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeEngine {
    pub fn with_commands(names: &[&str]) -> Self {
        Self {
            commands: names
                .iter()
                .map(|n| CommandDefinition::new(*n, format!("{} command", n)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl AssistantEngine for FakeEngine {
    fn is_command(&self, text: &str) -> bool {
        let Some(rest) = text.trim().strip_prefix('/') else {
            return false;
        };
        let name = rest.split_whitespace().next().unwrap_or("");
        self.commands.iter().any(|c| c.matches_name(name))
    }

    fn command_suggestions(&self, partial: &str) -> Vec<CommandDefinition> {
        let partial = partial.trim_start_matches('/').to_lowercase();
        self.commands
            .iter()
            .filter(|c| c.name.starts_with(&partial))
            .cloned()
            .collect()
    }

    async fn execute(&self, text: &str) -> Result<()> {
        self.executed.lock().push(text.to_string());
        if self.fail {
            return Err(Error::Command("engine unavailable".to_string()));
        }
        Ok(())
    }
}

/// Sender that records forwarded text
#[derive(Default)]
pub struct FakeSender {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeSender {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.sent.lock().push(text.to_string());
        if self.fail {
            return Err(Error::Other("network down".to_string()));
        }
        Ok(())
    }
}

/// Backend whose uploads, processing triggers and enhancements are scripted
#[derive(Default)]
pub struct FakeBackend {
    pub uploads: Mutex<Vec<String>>,
    pub processed: Mutex<Vec<String>>,
    pub failing_uploads: HashSet<String>,
    pub duplicate_uploads: HashSet<String>,
    pub fail_processing: bool,
    pub suggestion: Option<String>,
    pub applied: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().clone()
    }
}

fn unsupported<T>(what: &str) -> reqdesk_api::Result<T> {
    Err(reqdesk_api::Error::NotFound(what.to_string()))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn send_chat_message(&self, _project_id: &str, text: &str) -> reqdesk_api::Result<Message> {
        Ok(Message::assistant(format!("echo: {}", text)))
    }

    async fn upload_document(
        &self,
        _project_id: &str,
        attachment: &Attachment,
    ) -> reqdesk_api::Result<UploadedDocument> {
        self.uploads.lock().push(attachment.file_name.clone());
        if self.failing_uploads.contains(&attachment.file_name) {
            return Err(reqdesk_api::Error::api(413, "file too large"));
        }
        Ok(UploadedDocument {
            id: format!("doc-{}", attachment.file_name),
            is_duplicate: self.duplicate_uploads.contains(&attachment.file_name),
        })
    }

    async fn process_document(&self, document_id: &str) -> reqdesk_api::Result<()> {
        self.processed.lock().push(document_id.to_string());
        if self.fail_processing {
            return Err(reqdesk_api::Error::api(500, "queue full"));
        }
        Ok(())
    }

    async fn get_driver_detail(&self, _p: &str, id: &str) -> reqdesk_api::Result<DriverDetail> {
        unsupported(id)
    }

    async fn get_data_entity_detail(
        &self,
        _p: &str,
        id: &str,
    ) -> reqdesk_api::Result<DataEntityDetail> {
        unsupported(id)
    }

    async fn get_stakeholder(&self, _p: &str, id: &str) -> reqdesk_api::Result<StakeholderDetail> {
        unsupported(id)
    }

    async fn update_business_driver(
        &self,
        _p: &str,
        id: &str,
        _update: &DriverUpdate,
    ) -> reqdesk_api::Result<DriverDetail> {
        unsupported(id)
    }

    async fn update_driver_financials(
        &self,
        _p: &str,
        id: &str,
        _financials: &DriverFinancials,
    ) -> reqdesk_api::Result<DriverDetail> {
        unsupported(id)
    }

    async fn enhance_driver_field(
        &self,
        _p: &str,
        _id: &str,
        field: DriverField,
        notes: Option<&str>,
    ) -> reqdesk_api::Result<Suggestion> {
        match &self.suggestion {
            Some(s) => Ok(Suggestion {
                suggestion: format!("{} [{}|{}]", s, field.as_str(), notes.unwrap_or("-")),
            }),
            None => Err(reqdesk_api::Error::api(503, "model busy")),
        }
    }

    async fn enhance_vision(&self, _p: &str, notes: Option<&str>) -> reqdesk_api::Result<Suggestion> {
        match &self.suggestion {
            Some(s) => Ok(Suggestion {
                suggestion: format!("{} [vision|{}]", s, notes.unwrap_or("-")),
            }),
            None => Err(reqdesk_api::Error::api(503, "model busy")),
        }
    }

    async fn get_next_actions(&self, _p: &str) -> reqdesk_api::Result<Vec<NextAction>> {
        Ok(vec![])
    }

    async fn apply_proposal(&self, proposal_id: &str) -> reqdesk_api::Result<()> {
        self.applied.lock().push(proposal_id.to_string());
        Ok(())
    }

    async fn discard_proposal(&self, proposal_id: &str) -> reqdesk_api::Result<()> {
        unsupported(proposal_id)
    }

    async fn create_task(&self, _p: &str, title: &str) -> reqdesk_api::Result<CreatedEntity> {
        unsupported(title)
    }

    async fn create_stakeholder(&self, _p: &str, name: &str) -> reqdesk_api::Result<CreatedEntity> {
        unsupported(name)
    }

    async fn remember(
        &self,
        _p: &str,
        _category: MemoryCategory,
        content: &str,
    ) -> reqdesk_api::Result<CreatedEntity> {
        unsupported(content)
    }
}
