//! In-memory backend for the binary's unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use reqdesk_api::{
    Attachment, Backend, CreatedEntity, DataEntityDetail, DriverDetail, DriverField,
    DriverFinancials, DriverUpdate, Error, MemoryCategory, Message, NextAction, Result,
    StakeholderDetail, Suggestion, UploadedDocument,
};

#[derive(Default)]
pub struct FakeBackend {
    /// Every create/remember/apply/discard call fails
    pub fail_writes: bool,
    /// Chat sends fail
    pub fail_chat: bool,
    pub applied: Mutex<Vec<String>>,
    pub remembered: Mutex<Vec<(MemoryCategory, String)>>,
    pub chats: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }

    pub fn remembered(&self) -> Vec<(MemoryCategory, String)> {
        self.remembered.lock().clone()
    }

    pub fn chats(&self) -> Vec<String> {
        self.chats.lock().clone()
    }

    fn write(&self) -> Result<()> {
        if self.fail_writes {
            return Err(Error::api(500, "database unavailable"));
        }
        Ok(())
    }
}

fn created(id: &str) -> CreatedEntity {
    CreatedEntity {
        id: id.to_string(),
        extra: serde_json::Map::new(),
    }
}

fn action(kind: &str, title: &str, priority: i32) -> NextAction {
    NextAction {
        action_type: kind.to_string(),
        title: title.to_string(),
        description: None,
        priority,
        target_entity_id: None,
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn send_chat_message(&self, _project_id: &str, text: &str) -> Result<Message> {
        self.chats.lock().push(text.to_string());
        if self.fail_chat {
            return Err(Error::api(502, "assistant offline"));
        }
        Ok(Message::assistant(format!("You said: {}", text)))
    }

    async fn upload_document(&self, _p: &str, attachment: &Attachment) -> Result<UploadedDocument> {
        Ok(UploadedDocument {
            id: format!("doc-{}", attachment.file_name),
            is_duplicate: false,
        })
    }

    async fn process_document(&self, _document_id: &str) -> Result<()> {
        Ok(())
    }

    async fn get_driver_detail(&self, _p: &str, id: &str) -> Result<DriverDetail> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn get_data_entity_detail(&self, _p: &str, id: &str) -> Result<DataEntityDetail> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn get_stakeholder(&self, _p: &str, id: &str) -> Result<StakeholderDetail> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn update_business_driver(
        &self,
        _p: &str,
        id: &str,
        _update: &DriverUpdate,
    ) -> Result<DriverDetail> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn update_driver_financials(
        &self,
        _p: &str,
        id: &str,
        _financials: &DriverFinancials,
    ) -> Result<DriverDetail> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn enhance_driver_field(
        &self,
        _p: &str,
        _id: &str,
        field: DriverField,
        _notes: Option<&str>,
    ) -> Result<Suggestion> {
        Ok(Suggestion {
            suggestion: format!("better {}", field.as_str()),
        })
    }

    async fn enhance_vision(&self, _p: &str, _notes: Option<&str>) -> Result<Suggestion> {
        Ok(Suggestion {
            suggestion: "better vision".to_string(),
        })
    }

    async fn get_next_actions(&self, _p: &str) -> Result<Vec<NextAction>> {
        Ok(vec![
            action("missing_vision", "Write a vision", 1),
            action("missing_stakeholder", "Add a stakeholder", 5),
        ])
    }

    async fn apply_proposal(&self, proposal_id: &str) -> Result<()> {
        self.write()?;
        self.applied.lock().push(proposal_id.to_string());
        Ok(())
    }

    async fn discard_proposal(&self, _proposal_id: &str) -> Result<()> {
        self.write()
    }

    async fn create_task(&self, _p: &str, _title: &str) -> Result<CreatedEntity> {
        self.write()?;
        Ok(created("task-1"))
    }

    async fn create_stakeholder(&self, _p: &str, _name: &str) -> Result<CreatedEntity> {
        self.write()?;
        Ok(created("stk-1"))
    }

    async fn remember(
        &self,
        _p: &str,
        category: MemoryCategory,
        content: &str,
    ) -> Result<CreatedEntity> {
        self.write()?;
        self.remembered.lock().push((category, content.to_string()));
        Ok(created("mem-1"))
    }
}
