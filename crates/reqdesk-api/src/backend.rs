//! Backend capability seam

use async_trait::async_trait;

use crate::{
    Result,
    types::{
        Attachment, CreatedEntity, DataEntityDetail, DriverDetail, DriverField, DriverFinancials,
        DriverUpdate, MemoryCategory, Message, NextAction, StakeholderDetail, Suggestion,
        UploadedDocument,
    },
};

/// Everything the chat layer needs from the backend API.
///
/// [`crate::client::HttpBackend`] is the production implementation; tests
/// provide in-memory fakes.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Forward free text to the remote assistant and return its reply
    async fn send_chat_message(&self, project_id: &str, text: &str) -> Result<Message>;

    /// Upload one document
    async fn upload_document(
        &self,
        project_id: &str,
        attachment: &Attachment,
    ) -> Result<UploadedDocument>;

    /// Kick off background extraction for an uploaded document
    async fn process_document(&self, document_id: &str) -> Result<()>;

    async fn get_driver_detail(&self, project_id: &str, driver_id: &str) -> Result<DriverDetail>;

    async fn get_data_entity_detail(
        &self,
        project_id: &str,
        entity_id: &str,
    ) -> Result<DataEntityDetail>;

    async fn get_stakeholder(
        &self,
        project_id: &str,
        stakeholder_id: &str,
    ) -> Result<StakeholderDetail>;

    async fn update_business_driver(
        &self,
        project_id: &str,
        driver_id: &str,
        update: &DriverUpdate,
    ) -> Result<DriverDetail>;

    async fn update_driver_financials(
        &self,
        project_id: &str,
        driver_id: &str,
        financials: &DriverFinancials,
    ) -> Result<DriverDetail>;

    /// Ask the backend to rewrite one driver field, optionally guided by notes
    async fn enhance_driver_field(
        &self,
        project_id: &str,
        driver_id: &str,
        field: DriverField,
        notes: Option<&str>,
    ) -> Result<Suggestion>;

    /// Ask the backend to rewrite the project vision statement
    async fn enhance_vision(&self, project_id: &str, notes: Option<&str>) -> Result<Suggestion>;

    /// Ranked next-step suggestions for the project
    async fn get_next_actions(&self, project_id: &str) -> Result<Vec<NextAction>>;

    async fn apply_proposal(&self, proposal_id: &str) -> Result<()>;

    async fn discard_proposal(&self, proposal_id: &str) -> Result<()>;

    async fn create_task(&self, project_id: &str, title: &str) -> Result<CreatedEntity>;

    async fn create_stakeholder(&self, project_id: &str, name: &str) -> Result<CreatedEntity>;

    async fn remember(
        &self,
        project_id: &str,
        category: MemoryCategory,
        content: &str,
    ) -> Result<CreatedEntity>;
}
