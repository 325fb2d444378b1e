//! reqwest-backed implementation of [`Backend`]

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, multipart};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;

use crate::{
    backend::Backend,
    error::{Error, Result},
    types::{
        Attachment, CreatedEntity, DataEntityDetail, DriverDetail, DriverField, DriverFinancials,
        DriverUpdate, MemoryCategory, Message, NextAction, NextActionsResponse, StakeholderDetail,
        Suggestion, UploadedDocument,
    },
};

/// Environment variable consulted when no token is configured
pub const API_TOKEN_ENV: &str = "REQDESK_API_TOKEN";

/// HTTP client for the workbench API
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a client for `base_url` with an optional bearer token
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(60))
    }

    /// Create a client with a per-request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("base URL is empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Create from environment: token from `REQDESK_API_TOKEN`
    pub fn from_env(base_url: impl Into<String>) -> Result<Self> {
        Self::new(base_url, std::env::var(API_TOKEN_ENV).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Request failed with {}: {}", status, body);
            return Err(Error::from_status(status.as_u16(), &body));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                Error::UnexpectedResponse("empty body where JSON was expected".to_string())
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::PATCH, path).json(body)).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_chat_message(&self, project_id: &str, text: &str) -> Result<Message> {
        self.post(
            &format!("projects/{}/chat", project_id),
            &json!({ "message": text }),
        )
        .await
    }

    async fn upload_document(
        &self,
        project_id: &str,
        attachment: &Attachment,
    ) -> Result<UploadedDocument> {
        let part = multipart::Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime_type)?;
        let form = multipart::Form::new().part("file", part);
        let builder = self
            .request(Method::POST, &format!("projects/{}/documents", project_id))
            .multipart(form);
        self.send(builder).await
    }

    async fn process_document(&self, document_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(&format!("documents/{}/process", document_id), &json!({}))
            .await?;
        Ok(())
    }

    async fn get_driver_detail(&self, project_id: &str, driver_id: &str) -> Result<DriverDetail> {
        self.get(&format!("projects/{}/drivers/{}", project_id, driver_id))
            .await
    }

    async fn get_data_entity_detail(
        &self,
        project_id: &str,
        entity_id: &str,
    ) -> Result<DataEntityDetail> {
        self.get(&format!("projects/{}/data-entities/{}", project_id, entity_id))
            .await
    }

    async fn get_stakeholder(
        &self,
        project_id: &str,
        stakeholder_id: &str,
    ) -> Result<StakeholderDetail> {
        self.get(&format!(
            "projects/{}/stakeholders/{}",
            project_id, stakeholder_id
        ))
        .await
    }

    async fn update_business_driver(
        &self,
        project_id: &str,
        driver_id: &str,
        update: &DriverUpdate,
    ) -> Result<DriverDetail> {
        self.patch(
            &format!("projects/{}/drivers/{}", project_id, driver_id),
            update,
        )
        .await
    }

    async fn update_driver_financials(
        &self,
        project_id: &str,
        driver_id: &str,
        financials: &DriverFinancials,
    ) -> Result<DriverDetail> {
        self.patch(
            &format!("projects/{}/drivers/{}/financials", project_id, driver_id),
            financials,
        )
        .await
    }

    async fn enhance_driver_field(
        &self,
        project_id: &str,
        driver_id: &str,
        field: DriverField,
        notes: Option<&str>,
    ) -> Result<Suggestion> {
        self.post(
            &format!("projects/{}/drivers/{}/enhance", project_id, driver_id),
            &json!({ "field": field.as_str(), "notes": notes }),
        )
        .await
    }

    async fn enhance_vision(&self, project_id: &str, notes: Option<&str>) -> Result<Suggestion> {
        self.post(
            &format!("projects/{}/vision/enhance", project_id),
            &json!({ "notes": notes }),
        )
        .await
    }

    async fn get_next_actions(&self, project_id: &str) -> Result<Vec<NextAction>> {
        let response: NextActionsResponse = self
            .get(&format!("projects/{}/next-actions", project_id))
            .await?;
        Ok(response.actions)
    }

    async fn apply_proposal(&self, proposal_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(&format!("proposals/{}/apply", proposal_id), &json!({}))
            .await?;
        Ok(())
    }

    async fn discard_proposal(&self, proposal_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(&format!("proposals/{}/discard", proposal_id), &json!({}))
            .await?;
        Ok(())
    }

    async fn create_task(&self, project_id: &str, title: &str) -> Result<CreatedEntity> {
        self.post(
            &format!("projects/{}/tasks", project_id),
            &json!({ "title": title }),
        )
        .await
    }

    async fn create_stakeholder(&self, project_id: &str, name: &str) -> Result<CreatedEntity> {
        self.post(
            &format!("projects/{}/stakeholders", project_id),
            &json!({ "name": name }),
        )
        .await
    }

    async fn remember(
        &self,
        project_id: &str,
        category: MemoryCategory,
        content: &str,
    ) -> Result<CreatedEntity> {
        self.post(
            &format!("projects/{}/memory", project_id),
            &json!({ "category": category.as_str(), "content": content }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("https://api.example.com/v1/", None).unwrap();
        assert_eq!(backend.base_url(), "https://api.example.com/v1");
        assert_eq!(
            backend.url("/projects/p1/chat"),
            "https://api.example.com/v1/projects/p1/chat"
        );
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(
            HttpBackend::new("", None),
            Err(Error::InvalidConfig(_))
        ));
    }
}
