//! Core types exchanged with the backend and rendered by chat panels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Lifecycle state of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Complete,
    Error,
}

impl ToolStatus {
    /// `complete` and `error` have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolStatus::Complete | ToolStatus::Error)
    }

    /// Pending or running
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving from `self` to `next` is a forward step
    pub fn can_transition_to(&self, next: ToolStatus) -> bool {
        matches!(
            (self, next),
            (ToolStatus::Pending, ToolStatus::Running)
                | (ToolStatus::Pending, ToolStatus::Complete)
                | (ToolStatus::Pending, ToolStatus::Error)
                | (ToolStatus::Running, ToolStatus::Complete)
                | (ToolStatus::Running, ToolStatus::Error)
        )
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolStatus::Pending => "pending",
            ToolStatus::Running => "running",
            ToolStatus::Complete => "complete",
            ToolStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// One invocation of a named backend capability within a message.
///
/// The status can only move forward; use [`ToolCall::start`],
/// [`ToolCall::complete`] and [`ToolCall::fail`] to advance it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tool_name: String,
    status: ToolStatus,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCall {
    /// Create a call that has been requested but not started
    pub fn pending(tool_name: impl Into<String>) -> Self {
        Self::with_status(tool_name, ToolStatus::Pending)
    }

    /// Create a call that is already executing
    pub fn running(tool_name: impl Into<String>) -> Self {
        Self::with_status(tool_name, ToolStatus::Running)
    }

    fn with_status(tool_name: impl Into<String>, status: ToolStatus) -> Self {
        Self {
            id: None,
            tool_name: tool_name.into(),
            status,
            args: serde_json::Value::Null,
            result: None,
            error: None,
        }
    }

    /// Attach an identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the invocation arguments
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    fn advance(&mut self, next: ToolStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// pending → running
    pub fn start(&mut self) -> Result<()> {
        self.advance(ToolStatus::Running)
    }

    /// pending|running → complete, recording the result payload
    pub fn complete(&mut self, result: serde_json::Value) -> Result<()> {
        self.advance(ToolStatus::Complete)?;
        self.result = Some(result);
        Ok(())
    }

    /// pending|running → error, recording the error message
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.advance(ToolStatus::Error)?;
        self.error = Some(error.into());
        Ok(())
    }
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ToolCall>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
            is_streaming: false,
            tool_calls: vec![],
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system notice
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach tool calls
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// True iff any tool call is pending or running
    pub fn is_busy(&self) -> bool {
        self.tool_calls.iter().any(|c| c.status().is_active())
    }

    /// Find a tool call by id for a status update
    pub fn tool_call_mut(&mut self, id: &str) -> Option<&mut ToolCall> {
        self.tool_calls
            .iter_mut()
            .find(|c| c.id.as_deref() == Some(id))
    }

    /// Mark streaming as finished
    pub fn finish_streaming(&mut self) {
        self.is_streaming = false;
    }
}

/// Proposal-shaped payload found in `propose_features` and `add_signal` results.
///
/// Read field by field: only `proposal_id` is required, and counts that are
/// missing, null or not numeric read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub proposal_id: String,
    #[serde(default)]
    pub creates: u64,
    #[serde(default)]
    pub updates: u64,
    #[serde(default)]
    pub deletes: u64,
    #[serde(default)]
    pub total_changes: Option<u64>,
    #[serde(default)]
    pub processed: bool,
    /// Changes grouped by entity type; an object or a list, as sent
    #[serde(default)]
    pub changes_by_type: Option<serde_json::Value>,
}

fn lenient_count(value: &serde_json::Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

impl ProposalResult {
    /// Parse a tool result, returning `None` unless it carries a string `proposal_id`
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let proposal_id = value.get("proposal_id")?.as_str()?.to_string();
        let count = |key: &str| value.get(key).and_then(lenient_count);
        Some(Self {
            proposal_id,
            creates: count("creates").unwrap_or(0),
            updates: count("updates").unwrap_or(0),
            deletes: count("deletes").unwrap_or(0),
            total_changes: count("total_changes"),
            processed: value
                .get("processed")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            changes_by_type: value
                .get("changes_by_type")
                .filter(|v| !v.is_null())
                .cloned(),
        })
    }

    /// A "full preview" result lists its changes grouped by entity type
    pub fn is_full_preview(&self) -> bool {
        self.changes_by_type.is_some()
    }

    /// Reported total, or the sum of the individual counts
    pub fn total(&self) -> u64 {
        self.total_changes.unwrap_or_else(|| {
            self.creates
                .saturating_add(self.updates)
                .saturating_add(self.deletes)
        })
    }
}

/// A file selected for upload
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Response to a document upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    #[serde(default)]
    pub is_duplicate: bool,
}

/// A ranked suggestion for what the user could do next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub action_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub target_entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextActionsResponse {
    #[serde(default)]
    pub actions: Vec<NextAction>,
}

/// Excerpt, rationale and source type justifying a generated field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub source_type: String,
}

type Extra = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub stakeholder_type: Option<String>,
    #[serde(default)]
    pub influence_level: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverFinancials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// Business driver (pain, goal or KPI) with optional financial impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDetail {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub driver_type: Option<String>,
    #[serde(default)]
    pub measurement: Option<String>,
    #[serde(default)]
    pub desired_outcome: Option<String>,
    #[serde(default)]
    pub financials: Option<DriverFinancials>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityField {
    pub name: String,
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntityDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entity_category: Option<String>,
    #[serde(default)]
    pub fields: Vec<DataEntityField>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Text fields of a business driver that can be edited inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverField {
    Description,
    Measurement,
    DesiredOutcome,
}

impl DriverField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverField::Description => "description",
            DriverField::Measurement => "measurement",
            DriverField::DesiredOutcome => "desired_outcome",
        }
    }

    /// Read the current value of this field from a driver
    pub fn value_of<'a>(&self, driver: &'a DriverDetail) -> Option<&'a str> {
        match self {
            DriverField::Description => Some(driver.description.as_str()),
            DriverField::Measurement => driver.measurement.as_deref(),
            DriverField::DesiredOutcome => driver.desired_outcome.as_deref(),
        }
    }
}

impl FromStr for DriverField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "description" => Ok(DriverField::Description),
            "measurement" => Ok(DriverField::Measurement),
            "desired_outcome" | "outcome" => Ok(DriverField::DesiredOutcome),
            other => Err(Error::InvalidConfig(format!("unknown driver field '{}'", other))),
        }
    }
}

/// Partial update for a business driver; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_outcome: Option<String>,
}

impl DriverUpdate {
    /// An update that sets exactly one field
    pub fn field(field: DriverField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            DriverField::Description => Self {
                description: value,
                ..Default::default()
            },
            DriverField::Measurement => Self {
                measurement: value,
                ..Default::default()
            },
            DriverField::DesiredOutcome => Self {
                desired_outcome: value,
                ..Default::default()
            },
        }
    }
}

/// AI-assist output awaiting human review before commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion: String,
}

/// Category for `/remember` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Decision,
    Learning,
    Question,
}

impl MemoryCategory {
    pub const ALL: [MemoryCategory; 3] = [
        MemoryCategory::Decision,
        MemoryCategory::Learning,
        MemoryCategory::Question,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Decision => "decision",
            MemoryCategory::Learning => "learning",
            MemoryCategory::Question => "question",
        }
    }
}

impl FromStr for MemoryCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "decision" => Ok(MemoryCategory::Decision),
            "learning" => Ok(MemoryCategory::Learning),
            "question" => Ok(MemoryCategory::Question),
            other => Err(Error::InvalidConfig(format!(
                "unknown memory category '{}'",
                other
            ))),
        }
    }
}

/// Identifier of an entity created by a local command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}
