//! Derived, read-only view of a message's tool calls

use reqdesk_api::{Message, ToolCall, ToolStatus};
use std::borrow::Cow;

/// Backend tools with a curated display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTool {
    ProposeFeatures,
    AddSignal,
    SearchProject,
    CreateTask,
    CreateStakeholder,
    UpdateBusinessDriver,
    AnalyzeGaps,
    GenerateValuePath,
}

impl KnownTool {
    pub const ALL: [KnownTool; 8] = [
        KnownTool::ProposeFeatures,
        KnownTool::AddSignal,
        KnownTool::SearchProject,
        KnownTool::CreateTask,
        KnownTool::CreateStakeholder,
        KnownTool::UpdateBusinessDriver,
        KnownTool::AnalyzeGaps,
        KnownTool::GenerateValuePath,
    ];

    /// Wire name as reported in `ToolCall.tool_name`
    pub fn name(&self) -> &'static str {
        match self {
            KnownTool::ProposeFeatures => "propose_features",
            KnownTool::AddSignal => "add_signal",
            KnownTool::SearchProject => "search_project",
            KnownTool::CreateTask => "create_task",
            KnownTool::CreateStakeholder => "create_stakeholder",
            KnownTool::UpdateBusinessDriver => "update_business_driver",
            KnownTool::AnalyzeGaps => "analyze_gaps",
            KnownTool::GenerateValuePath => "generate_value_path",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            KnownTool::ProposeFeatures => "Proposing features",
            KnownTool::AddSignal => "Processing signal",
            KnownTool::SearchProject => "Searching project",
            KnownTool::CreateTask => "Creating task",
            KnownTool::CreateStakeholder => "Adding stakeholder",
            KnownTool::UpdateBusinessDriver => "Updating business driver",
            KnownTool::AnalyzeGaps => "Analyzing gaps",
            KnownTool::GenerateValuePath => "Generating value path",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Human-readable label for a tool name.
///
/// Unknown names fall back to their `snake_case` words in Title Case, so a
/// new backend tool shows up as e.g. `Draft Email` instead of disappearing.
pub fn tool_label(tool_name: &str) -> Cow<'static, str> {
    match KnownTool::from_name(tool_name) {
        Some(tool) => Cow::Borrowed(tool.label()),
        None => Cow::Owned(title_case(tool_name)),
    }
}

/// `snake_case` → `Snake Case`
pub fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-message tool-call summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolCallSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
}

impl ToolCallSummary {
    pub fn of(message: &Message) -> Self {
        Self::from_calls(&message.tool_calls)
    }

    pub fn from_calls(calls: &[ToolCall]) -> Self {
        calls.iter().fold(Self::default(), |mut acc, call| {
            acc.total += 1;
            match call.status() {
                ToolStatus::Complete => acc.completed += 1,
                ToolStatus::Error => acc.failed += 1,
                ToolStatus::Pending | ToolStatus::Running => acc.in_flight += 1,
            }
            acc
        })
    }

    /// Any call pending or running
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// `"2/3 tools complete"`, or `None` for a message without tool calls
    pub fn label(&self) -> Option<String> {
        if self.total == 0 {
            return None;
        }
        let noun = if self.total == 1 { "tool" } else { "tools" };
        let mut text = format!("{}/{} {} complete", self.completed, self.total, noun);
        if self.failed > 0 {
            text.push_str(&format!(", {} failed", self.failed));
        }
        Some(text)
    }
}

/// One row of a tool-call list: label plus status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallView {
    pub label: String,
    pub status: ToolStatus,
    pub error: Option<String>,
}

/// Rows for every tool call of `message`, in order
pub fn tool_call_views(message: &Message) -> Vec<ToolCallView> {
    message
        .tool_calls
        .iter()
        .map(|call| ToolCallView {
            label: tool_label(&call.tool_name).into_owned(),
            status: call.status(),
            error: call.error.clone(),
        })
        .collect()
}
