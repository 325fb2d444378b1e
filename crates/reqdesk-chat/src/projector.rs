//! Derive proposal and signal cards from completed tool calls

use reqdesk_api::{Message, ProposalResult, ToolStatus};
use serde_json::Value;

use crate::tool_calls::KnownTool;

/// Full preview of a feature proposal
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalCard {
    pub proposal_id: String,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    /// Object keyed by entity type, or a flat list of changes
    pub changes_by_type: Value,
}

impl ProposalCard {
    pub fn actions(&self) -> &'static [ProposalAction] {
        &[
            ProposalAction::Apply,
            ProposalAction::Discard,
            ProposalAction::ViewDetails,
        ]
    }
}

/// Lightweight notice that a signal was processed into a proposal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCard {
    pub proposal_id: String,
    pub total_changes: u64,
}

impl SignalCard {
    pub fn actions(&self) -> &'static [ProposalAction] {
        &[ProposalAction::Apply, ProposalAction::Discard]
    }
}

/// What a user can do with a proposal card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalAction {
    Apply,
    Discard,
    ViewDetails,
}

impl ProposalAction {
    /// The user message sent on the user's behalf when the action is chosen
    pub fn follow_up_message(&self, proposal_id: &str) -> String {
        match self {
            ProposalAction::Apply => format!("Apply proposal {}", proposal_id),
            ProposalAction::Discard => format!("Discard proposal {}", proposal_id),
            ProposalAction::ViewDetails => format!("Show details for proposal {}", proposal_id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProposalAction::Apply => "Apply",
            ProposalAction::Discard => "Discard",
            ProposalAction::ViewDetails => "View details",
        }
    }
}

/// Cards surfaced for one message; both may be present
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Affordances {
    pub proposal: Option<ProposalCard>,
    pub signal: Option<SignalCard>,
}

impl Affordances {
    pub fn is_empty(&self) -> bool {
        self.proposal.is_none() && self.signal.is_none()
    }

    /// Proposal id of whichever card is present, full preview first
    pub fn proposal_id(&self) -> Option<&str> {
        self.proposal
            .as_ref()
            .map(|p| p.proposal_id.as_str())
            .or_else(|| self.signal.as_ref().map(|s| s.proposal_id.as_str()))
    }
}

/// Scan a message's tool calls for card-worthy results. Never mutates the message.
pub fn project(message: &Message) -> Affordances {
    Affordances {
        proposal: find_proposal(message),
        signal: find_signal(message),
    }
}

fn completed_results<'a>(
    message: &'a Message,
    tool: KnownTool,
) -> impl Iterator<Item = &'a Value> + 'a {
    message
        .tool_calls
        .iter()
        .filter(move |c| c.tool_name == tool.name() && c.status() == ToolStatus::Complete)
        .filter_map(|c| c.result.as_ref())
}

fn find_proposal(message: &Message) -> Option<ProposalCard> {
    completed_results(message, KnownTool::ProposeFeatures)
        .filter_map(ProposalResult::from_value)
        .find_map(|result| {
            let changes_by_type = result.changes_by_type?;
            Some(ProposalCard {
                proposal_id: result.proposal_id,
                creates: result.creates,
                updates: result.updates,
                deletes: result.deletes,
                changes_by_type,
            })
        })
}

fn find_signal(message: &Message) -> Option<SignalCard> {
    completed_results(message, KnownTool::AddSignal)
        .filter_map(ProposalResult::from_value)
        .find(|result| result.processed)
        .map(|result| SignalCard {
            total_changes: result.total(),
            proposal_id: result.proposal_id,
        })
}
