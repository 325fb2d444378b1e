//! Map ranked next-action suggestions to composer commands

use reqdesk_api::NextAction;

/// Action kinds the backend is known to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownAction {
    MissingStakeholder,
    MissingTask,
    MissingVision,
    WeakDriver,
    UnprocessedDocument,
    OpenQuestion,
    PendingProposal,
    CoverageGap,
}

impl KnownAction {
    pub const ALL: [KnownAction; 8] = [
        KnownAction::MissingStakeholder,
        KnownAction::MissingTask,
        KnownAction::MissingVision,
        KnownAction::WeakDriver,
        KnownAction::UnprocessedDocument,
        KnownAction::OpenQuestion,
        KnownAction::PendingProposal,
        KnownAction::CoverageGap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KnownAction::MissingStakeholder => "missing_stakeholder",
            KnownAction::MissingTask => "missing_task",
            KnownAction::MissingVision => "missing_vision",
            KnownAction::WeakDriver => "weak_driver",
            KnownAction::UnprocessedDocument => "unprocessed_document",
            KnownAction::OpenQuestion => "open_question",
            KnownAction::PendingProposal => "pending_proposal",
            KnownAction::CoverageGap => "coverage_gap",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// Text to place in the composer when the user picks `action`
pub fn command_for(action: &NextAction) -> String {
    let target = action.target_entity_id.as_deref();
    match (KnownAction::from_name(&action.action_type), target) {
        (Some(KnownAction::MissingStakeholder), _) => "/create-stakeholder".to_string(),
        (Some(KnownAction::MissingTask), _) => "/create-task".to_string(),
        (Some(KnownAction::MissingVision), _) => "/enhance-vision".to_string(),
        (Some(KnownAction::WeakDriver), Some(id)) => format!("/driver {}", id),
        (Some(KnownAction::PendingProposal), Some(id)) => format!("/apply {}", id),
        (Some(KnownAction::OpenQuestion), _) => "/remember".to_string(),
        (Some(KnownAction::UnprocessedDocument), _) => {
            "Which uploaded documents still need processing?".to_string()
        }
        (Some(KnownAction::CoverageGap), _) => {
            "Analyze gaps in the current requirements".to_string()
        }
        _ => format!("Help me with: {}", action.title),
    }
}

/// Highest priority first; ties keep backend order
pub fn ranked(mut actions: Vec<NextAction>) -> Vec<NextAction> {
    actions.sort_by_key(|a| std::cmp::Reverse(a.priority));
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: &str, title: &str, priority: i32, target: Option<&str>) -> NextAction {
        NextAction {
            action_type: kind.to_string(),
            title: title.to_string(),
            description: None,
            priority,
            target_entity_id: target.map(String::from),
        }
    }

    #[test]
    fn test_known_actions() {
        assert_eq!(
            command_for(&action("missing_stakeholder", "Add the CFO", 1, None)),
            "/create-stakeholder"
        );
        assert_eq!(
            command_for(&action("weak_driver", "Quantify churn", 1, Some("d7"))),
            "/driver d7"
        );
        assert_eq!(command_for(&action("open_question", "Pricing?", 1, None)), "/remember");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            command_for(&action("brand_new_kind", "Review personas", 1, None)),
            "Help me with: Review personas"
        );
        // Known kind that needs a target but has none
        assert_eq!(
            command_for(&action("pending_proposal", "Review proposal", 1, None)),
            "Help me with: Review proposal"
        );
    }

    #[test]
    fn test_names_round_trip() {
        for kind in KnownAction::ALL {
            assert_eq!(KnownAction::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_ranked() {
        let sorted = ranked(vec![
            action("a", "low", 1, None),
            action("b", "high", 9, None),
            action("c", "mid", 5, None),
            action("d", "high too", 9, None),
        ]);
        let titles: Vec<_> = sorted.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "high too", "mid", "low"]);
    }
}
