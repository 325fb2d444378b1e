//! Proposal and signal cards drawn under an assistant message

use crate::theme::Theme;
use ratatui::{
    style::Modifier,
    text::{Line, Span},
};
use reqdesk_chat::{Affordances, ProposalAction, ProposalCard, SignalCard};
use serde_json::Value;

fn key_hint(action: ProposalAction) -> &'static str {
    match action {
        ProposalAction::Apply => "Ctrl+Y",
        ProposalAction::Discard => "Ctrl+N",
        ProposalAction::ViewDetails => "Ctrl+O",
    }
}

fn actions_line(actions: &[ProposalAction], busy: bool, theme: &Theme) -> Line<'static> {
    if busy {
        return Line::from(vec![
            Span::styled("  │ ", theme.card_style()),
            Span::styled("Working on it…", theme.warning_style()),
        ]);
    }
    let mut spans = vec![Span::styled("  │ ", theme.card_style())];
    for (i, action) in actions.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", theme.dim_style()));
        }
        spans.push(Span::styled(format!("[{}]", action.label()), theme.accent_bold()));
        spans.push(Span::styled(format!(" {}", key_hint(*action)), theme.dim_style()));
    }
    Line::from(spans)
}

fn change_count(changes: &Value) -> u64 {
    changes
        .as_array()
        .map(|a| a.len() as u64)
        .or_else(|| changes.as_u64())
        .unwrap_or(0)
}

fn proposal_lines(card: &ProposalCard, busy: bool, theme: &Theme) -> Vec<Line<'static>> {
    let bar = theme.card_style();
    let mut lines = vec![Line::from(vec![
        Span::styled("  ┌ ", bar),
        Span::styled(
            "Feature proposal",
            theme.card_style().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", card.proposal_id), theme.dim_style()),
    ])];
    lines.push(Line::from(vec![
        Span::styled("  │ ", bar),
        Span::styled(format!("+{} new", card.creates), theme.success_style()),
        Span::raw("  "),
        Span::styled(format!("~{} updated", card.updates), theme.warning_style()),
        Span::raw("  "),
        Span::styled(format!("-{} removed", card.deletes), theme.error_style()),
    ]));
    let groups: Vec<(String, u64)> = match &card.changes_by_type {
        Value::Object(map) => map
            .iter()
            .map(|(kind, changes)| (kind.replace('_', " "), change_count(changes)))
            .collect(),
        Value::Array(items) if !items.is_empty() => {
            vec![("changes".to_string(), items.len() as u64)]
        }
        _ => Vec::new(),
    };
    for (kind, count) in groups {
        lines.push(Line::from(vec![
            Span::styled("  │   ", bar),
            Span::styled(format!("{}: {}", kind, count), theme.dim_style()),
        ]));
    }
    lines.push(actions_line(card.actions(), busy, theme));
    lines.push(Line::from(Span::styled("  └", bar)));
    lines
}

fn signal_lines(card: &SignalCard, busy: bool, theme: &Theme) -> Vec<Line<'static>> {
    let bar = theme.card_style();
    let noun = if card.total_changes == 1 { "change" } else { "changes" };
    vec![
        Line::from(vec![
            Span::styled("  ┌ ", bar),
            Span::styled("Signal processed", theme.card_style().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {} proposed {}", card.total_changes, noun),
                theme.dim_style(),
            ),
        ]),
        actions_line(card.actions(), busy, theme),
        Line::from(Span::styled("  └", bar)),
    ]
}

/// Lines for every card in `affordances`; `busy` reports in-flight proposal ids
pub fn card_lines(
    affordances: &Affordances,
    busy: &dyn Fn(&str) -> bool,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(card) = &affordances.proposal {
        lines.extend(proposal_lines(card, busy(&card.proposal_id), theme));
    }
    if let Some(card) = &affordances.signal {
        lines.extend(signal_lines(card, busy(&card.proposal_id), theme));
    }
    lines
}
