//! Merge the host's conversation log with the engine's context messages.

use chrono::{DateTime, Utc};
use reqdesk_api::{Message, Role};
use std::collections::{HashMap, HashSet};

/// Which collaborator owns a merged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageSource {
    /// Durable conversation log owned by the host
    External,
    /// Command results and notices owned by the assistant engine
    Context,
}

/// A message with its stable key and ordering timestamp resolved
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source: MessageSource,
    pub message: Message,
}

impl MergedMessage {
    /// System notices are kept in the data but not drawn
    pub fn is_renderable(&self) -> bool {
        self.message.role != Role::System
    }
}

/// Produces one ordered, deduplicated sequence from two message sources.
///
/// A message without a timestamp is stamped with the time the merger first
/// saw its key, and keeps that stamp on every later merge.
#[derive(Debug, Default)]
pub struct MessageMerger {
    first_seen: HashMap<String, DateTime<Utc>>,
}

impl MessageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge using the current time for newly observed untimestamped messages
    pub fn merge(&mut self, external: &[Message], context: &[Message]) -> Vec<MergedMessage> {
        self.merge_at(external, context, Utc::now())
    }

    /// Merge with an explicit "now"
    pub fn merge_at(
        &mut self,
        external: &[Message],
        context: &[Message],
        now: DateTime<Utc>,
    ) -> Vec<MergedMessage> {
        let tagged = external
            .iter()
            .enumerate()
            .map(|(i, m)| (MessageSource::External, i, m))
            .chain(
                context
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (MessageSource::Context, i, m)),
            );

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::with_capacity(external.len() + context.len());

        for (source, index, message) in tagged {
            let id = stable_id(message, source, index);
            if !seen.insert(id.clone()) {
                tracing::debug!("Dropping duplicate message {}", id);
                continue;
            }

            let timestamp = match message.timestamp {
                Some(ts) => ts,
                None => *self.first_seen.entry(id.clone()).or_insert(now),
            };

            let mut message = message.clone();
            message.id = Some(id.clone());
            message.timestamp = Some(timestamp);

            merged.push(MergedMessage {
                id,
                timestamp,
                source,
                message,
            });
        }

        self.first_seen.retain(|id, _| seen.contains(id));

        // stable: ties keep external-then-context input order
        merged.sort_by_key(|m| m.timestamp);
        merged
    }
}

fn stable_id(message: &Message, source: MessageSource, index: usize) -> String {
    match message.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => match source {
            MessageSource::External => format!("external-{}", index),
            MessageSource::Context => format!("context-{}", index),
        },
    }
}

/// Only the messages a chat panel should draw
pub fn renderable(merged: &[MergedMessage]) -> impl Iterator<Item = &MergedMessage> {
    merged.iter().filter(|m| m.is_renderable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(id: Option<&str>, role: Role, ts: Option<i64>, content: &str) -> Message {
        Message {
            id: id.map(String::from),
            role,
            content: content.to_string(),
            timestamp: ts.map(at),
            is_streaming: false,
            tool_calls: vec![],
        }
    }

    fn ids(merged: &[MergedMessage]) -> Vec<&str> {
        merged.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_empty_inputs() {
        let mut merger = MessageMerger::new();
        assert!(merger.merge(&[], &[]).is_empty());
    }

    #[test]
    fn test_sorted_by_timestamp() {
        let external = vec![
            msg(Some("e1"), Role::User, Some(1), "hi"),
            msg(Some("e2"), Role::Assistant, Some(5), "hello"),
        ];
        let context = vec![msg(Some("c1"), Role::Assistant, Some(3), "/help output")];
        let merged = MessageMerger::new().merge_at(&external, &context, at(100));
        assert_eq!(ids(&merged), vec!["e1", "c1", "e2"]);
        assert!(merged.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_context_after_external_appends() {
        let external = vec![
            msg(Some("e1"), Role::User, Some(1), ""),
            msg(Some("e2"), Role::Assistant, Some(2), ""),
        ];
        let context = vec![
            msg(Some("c1"), Role::Assistant, Some(10), ""),
            msg(Some("c2"), Role::Assistant, Some(11), ""),
        ];
        let merged = MessageMerger::new().merge_at(&external, &context, at(100));
        assert_eq!(ids(&merged), vec!["e1", "e2", "c1", "c2"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let external = vec![msg(Some("e1"), Role::User, Some(1), "")];
        let context = vec![msg(Some("c1"), Role::Assistant, Some(1), "")];
        let merged = MessageMerger::new().merge_at(&external, &context, at(100));
        assert_eq!(ids(&merged), vec!["e1", "c1"]);
    }

    #[test]
    fn test_missing_ids_synthesized_and_stable() {
        let external = vec![
            msg(None, Role::User, Some(1), "a"),
            msg(Some(""), Role::Assistant, Some(2), "b"),
        ];
        let context = vec![msg(None, Role::Assistant, Some(3), "c")];
        let mut merger = MessageMerger::new();
        let first = merger.merge_at(&external, &context, at(100));
        let second = merger.merge_at(&external, &context, at(200));
        assert_eq!(ids(&first), vec!["external-0", "external-1", "context-0"]);
        assert_eq!(ids(&first), ids(&second));
        assert!(first.iter().all(|m| m.message.id.as_deref() == Some(m.id.as_str())));
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let external = vec![msg(Some("same"), Role::Assistant, Some(1), "durable")];
        let context = vec![msg(Some("same"), Role::Assistant, Some(2), "local copy")];
        let merged = MessageMerger::new().merge_at(&external, &context, at(100));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].message.content, "durable");
        assert_eq!(merged[0].source, MessageSource::External);
    }

    #[test]
    fn test_default_timestamp_cached_across_merges() {
        let mut merger = MessageMerger::new();
        let external = vec![msg(Some("e1"), Role::Assistant, None, "no time")];

        let first = merger.merge_at(&external, &[], at(50));
        assert_eq!(first[0].timestamp, at(50));

        // A newer message arrives; the untimestamped one must not jump past it.
        let context = vec![msg(Some("c1"), Role::Assistant, Some(60), "newer")];
        let second = merger.merge_at(&external, &context, at(500));
        assert_eq!(second[0].timestamp, at(50));
        assert_eq!(ids(&second), vec!["e1", "c1"]);
    }

    #[test]
    fn test_forgotten_ids_are_pruned() {
        let mut merger = MessageMerger::new();
        let external = vec![msg(Some("e1"), Role::Assistant, None, "")];
        merger.merge_at(&external, &[], at(1));
        merger.merge_at(&[], &[], at(2));
        let again = merger.merge_at(&external, &[], at(3));
        assert_eq!(again[0].timestamp, at(3));
    }

    #[test]
    fn test_renderable_filters_system() {
        let external = vec![
            msg(Some("s"), Role::System, Some(1), "notice"),
            msg(Some("u"), Role::User, Some(2), "hi"),
        ];
        let merged = MessageMerger::new().merge_at(&external, &[], at(100));
        let shown: Vec<_> = renderable(&merged).map(|m| m.id.as_str()).collect();
        assert_eq!(shown, vec!["u"]);
        assert_eq!(merged.len(), 2);
    }
}
