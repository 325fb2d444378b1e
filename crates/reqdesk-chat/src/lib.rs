//! reqdesk-chat: Chat orchestration for the requirements workspace
//!
//! This crate merges the durable conversation log with locally produced
//! messages, tracks tool-call progress, projects proposal results into
//! actionable cards, routes composer input, and handles document intake.

pub mod actions;
pub mod composer;
pub mod context;
pub mod detail;
pub mod error;
pub mod field_editor;
pub mod inflight;
pub mod intake;
pub mod merge;
pub mod projector;
pub mod router;
pub mod tool_calls;

#[cfg(test)]
mod testing;

pub use composer::{Composer, Dispatch, Prepared};
pub use context::{AssistantContext, AssistantEngine, CommandDefinition, ContextLog, MessageSender};
pub use detail::{DetailDrawer, DetailState, EntityDrawer, EntityKind};
pub use error::{Error, Result};
pub use field_editor::{EditTarget, EditorEvent, EditorState, FieldEditor};
pub use inflight::{InFlight, InFlightGuard};
pub use intake::{IntakeReport, UploadOutcome};
pub use merge::{MergedMessage, MessageMerger, MessageSource};
pub use projector::{Affordances, ProposalAction, ProposalCard, SignalCard};
pub use router::{Route, StructuredCommand, StructuredFlow};
pub use tool_calls::{KnownTool, ToolCallSummary, tool_label};
