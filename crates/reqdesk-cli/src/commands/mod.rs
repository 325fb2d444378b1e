//! Slash commands understood by the local engine

mod engine;

pub use engine::{LocalEngine, UiRequest};

use reqdesk_api::{DriverField, MemoryCategory};
use reqdesk_chat::router::split_quoted;
use reqdesk_chat::{CommandDefinition, EditTarget, EntityKind};

/// A parsed slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Show a message to the user (nothing reaches the backend)
    Message(String),
    /// Hide the transcript so far
    Clear,
    /// Exit the application
    Exit,
    CreateTask(String),
    CreateStakeholder(String),
    Remember(MemoryCategory, String),
    Apply(String),
    Discard(String),
    /// Open the detail drawer for an entity
    OpenDetail(EntityKind, String),
    /// Start the field editor
    Edit(EditTarget),
    /// Fetch and show suggested next actions
    NextActions,
    /// Unknown command
    Unknown(String),
}

/// Every command with aliases and usage, in help order
pub fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("help", "Show available commands").with_aliases(&["h", "?"]),
        CommandDefinition::new("next", "Suggested next actions").with_aliases(&["n", "next-actions"]),
        CommandDefinition::new("create-task", "Create a task")
            .with_aliases(&["add-task", "new-task"])
            .with_usage("\"title\""),
        CommandDefinition::new("create-stakeholder", "Add a stakeholder")
            .with_aliases(&["add-stakeholder", "new-stakeholder"])
            .with_usage("\"name\""),
        CommandDefinition::new("remember", "Save a decision, learning or question")
            .with_usage("<decision|learning|question> \"text\""),
        CommandDefinition::new("apply", "Apply a proposal").with_usage("<proposal-id>"),
        CommandDefinition::new("discard", "Discard a proposal").with_usage("<proposal-id>"),
        CommandDefinition::new("stakeholder", "Show stakeholder details").with_usage("<id>"),
        CommandDefinition::new("driver", "Show business driver details").with_usage("<id>"),
        CommandDefinition::new("entity", "Show data entity details")
            .with_aliases(&["data-entity"])
            .with_usage("<id>"),
        CommandDefinition::new("enhance", "Edit a business driver field")
            .with_usage("<driver-id> <description|measurement|desired_outcome>"),
        CommandDefinition::new("enhance-vision", "Rewrite the project vision").with_aliases(&["vision"]),
        CommandDefinition::new("clear", "Clear the conversation view").with_aliases(&["c"]),
        CommandDefinition::new("quit", "Exit reqdesk").with_aliases(&["exit", "q"]),
    ]
}

/// Take the first argument, quoted or not, and the whole quoted remainder
fn unquote(args: &str) -> String {
    let args = args.trim();
    if args.starts_with('"') {
        split_quoted(args).0
    } else {
        args.to_string()
    }
}

fn usage(name: &str) -> CommandResult {
    let hint = definitions()
        .into_iter()
        .find(|d| d.name == name)
        .and_then(|d| d.usage)
        .unwrap_or_default();
    CommandResult::Message(format!("Usage: /{} {}", name, hint))
}

/// Parse a slash command
pub fn parse_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = input[1..].splitn(2, char::is_whitespace).collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "next" | "n" | "next-actions" => CommandResult::NextActions,

        "create-task" | "add-task" | "new-task" => match unquote(args) {
            title if title.is_empty() => usage("create-task"),
            title => CommandResult::CreateTask(title),
        },

        "create-stakeholder" | "add-stakeholder" | "new-stakeholder" => match unquote(args) {
            name if name.is_empty() => usage("create-stakeholder"),
            name => CommandResult::CreateStakeholder(name),
        },

        "remember" => {
            let (category, rest) = split_quoted(args);
            match (category.parse::<MemoryCategory>(), unquote(rest)) {
                (Ok(category), text) if !text.is_empty() => CommandResult::Remember(category, text),
                _ => usage("remember"),
            }
        }

        "apply" | "discard" => {
            let (id, _) = split_quoted(args);
            match (command.as_str(), id.is_empty()) {
                (_, true) => usage(&command),
                ("apply", false) => CommandResult::Apply(id),
                _ => CommandResult::Discard(id),
            }
        }

        "stakeholder" | "driver" | "entity" | "data-entity" => {
            let (id, _) = split_quoted(args);
            let kind = match command.as_str() {
                "stakeholder" => EntityKind::Stakeholder,
                "driver" => EntityKind::Driver,
                _ => EntityKind::DataEntity,
            };
            if id.is_empty() {
                usage(if kind == EntityKind::DataEntity { "entity" } else { command.as_str() })
            } else {
                CommandResult::OpenDetail(kind, id)
            }
        }

        "enhance" => {
            let (driver_id, rest) = split_quoted(args);
            let field = rest.trim().parse::<DriverField>();
            match field {
                Ok(field) if !driver_id.is_empty() => {
                    CommandResult::Edit(EditTarget::Driver { driver_id, field })
                }
                _ => usage("enhance"),
            }
        }

        "enhance-vision" | "vision" => CommandResult::Edit(EditTarget::Vision),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?                 Show this help message
  /next, /n                     Suggested next actions
  /create-task ["title"]        Create a task (prompts for the title)
  /create-stakeholder ["name"]  Add a stakeholder (prompts for the name)
  /remember [category "text"]   Save a decision, learning or question
  /apply <proposal-id>          Apply a proposal
  /discard <proposal-id>        Discard a proposal
  /stakeholder <id>             Show stakeholder details
  /driver <id>                  Show business driver details
  /entity <id>                  Show data entity details
  /enhance <driver-id> <field>  Edit a driver field by hand or with AI help
  /enhance-vision               Rewrite the project vision with AI help
  /clear, /c                    Clear the conversation view
  /quit, /exit, /q              Exit reqdesk

Anything else is sent to the assistant.

Examples:
  /remember decision "Launch in EU first"
  /enhance drv-12 desired_outcome
  /apply prop-3"#
        .to_string()
}
