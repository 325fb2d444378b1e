//! reqdesk - terminal workbench for requirements chat

mod commands;
mod config;
mod prefs;
mod remote;
mod ui;
mod workspace;

#[cfg(test)]
mod testing;

use anyhow::Context as _;
use clap::Parser;
use ratatui::text::Line;
use reqdesk_api::{Attachment, HttpBackend};
use reqdesk_chat::intake::mime_for_path;
use reqdesk_chat::{EditorEvent, EditorState, EntityDrawer, FieldEditor, Prepared};
use reqdesk_tui::Theme;
use reqdesk_tui::widgets::message_list::transcript_lines;
use reqdesk_tui::widgets::side_panel::{drawer_lines, next_action_lines};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use commands::UiRequest;
use workspace::{Outcome, Task, Workspace};

/// reqdesk - chat with your requirements workspace
#[derive(Parser, Debug)]
#[command(name = "reqdesk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project to open (default: project_id from the config file)
    #[arg(short, long)]
    project: Option<String>,

    /// Workbench API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Upload documents matching this glob before starting (repeatable)
    #[arg(long, value_name = "GLOB")]
    attach: Vec<String>,

    /// Run in non-interactive mode with a single message or command
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Create a default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("reqdesk=debug,reqdesk_api=debug,reqdesk_chat=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // Merge config with CLI args (CLI takes precedence)
    let Some(project_id) = args.project.clone().or(cfg.project_id.clone()) else {
        eprintln!("Error: No project selected");
        eprintln!();
        eprintln!("Pass --project <ID>, or set project_id in:");
        eprintln!("  {}", config::Config::config_path().display());
        std::process::exit(1);
    };
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| cfg.base_url().to_string());
    let theme = Theme::by_name(cfg.theme.as_deref().unwrap_or("dark"));
    let use_tui = !args.no_tui && args.command.is_none() && cfg.tui.unwrap_or(true);

    let backend = HttpBackend::with_timeout(&base_url, cfg.api_token(), cfg.request_timeout())
        .context("Failed to create API client")?;
    tracing::debug!("Opening project {} at {}", project_id, base_url);

    let ws = Workspace::new(Arc::new(backend), project_id);

    if !args.attach.is_empty() {
        let files = collect_attachments(&args.attach)?;
        let report = ws.attach(files).await;
        if !use_tui {
            eprintln!(
                "Uploaded {} file(s), {} failed",
                report.succeeded(),
                report.failed()
            );
        }
    }

    if let Some(command) = args.command {
        return run_command(&ws, &command, &theme).await;
    }

    if use_tui {
        ui::run_tui(&ws, theme, prefs::Prefs::load()).await
    } else {
        run_interactive(&ws, &theme).await
    }
}

/// Expand `--attach` globs and read every matching file
fn collect_attachments(patterns: &[String]) -> anyhow::Result<Vec<Attachment>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths =
            glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        for path in paths.filter_map(|p| p.ok()).filter(|p| p.is_file()) {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let mime = mime_for_path(&path.to_string_lossy());
            files.push(Attachment::new(name, mime, bytes));
        }
    }
    if files.is_empty() {
        anyhow::bail!("No files matched {}", patterns.join(", "));
    }
    Ok(files)
}

fn plain(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|s| s.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
}

/// Prints transcript messages that have not been printed yet
struct Printer {
    merger: reqdesk_chat::MessageMerger,
    printed: HashSet<String>,
}

impl Printer {
    fn new() -> Self {
        Self {
            merger: reqdesk_chat::MessageMerger::new(),
            printed: HashSet::new(),
        }
    }

    fn flush(&mut self, ws: &Workspace, theme: &Theme) {
        let fresh: Vec<_> = ws
            .merged(&mut self.merger)
            .into_iter()
            .filter(|m| !m.message.is_streaming && !self.printed.contains(&m.id))
            .collect();
        for m in &fresh {
            self.printed.insert(m.id.clone());
        }
        let busy = |id: &str| ws.engine.in_flight().contains(id);
        let lines = transcript_lines(
            &fresh,
            theme,
            terminal_width(),
            &busy,
            std::time::Duration::ZERO,
        );
        if !lines.is_empty() {
            println!("{}", plain(&lines));
        }
    }
}

/// Run a single message or command and print what it produced
async fn run_command(ws: &Workspace, input: &str, theme: &Theme) -> anyhow::Result<()> {
    let mut printer = Printer::new();
    let mut composer = reqdesk_chat::Composer::new();
    composer.set_draft(input);

    let result = composer.submit(&ws.ctx).await;
    printer.flush(ws, theme);

    match result {
        Ok(Prepared::FlowStarted(_)) => {
            eprintln!("{} needs arguments when used with -c", input.trim());
        }
        Ok(_) => {
            for request in ws.engine.take_requests() {
                if !handle_request(ws, request, theme, false).await? {
                    break;
                }
            }
        }
        Err(e) => anyhow::bail!(e.user_message()),
    }
    Ok(())
}

/// Simple stdin/stdout loop
async fn run_interactive(ws: &Workspace, theme: &Theme) -> anyhow::Result<()> {
    let mut printer = Printer::new();
    let mut composer = reqdesk_chat::Composer::new();

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("reqdesk ({})", ws.project_id);
        if let Outcome::NextActions(actions) = ws.perform(Task::NextActions).await {
            if !actions.is_empty() {
                eprintln!("{}", plain(&next_action_lines(&actions, theme)));
            }
        }
        eprintln!();
    }
    printer.flush(ws, theme);

    loop {
        match composer.flow().prompt() {
            Some(prompt) => print!("{} > ", prompt),
            None => print!("> "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        composer.set_draft(input);
        match composer.submit(&ws.ctx).await {
            Ok(Prepared::Ignored) if composer.flow().awaiting_category() => {
                println!(
                    "Pick one of: {}",
                    reqdesk_api::MemoryCategory::ALL
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Dispatch failed: {}", e),
        }
        printer.flush(ws, theme);

        for request in ws.engine.take_requests() {
            if !handle_request(ws, request, theme, true).await? {
                return Ok(());
            }
        }
        printer.flush(ws, theme);
    }

    Ok(())
}

/// Carry out a host follow-up outside the TUI. Returns false to quit.
async fn handle_request(
    ws: &Workspace,
    request: UiRequest,
    theme: &Theme,
    interactive: bool,
) -> anyhow::Result<bool> {
    match request {
        UiRequest::Exit => return Ok(false),
        UiRequest::Clear => println!("Cleared."),
        UiRequest::NextActions(actions) => {
            println!("{}", plain(&next_action_lines(&actions, theme)));
        }
        UiRequest::OpenDetail(kind, id) => {
            let mut drawer =
                EntityDrawer::open(kind, ws.backend.clone(), ws.project_id.clone(), id);
            drawer.settled().await;
            println!("{}", plain(&drawer_lines(&drawer, theme)));
        }
        UiRequest::Edit(target) => {
            if !interactive {
                eprintln!("Editing {} needs an interactive session", target.label());
                return Ok(true);
            }
            let mut editor = FieldEditor::new(target.clone());
            editor.handle(EditorEvent::OpenMenu);

            println!("Asking for a better {}...", target.label());
            editor
                .drive(EditorEvent::ChooseAiRewrite, ws.backend.as_ref(), &ws.project_id)
                .await;
            let EditorState::AiSuggestion { suggestion } = editor.state() else {
                println!(
                    "No suggestion: {}",
                    editor.last_error().unwrap_or("nothing came back")
                );
                return Ok(true);
            };
            println!("\n{}\n", suggestion);
            print!("Use this? [y/N] ");
            io::stdout().flush()?;

            let mut answer = String::new();
            io::stdin().read_line(&mut answer)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                editor.handle(EditorEvent::Cancel);
                return Ok(true);
            }
            let Some(value) = editor
                .drive(EditorEvent::Accept, ws.backend.as_ref(), &ws.project_id)
                .await
            else {
                return Ok(true);
            };
            if let Outcome::Committed(_, Err(e)) = ws.perform(Task::Commit { target, value }).await {
                println!("Error: {}", e);
            }
        }
    }
    Ok(true)
}
