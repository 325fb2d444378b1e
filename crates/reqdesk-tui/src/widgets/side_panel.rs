//! Side panel: suggested next actions and the open entity drawer

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Widget, Wrap},
};
use reqdesk_api::{
    DataEntityDetail, DriverDetail, DriverField, Evidence, NextAction, StakeholderDetail,
};
use reqdesk_chat::{DetailState, EditorState, EntityDrawer, FieldEditor};

/// Tabs of the side panel; the name is what gets persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    NextActions,
    Details,
}

impl PanelTab {
    pub const ALL: [PanelTab; 2] = [PanelTab::NextActions, PanelTab::Details];

    pub fn name(&self) -> &'static str {
        match self {
            PanelTab::NextActions => "next-actions",
            PanelTab::Details => "details",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn title(&self) -> &'static str {
        match self {
            PanelTab::NextActions => "Next actions",
            PanelTab::Details => "Details",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PanelTab::NextActions => PanelTab::Details,
            PanelTab::Details => PanelTab::NextActions,
        }
    }
}

pub fn next_action_lines(actions: &[NextAction], theme: &Theme) -> Vec<Line<'static>> {
    if actions.is_empty() {
        return vec![Line::from(Span::styled(
            "Nothing suggested right now.",
            theme.dim_style(),
        ))];
    }
    let mut lines = Vec::new();
    for (i, action) in actions.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{}. ", i + 1), theme.dim_style()),
            Span::styled(action.title.clone(), theme.accent_bold()),
        ]));
        if let Some(desc) = &action.description {
            lines.push(Line::from(Span::styled(format!("   {}", desc), theme.dim_style())));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Ctrl+T to pick one", theme.dim_style())));
    lines
}

fn heading(text: &str, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        theme.accent_bold().add_modifier(Modifier::UNDERLINED),
    ))
}

fn field(label: &str, value: Option<&str>, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), theme.dim_style()),
        Span::styled(value.unwrap_or("—").to_string(), theme.base_style()),
    ])
}

fn evidence_lines(evidence: &[Evidence], theme: &Theme) -> Vec<Line<'static>> {
    if evidence.is_empty() {
        return vec![];
    }
    let mut lines = vec![Line::from(""), heading("Evidence", theme)];
    for item in evidence {
        lines.push(Line::from(Span::styled(
            format!("“{}”", item.excerpt),
            theme.base_style().add_modifier(Modifier::ITALIC),
        )));
        if !item.rationale.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {} ({})", item.rationale, item.source_type),
                theme.dim_style(),
            )));
        }
    }
    lines
}

fn stakeholder_lines(s: &StakeholderDetail, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading(&s.name, theme),
        field("Role", s.role.as_deref(), theme),
        field("Type", s.stakeholder_type.as_deref(), theme),
        field("Influence", s.influence_level.as_deref(), theme),
    ];
    for (title, items) in [("Goals", &s.goals), ("Pain points", &s.pain_points)] {
        if !items.is_empty() {
            lines.push(Line::from(""));
            lines.push(heading(title, theme));
            lines.extend(items.iter().map(|g| Line::from(format!("• {}", g))));
        }
    }
    lines.extend(evidence_lines(&s.evidence, theme));
    lines
}

fn driver_lines(d: &DriverDetail, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading(d.driver_type.as_deref().unwrap_or("Business driver"), theme),
        field("Description", DriverField::Description.value_of(d), theme),
        field("Measurement", DriverField::Measurement.value_of(d), theme),
        field("Desired outcome", DriverField::DesiredOutcome.value_of(d), theme),
    ];
    if let Some(f) = &d.financials {
        let money = |v: Option<f64>| v.map(|v| format!("{:.0} {}", v, f.currency.as_deref().unwrap_or("")));
        lines.push(Line::from(""));
        lines.push(heading("Financials", theme));
        lines.push(field("Current", money(f.current_value).as_deref(), theme));
        lines.push(field("Target", money(f.target_value).as_deref(), theme));
        lines.push(field("Timeframe", f.timeframe.as_deref(), theme));
        lines.push(field("Confidence", f.confidence.as_deref(), theme));
    }
    lines.extend(evidence_lines(&d.evidence, theme));
    lines
}

fn entity_lines(e: &DataEntityDetail, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading(&e.name, theme),
        field("Category", e.entity_category.as_deref(), theme),
        field("Description", e.description.as_deref(), theme),
    ];
    if !e.fields.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading("Fields", theme));
        for f in &e.fields {
            let required = if f.required { " *" } else { "" };
            lines.push(Line::from(vec![
                Span::styled(format!("{}{}", f.name, required), theme.base_style()),
                Span::styled(
                    format!("  {}", f.field_type.as_deref().unwrap_or("")),
                    theme.dim_style(),
                ),
            ]));
        }
    }
    lines.extend(evidence_lines(&e.evidence, theme));
    lines
}

fn state_lines<T>(
    state: &DetailState<T>,
    kind: &str,
    theme: &Theme,
    render: impl Fn(&T, &Theme) -> Vec<Line<'static>>,
) -> Vec<Line<'static>> {
    match state {
        DetailState::Loading => vec![Line::from(Span::styled(
            format!("Loading {}…", kind),
            theme.dim_style(),
        ))],
        DetailState::Loaded(detail) => render(detail, theme),
        DetailState::Failed(error) => vec![
            Line::from(Span::styled(format!("Failed to load {}", kind), theme.error_style())),
            Line::from(Span::styled(error.clone(), theme.dim_style())),
        ],
    }
}

pub fn drawer_lines(drawer: &EntityDrawer, theme: &Theme) -> Vec<Line<'static>> {
    let kind = drawer.kind().label();
    match drawer {
        EntityDrawer::Stakeholder(d) => d.with_state(|s| state_lines(s, kind, theme, stakeholder_lines)),
        EntityDrawer::Driver(d) => d.with_state(|s| state_lines(s, kind, theme, driver_lines)),
        EntityDrawer::DataEntity(d) => d.with_state(|s| state_lines(s, kind, theme, entity_lines)),
    }
}

pub fn editor_lines(editor: &FieldEditor, theme: &Theme) -> Vec<Line<'static>> {
    let label = editor.target().label();
    let mut lines = vec![Line::from(""), heading(&format!("Editing {}", label), theme)];
    match editor.state() {
        EditorState::Idle => {}
        EditorState::Menu => lines.push(Line::from(Span::styled(
            "Choose: manual edit, AI rewrite, or AI with notes",
            theme.dim_style(),
        ))),
        EditorState::Manual { draft } => lines.push(Line::from(draft.clone())),
        EditorState::AiNotes { notes } => {
            lines.push(Line::from(Span::styled("Notes for the rewrite:", theme.dim_style())));
            lines.push(Line::from(notes.clone()));
        }
        EditorState::AiLoading { .. } => lines.push(Line::from(Span::styled(
            "Asking for a suggestion…",
            theme.warning_style(),
        ))),
        EditorState::AiSuggestion { suggestion } => {
            lines.push(Line::from(Span::styled(suggestion.clone(), theme.success_style())));
            lines.push(Line::from(Span::styled(
                "Enter to accept, Esc to discard",
                theme.dim_style(),
            )));
        }
    }
    if let Some(error) = editor.last_error() {
        lines.push(Line::from(Span::styled(error.to_string(), theme.error_style())));
    }
    lines
}

/// Bordered panel with a tab strip and pre-built body lines
pub struct SidePanel<'a> {
    tab: PanelTab,
    body: Vec<Line<'static>>,
    theme: &'a Theme,
}

impl<'a> SidePanel<'a> {
    pub fn new(tab: PanelTab, body: Vec<Line<'static>>, theme: &'a Theme) -> Self {
        Self { tab, body, theme }
    }
}

impl Widget for SidePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height < 2 {
            return;
        }

        let selected = PanelTab::ALL.iter().position(|t| *t == self.tab).unwrap_or(0);
        Tabs::new(PanelTab::ALL.iter().map(|t| t.title()))
            .select(selected)
            .style(self.theme.dim_style())
            .highlight_style(self.theme.accent_bold())
            .render(Rect::new(inner.x, inner.y, inner.width, 1), buf);

        let body = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
        Paragraph::new(self.body)
            .wrap(Wrap { trim: false })
            .render(body, buf);
    }
}
