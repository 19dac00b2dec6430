//! Result rendering.
//!
//! Maps a parsed run response onto a fixed-order section view (Tasks,
//! Planned Events, Reminders, Report). Rendering is total: any input shape
//! lands on some rendered output, never an error.

use serde_json::Value;

use crate::model::{PlannedEvent, Reminder, Report, Task, WorkflowResult};

/// Placeholder shown when the whole payload is empty.
pub const NO_RESULTS: &str = "No results returned.";

/// What the results area shows: a lone notice line, or the four sections.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    Notice(String),
    Sections(Vec<Section>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// Per-section empty state.
    Empty(&'static str),
    Rows(Vec<Row>),
    Report(ReportBody),
}

/// One rendered list item plus the raw record it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub primary: String,
    pub meta: String,
    pub export: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportBody {
    pub summary: String,
    pub counts: String,
    pub top_actions: Vec<String>,
    pub export: Value,
}

impl ResultsView {
    /// Number of exportable records, in view order.
    pub fn export_count(&self) -> usize {
        match self {
            ResultsView::Notice(_) => 0,
            ResultsView::Sections(sections) => sections
                .iter()
                .map(|s| match &s.body {
                    SectionBody::Empty(_) => 0,
                    SectionBody::Rows(rows) => rows.len(),
                    SectionBody::Report(_) => 1,
                })
                .sum(),
        }
    }

    /// Raw record behind the n-th exportable item, in view order.
    pub fn export_at(&self, index: usize) -> Option<&Value> {
        let sections = match self {
            ResultsView::Sections(sections) => sections,
            ResultsView::Notice(_) => return None,
        };
        let mut remaining = index;
        for section in sections {
            match &section.body {
                SectionBody::Empty(_) => {}
                SectionBody::Rows(rows) => {
                    if remaining < rows.len() {
                        return Some(&rows[remaining].export);
                    }
                    remaining -= rows.len();
                }
                SectionBody::Report(report) => {
                    if remaining == 0 {
                        return Some(&report.export);
                    }
                    remaining -= 1;
                }
            }
        }
        None
    }

    /// Plain-text lines for one-shot output.
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            ResultsView::Notice(msg) => lines.push(msg.clone()),
            ResultsView::Sections(sections) => {
                for section in sections {
                    lines.push(format!("== {} ==", section.title));
                    match &section.body {
                        SectionBody::Empty(msg) => lines.push(format!("  {msg}")),
                        SectionBody::Rows(rows) => {
                            for row in rows {
                                lines.push(format!("  {}", row.primary));
                                if !row.meta.is_empty() {
                                    lines.push(format!("    {}", row.meta));
                                }
                            }
                        }
                        SectionBody::Report(report) => {
                            if !report.summary.is_empty() {
                                lines.push(format!("  {}", report.summary));
                            }
                            lines.push(format!("  {}", report.counts));
                            for action in &report.top_actions {
                                lines.push(format!("  - {action}"));
                            }
                        }
                    }
                }
            }
        }
        lines
    }
}

/// Render a run response. `None` and an all-absent payload both collapse to
/// the notice placeholder; anything else renders all four sections.
pub fn render_results(result: Option<&WorkflowResult>) -> ResultsView {
    let result = match result {
        Some(result) if !result.payload.is_empty() => result,
        _ => return ResultsView::Notice(NO_RESULTS.to_string()),
    };
    let payload = &result.payload;
    ResultsView::Sections(vec![
        Section {
            title: "Tasks",
            body: list_body(payload.tasks.as_deref(), "No tasks added", task_row),
        },
        Section {
            title: "Planned Events",
            body: list_body(payload.events.as_deref(), "No events planned", event_row),
        },
        Section {
            title: "Reminders",
            body: list_body(payload.reminders.as_deref(), "No reminders", reminder_row),
        },
        Section {
            title: "Report",
            body: report_body(payload.report.as_ref()),
        },
    ])
}

/// Absent and empty lists render the same empty-state line.
fn list_body<T>(items: Option<&[T]>, empty: &'static str, row: fn(&T) -> Row) -> SectionBody {
    match items {
        Some(items) if !items.is_empty() => SectionBody::Rows(items.iter().map(row).collect()),
        _ => SectionBody::Empty(empty),
    }
}

/// An absent or empty-string label falls back to the given default.
fn primary_label(label: Option<&str>, fallback: &str) -> String {
    match label {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => fallback.to_string(),
    }
}

/// Empty strings act like absent values in display positions.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn task_row(task: &Task) -> Row {
    let mut meta = String::new();
    if let Some(due) = non_empty(task.due.as_deref()) {
        meta.push_str(&format!("Due: {due} • "));
    }
    meta.push_str(&format!(
        "Priority: {}",
        non_empty(task.priority.as_deref()).unwrap_or("Medium")
    ));
    Row {
        primary: primary_label(task.title.as_deref(), "Untitled"),
        meta,
        export: task.raw.clone(),
    }
}

pub(crate) fn event_row(event: &PlannedEvent) -> Row {
    // A numeric duration of 0 reaches here as "0" and stays visible.
    let start = non_empty(event.start_time.as_deref()).unwrap_or("");
    let duration = event.duration_mins.as_deref().unwrap_or("");
    Row {
        primary: primary_label(event.title.as_deref(), "Event"),
        meta: format!("{start} • {duration} mins"),
        export: event.raw.clone(),
    }
}

pub(crate) fn reminder_row(reminder: &Reminder) -> Row {
    Row {
        primary: format!(
            "Task {} • Remind at: {}",
            reminder.task_id.as_deref().unwrap_or(""),
            reminder.remind_at().unwrap_or("")
        ),
        meta: String::new(),
        export: reminder.raw.clone(),
    }
}

fn report_body(report: Option<&Report>) -> SectionBody {
    let report = match report {
        Some(report) if !report.is_empty() => report,
        _ => return SectionBody::Empty("No report"),
    };
    SectionBody::Report(ReportBody {
        summary: report.summary.clone().unwrap_or_default(),
        counts: format!(
            "Completed: {} • Pending: {}",
            report.completed_count.as_deref().unwrap_or("0"),
            report.pending_count.as_deref().unwrap_or("0")
        ),
        top_actions: report.top_actions.clone(),
        export: report.raw.clone(),
    })
}

/// Dashboard variant of a task row; stored tasks flag completion.
pub fn dashboard_task_row(task: &Task) -> Row {
    let mut row = task_row(task);
    if task.is_done() {
        row.primary.push_str(" • Done");
    }
    row
}
