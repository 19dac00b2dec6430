use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::render::ResultsView;

/// Body for the run endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRequest {
    pub text: String,
}

/// Parsed run response. The service wraps the agent payload as
/// `{"ok": true, "result": {...}}`, while older deployments returned the
/// payload bare; both shapes are accepted, and an explicit `result` key wins
/// even when its value is null.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct WorkflowResult {
    pub payload: AgentPayload,
    /// Exact response document as received, kept for raw JSON output.
    pub raw: Value,
}

impl From<Value> for WorkflowResult {
    fn from(raw: Value) -> Self {
        let payload = match raw.get("result") {
            Some(inner) => AgentPayload::from_value(inner),
            None => AgentPayload::from_value(&raw),
        };
        Self { payload, raw }
    }
}

/// Up to four independent agent outputs. Each key may be missing entirely; a
/// null value or a non-object payload also reads as absent. Whatever cannot
/// be read normalizes to absence instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPayload {
    pub tasks: Option<Vec<Task>>,
    pub events: Option<Vec<PlannedEvent>>,
    pub reminders: Option<Vec<Reminder>>,
    pub report: Option<Report>,
}

impl AgentPayload {
    fn from_value(v: &Value) -> Self {
        Self {
            tasks: agent_items(v, "task_extractor_agent", "added"),
            events: agent_items(v, "planner_agent", "events"),
            reminders: agent_items(v, "reminder_agent", "reminders"),
            report: match v.get("reporter_agent") {
                Some(r) if !r.is_null() => Some(Report::from(r.clone())),
                _ => None,
            },
        }
    }

    /// True when none of the four agent keys yielded anything; the results
    /// area shows a single placeholder in that case.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_none()
            && self.events.is_none()
            && self.reminders.is_none()
            && self.report.is_none()
    }
}

/// Pull `v[agent][list_key]` as a list of items. A present agent key with a
/// missing or malformed list yields an empty list; an absent or null agent
/// key yields `None`.
fn agent_items<T: From<Value>>(v: &Value, agent: &str, list_key: &str) -> Option<Vec<T>> {
    let output = v.get(agent)?;
    if output.is_null() {
        return None;
    }
    let items = match output.get(list_key) {
        Some(Value::Array(items)) => items.iter().cloned().map(T::from).collect(),
        _ => Vec::new(),
    };
    Some(items)
}

/// Display form of a loose JSON field: strings pass through, numbers and
/// bools format to their literal text, arrays and objects degrade to compact
/// JSON, null and missing read as absent.
fn display_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

fn field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(display_string)
}

/// A task extracted by the service. Only display fields are lifted; `raw`
/// keeps the record exactly as sent (including `created_at`, `done`, and
/// anything else) for export and dashboard actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Option<String>,
    pub title: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub raw: Value,
}

impl From<Value> for Task {
    fn from(raw: Value) -> Self {
        Self {
            id: field(&raw, "id"),
            title: field(&raw, "title"),
            due: field(&raw, "due"),
            priority: field(&raw, "priority"),
            raw,
        }
    }
}

impl Task {
    pub fn is_done(&self) -> bool {
        match self.raw.get("done") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEvent {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub duration_mins: Option<String>,
    pub raw: Value,
}

impl From<Value> for PlannedEvent {
    fn from(raw: Value) -> Self {
        Self {
            title: field(&raw, "title"),
            start_time: field(&raw, "start_time"),
            duration_mins: field(&raw, "duration_mins"),
            raw,
        }
    }
}

/// A reminder tied to a task. The remind-at timestamp historically appeared
/// under both `remind_at` and `remindAt`; both spellings are read.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub task_id: Option<String>,
    remind_at: Option<String>,
    remind_at_compat: Option<String>,
    pub raw: Value,
}

impl From<Value> for Reminder {
    fn from(raw: Value) -> Self {
        Self {
            task_id: field(&raw, "task_id"),
            remind_at: field(&raw, "remind_at"),
            remind_at_compat: field(&raw, "remindAt"),
            raw,
        }
    }
}

impl Reminder {
    /// `remind_at` wins when both spellings are present; empty strings read
    /// as absent.
    pub fn remind_at(&self) -> Option<&str> {
        let spellings = [&self.remind_at, &self.remind_at_compat];
        spellings
            .into_iter()
            .find_map(|v| v.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub summary: Option<String>,
    pub completed_count: Option<String>,
    pub pending_count: Option<String>,
    pub top_actions: Vec<String>,
    pub raw: Value,
}

impl From<Value> for Report {
    fn from(raw: Value) -> Self {
        let top_actions = match raw.get("top_actions") {
            Some(Value::Array(items)) => items.iter().filter_map(display_string).collect(),
            _ => Vec::new(),
        };
        Self {
            summary: field(&raw, "summary"),
            completed_count: field(&raw, "completed_count"),
            pending_count: field(&raw, "pending_count"),
            top_actions,
            raw,
        }
    }
}

impl Report {
    /// An absent record and a record with no keys both read as empty.
    pub fn is_empty(&self) -> bool {
        self.raw.as_object().map(|m| m.is_empty()).unwrap_or(true)
    }
}

/// Stored state fetched from the service's read endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub tasks: Vec<Task>,
    pub events: Vec<PlannedEvent>,
    pub reminders: Vec<Reminder>,
}

/// Lifecycle phase of the one allowed in-flight operation. Controls are
/// enabled exactly when the phase is not `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiPhase {
    #[default]
    Idle,
    Loading,
    ShowingError,
    ShowingResult,
}

/// Events emitted by the controller and consumed by presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PhaseChanged { phase: UiPhase },
    ErrorShown { message: String },
    ErrorCleared,
    ResultsRendered { view: ResultsView },
    ResultsCleared,
    InputCleared,
    DashboardLoaded { data: DashboardData },
    Info(InfoEvent),
}

/// Structured info events consumed by UI/CLI status lines.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoEvent {
    Message(String),
    ServerHealthy { base_url: String },
    ServerUnreachable { base_url: String, detail: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::ServerHealthy { base_url } => format!("Connected to {}", base_url),
            InfoEvent::ServerUnreachable { base_url, detail } => {
                format!("Cannot reach {}: {}", base_url, detail)
            }
        }
    }
}
