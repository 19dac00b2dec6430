use crate::config::Theme;
use crate::model::{DashboardData, UiEvent, UiPhase};
use crate::render::ResultsView;
use ratatui::style::Color;
use std::time::Instant;

pub struct UiState {
    pub tab: usize,
    pub theme: Theme,
    pub phase: UiPhase,
    pub info: String,
    pub server: String,

    // Workflow tab
    pub input: String,
    pub error: Option<String>,
    pub results: Option<ResultsView>,
    pub selected_export: usize, // Index into the view's exportable records
    pub pending_auto_run: Option<Instant>,

    // Clear-store confirmation overlay
    pub confirm_clear: bool,

    // Dashboard tab
    pub dashboard: DashboardData,
    pub dashboard_loaded: bool,
    pub dashboard_selected: usize,
    pub include_done: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            theme: Theme::Light,
            phase: UiPhase::Idle,
            info: String::new(),
            server: String::new(),
            input: String::new(),
            error: None,
            results: None,
            selected_export: 0,
            pending_auto_run: None,
            confirm_clear: false,
            dashboard: DashboardData::default(),
            dashboard_loaded: false,
            dashboard_selected: 0,
            include_done: false,
        }
    }
}

impl UiState {
    /// Keys that start an operation are inert while one is in flight.
    pub fn controls_enabled(&self) -> bool {
        self.phase != UiPhase::Loading
    }

    pub fn export_count(&self) -> usize {
        self.results
            .as_ref()
            .map(|view| view.export_count())
            .unwrap_or(0)
    }
}

/// Fold one controller event into the UI mirror. The controller is the only
/// authority; nothing here second-guesses phases or ordering.
pub fn apply_event(state: &mut UiState, ev: UiEvent) {
    match ev {
        UiEvent::PhaseChanged { phase } => state.phase = phase,
        UiEvent::ErrorShown { message } => state.error = Some(message),
        UiEvent::ErrorCleared => state.error = None,
        UiEvent::ResultsRendered { view } => {
            state.results = Some(view);
            state.selected_export = 0;
        }
        UiEvent::ResultsCleared => {
            state.results = None;
            state.selected_export = 0;
        }
        UiEvent::InputCleared => state.input.clear(),
        UiEvent::DashboardLoaded { data } => {
            state.dashboard = data;
            state.dashboard_loaded = true;
            if state.dashboard_selected >= state.dashboard.tasks.len() {
                state.dashboard_selected = state.dashboard.tasks.len().saturating_sub(1);
            }
        }
        UiEvent::Info(info) => state.info = info.to_message(),
    }
}

/// Panel colors per theme.
pub struct Palette {
    pub accent: Color,
    pub border: Color,
    pub label: Color,
    pub error: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            accent: Color::Yellow,
            border: Color::Reset,
            label: Color::Gray,
            error: Color::Red,
        },
        Theme::Dark => Palette {
            accent: Color::Cyan,
            border: Color::DarkGray,
            label: Color::DarkGray,
            error: Color::LightRed,
        },
    }
}
