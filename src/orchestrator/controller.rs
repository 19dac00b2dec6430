//! Request lifecycle controller.
//!
//! Owns the lifecycle phase and the one in-flight service call, and emits
//! events back to presentation layers. Commands are processed one at a time,
//! so a second operation can never start while one is running.

use crate::client::WorkflowClient;
use crate::model::{InfoEvent, UiEvent, UiPhase};
use crate::render::{self, ResultsView};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Validation message for a blank submit.
pub(crate) const EMPTY_INPUT_MESSAGE: &str = "Enter some instructions to run the workflow.";

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Run the workflow with the given instruction text.
    Submit { text: String },
    /// Clear the input field only; never touches results or the service.
    ClearInput,
    /// Clear the service's stored state. Sent only after the user confirmed.
    ClearStore { on_dashboard: bool, include_done: bool },
    /// Re-fetch the dashboard read endpoints.
    RefreshDashboard { include_done: bool },
    /// Flag a stored task as done, then re-fetch the dashboard.
    MarkTaskDone { task_id: String, include_done: bool },
    Quit,
}

/// Single authority over the lifecycle phase.
pub(crate) struct WorkflowController {
    client: WorkflowClient,
    event_tx: UnboundedSender<UiEvent>,
}

impl WorkflowController {
    pub(crate) fn new(client: WorkflowClient, event_tx: UnboundedSender<UiEvent>) -> Self {
        Self { client, event_tx }
    }

    fn set_phase(&mut self, phase: UiPhase) {
        let _ = self.event_tx.send(UiEvent::PhaseChanged { phase });
    }

    fn show_error(&mut self, message: String) {
        let _ = self.event_tx.send(UiEvent::ErrorShown { message });
    }

    fn info(&mut self, event: InfoEvent) {
        let _ = self.event_tx.send(UiEvent::Info(event));
    }

    /// One health probe at startup; the outcome only feeds the status line.
    pub(crate) async fn probe_server(&mut self) {
        let base_url = self.client.base_url().to_string();
        let event = match self.client.health().await {
            Ok(true) => InfoEvent::ServerHealthy { base_url },
            Ok(false) => InfoEvent::ServerUnreachable {
                base_url,
                detail: "unexpected health response".to_string(),
            },
            Err(e) => InfoEvent::ServerUnreachable {
                base_url,
                detail: e.to_string(),
            },
        };
        self.info(event);
    }

    /// Validate, drop the previous presentation, call the run endpoint, and
    /// render the outcome. Every path ends in a non-loading phase, and the
    /// phase change is always the last event out.
    pub(crate) async fn run_workflow(&mut self, raw_input: &str) {
        let text = raw_input.trim().to_string();
        if text.is_empty() {
            // Fail fast: no request, and the previous results stay up.
            self.show_error(EMPTY_INPUT_MESSAGE.to_string());
            self.set_phase(UiPhase::ShowingError);
            return;
        }

        let _ = self.event_tx.send(UiEvent::ErrorCleared);
        let _ = self.event_tx.send(UiEvent::ResultsCleared);
        self.info(InfoEvent::Message("Running workflow…".into()));
        self.set_phase(UiPhase::Loading);

        match self.client.run_workflow(&text).await {
            Ok(result) => {
                let view = render::render_results(Some(&result));
                let _ = self.event_tx.send(UiEvent::ResultsRendered { view });
                self.set_phase(UiPhase::ShowingResult);
            }
            Err(e) => {
                self.show_error(e.run_message());
                self.set_phase(UiPhase::ShowingError);
            }
        }
    }

    /// Clear only the input field. No network call, no phase change, no
    /// effect on results or the error line.
    pub(crate) fn clear_input(&mut self) {
        let _ = self.event_tx.send(UiEvent::InputCleared);
    }

    /// Clear the service's stored state. Failure leaves the results area
    /// untouched; success replaces it with a confirmation notice.
    pub(crate) async fn clear_store(&mut self, on_dashboard: bool, include_done: bool) {
        self.info(InfoEvent::Message("Clearing database…".into()));
        self.set_phase(UiPhase::Loading);

        match self.client.clear_store().await {
            Ok(()) => {
                let _ = self.event_tx.send(UiEvent::ResultsRendered {
                    view: ResultsView::Notice("Database cleared.".to_string()),
                });
                self.set_phase(UiPhase::ShowingResult);
                if on_dashboard {
                    self.refresh_dashboard(include_done).await;
                }
            }
            Err(e) => {
                self.show_error(format!("Failed to clear DB: {e}"));
                self.set_phase(UiPhase::ShowingError);
            }
        }
    }

    /// Re-fetch the dashboard read endpoints. Failures land on the status
    /// line instead of the lifecycle error slot.
    pub(crate) async fn refresh_dashboard(&mut self, include_done: bool) {
        match self.client.fetch_dashboard(include_done).await {
            Ok(data) => {
                let _ = self.event_tx.send(UiEvent::DashboardLoaded { data });
            }
            Err(e) => {
                self.info(InfoEvent::Message(format!("Dashboard refresh failed: {e}")));
            }
        }
    }

    pub(crate) async fn mark_task_done(&mut self, task_id: &str, include_done: bool) {
        match self.client.mark_task_done(task_id).await {
            Ok(()) => {
                self.info(InfoEvent::Message(format!("Task {task_id} marked done")));
                self.refresh_dashboard(include_done).await;
            }
            Err(e) => {
                self.info(InfoEvent::Message(format!("Mark done failed: {e}")));
            }
        }
    }
}

/// Drive the controller from UI commands until quit or channel close.
pub(crate) async fn run_controller(
    client: WorkflowClient,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut controller = WorkflowController::new(client, event_tx);
    controller.probe_server().await;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::Submit { text } => controller.run_workflow(&text).await,
            UiCommand::ClearInput => controller.clear_input(),
            UiCommand::ClearStore {
                on_dashboard,
                include_done,
            } => controller.clear_store(on_dashboard, include_done).await,
            UiCommand::RefreshDashboard { include_done } => {
                controller.refresh_dashboard(include_done).await
            }
            UiCommand::MarkTaskDone {
                task_id,
                include_done,
            } => controller.mark_task_done(&task_id, include_done).await,
            UiCommand::Quit => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Row, Section, SectionBody};
    use serde_json::json;
    use tokio::sync::mpsc;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller_for(
        url: &str,
    ) -> (WorkflowController, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = WorkflowClient::new(url).unwrap();
        (WorkflowController::new(client, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn last_phase(events: &[UiEvent]) -> Option<UiPhase> {
        events.iter().rev().find_map(|ev| match ev {
            UiEvent::PhaseChanged { phase } => Some(*phase),
            _ => None,
        })
    }

    #[tokio::test]
    async fn blank_submit_fails_fast_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.run_workflow("   \t  ").await;

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                UiEvent::ErrorShown {
                    message: EMPTY_INPUT_MESSAGE.to_string()
                },
                UiEvent::PhaseChanged {
                    phase: UiPhase::ShowingError
                },
            ]
        );
    }

    #[tokio::test]
    async fn successful_run_renders_sections_and_ends_on_showing_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_json(json!({"text": "plan my day"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"task_extractor_agent": {"added": [
                    {"title": "Buy milk", "priority": "High"}
                ]}}
            })))
            .mount(&server)
            .await;

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.run_workflow("plan my day").await;

        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::ErrorCleared));
        assert!(events.contains(&UiEvent::ResultsCleared));
        assert!(events.contains(&UiEvent::PhaseChanged {
            phase: UiPhase::Loading
        }));
        assert_eq!(last_phase(&events), Some(UiPhase::ShowingResult));

        let view = events
            .iter()
            .find_map(|ev| match ev {
                UiEvent::ResultsRendered { view } => Some(view.clone()),
                _ => None,
            })
            .expect("a rendered view");
        let sections: Vec<Section> = match view {
            ResultsView::Sections(sections) => sections,
            other => panic!("expected sections, got {other:?}"),
        };
        let rows: &[Row] = match &sections[0].body {
            SectionBody::Rows(rows) => rows,
            other => panic!("expected task rows, got {other:?}"),
        };
        assert_eq!(rows[0].primary, "Buy milk");
        assert_eq!(rows[0].meta, "Priority: High");
        assert_eq!(sections[1].body, SectionBody::Empty("No events planned"));
        assert_eq!(sections[2].body, SectionBody::Empty("No reminders"));
        assert_eq!(sections[3].body, SectionBody::Empty("No report"));
    }

    #[tokio::test]
    async fn service_error_document_surfaces_its_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.run_workflow("plan").await;

        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::ErrorShown {
            message: "db down".to_string()
        }));
        assert_eq!(last_phase(&events), Some(UiPhase::ShowingError));
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, UiEvent::ResultsRendered { .. })));
    }

    #[tokio::test]
    async fn transport_failure_gets_the_network_error_prefix() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (mut controller, mut rx) = controller_for(&url);
        controller.run_workflow("plan").await;

        let events = drain(&mut rx);
        let message = events
            .iter()
            .find_map(|ev| match ev {
                UiEvent::ErrorShown { message } => Some(message.clone()),
                _ => None,
            })
            .expect("an error message");
        assert!(message.starts_with("Network error: "), "got {message:?}");
        assert_eq!(last_phase(&events), Some(UiPhase::ShowingError));
    }

    #[tokio::test]
    async fn clear_input_emits_exactly_one_event() {
        let (mut controller, mut rx) = controller_for("http://127.0.0.1:9");
        controller.clear_input();
        assert_eq!(drain(&mut rx), vec![UiEvent::InputCleared]);
    }

    #[tokio::test]
    async fn clear_store_success_shows_the_notice_and_keeps_the_error_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.clear_store(false, false).await;

        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::ResultsRendered {
            view: ResultsView::Notice("Database cleared.".to_string())
        }));
        assert!(!events.contains(&UiEvent::ErrorCleared));
        assert_eq!(last_phase(&events), Some(UiPhase::ShowingResult));
    }

    #[tokio::test]
    async fn clear_store_failure_leaves_results_alone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.clear_store(false, false).await;

        let events = drain(&mut rx);
        assert!(events.contains(&UiEvent::ErrorShown {
            message: "Failed to clear DB: boom".to_string()
        }));
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, UiEvent::ResultsRendered { .. } | UiEvent::ResultsCleared)));
        assert_eq!(last_phase(&events), Some(UiPhase::ShowingError));
    }

    #[tokio::test]
    async fn clear_store_on_dashboard_refetches_the_read_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;
        for (route, key) in [("/tasks", "tasks"), ("/events", "events"), ("/reminders", "reminders")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({key: []})))
                .mount(&server)
                .await;
        }

        let (mut controller, mut rx) = controller_for(&server.uri());
        controller.clear_store(true, false).await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|ev| matches!(
            ev,
            UiEvent::DashboardLoaded { data } if data.tasks.is_empty()
        )));
    }
}
