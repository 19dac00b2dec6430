//! HTTP client for the workflow service.
//!
//! Call outcomes are classified, not just propagated: a reachable service
//! that answered with an error document is an application error, while
//! anything that prevented an answer from arriving (connect, timeout, an
//! unreadable body) is a transport error.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{DashboardData, PlannedEvent, Reminder, Task, WorkflowRequest, WorkflowResult};

/// Failure classes for service calls.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The service answered and reported a failure.
    #[error("{0}")]
    Application(String),
    /// The request never completed.
    #[error("{0}")]
    Transport(String),
}

impl InvokeError {
    /// User-facing message for a failed run.
    pub fn run_message(&self) -> String {
        match self {
            InvokeError::Application(message) => message.clone(),
            InvokeError::Transport(detail) => format!("Network error: {detail}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl WorkflowClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("workflowgenie-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the instruction text to the run endpoint and parse the response.
    pub async fn run_workflow(&self, text: &str) -> Result<WorkflowResult, InvokeError> {
        let request = WorkflowRequest {
            text: text.to_string(),
        };
        let resp = self
            .http
            .post(format!("{}/run", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(InvokeError::Application(run_error_message(resp).await));
        }
        resp.json().await.map_err(transport)
    }

    /// POST to the clear endpoint. A success body carries no information
    /// beyond the HTTP status, so success is just `()`.
    pub async fn clear_store(&self) -> Result<(), InvokeError> {
        let resp = self
            .http
            .post(format!("{}/clear_db", self.base_url))
            .json(&json!({}))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        let detail = if body.trim().is_empty() {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string())
        } else {
            body.trim().to_string()
        };
        Err(InvokeError::Application(detail))
    }

    /// One-shot health probe against the service root.
    pub async fn health(&self) -> Result<bool, InvokeError> {
        let body = self
            .read_json(self.http.get(format!("{}/health", self.base_url)))
            .await?;
        Ok(body.get("status").and_then(Value::as_str) == Some("ok"))
    }

    pub async fn list_tasks(&self, include_done: bool) -> Result<Vec<Task>, InvokeError> {
        let mut req = self.http.get(format!("{}/tasks", self.base_url));
        if include_done {
            req = req.query(&[("include_done", "true")]);
        }
        let body = self.read_json(req).await?;
        Ok(value_items(&body, "tasks"))
    }

    pub async fn list_events(&self) -> Result<Vec<PlannedEvent>, InvokeError> {
        let body = self
            .read_json(self.http.get(format!("{}/events", self.base_url)))
            .await?;
        Ok(value_items(&body, "events"))
    }

    pub async fn list_reminders(&self) -> Result<Vec<Reminder>, InvokeError> {
        let body = self
            .read_json(self.http.get(format!("{}/reminders", self.base_url)))
            .await?;
        Ok(value_items(&body, "reminders"))
    }

    /// Flag a stored task as done.
    pub async fn mark_task_done(&self, task_id: &str) -> Result<(), InvokeError> {
        let resp = self
            .http
            .post(format!("{}/tasks/{}/done", self.base_url, task_id))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(InvokeError::Application(resp.status().to_string()));
        }
        Ok(())
    }

    /// Fetch all three read endpoints for the dashboard.
    pub async fn fetch_dashboard(&self, include_done: bool) -> Result<DashboardData, InvokeError> {
        let tasks = self.list_tasks(include_done).await?;
        let events = self.list_events().await?;
        let reminders = self.list_reminders().await?;
        Ok(DashboardData {
            tasks,
            events,
            reminders,
        })
    }

    async fn read_json(&self, req: reqwest::RequestBuilder) -> Result<Value, InvokeError> {
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(InvokeError::Application(status.to_string()));
        }
        resp.json().await.map_err(transport)
    }
}

/// Read the message out of a failed run response. Only a non-empty string
/// under `"error"` is trusted; anything else gets the fixed fallback.
async fn run_error_message(resp: reqwest::Response) -> String {
    const FALLBACK: &str = "Workflow run failed";
    let body: Value = match resp.json().await {
        Ok(body) => body,
        Err(_) => return FALLBACK.to_string(),
    };
    match body.get("error").and_then(Value::as_str) {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => FALLBACK.to_string(),
    }
}

fn transport(e: reqwest::Error) -> InvokeError {
    // Keep the cause chain; reqwest's Display alone drops it.
    InvokeError::Transport(format!("{:#}", anyhow::Error::new(e)))
}

/// Read `body[key]` as a list of loosely-typed items; anything that is not
/// an array reads as empty.
fn value_items<T: From<Value>>(body: &Value, key: &str) -> Vec<T> {
    match body.get(key) {
        Some(Value::Array(items)) => items.iter().cloned().map(T::from).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn run_posts_text_and_parses_the_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .and(body_json(json!({"text": "plan my day"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"task_extractor_agent": {"added": [{"title": "Buy milk"}]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        let result = client.run_workflow("plan my day").await.unwrap();
        assert_eq!(result.payload.tasks.as_ref().unwrap().len(), 1);
        assert_eq!(result.raw["ok"], json!(true));
    }

    #[tokio::test]
    async fn run_error_document_maps_to_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        match client.run_workflow("x").await {
            Err(InvokeError::Application(msg)) => assert_eq!(msg, "db down"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_error_body_gets_the_fixed_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        match client.run_workflow("x").await {
            Err(InvokeError::Application(msg)) => assert_eq!(msg, "Workflow run failed"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_error_string_also_gets_the_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": ""})))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        match client.run_workflow("x").await {
            Err(InvokeError::Application(msg)) => assert_eq!(msg, "Workflow run failed"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_success_body_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        assert!(matches!(
            client.run_workflow("x").await,
            Err(InvokeError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = WorkflowClient::new(&url).unwrap();
        match client.run_workflow("x").await {
            Err(InvokeError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clear_store_succeeds_on_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": "Database cleared"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        client.clear_store().await.unwrap();
    }

    #[tokio::test]
    async fn clear_store_reports_body_text_then_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        match client.clear_store().await {
            Err(InvokeError::Application(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected application error, got {other:?}"),
        }

        server.reset().await;
        Mock::given(method("POST"))
            .and(path("/clear_db"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        match client.clear_store().await {
            Err(InvokeError::Application(msg)) => assert_eq!(msg, "Internal Server Error"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn include_done_is_sent_only_when_asked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .and(query_param("include_done", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [{"id": 1, "title": "a", "done": true}, {"id": 2, "title": "b"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [{"id": 2, "title": "b"}]
            })))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        assert_eq!(client.list_tasks(true).await.unwrap().len(), 2);
        assert_eq!(client.list_tasks(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_done_posts_to_the_task_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks/7/done"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        client.mark_task_done("7").await.unwrap();
    }

    #[tokio::test]
    async fn dashboard_fetch_combines_the_read_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": [{"id": 1}]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/reminders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reminders": [{"task_id": 1, "remindAt": "18:00"}]
            })))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        let data = client.fetch_dashboard(false).await.unwrap();
        assert_eq!(data.tasks.len(), 1);
        assert!(data.events.is_empty());
        assert_eq!(data.reminders[0].remind_at(), Some("18:00"));
    }

    #[tokio::test]
    async fn health_checks_the_status_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let client = WorkflowClient::new(&server.uri()).unwrap();
        assert!(client.health().await.unwrap());
    }
}
