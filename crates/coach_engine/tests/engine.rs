use std::sync::Arc;
use std::time::Duration;

use coach_core::{
    ContentKey, ExecutionError, ExecutionRequest, FetchError, FetchFailure, RunTicket,
};
use coach_engine::{CodeExecutor, ContentSource, EngineEvent, EngineHandle, EngineStopped};

/// Echoes the code back; code starting with `sleep` takes a long time.
struct EchoExecutor;

#[async_trait::async_trait]
impl CodeExecutor for EchoExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
        if request.code.starts_with("sleep") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(request.code.clone())
    }
}

struct EmptyContent;

#[async_trait::async_trait]
impl ContentSource for EmptyContent {
    async fn fetch(&self, _key: &ContentKey) -> Result<serde_json::Value, FetchError> {
        Err(FetchError::new(FetchFailure::Network, "offline"))
    }

    async fn list_questions(&self) -> Result<serde_json::Value, FetchError> {
        Ok(serde_json::json!([{ "site": "so", "question_id": "1" }]))
    }
}

fn engine() -> EngineHandle {
    EngineHandle::with_clients(Arc::new(EchoExecutor), Arc::new(EmptyContent))
}

fn request(code: &str) -> ExecutionRequest {
    ExecutionRequest {
        language: "python".to_string(),
        code: code.to_string(),
        site: None,
        question_id: None,
    }
}

#[test]
fn execution_result_comes_back_with_ticket() {
    let engine = engine();
    let ticket = RunTicket { session: 1, run: 1 };
    engine.execute(ticket, request("print(1)"));

    let event = engine.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        event,
        Some(EngineEvent::ExecutionFinished {
            ticket,
            result: Ok("print(1)".to_string()),
        })
    );
}

#[test]
fn cancelled_run_reports_nothing() {
    let engine = engine();
    let slow = RunTicket { session: 1, run: 1 };
    engine.execute(slow, request("sleep"));
    engine.cancel(slow);

    let fast = RunTicket { session: 2, run: 1 };
    engine.execute(fast, request("done"));

    let event = engine.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(
        event,
        Some(EngineEvent::ExecutionFinished { ticket, .. }) if ticket == fast
    ));
    assert_eq!(engine.recv_timeout(Duration::from_millis(200)), Ok(None));
}

#[test]
fn fetch_errors_are_forwarded() {
    let engine = engine();
    let key = ContentKey::Article("text".to_string());
    engine.fetch(key.clone());

    let event = engine.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        event,
        Some(EngineEvent::ExercisesFetched {
            key,
            result: Err(FetchError::new(FetchFailure::Network, "offline")),
        })
    );
}

#[test]
fn question_listing_is_forwarded() {
    let engine = engine();
    engine.list_questions();

    let event = engine.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        event,
        Some(EngineEvent::QuestionsListed {
            result: Ok(serde_json::json!([{ "site": "so", "question_id": "1" }])),
        })
    );
}

#[test]
fn stopped_engine_is_reported_instead_of_timing_out() {
    let engine = engine();
    engine.execute(RunTicket { session: 1, run: 1 }, request("sleep"));
    engine.shutdown();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut outcome = engine.recv_timeout(Duration::from_millis(100));
    while outcome == Ok(None) && std::time::Instant::now() < deadline {
        outcome = engine.recv_timeout(Duration::from_millis(100));
    }
    assert_eq!(outcome, Err(EngineStopped));
}
