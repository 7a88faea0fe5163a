use coach_core::{ContentKey, ExecutionError, FetchError, RunTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ExecutionFinished {
        ticket: RunTicket,
        result: Result<String, ExecutionError>,
    },
    ExercisesFetched {
        key: ContentKey,
        result: Result<serde_json::Value, FetchError>,
    },
    QuestionsListed {
        result: Result<serde_json::Value, FetchError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("execution engine stopped")]
pub struct EngineStopped;
