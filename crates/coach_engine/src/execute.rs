use coach_core::{ExecutionError, ExecutionFailure, ExecutionRequest};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::http::{error_message, read_limited, BodyError, ServiceSettings};

/// Sends code to the execution service and returns what it printed.
#[async_trait::async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<String, ExecutionError>;
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `POST {base}/execute` with a JSON `{language, code}` body.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    settings: ServiceSettings,
}

impl ReqwestExecutor {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl CodeExecutor for ReqwestExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
        let url = self
            .settings
            .endpoint("execute")
            .map_err(|err| ExecutionError::new(ExecutionFailure::Network, err.to_string()))?;
        let client = self.settings.build_client().map_err(map_reqwest_error)?;
        let body = serde_json::to_vec(request)
            .map_err(|err| ExecutionError::new(ExecutionFailure::InvalidResponse, err.to_string()))?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = read_limited(response, self.settings.max_response_bytes)
            .await
            .map_err(|err| match err {
                BodyError::TooLarge { max_bytes } => ExecutionError::new(
                    ExecutionFailure::ResponseTooLarge { max_bytes },
                    "execution output too large",
                ),
                BodyError::Transport(err) => map_reqwest_error(err),
            })?;

        if !status.is_success() {
            let message = error_message(&bytes).unwrap_or_else(|| status.to_string());
            return Err(ExecutionError::new(
                ExecutionFailure::ServiceRejected {
                    status: status.as_u16(),
                },
                message,
            ));
        }

        let parsed: ExecuteResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ExecutionError::new(ExecutionFailure::InvalidResponse, err.to_string()))?;
        match parsed {
            ExecuteResponse {
                output: None,
                error: Some(message),
            } => Err(ExecutionError::new(
                ExecutionFailure::ServiceRejected {
                    status: status.as_u16(),
                },
                message,
            )),
            ExecuteResponse { output, .. } => Ok(output.unwrap_or_default()),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ExecutionError {
    if err.is_timeout() {
        return ExecutionError::new(ExecutionFailure::Timeout, err.to_string());
    }
    ExecutionError::new(ExecutionFailure::Network, err.to_string())
}
