use coach_core::{ContentKey, FetchError, FetchFailure};
use coach_logging::coach_debug;
use url::Url;

use crate::http::{read_limited, BodyError, ServiceSettings};

/// Fetches raw exercise payloads; normalization happens in the core.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, key: &ContentKey) -> Result<serde_json::Value, FetchError>;

    /// Every question exercises can be fetched for, as `{site, question_id, question_text}` entries.
    async fn list_questions(&self) -> Result<serde_json::Value, FetchError>;
}

/// Article content goes to `GET {base}/get-learning-objectives?articleContent=..`,
/// questions to `GET {base}/exercises/{site}/{question_id}`, the listing to
/// `GET {base}/questions`.
#[derive(Debug, Clone)]
pub struct ReqwestContentSource {
    settings: ServiceSettings,
}

impl ReqwestContentSource {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }

    pub fn url_for(&self, key: &ContentKey) -> Result<Url, FetchError> {
        let invalid = |err: crate::EndpointError| FetchError::new(FetchFailure::Network, err.to_string());
        match key {
            ContentKey::Article(text) => {
                let mut url = self.settings.endpoint("get-learning-objectives").map_err(invalid)?;
                url.query_pairs_mut().append_pair("articleContent", text);
                Ok(url)
            }
            ContentKey::Question(question) => {
                let mut url = self.settings.endpoint("exercises").map_err(invalid)?;
                url.path_segments_mut()
                    .map_err(|()| {
                        FetchError::new(FetchFailure::Network, "service url cannot be a base")
                    })?
                    .push(&question.site)
                    .push(&question.question_id);
                Ok(url)
            }
        }
    }
}

#[async_trait::async_trait]
impl ContentSource for ReqwestContentSource {
    async fn fetch(&self, key: &ContentKey) -> Result<serde_json::Value, FetchError> {
        let url = self.url_for(key)?;
        coach_debug!("fetching exercises for {}", key);
        self.get_json(url, FETCH_EXERCISES_FAILED).await
    }

    async fn list_questions(&self) -> Result<serde_json::Value, FetchError> {
        let url = self
            .settings
            .endpoint("questions")
            .map_err(|err| FetchError::new(FetchFailure::Network, err.to_string()))?;
        coach_debug!("listing questions");
        self.get_json(url, LIST_QUESTIONS_FAILED).await
    }
}

const FETCH_EXERCISES_FAILED: &str = "Failed to fetch the exercises. Please try again.";
const LIST_QUESTIONS_FAILED: &str = "Failed to fetch questions.";

impl ReqwestContentSource {
    async fn get_json(
        &self,
        url: Url,
        failure: &'static str,
    ) -> Result<serde_json::Value, FetchError> {
        let transport = |err: reqwest::Error| map_reqwest_error(err, failure);
        let client = self.settings.build_client().map_err(transport)?;
        let response = client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FetchFailure::HttpStatus(status.as_u16()),
                failure,
            ));
        }

        let bytes = read_limited(response, self.settings.max_response_bytes)
            .await
            .map_err(|err| match err {
                BodyError::TooLarge { max_bytes } => FetchError::new(
                    FetchFailure::InvalidPayload,
                    format!("exercise payload larger than {max_bytes} bytes"),
                ),
                BodyError::Transport(err) => transport(err),
            })?;
        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FetchFailure::InvalidPayload, err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error, message: &str) -> FetchError {
    let kind = if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Network
    };
    coach_debug!("content transport error: {}", err);
    FetchError::new(kind, message)
}
