use std::time::Duration;

use futures_util::StreamExt;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

/// Connection settings shared by the execution and content clients.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_response_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_response_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid service url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ServiceSettings {
    /// Resolves `path` below the base url, keeping any path prefix of the base.
    pub fn endpoint(&self, path: &str) -> Result<Url, EndpointError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|url| url.join(path.trim_start_matches('/')))
            .map_err(|source| EndpointError::InvalidUrl {
                url: self.base_url.clone(),
                source,
            })
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
    }
}

pub(crate) enum BodyError {
    TooLarge { max_bytes: u64 },
    Transport(reqwest::Error),
}

/// Streams a response body, refusing to buffer more than `max_bytes`.
pub(crate) async fn read_limited(
    response: reqwest::Response,
    max_bytes: u64,
) -> Result<Vec<u8>, BodyError> {
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(BodyError::TooLarge { max_bytes });
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Transport)?;
        if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(BodyError::TooLarge { max_bytes });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Pulls a human readable `error` field out of a JSON error body.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .and_then(|field| field.as_str())
        .map(ToOwned::to_owned)
}
