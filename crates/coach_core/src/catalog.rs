use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::exercise::{normalize_payload, Exercise, ValidationError};
use crate::view_model::CatalogView;

/// A question on an external Q&A site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionRef {
    pub site: String,
    pub question_id: String,
}

/// Stable identity of an exercise fetch; equal keys are never fetched twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentKey {
    Article(String),
    Question(QuestionRef),
}

impl ContentKey {
    pub fn question(&self) -> Option<&QuestionRef> {
        match self {
            ContentKey::Question(question) => Some(question),
            ContentKey::Article(_) => None,
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKey::Article(text) => write!(f, "article ({} chars)", text.chars().count()),
            ContentKey::Question(q) => write!(f, "question {}/{}", q.site, q.question_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchFailure,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    MissingContent,
    NoExercises,
    InvalidPayload,
    HttpStatus(u16),
    Timeout,
    Network,
}

/// One entry of the question listing, the source of `ContentKey::Question` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub question: QuestionRef,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct RawQuestionText {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct RawQuestion {
    site: String,
    question_id: Value,
    #[serde(default)]
    question_text: Option<RawQuestionText>,
    #[serde(default)]
    content: Option<String>,
}

/// Normalizes the `/questions` listing, a JSON array of questions.
pub fn normalize_question_list(payload: Value) -> Result<Vec<QuestionSummary>, ValidationError> {
    let Value::Array(items) = payload else {
        return Err(ValidationError::UnexpectedShape(
            "question listing is not an array".to_string(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawQuestion =
                serde_json::from_value(item).map_err(|err| ValidationError::Malformed {
                    index: index + 1,
                    message: err.to_string(),
                })?;
            let question_id = match raw.question_id {
                Value::String(id) => id,
                other => other.to_string(),
            };
            Ok(QuestionSummary {
                question: QuestionRef {
                    site: raw.site,
                    question_id,
                },
                title: raw
                    .question_text
                    .and_then(|text| text.title)
                    .filter(|title| !title.trim().is_empty()),
                content: raw.content.filter(|content| !content.trim().is_empty()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogStatus {
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed,
}

/// Exercises fetched for one content key, and the learner's position in them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogState {
    key: Option<ContentKey>,
    status: CatalogStatus,
    exercises: Vec<Arc<Exercise>>,
    error: Option<FetchError>,
    current: usize,
    completed: bool,
    questions: QuestionListing,
    dirty: bool,
}

/// The question listing outlives exercise fetches for individual keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct QuestionListing {
    status: CatalogStatus,
    entries: Vec<QuestionSummary>,
    error: Option<FetchError>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> CatalogView {
        CatalogView {
            status: self.status,
            error: self.error.as_ref().map(|err| err.message.clone()),
            exercise_count: self.exercises.len(),
            current_index: self.current,
            completed: self.completed,
            questions_status: self.questions.status,
            questions: self.questions.entries.clone(),
            questions_error: self.questions.error.as_ref().map(|err| err.message.clone()),
            dirty: self.dirty,
        }
    }

    pub fn questions(&self) -> &[QuestionSummary] {
        &self.questions.entries
    }

    pub fn questions_status(&self) -> CatalogStatus {
        self.questions.status
    }

    pub fn key(&self) -> Option<&ContentKey> {
        self.key.as_ref()
    }

    pub fn status(&self) -> CatalogStatus {
        self.status
    }

    pub fn exercises(&self) -> &[Arc<Exercise>] {
        &self.exercises
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Arc<Exercise>> {
        if self.completed {
            return None;
        }
        self.exercises.get(self.current)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Returns true when a fetch must be issued for `key`.
    pub(crate) fn request(&mut self, key: ContentKey) -> bool {
        let same_key = self.key.as_ref() == Some(&key);
        if same_key && matches!(self.status, CatalogStatus::Loading | CatalogStatus::Loaded) {
            return false;
        }

        self.invalidate();
        if matches!(&key, ContentKey::Article(text) if text.trim().is_empty()) {
            self.key = Some(key);
            self.fail(FetchError::new(
                FetchFailure::MissingContent,
                "No article content provided.",
            ));
            return false;
        }
        self.key = Some(key);
        self.status = CatalogStatus::Loading;
        true
    }

    /// Applies a fetch result; returns false when it belongs to another key.
    pub(crate) fn apply_fetched(
        &mut self,
        key: &ContentKey,
        result: Result<serde_json::Value, FetchError>,
    ) -> bool {
        if self.key.as_ref() != Some(key) || self.status != CatalogStatus::Loading {
            return false;
        }

        let exercises = result.and_then(|payload| {
            normalize_payload(payload)
                .map_err(|err| FetchError::new(FetchFailure::InvalidPayload, err.to_string()))
        });
        match exercises {
            Ok(exercises) if exercises.is_empty() => {
                self.fail(FetchError::new(FetchFailure::NoExercises, "No exercises found."));
            }
            Ok(exercises) => {
                self.exercises = exercises.into_iter().map(Arc::new).collect();
                self.status = CatalogStatus::Loaded;
                self.dirty = true;
            }
            Err(err) => self.fail(err),
        }
        true
    }

    /// Moves past the current exercise; returns true if the position changed.
    pub(crate) fn complete_current(&mut self, exercise_id: &str) -> bool {
        let Some(current) = self.current() else {
            return false;
        };
        if current.id != exercise_id {
            return false;
        }
        if self.current + 1 < self.exercises.len() {
            self.current += 1;
        } else {
            self.completed = true;
        }
        self.dirty = true;
        true
    }

    /// Forgets the key and its exercises; the question listing is kept.
    pub(crate) fn invalidate(&mut self) {
        let questions = std::mem::take(&mut self.questions);
        *self = Self {
            questions,
            dirty: true,
            ..Self::default()
        };
    }

    /// Returns true when the listing must be fetched.
    pub(crate) fn request_questions(&mut self) -> bool {
        if self.questions.status == CatalogStatus::Loading {
            return false;
        }
        self.questions = QuestionListing {
            status: CatalogStatus::Loading,
            ..QuestionListing::default()
        };
        self.dirty = true;
        true
    }

    /// Applies a listing result; returns false when none was requested.
    pub(crate) fn apply_questions(&mut self, result: Result<Value, FetchError>) -> bool {
        if self.questions.status != CatalogStatus::Loading {
            return false;
        }
        let listed = result.and_then(|payload| {
            normalize_question_list(payload)
                .map_err(|err| FetchError::new(FetchFailure::InvalidPayload, err.to_string()))
        });
        self.questions = match listed {
            Ok(entries) => QuestionListing {
                status: CatalogStatus::Loaded,
                entries,
                error: None,
            },
            Err(err) => QuestionListing {
                status: CatalogStatus::Failed,
                entries: Vec::new(),
                error: Some(err),
            },
        };
        self.dirty = true;
        true
    }

    fn fail(&mut self, error: FetchError) {
        self.exercises.clear();
        self.error = Some(error);
        self.status = CatalogStatus::Failed;
        self.dirty = true;
    }
}
