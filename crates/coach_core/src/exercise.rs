use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// A normalized coding exercise. Optional sequences are always present (possibly empty),
/// optional texts are `None` rather than empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exercise {
    pub id: String,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub problem_statement: Option<String>,
    pub instructions: Option<String>,
    /// Trimmed initial editor contents.
    pub code_template: String,
    pub hints: Vec<String>,
    pub solution_code: Option<String>,
    pub solution_explanation: Option<String>,
    pub expected_output: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub references: Vec<String>,
}

impl Exercise {
    /// Minimal exercise with only an id and a template.
    pub fn new(id: impl Into<String>, code_template: &str) -> Self {
        Self {
            id: id.into(),
            title: None,
            difficulty: None,
            problem_statement: None,
            instructions: None,
            code_template: code_template.trim().to_string(),
            hints: Vec::new(),
            solution_code: None,
            solution_explanation: None,
            expected_output: None,
            test_cases: Vec::new(),
            references: Vec::new(),
        }
    }

    /// The solution can only be shown when both code and explanation exist.
    pub fn has_solution(&self) -> bool {
        self.solution_code.is_some() && self.solution_explanation.is_some()
    }
}

/// Exercise record as delivered by the content service, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExercise {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub problem_statement: Option<String>,
    pub instructions: Option<String>,
    #[serde(alias = "initialCode")]
    pub code_template: Option<String>,
    pub hints: Option<Vec<String>>,
    pub hint: Option<String>,
    pub solution_code: Option<String>,
    pub solution_explanation: Option<String>,
    #[serde(alias = "expectedOutput")]
    pub expected_output: Option<String>,
    pub test_cases: Option<Vec<TestCase>>,
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("exercise `{exercise}` has no code template")]
    MissingTemplate { exercise: String },
    #[error("exercise #{index} is malformed: {message}")]
    Malformed { index: usize, message: String },
    #[error("unexpected exercise payload: {0}")]
    UnexpectedShape(String),
}

/// Validate and default a single raw record.
pub fn normalize_exercise(raw: RawExercise) -> Result<Exercise, ValidationError> {
    let title = non_empty(raw.title);
    let id = raw
        .id
        .and_then(|value| match value {
            Value::String(text) => non_empty(Some(text)),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .or_else(|| title.clone())
        .unwrap_or_else(|| "exercise".to_string());

    let Some(template) = raw.code_template else {
        return Err(ValidationError::MissingTemplate { exercise: id });
    };

    let mut hints = raw.hints.unwrap_or_default();
    if hints.is_empty() {
        hints.extend(non_empty(raw.hint));
    }

    Ok(Exercise {
        title,
        difficulty: non_empty(raw.difficulty),
        problem_statement: non_empty(raw.problem_statement),
        instructions: non_empty(raw.instructions),
        code_template: template.trim().to_string(),
        hints,
        solution_code: non_empty(raw.solution_code),
        solution_explanation: non_empty(raw.solution_explanation),
        expected_output: non_empty(raw.expected_output),
        test_cases: raw.test_cases.unwrap_or_default(),
        references: raw.references.unwrap_or_default(),
        id,
    })
}

/// Normalize whatever shape the content service returned into a flat list.
///
/// Accepts a single exercise object, an array of exercises, or an
/// `{ "exercises": [...] }` envelope. The first invalid element fails the whole payload.
pub fn normalize_payload(payload: Value) -> Result<Vec<Exercise>, ValidationError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("exercises") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ValidationError::UnexpectedShape(format!(
                    "`exercises` is {}",
                    kind_of(&other)
                )))
            }
            None => vec![Value::Object(map)],
        },
        other => return Err(ValidationError::UnexpectedShape(kind_of(&other).to_string())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut raw: RawExercise =
                serde_json::from_value(item).map_err(|err| ValidationError::Malformed {
                    index: index + 1,
                    message: err.to_string(),
                })?;
            if raw.id.is_none() && non_empty(raw.title.clone()).is_none() {
                raw.id = Some(Value::String(format!("exercise-{}", index + 1)));
            }
            normalize_exercise(raw)
        })
        .collect()
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
