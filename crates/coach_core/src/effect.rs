use std::sync::Arc;

use crate::catalog::{ContentKey, QuestionRef};
use crate::execution::{ExecutionRequest, RunTicket};
use crate::exercise::Exercise;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ExecuteCode {
        ticket: RunTicket,
        request: ExecutionRequest,
    },
    CancelRun {
        ticket: RunTicket,
    },
    FetchExercises {
        key: ContentKey,
    },
    ListQuestions,
    /// The catalog dropped the exercise on screen; the exercise session should unload it.
    DismissExercise,
    /// The catalog moved to a new exercise; the exercise session should load it.
    PresentExercise {
        exercise: Arc<Exercise>,
        question: Option<QuestionRef>,
    },
    ExerciseCompleted {
        exercise_id: String,
        correct: bool,
    },
}
