use std::sync::Arc;

use crate::catalog::{ContentKey, FetchError, QuestionRef};
use crate::execution::{ExecutionError, RunTicket};
use crate::exercise::Exercise;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseMsg {
    /// A (possibly different) exercise is now on screen.
    Load {
        exercise: Arc<Exercise>,
        question: Option<QuestionRef>,
    },
    /// User edited the code editor.
    CodeEdited(String),
    /// User clicked Run.
    RunClicked,
    /// Execution service answered a run.
    RunFinished {
        ticket: RunTicket,
        result: Result<String, ExecutionError>,
    },
    /// User clicked Show Hint.
    HintClicked,
    /// User toggled the solution panel.
    SolutionToggled,
    /// User clicked Submit.
    SubmitClicked,
    /// The exercise on screen no longer belongs to the catalog.
    Unload,
    /// Fallback for placeholder wiring.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorialMsg {
    CodeEdited(String),
    NextClicked,
    PreviousClicked,
    RunClicked,
    /// User asked to verify the current step.
    CheckClicked,
    HintClicked,
    /// Execution service answered a run or a check.
    ExecutionFinished {
        ticket: RunTicket,
        result: Result<String, ExecutionError>,
    },
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogMsg {
    /// The view wants the exercises for `key`.
    Requested(ContentKey),
    /// Content service answered a fetch; the payload is normalized on arrival.
    Fetched {
        key: ContentKey,
        result: Result<serde_json::Value, FetchError>,
    },
    /// A submission for `exercise_id` was graded.
    ExerciseCompleted { exercise_id: String, correct: bool },
    /// Forget the current key and everything fetched for it.
    Invalidate,
    /// The view wants the list of known questions.
    QuestionsRequested,
    /// Content service answered the question listing.
    QuestionsListed {
        result: Result<serde_json::Value, FetchError>,
    },
}
