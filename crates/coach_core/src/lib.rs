//! Coach core: question parsing, exercise normalization and the pure
//! session state machines behind the exercise player.
mod catalog;
mod effect;
mod execution;
mod exercise;
mod grading;
mod msg;
mod question;
mod state;
mod tutorial;
mod update;
mod view_model;

pub use catalog::{
    normalize_question_list, CatalogState, CatalogStatus, ContentKey, FetchError, FetchFailure,
    QuestionRef, QuestionSummary,
};
pub use effect::Effect;
pub use execution::{ExecutionError, ExecutionFailure, ExecutionRequest, RunTicket};
pub use exercise::{
    normalize_exercise, normalize_payload, Exercise, RawExercise, TestCase, ValidationError,
};
pub use grading::{
    ComparatorKind, ExactTrimComparator, GradingConfig, HintPolicy, OutputComparator,
    TestVerdict, VerdictScanner, WhitespaceInsensitiveComparator, DEFAULT_FAILURE_MARKER,
};
pub use msg::{CatalogMsg, ExerciseMsg, TutorialMsg};
pub use question::{parse_question, AnswerOption, OptionLabel, ParseError, ParsedQuestion, Section};
pub use state::{ExerciseSession, RunState, DEFAULT_LANGUAGE, NO_OUTPUT};
pub use tutorial::{
    AdvancePolicy, StepFeedback, TreeNode, Tutorial, TutorialError, TutorialSession, TutorialStep,
};
pub use update::{update, update_catalog, update_tutorial};
pub use view_model::{CatalogView, ExerciseView, TutorialView};
