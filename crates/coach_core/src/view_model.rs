use crate::catalog::{CatalogStatus, QuestionSummary};
use crate::exercise::TestCase;
use crate::grading::TestVerdict;
use crate::state::RunState;
use crate::tutorial::{AdvancePolicy, StepFeedback, TreeNode};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExerciseView {
    pub exercise_id: Option<String>,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub problem_statement: Option<String>,
    pub instructions: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub references: Vec<String>,
    pub run_state: RunState,
    pub code: String,
    pub output: String,
    pub run_error: Option<String>,
    pub verdict: TestVerdict,
    pub revealed_hints: Vec<String>,
    pub hints_remaining: usize,
    /// Present only while the solution is revealed.
    pub solution_code: Option<String>,
    pub solution_explanation: Option<String>,
    pub submitted: bool,
    pub correct: bool,
    /// Shown after an incorrect submission.
    pub expected_output: Option<String>,
    pub can_run: bool,
    pub can_submit: bool,
    pub can_request_hint: bool,
    pub can_toggle_solution: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialView {
    pub title: String,
    pub advance_policy: AdvancePolicy,
    pub step_index: usize,
    pub step_count: usize,
    pub instruction: String,
    pub tree: Option<TreeNode>,
    pub code: String,
    pub output: String,
    pub run_error: Option<String>,
    pub feedback: Option<StepFeedback>,
    pub hint: Option<String>,
    pub running: bool,
    pub can_run: bool,
    pub can_request_hint: bool,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogView {
    pub status: CatalogStatus,
    /// User-facing reason the exercises could not be shown.
    pub error: Option<String>,
    pub exercise_count: usize,
    pub current_index: usize,
    pub completed: bool,
    pub questions_status: CatalogStatus,
    pub questions: Vec<QuestionSummary>,
    pub questions_error: Option<String>,
    pub dirty: bool,
}
