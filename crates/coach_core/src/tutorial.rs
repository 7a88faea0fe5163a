use std::sync::Arc;

use coach_logging::coach_debug;
use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionError, ExecutionRequest, RunTicket};
use crate::grading::{ExactTrimComparator, OutputComparator};
use crate::view_model::TutorialView;

/// Node of the diagram shown next to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialStep {
    #[serde(skip)]
    pub index: usize,
    pub instruction: String,
    pub code_snippet: String,
    #[serde(default)]
    pub tree_data: Option<TreeNode>,
    #[serde(default)]
    pub expected_submission: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl TutorialStep {
    fn is_gated(&self) -> bool {
        self.expected_submission.is_some() || self.expected_output.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdvancePolicy {
    #[default]
    Free,
    Gated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TutorialError {
    #[error("tutorial `{0}` has no steps")]
    NoSteps(String),
}

#[derive(Deserialize)]
struct TutorialDef {
    title: String,
    language: String,
    #[serde(default)]
    advance_policy: AdvancePolicy,
    steps: Vec<TutorialStep>,
}

impl TryFrom<TutorialDef> for Tutorial {
    type Error = TutorialError;

    fn try_from(def: TutorialDef) -> Result<Self, Self::Error> {
        Tutorial::new(def.title, def.language, def.advance_policy, def.steps)
    }
}

/// A fixed, non-empty sequence of guided steps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TutorialDef")]
pub struct Tutorial {
    title: String,
    language: String,
    advance_policy: AdvancePolicy,
    steps: Vec<TutorialStep>,
}

impl Tutorial {
    pub fn new(
        title: impl Into<String>,
        language: impl Into<String>,
        advance_policy: AdvancePolicy,
        mut steps: Vec<TutorialStep>,
    ) -> Result<Self, TutorialError> {
        let title = title.into();
        if steps.is_empty() {
            return Err(TutorialError::NoSteps(title));
        }
        for (index, step) in steps.iter_mut().enumerate() {
            step.index = index;
        }
        Ok(Self {
            title,
            language: language.into(),
            advance_policy,
            steps,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn advance_policy(&self) -> AdvancePolicy {
        self.advance_policy
    }

    pub fn steps(&self) -> &[TutorialStep] {
        &self.steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFeedback {
    Correct,
    Incorrect,
}

impl StepFeedback {
    pub fn message(self) -> &'static str {
        match self {
            StepFeedback::Correct => "Correct! Proceed to the next step.",
            StepFeedback::Incorrect => "Incorrect. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingKind {
    Run,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Navigation {
    Moved { cancelled: Option<RunTicket> },
    AtBoundary,
    Refused,
}

/// Learner's position and editor state within one tutorial.
#[derive(Debug, Clone)]
pub struct TutorialSession {
    tutorial: Arc<Tutorial>,
    comparator: Arc<dyn OutputComparator>,
    current_index: usize,
    code: String,
    output: String,
    run_error: Option<ExecutionError>,
    /// Only ever describes the code currently in the editor.
    feedback: Option<StepFeedback>,
    /// Code sent with the outstanding check.
    checked_code: Option<String>,
    hint_visible: bool,
    generation: u64,
    next_run: u64,
    pending: Option<(RunTicket, PendingKind)>,
    dirty: bool,
}

impl TutorialSession {
    pub fn new(tutorial: Arc<Tutorial>) -> Self {
        Self::with_comparator(tutorial, Arc::new(ExactTrimComparator))
    }

    pub fn with_comparator(tutorial: Arc<Tutorial>, comparator: Arc<dyn OutputComparator>) -> Self {
        // `Tutorial` guarantees at least one step.
        let code = tutorial.steps[0].code_snippet.clone();
        Self {
            tutorial,
            comparator,
            current_index: 0,
            code,
            output: String::new(),
            run_error: None,
            feedback: None,
            checked_code: None,
            hint_visible: false,
            generation: 0,
            next_run: 0,
            pending: None,
            dirty: true,
        }
    }

    pub fn view(&self) -> TutorialView {
        let step = self.step();
        let last = self.tutorial.steps.len() - 1;
        TutorialView {
            title: self.tutorial.title.clone(),
            advance_policy: self.tutorial.advance_policy,
            step_index: self.current_index,
            step_count: self.tutorial.steps.len(),
            instruction: step.instruction.clone(),
            tree: step.tree_data.clone(),
            code: self.code.clone(),
            output: self.output.clone(),
            run_error: self.run_error.as_ref().map(|err| err.message.clone()),
            feedback: self.feedback,
            hint: step.hint.clone().filter(|_| self.hint_visible),
            running: self.pending.is_some(),
            can_run: self.pending.is_none(),
            can_request_hint: step.hint.is_some() && !self.hint_visible,
            can_advance: self.current_index < last,
            can_retreat: self.current_index > 0,
            dirty: self.dirty,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn feedback(&self) -> Option<StepFeedback> {
        self.feedback
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn step(&self) -> &TutorialStep {
        &self.tutorial.steps[self.current_index]
    }

    pub(crate) fn edit_code(&mut self, code: String) {
        if self.code != code {
            self.code = code;
            self.feedback = None;
            self.dirty = true;
        }
    }

    pub(crate) fn show_hint(&mut self) {
        if self.step().hint.is_some() && !self.hint_visible {
            self.hint_visible = true;
            self.dirty = true;
        }
    }

    pub(crate) fn advance(&mut self) -> Navigation {
        if self.current_index + 1 >= self.tutorial.steps.len() {
            return Navigation::AtBoundary;
        }
        if self.tutorial.advance_policy == AdvancePolicy::Gated && !self.step_satisfied() {
            coach_debug!("advance refused at step {}", self.current_index);
            self.feedback = Some(StepFeedback::Incorrect);
            self.dirty = true;
            return Navigation::Refused;
        }
        let cancelled = self.move_to(self.current_index + 1);
        Navigation::Moved { cancelled }
    }

    pub(crate) fn retreat(&mut self) -> Navigation {
        if self.current_index == 0 {
            return Navigation::AtBoundary;
        }
        let cancelled = self.move_to(self.current_index - 1);
        Navigation::Moved { cancelled }
    }

    /// Starts a plain run of the editor contents.
    pub(crate) fn begin_run(&mut self) -> Option<(RunTicket, ExecutionRequest)> {
        self.begin(PendingKind::Run)
    }

    /// Checks the current step. Steps with an expected output go through the
    /// execution service; otherwise the code is compared locally.
    pub(crate) fn begin_check(&mut self) -> Option<(RunTicket, ExecutionRequest)> {
        if self.pending.is_some() {
            return None;
        }
        if self.step().expected_output.is_some() {
            return self.begin(PendingKind::Check);
        }
        let passed = match self.step().expected_submission.as_deref() {
            Some(expected) => self.code.trim() == expected.trim(),
            None => true,
        };
        self.set_feedback(passed);
        None
    }

    pub(crate) fn finish(&mut self, ticket: RunTicket, result: Result<String, ExecutionError>) -> bool {
        let Some((pending, kind)) = self.pending else {
            coach_debug!("dropping tutorial result for ticket {}: nothing pending", ticket);
            return false;
        };
        if pending != ticket {
            coach_debug!("dropping stale tutorial result for ticket {}", ticket);
            return false;
        }
        self.pending = None;

        match result {
            Ok(output) => {
                let checked = self.checked_code.take();
                if kind == PendingKind::Check {
                    if checked.as_deref() == Some(self.code.as_str()) {
                        let passed = self
                            .step()
                            .expected_output
                            .as_deref()
                            .is_some_and(|expected| self.comparator.matches(&output, expected));
                        self.set_feedback(passed);
                    } else {
                        coach_debug!("check {} graded code that was edited since", ticket);
                    }
                }
                self.output = output;
            }
            Err(err) => {
                self.checked_code = None;
                self.run_error = Some(err);
            }
        }
        self.dirty = true;
        true
    }

    fn begin(&mut self, kind: PendingKind) -> Option<(RunTicket, ExecutionRequest)> {
        if self.pending.is_some() {
            coach_debug!("tutorial run refused: {:?} already pending", self.pending);
            return None;
        }
        self.next_run += 1;
        let ticket = RunTicket {
            session: self.generation,
            run: self.next_run,
        };
        self.pending = Some((ticket, kind));
        self.output.clear();
        self.run_error = None;
        if kind == PendingKind::Check {
            self.feedback = None;
            self.checked_code = Some(self.code.clone());
        }
        self.dirty = true;
        Some((
            ticket,
            ExecutionRequest {
                language: self.tutorial.language.clone(),
                code: self.code.clone(),
                site: None,
                question_id: None,
            },
        ))
    }

    fn step_satisfied(&self) -> bool {
        let step = self.step();
        if !step.is_gated() || self.feedback == Some(StepFeedback::Correct) {
            return true;
        }
        step.expected_submission
            .as_deref()
            .is_some_and(|expected| self.code.trim() == expected.trim())
    }

    fn set_feedback(&mut self, passed: bool) {
        self.feedback = Some(if passed {
            StepFeedback::Correct
        } else {
            StepFeedback::Incorrect
        });
        self.dirty = true;
    }

    fn move_to(&mut self, index: usize) -> Option<RunTicket> {
        let cancelled = self.pending.take().map(|(ticket, _)| ticket);
        self.checked_code = None;
        self.generation += 1;
        self.current_index = index;
        self.code = self.step().code_snippet.clone();
        self.output.clear();
        self.run_error = None;
        self.feedback = None;
        self.hint_visible = false;
        self.dirty = true;
        cancelled
    }
}
