use std::sync::Arc;

use coach_logging::coach_debug;

use crate::catalog::QuestionRef;
use crate::execution::{ExecutionError, ExecutionRequest, RunTicket};
use crate::exercise::Exercise;
use crate::grading::{GradingConfig, HintPolicy, TestVerdict};
use crate::view_model::ExerciseView;

pub const DEFAULT_LANGUAGE: &str = "golang";

/// Printed in place of an empty successful run so it can still be submitted.
pub const NO_OUTPUT: &str = "No output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Ready,
    Errored,
}

/// Ephemeral interaction state for the exercise currently on screen.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    grading: GradingConfig,
    language: String,
    exercise: Option<Arc<Exercise>>,
    question: Option<QuestionRef>,
    generation: u64,
    next_run: u64,
    in_flight: Option<RunTicket>,
    run_state: RunState,
    code: String,
    output: String,
    run_error: Option<ExecutionError>,
    hint_index: usize,
    revealed_hints: Vec<String>,
    solution_revealed: bool,
    submitted: bool,
    correct: bool,
    verdict: TestVerdict,
    dirty: bool,
}

impl Default for ExerciseSession {
    fn default() -> Self {
        Self::new(GradingConfig::default(), DEFAULT_LANGUAGE)
    }
}

impl ExerciseSession {
    pub fn new(grading: GradingConfig, language: impl Into<String>) -> Self {
        Self {
            grading,
            language: language.into(),
            exercise: None,
            question: None,
            generation: 0,
            next_run: 0,
            in_flight: None,
            run_state: RunState::Idle,
            code: String::new(),
            output: String::new(),
            run_error: None,
            hint_index: 0,
            revealed_hints: Vec::new(),
            solution_revealed: false,
            submitted: false,
            correct: false,
            verdict: TestVerdict::Unknown,
            dirty: false,
        }
    }

    pub fn view(&self) -> ExerciseView {
        let exercise = self.exercise.as_deref();
        let hints_total = exercise.map_or(0, |e| e.hints.len());
        let solution = exercise.filter(|_| self.solution_revealed);
        ExerciseView {
            exercise_id: exercise.map(|e| e.id.clone()),
            title: exercise.and_then(|e| e.title.clone()),
            difficulty: exercise.and_then(|e| e.difficulty.clone()),
            problem_statement: exercise.and_then(|e| e.problem_statement.clone()),
            instructions: exercise.and_then(|e| e.instructions.clone()),
            test_cases: exercise.map(|e| e.test_cases.clone()).unwrap_or_default(),
            references: exercise.map(|e| e.references.clone()).unwrap_or_default(),
            run_state: self.run_state,
            code: self.code.clone(),
            output: self.output.clone(),
            run_error: self.run_error.as_ref().map(|err| err.message.clone()),
            verdict: self.verdict,
            revealed_hints: self.revealed_hints.clone(),
            hints_remaining: hints_total - self.hint_index,
            solution_code: solution.and_then(|e| e.solution_code.clone()),
            solution_explanation: solution.and_then(|e| e.solution_explanation.clone()),
            submitted: self.submitted,
            correct: self.correct,
            expected_output: exercise
                .filter(|_| self.submitted && !self.correct)
                .and_then(|e| e.expected_output.clone()),
            can_run: exercise.is_some() && self.run_state != RunState::Running,
            can_submit: self.can_submit(),
            can_request_hint: self.can_request_hint(),
            can_toggle_solution: exercise.is_some_and(Exercise::has_solution),
            dirty: self.dirty,
        }
    }

    pub fn exercise(&self) -> Option<&Arc<Exercise>> {
        self.exercise.as_ref()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn hint_index(&self) -> usize {
        self.hint_index
    }

    pub fn revealed_hints(&self) -> &[String] {
        &self.revealed_hints
    }

    pub fn in_flight(&self) -> Option<RunTicket> {
        self.in_flight
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Resets every field for `exercise`, returning the run that must be cancelled, if any.
    ///
    /// Reloading the exercise that is already shown keeps the session as is.
    pub(crate) fn load(
        &mut self,
        exercise: Arc<Exercise>,
        question: Option<QuestionRef>,
    ) -> Option<RunTicket> {
        if self.exercise.as_deref() == Some(&*exercise) && self.question == question {
            return None;
        }

        let cancelled = self.in_flight.take();
        let mut fresh = Self::new(self.grading.clone(), self.language.clone());
        fresh.generation = self.generation + 1;
        fresh.code = exercise.code_template.clone();
        fresh.exercise = Some(exercise);
        fresh.question = question;
        fresh.dirty = true;
        *self = fresh;
        cancelled
    }

    /// Drops the exercise on screen, returning the run that must be cancelled, if any.
    pub(crate) fn unload(&mut self) -> Option<RunTicket> {
        self.exercise.as_ref()?;
        let cancelled = self.in_flight.take();
        let mut fresh = Self::new(self.grading.clone(), self.language.clone());
        fresh.generation = self.generation + 1;
        fresh.dirty = true;
        *self = fresh;
        cancelled
    }

    pub(crate) fn edit_code(&mut self, code: String) {
        if self.code != code {
            self.code = code;
            self.dirty = true;
        }
    }

    /// Enters `Running`; refuses while a run is outstanding.
    pub(crate) fn begin_run(&mut self) -> Option<(RunTicket, ExecutionRequest)> {
        if self.exercise.is_none() {
            return None;
        }
        if self.run_state == RunState::Running {
            coach_debug!("run refused: ticket {:?} still in flight", self.in_flight);
            return None;
        }

        self.next_run += 1;
        let ticket = RunTicket {
            session: self.generation,
            run: self.next_run,
        };
        self.in_flight = Some(ticket);
        self.run_state = RunState::Running;
        self.output.clear();
        self.run_error = None;
        self.verdict = TestVerdict::Unknown;
        self.dirty = true;

        let request = ExecutionRequest {
            language: self.language.clone(),
            code: self.code.clone(),
            site: self.question.as_ref().map(|q| q.site.clone()),
            question_id: self.question.as_ref().map(|q| q.question_id.clone()),
        };
        Some((ticket, request))
    }

    /// Leaves `Running`. Results for any ticket but the outstanding one are dropped.
    pub(crate) fn finish_run(
        &mut self,
        ticket: RunTicket,
        result: Result<String, ExecutionError>,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            coach_debug!("dropping stale run result for ticket {}", ticket);
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(output) => {
                self.verdict = self.grading.scanner.scan(&output);
                self.output = if output.is_empty() {
                    NO_OUTPUT.to_string()
                } else {
                    output
                };
                self.run_state = RunState::Ready;
            }
            Err(err) => {
                self.output.clear();
                self.verdict = TestVerdict::Unknown;
                self.run_error = Some(err);
                self.run_state = RunState::Errored;
            }
        }
        self.dirty = true;
        true
    }

    pub(crate) fn request_hint(&mut self) {
        let Some(exercise) = self.exercise.clone() else {
            return;
        };
        if let Some(hint) = exercise.hints.get(self.hint_index) {
            self.revealed_hints.push(hint.clone());
            self.hint_index += 1;
            self.dirty = true;
            return;
        }
        if self.grading.hint_policy == HintPolicy::RevealSolution {
            self.toggle_solution();
        }
    }

    pub(crate) fn toggle_solution(&mut self) {
        if self.exercise.as_deref().is_some_and(Exercise::has_solution) {
            self.solution_revealed = !self.solution_revealed;
            self.dirty = true;
        }
    }

    /// Grades the last output once per session. Returns the verdict if accepted.
    pub(crate) fn submit(&mut self) -> Option<(String, bool)> {
        if !self.can_submit() {
            return None;
        }
        let exercise = self.exercise.as_deref()?;
        let correct = match exercise.expected_output.as_deref() {
            Some(expected) => self.grading.comparator.matches(&self.output, expected),
            None => true,
        };
        let exercise_id = exercise.id.clone();
        self.submitted = true;
        self.correct = correct;
        self.dirty = true;
        Some((exercise_id, correct))
    }

    fn can_submit(&self) -> bool {
        self.exercise.is_some() && !self.output.is_empty() && !self.submitted
    }

    fn can_request_hint(&self) -> bool {
        let Some(exercise) = self.exercise.as_deref() else {
            return false;
        };
        self.hint_index < exercise.hints.len()
            || (self.grading.hint_policy == HintPolicy::RevealSolution && exercise.has_solution())
    }
}
