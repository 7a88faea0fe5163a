use coach_logging::coach_debug;

use crate::tutorial::Navigation;
use crate::{CatalogMsg, CatalogState, Effect, ExerciseMsg, ExerciseSession, TutorialMsg, TutorialSession};

/// Pure update function: applies a message to an exercise session and returns any effects.
pub fn update(mut state: ExerciseSession, msg: ExerciseMsg) -> (ExerciseSession, Vec<Effect>) {
    let effects = match msg {
        ExerciseMsg::Load { exercise, question } => match state.load(exercise, question) {
            Some(ticket) => vec![Effect::CancelRun { ticket }],
            None => Vec::new(),
        },
        ExerciseMsg::CodeEdited(code) => {
            state.edit_code(code);
            Vec::new()
        }
        ExerciseMsg::RunClicked => match state.begin_run() {
            Some((ticket, request)) => vec![Effect::ExecuteCode { ticket, request }],
            None => Vec::new(),
        },
        ExerciseMsg::RunFinished { ticket, result } => {
            state.finish_run(ticket, result);
            Vec::new()
        }
        ExerciseMsg::HintClicked => {
            state.request_hint();
            Vec::new()
        }
        ExerciseMsg::SolutionToggled => {
            state.toggle_solution();
            Vec::new()
        }
        ExerciseMsg::SubmitClicked => match state.submit() {
            Some((exercise_id, correct)) => vec![Effect::ExerciseCompleted {
                exercise_id,
                correct,
            }],
            None => {
                coach_debug!("submit ignored: no completed run or already submitted");
                Vec::new()
            }
        },
        ExerciseMsg::Unload => match state.unload() {
            Some(ticket) => vec![Effect::CancelRun { ticket }],
            None => Vec::new(),
        },
        ExerciseMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Pure update function for a tutorial walkthrough.
pub fn update_tutorial(
    mut state: TutorialSession,
    msg: TutorialMsg,
) -> (TutorialSession, Vec<Effect>) {
    let effects = match msg {
        TutorialMsg::CodeEdited(code) => {
            state.edit_code(code);
            Vec::new()
        }
        TutorialMsg::NextClicked => navigation_effects(state.advance()),
        TutorialMsg::PreviousClicked => navigation_effects(state.retreat()),
        TutorialMsg::RunClicked => match state.begin_run() {
            Some((ticket, request)) => vec![Effect::ExecuteCode { ticket, request }],
            None => Vec::new(),
        },
        TutorialMsg::CheckClicked => match state.begin_check() {
            Some((ticket, request)) => vec![Effect::ExecuteCode { ticket, request }],
            None => Vec::new(),
        },
        TutorialMsg::HintClicked => {
            state.show_hint();
            Vec::new()
        }
        TutorialMsg::ExecutionFinished { ticket, result } => {
            state.finish(ticket, result);
            Vec::new()
        }
        TutorialMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn navigation_effects(navigation: Navigation) -> Vec<Effect> {
    match navigation {
        Navigation::Moved {
            cancelled: Some(ticket),
        } => vec![Effect::CancelRun { ticket }],
        Navigation::Moved { cancelled: None } | Navigation::Refused => Vec::new(),
        Navigation::AtBoundary => {
            coach_debug!("navigation ignored at tutorial boundary");
            Vec::new()
        }
    }
}

/// Pure update function for the exercise catalog.
pub fn update_catalog(mut state: CatalogState, msg: CatalogMsg) -> (CatalogState, Vec<Effect>) {
    let had_exercises = !state.exercises().is_empty();
    let mut effects = match msg {
        CatalogMsg::Requested(key) => {
            if state.request(key.clone()) {
                vec![Effect::FetchExercises { key }]
            } else {
                Vec::new()
            }
        }
        CatalogMsg::Fetched { key, result } => {
            if state.apply_fetched(&key, result) {
                present_current(&state)
            } else {
                coach_debug!("dropping exercises fetched for superseded {}", key);
                Vec::new()
            }
        }
        CatalogMsg::ExerciseCompleted {
            exercise_id,
            correct,
        } => {
            if correct && state.complete_current(&exercise_id) {
                present_current(&state)
            } else {
                Vec::new()
            }
        }
        CatalogMsg::Invalidate => {
            state.invalidate();
            Vec::new()
        }
        CatalogMsg::QuestionsRequested => {
            if state.request_questions() {
                vec![Effect::ListQuestions]
            } else {
                Vec::new()
            }
        }
        CatalogMsg::QuestionsListed { result } => {
            if !state.apply_questions(result) {
                coach_debug!("dropping unrequested question listing");
            }
            Vec::new()
        }
    };

    if had_exercises && state.exercises().is_empty() {
        effects.insert(0, Effect::DismissExercise);
    }
    (state, effects)
}

fn present_current(state: &CatalogState) -> Vec<Effect> {
    match state.current() {
        Some(exercise) => vec![Effect::PresentExercise {
            exercise: exercise.clone(),
            question: state.key().and_then(|key| key.question().cloned()),
        }],
        None => Vec::new(),
    }
}
