use std::sync::{Arc, Once};

use coach_core::{
    update_tutorial, AdvancePolicy, Effect, ExecutionError, ExecutionFailure, StepFeedback,
    TreeNode, Tutorial, TutorialError, TutorialMsg, TutorialSession, TutorialStep,
};
use proptest::prelude::*;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(coach_logging::initialize_for_tests);
}

fn step(snippet: &str) -> TutorialStep {
    TutorialStep {
        index: 0,
        instruction: format!("Write {snippet}"),
        code_snippet: snippet.to_string(),
        tree_data: None,
        expected_submission: None,
        expected_output: None,
        hint: None,
    }
}

fn combination_sum(policy: AdvancePolicy) -> Arc<Tutorial> {
    let mut first = step("# Step 1\ndef combination_sum(candidates, target):\n    results = []");
    first.expected_submission =
        Some("def combination_sum(candidates, target):\n    results = []\n    return results".to_string());
    first.hint = Some("Return the list.".to_string());
    first.tree_data = Some(TreeNode {
        name: "results = []".to_string(),
        children: Vec::new(),
    });

    let mut second = step("# Step 2\ndef combination_sum(candidates, target):\n    pass");
    second.expected_output = Some("[[2, 2, 3], [7]]".to_string());

    let third = step("# Step 3\nprint(combination_sum([2, 3, 6, 7], 7))");

    Arc::new(
        Tutorial::new("Combination Sum", "python", policy, vec![first, second, third]).unwrap(),
    )
}

fn send(state: TutorialSession, msg: TutorialMsg) -> TutorialSession {
    update_tutorial(state, msg).0
}

#[test]
fn starts_on_first_step() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let view = state.view();

    assert_eq!(view.step_index, 0);
    assert_eq!(view.step_count, 3);
    assert!(view.code.starts_with("# Step 1"));
    assert_eq!(view.tree.map(|t| t.name), Some("results = []".to_string()));
    assert!(!view.can_retreat);
    assert!(view.can_advance);
}

#[test]
fn empty_tutorial_is_rejected() {
    assert_eq!(
        Tutorial::new("Empty", "python", AdvancePolicy::Free, Vec::new()),
        Err(TutorialError::NoSteps("Empty".to_string()))
    );
}

#[test]
fn steps_are_indexed_in_order() {
    let tutorial = combination_sum(AdvancePolicy::Free);
    let indices: Vec<usize> = tutorial.steps().iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn free_advance_and_retreat_stay_in_bounds() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));

    let state = send(state, TutorialMsg::PreviousClicked);
    assert_eq!(state.current_index(), 0);

    let state = send(state, TutorialMsg::NextClicked);
    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 2);
    assert!(state.code().starts_with("# Step 3"));

    let (state, effects) = update_tutorial(state, TutorialMsg::NextClicked);
    assert!(effects.is_empty());
    assert_eq!(state.current_index(), 2);
    assert!(!state.view().can_advance);

    let state = send(state, TutorialMsg::PreviousClicked);
    assert_eq!(state.current_index(), 1);
    assert!(state.code().starts_with("# Step 2"));
}

#[test]
fn navigation_replaces_code_and_clears_feedback() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let state = send(state, TutorialMsg::CodeEdited("wrong".to_string()));
    let state = send(state, TutorialMsg::CheckClicked);
    assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
    let state = send(state, TutorialMsg::HintClicked);
    assert_eq!(state.view().hint.as_deref(), Some("Return the list."));

    let state = send(state, TutorialMsg::NextClicked);
    let view = state.view();
    assert_eq!(view.feedback, None);
    assert_eq!(view.output, "");
    assert_eq!(view.hint, None);
    assert!(view.code.starts_with("# Step 2"));
}

#[test]
fn gated_advance_refuses_wrong_code() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
    let (state, effects) = update_tutorial(state, TutorialMsg::NextClicked);

    assert!(effects.is_empty());
    assert_eq!(state.current_index(), 0);
    assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
    assert_eq!(
        state.view().feedback.map(StepFeedback::message),
        Some("Incorrect. Please try again.")
    );
}

#[test]
fn gated_advance_accepts_matching_submission() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
    let state = send(
        state,
        TutorialMsg::CodeEdited(
            "\ndef combination_sum(candidates, target):\n    results = []\n    return results\n\n"
                .to_string(),
        ),
    );
    let state = send(state, TutorialMsg::CheckClicked);
    assert_eq!(state.feedback(), Some(StepFeedback::Correct));

    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 1);
}

#[test]
fn editing_after_a_correct_check_regates_the_step() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
    let state = send(
        state,
        TutorialMsg::CodeEdited(
            "def combination_sum(candidates, target):\n    results = []\n    return results"
                .to_string(),
        ),
    );
    let state = send(state, TutorialMsg::CheckClicked);
    assert_eq!(state.feedback(), Some(StepFeedback::Correct));

    let state = send(state, TutorialMsg::CodeEdited("garbage".to_string()));
    assert_eq!(state.feedback(), None);

    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 0);
    assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
}

#[test]
fn check_result_for_edited_code_is_not_graded() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let state = send(state, TutorialMsg::NextClicked);
    let (state, effects) = update_tutorial(state, TutorialMsg::CheckClicked);
    let [Effect::ExecuteCode { ticket, .. }] = effects.as_slice() else {
        panic!("expected ExecuteCode, got {effects:?}");
    };

    let state = send(state, TutorialMsg::CodeEdited("print('cheat')".to_string()));
    let state = send(
        state,
        TutorialMsg::ExecutionFinished {
            ticket: *ticket,
            result: Ok("[[2, 2, 3], [7]]".to_string()),
        },
    );
    assert_eq!(state.feedback(), None);
    assert_eq!(state.view().output, "[[2, 2, 3], [7]]");
}

#[test]
fn check_with_expected_output_goes_through_execution() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
    let state = send(
        state,
        TutorialMsg::CodeEdited(
            "def combination_sum(candidates, target):\n    results = []\n    return results"
                .to_string(),
        ),
    );
    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 1);

    // Step 2 is gated on output; advancing before a check is refused.
    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 1);

    let (state, effects) = update_tutorial(state, TutorialMsg::CheckClicked);
    let [Effect::ExecuteCode { ticket, request }] = effects.as_slice() else {
        panic!("expected ExecuteCode, got {effects:?}");
    };
    assert_eq!(request.language, "python");
    assert!(state.view().running);
    assert_eq!(state.feedback(), None);

    let state = send(
        state,
        TutorialMsg::ExecutionFinished {
            ticket: *ticket,
            result: Ok("[[2, 2, 3], [7]]\n".to_string()),
        },
    );
    assert_eq!(state.feedback(), Some(StepFeedback::Correct));
    // The check alone never moves the index.
    assert_eq!(state.current_index(), 1);

    let state = send(state, TutorialMsg::NextClicked);
    assert_eq!(state.current_index(), 2);
}

#[test]
fn failed_check_output_is_incorrect() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let state = send(state, TutorialMsg::NextClicked);
    let (state, effects) = update_tutorial(state, TutorialMsg::CheckClicked);
    let [Effect::ExecuteCode { ticket, .. }] = effects.as_slice() else {
        panic!("expected ExecuteCode, got {effects:?}");
    };
    let state = send(
        state,
        TutorialMsg::ExecutionFinished {
            ticket: *ticket,
            result: Ok("[]".to_string()),
        },
    );
    assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
    assert_eq!(state.view().output, "[]");
}

#[test]
fn run_error_is_shown_without_feedback() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let (state, effects) = update_tutorial(state, TutorialMsg::RunClicked);
    let [Effect::ExecuteCode { ticket, .. }] = effects.as_slice() else {
        panic!("expected ExecuteCode, got {effects:?}");
    };

    // Only one request may be outstanding.
    let (state, effects) = update_tutorial(state, TutorialMsg::RunClicked);
    assert!(effects.is_empty());

    let state = send(
        state,
        TutorialMsg::ExecutionFinished {
            ticket: *ticket,
            result: Err(ExecutionError::new(
                ExecutionFailure::Network,
                "Error executing code",
            )),
        },
    );
    let view = state.view();
    assert_eq!(view.run_error.as_deref(), Some("Error executing code"));
    assert_eq!(view.feedback, None);
    assert!(view.can_run);
}

#[test]
fn navigating_away_cancels_pending_run() {
    init_logging();
    let state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
    let (state, effects) = update_tutorial(state, TutorialMsg::RunClicked);
    let [Effect::ExecuteCode { ticket, .. }] = effects.as_slice() else {
        panic!("expected ExecuteCode, got {effects:?}");
    };
    let ticket = *ticket;

    let (state, effects) = update_tutorial(state, TutorialMsg::NextClicked);
    assert_eq!(effects, vec![Effect::CancelRun { ticket }]);

    let state = send(
        state,
        TutorialMsg::ExecutionFinished {
            ticket,
            result: Ok("late".to_string()),
        },
    );
    assert_eq!(state.view().output, "");
}

proptest! {
    #[test]
    fn index_stays_within_bounds(moves in prop::collection::vec(any::<bool>(), 0..30)) {
        let mut state = TutorialSession::new(combination_sum(AdvancePolicy::Free));
        let mut expected: usize = 0;
        for forward in moves {
            let msg = if forward { TutorialMsg::NextClicked } else { TutorialMsg::PreviousClicked };
            state = update_tutorial(state, msg).0;
            expected = if forward { (expected + 1).min(2) } else { expected.saturating_sub(1) };
            prop_assert_eq!(state.current_index(), expected);
        }
    }

    #[test]
    fn gated_wrong_code_never_moves(code in "[a-z ]{0,20}") {
        let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
        let state = update_tutorial(state, TutorialMsg::CodeEdited(code)).0;
        let state = update_tutorial(state, TutorialMsg::NextClicked).0;
        prop_assert_eq!(state.current_index(), 0);
        prop_assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
    }

    #[test]
    fn wrong_code_after_correct_check_never_moves(code in "[a-z ]{0,20}") {
        let state = TutorialSession::new(combination_sum(AdvancePolicy::Gated));
        let expected = "def combination_sum(candidates, target):\n    results = []\n    return results";
        let state = update_tutorial(state, TutorialMsg::CodeEdited(expected.to_string())).0;
        let state = update_tutorial(state, TutorialMsg::CheckClicked).0;
        let state = update_tutorial(state, TutorialMsg::CodeEdited(code)).0;
        let state = update_tutorial(state, TutorialMsg::NextClicked).0;
        prop_assert_eq!(state.current_index(), 0);
        prop_assert_eq!(state.feedback(), Some(StepFeedback::Incorrect));
    }
}
