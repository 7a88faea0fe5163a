use std::fmt::Write;

use coach_core::{
    AdvancePolicy, CatalogStatus, CatalogView, ExerciseView, ParsedQuestion, RunState,
    TestVerdict, TreeNode, TutorialView,
};

const RULE: &str = "----------------------------------------";

pub(crate) fn render_catalog(view: &CatalogView) -> String {
    let mut out = render_exercise_progress(view);
    out.push_str(&render_questions(view));
    out
}

fn render_exercise_progress(view: &CatalogView) -> String {
    match view.status {
        CatalogStatus::Empty => String::new(),
        CatalogStatus::Loading => "Loading exercises...\n".to_string(),
        CatalogStatus::Failed => format!(
            "{}\n",
            view.error.as_deref().unwrap_or("Failed to load exercises.")
        ),
        CatalogStatus::Loaded if view.completed => {
            format!("All {} exercises completed.\n", view.exercise_count)
        }
        CatalogStatus::Loaded => format!(
            "Exercise {} of {}\n",
            view.current_index + 1,
            view.exercise_count
        ),
    }
}

fn render_questions(view: &CatalogView) -> String {
    let mut out = String::new();
    match view.questions_status {
        CatalogStatus::Empty => {}
        CatalogStatus::Loading => out.push_str("Loading questions...\n"),
        CatalogStatus::Failed => {
            let _ = writeln!(
                out,
                "{}",
                view.questions_error
                    .as_deref()
                    .unwrap_or("Failed to fetch questions.")
            );
        }
        CatalogStatus::Loaded if view.questions.is_empty() => out.push_str("No questions.\n"),
        CatalogStatus::Loaded => {
            let _ = writeln!(out, "Questions:");
            for entry in &view.questions {
                let id = format!("{}/{}", entry.question.site, entry.question.question_id);
                match &entry.title {
                    Some(title) => {
                        let _ = writeln!(out, "  {id}  {title}");
                    }
                    None => {
                        let _ = writeln!(out, "  {id}");
                    }
                }
            }
            let _ = writeln!(out, "Open one with --question site/id");
        }
    }
    out
}

pub(crate) fn render_exercise(view: &ExerciseView) -> String {
    let mut out = String::new();
    let Some(id) = view.exercise_id.as_deref() else {
        return out;
    };

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{}", view.title.as_deref().unwrap_or(id));
    if let Some(difficulty) = &view.difficulty {
        let _ = writeln!(out, "Difficulty: {difficulty}");
    }
    for text in [&view.problem_statement, &view.instructions]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(out, "\n{text}");
    }
    if !view.test_cases.is_empty() {
        let _ = writeln!(out, "\nTest cases:");
        for case in &view.test_cases {
            let _ = writeln!(
                out,
                "  input: {}  expected: {}",
                case.input, case.expected_output
            );
        }
    }
    if !view.references.is_empty() {
        let _ = writeln!(out, "\nReferences:");
        for reference in &view.references {
            let _ = writeln!(out, "  {reference}");
        }
    }

    let _ = writeln!(out, "\nCode:\n{}", indent(&view.code));

    match view.run_state {
        RunState::Idle => {}
        RunState::Running => {
            let _ = writeln!(out, "Running...");
        }
        RunState::Ready => {
            let _ = writeln!(out, "Output:\n{}", indent(&view.output));
            match view.verdict {
                TestVerdict::AllPassed => {
                    let _ = writeln!(out, "All tests passed.");
                }
                TestVerdict::SomeFailed => {
                    let _ = writeln!(out, "Some tests failed.");
                }
                TestVerdict::Unknown => {}
            }
        }
        RunState::Errored => {
            let _ = writeln!(
                out,
                "Error: {}",
                view.run_error.as_deref().unwrap_or("execution failed")
            );
        }
    }

    for (index, hint) in view.revealed_hints.iter().enumerate() {
        let _ = writeln!(out, "Hint {}: {hint}", index + 1);
    }
    if let (Some(code), Some(explanation)) = (&view.solution_code, &view.solution_explanation) {
        let _ = writeln!(out, "Solution:\n{}\n{explanation}", indent(code));
    }

    if view.submitted {
        if view.correct {
            let _ = writeln!(out, "Correct!");
        } else {
            let _ = writeln!(out, "Incorrect.");
            if let Some(expected) = &view.expected_output {
                let _ = writeln!(out, "Expected output:\n{}", indent(expected));
            }
        }
    }

    let _ = writeln!(out, "[{}]", exercise_actions(view).join(" "));
    out
}

fn exercise_actions(view: &ExerciseView) -> Vec<&'static str> {
    let mut actions = vec!["code"];
    if view.can_run {
        actions.push("run");
    }
    if view.can_submit {
        actions.push("submit");
    }
    if view.can_request_hint {
        actions.push("hint");
    }
    if view.can_toggle_solution {
        actions.push("solution");
    }
    actions.push("quit");
    actions
}

pub(crate) fn render_tutorial(view: &TutorialView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{} - step {} of {}",
        view.title,
        view.step_index + 1,
        view.step_count
    );
    let _ = writeln!(out, "\n{}", view.instruction);
    if let Some(tree) = &view.tree {
        let _ = writeln!(out);
        render_tree(&mut out, tree, 0);
    }
    let _ = writeln!(out, "\nCode:\n{}", indent(&view.code));

    if view.running {
        let _ = writeln!(out, "Running...");
    } else if let Some(err) = &view.run_error {
        let _ = writeln!(out, "Error: {err}");
    } else if !view.output.is_empty() {
        let _ = writeln!(out, "Output:\n{}", indent(&view.output));
    }
    if let Some(hint) = &view.hint {
        let _ = writeln!(out, "Hint: {hint}");
    }
    if let Some(feedback) = view.feedback {
        let _ = writeln!(out, "{}", feedback.message());
    }

    let mut actions = vec!["code"];
    if view.can_run {
        actions.extend(["run", "check"]);
    }
    if view.can_request_hint {
        actions.push("hint");
    }
    if view.can_retreat {
        actions.push("prev");
    }
    if view.can_advance {
        actions.push(match view.advance_policy {
            AdvancePolicy::Free => "next",
            AdvancePolicy::Gated => "next (after a correct check)",
        });
    }
    actions.push("quit");
    let _ = writeln!(out, "[{}]", actions.join(" "));
    out
}

fn render_tree(out: &mut String, node: &TreeNode, depth: usize) {
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.name);
    for child in &node.children {
        render_tree(out, child, depth + 1);
    }
}

pub(crate) fn render_question(question: &ParsedQuestion) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", question.question());
    for option in question.options() {
        let _ = writeln!(out, "  {}) {}", option.label, option.text);
    }
    out
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
