use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coach_core::{
    parse_question, update, update_catalog, update_tutorial, CatalogMsg, CatalogState,
    CatalogStatus, ContentKey, ExerciseMsg, ExerciseSession, ParsedQuestion, RunState, Tutorial,
    TutorialMsg, TutorialSession,
};
use coach_engine::EngineHandle;
use coach_logging::{coach_debug, coach_info};

use super::config::PlayerConfig;
use super::effects::{EffectRunner, RunRoute};
use super::{render, AppMsg, Source};

const WAIT_SLICE: Duration = Duration::from_millis(100);

const EXERCISE_HELP: &str =
    "commands: code, open <file>, run, submit, hint, solution, show, retry, questions, quit";
const TUTORIAL_HELP: &str = "commands: code, open <file>, run, check, hint, next, prev, show, quit";

pub fn run_app(config: PlayerConfig, source: Source) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    match source {
        Source::Quiz(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read question {path:?}"))?;
            let question = parse_question(&text)
                .with_context(|| format!("{path:?} is not a well-formed question"))?;
            run_quiz(&question, stdin.lock(), stdout.lock())?;
        }
        Source::Tutorial(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read tutorial {path:?}"))?;
            let tutorial: Tutorial =
                ron::from_str(&text).with_context(|| format!("failed to parse tutorial {path:?}"))?;
            coach_info!(
                "tutorial {:?} loaded with {} steps",
                tutorial.title(),
                tutorial.steps().len()
            );
            let session = TutorialSession::with_comparator(
                Arc::new(tutorial),
                config.grading_config().comparator,
            );
            let engine = EngineHandle::new(config.service_settings());
            let runner = EffectRunner::new(engine, RunRoute::Tutorial);
            let mut app = App::tutorial(runner, session, stdout.lock());
            app.run(stdin.lock())?;
        }
        Source::Article(text) => {
            let mut app = exercise_app(&config, stdout.lock());
            let key = ContentKey::Article(text);
            app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(key)))?;
            app.run(stdin.lock())?;
        }
        Source::Question(question) => {
            let mut app = exercise_app(&config, stdout.lock());
            let key = ContentKey::Question(question);
            app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(key)))?;
            app.run(stdin.lock())?;
        }
        Source::Questions => {
            let mut app = exercise_app(&config, stdout.lock());
            app.dispatch(AppMsg::Catalog(CatalogMsg::QuestionsRequested))?;
            app.run(io::empty())?;
        }
    }
    Ok(())
}

fn exercise_app<W: Write>(config: &PlayerConfig, out: W) -> App<W> {
    let engine = EngineHandle::new(config.service_settings());
    let session = ExerciseSession::new(config.grading_config(), config.language.clone());
    App::exercises(EffectRunner::new(engine, RunRoute::Exercise), session, out)
}

/// Asks for an answer letter until one of the options is named.
pub(crate) fn run_quiz<R: BufRead, W: Write>(
    question: &ParsedQuestion,
    input: R,
    mut out: W,
) -> io::Result<()> {
    write!(out, "{}", render::render_question(question))?;
    writeln!(out, "Answer with a letter:")?;
    for line in input.lines() {
        let line = line?;
        let mut chars = line.trim().chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            writeln!(out, "Answer with a single letter.")?;
            continue;
        };
        let known = question
            .options()
            .iter()
            .any(|option| option.label.as_char() == letter.to_ascii_lowercase());
        if !known {
            writeln!(out, "No option `{letter}`.")?;
            continue;
        }
        let verdict = if question.is_correct(letter) {
            "Correct!"
        } else {
            "Incorrect."
        };
        let answer = question.correct_answer();
        writeln!(out, "{verdict} The answer is {}) {}", answer.label, answer.text)?;
        writeln!(out, "{}", question.explanation())?;
        break;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

enum Mode {
    Exercises {
        catalog: CatalogState,
        session: ExerciseSession,
    },
    Tutorial {
        session: Option<TutorialSession>,
    },
}

/// Line-oriented driver around the core state machines.
struct App<W: Write> {
    runner: EffectRunner,
    mode: Mode,
    /// Lines collected by `code` until a lone `.`.
    editor: Option<Vec<String>>,
    out: W,
}

impl<W: Write> App<W> {
    fn exercises(runner: EffectRunner, session: ExerciseSession, out: W) -> Self {
        Self {
            runner,
            mode: Mode::Exercises {
                catalog: CatalogState::new(),
                session,
            },
            editor: None,
            out,
        }
    }

    fn tutorial(runner: EffectRunner, session: TutorialSession, out: W) -> Self {
        Self {
            runner,
            mode: Mode::Tutorial {
                session: Some(session),
            },
            editor: None,
            out,
        }
    }

    /// Reads commands until `quit` or end of input. While a run or fetch is
    /// outstanding no input is read, so scripted sessions see every result.
    fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        let mut lines = input.lines();
        self.render()?;
        loop {
            while self.busy() {
                if let Some(msg) = self.runner.wait(WAIT_SLICE).map_err(io::Error::other)? {
                    self.dispatch(msg)?;
                }
            }
            while let Some(msg) = self.runner.poll() {
                self.dispatch(msg)?;
            }
            self.render()?;

            let Some(line) = lines.next() else {
                break;
            };
            if self.handle_line(&line?)? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    fn busy(&self) -> bool {
        match &self.mode {
            Mode::Exercises { catalog, session } => {
                catalog.status() == CatalogStatus::Loading
                    || catalog.questions_status() == CatalogStatus::Loading
                    || session.run_state() == RunState::Running
            }
            Mode::Tutorial { session } => session.as_ref().is_some_and(|s| s.view().running),
        }
    }

    /// Applies `msg` and everything it leads to, rendering after each step so
    /// feedback is visible before a follow-up replaces it.
    fn dispatch(&mut self, msg: AppMsg) -> io::Result<()> {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let effects = match (&mut self.mode, msg) {
                (Mode::Exercises { session, .. }, AppMsg::Exercise(msg)) => {
                    let (next, effects) = update(std::mem::take(session), msg);
                    *session = next;
                    effects
                }
                (Mode::Exercises { catalog, .. }, AppMsg::Catalog(msg)) => {
                    let (next, effects) = update_catalog(std::mem::take(catalog), msg);
                    *catalog = next;
                    effects
                }
                (Mode::Tutorial { session }, AppMsg::Tutorial(msg)) => match session.take() {
                    Some(current) => {
                        let (next, effects) = update_tutorial(current, msg);
                        *session = Some(next);
                        effects
                    }
                    None => Vec::new(),
                },
                (_, msg) => {
                    coach_debug!("message does not apply to this mode: {:?}", msg);
                    Vec::new()
                }
            };
            queue.extend(self.runner.enqueue(effects));
            self.render()?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        if let Some(lines) = self.editor.as_mut() {
            if line.trim_end() != "." {
                lines.push(line.to_string());
                return Ok(Flow::Continue);
            }
            let code = lines.join("\n");
            self.editor = None;
            self.edit_code(code)?;
            return Ok(Flow::Continue);
        }

        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };
        match command {
            "" => {}
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => writeln!(self.out, "{}", self.help())?,
            "code" => {
                writeln!(self.out, "Enter code, finish with a line containing only `.`")?;
                self.editor = Some(Vec::new());
            }
            "open" => match fs::read_to_string(argument) {
                Ok(code) => self.edit_code(code)?,
                Err(err) => writeln!(self.out, "Cannot read {argument:?}: {err}")?,
            },
            "show" => self.show()?,
            _ => match self.command_msg(command) {
                Some(msg) => self.dispatch(msg)?,
                None => writeln!(self.out, "Unknown command `{command}`. {}", self.help())?,
            },
        }
        Ok(Flow::Continue)
    }

    fn command_msg(&self, command: &str) -> Option<AppMsg> {
        let msg = match (&self.mode, command) {
            (Mode::Exercises { .. }, "run") => AppMsg::Exercise(ExerciseMsg::RunClicked),
            (Mode::Exercises { .. }, "submit") => AppMsg::Exercise(ExerciseMsg::SubmitClicked),
            (Mode::Exercises { .. }, "hint") => AppMsg::Exercise(ExerciseMsg::HintClicked),
            (Mode::Exercises { .. }, "solution") => AppMsg::Exercise(ExerciseMsg::SolutionToggled),
            (Mode::Exercises { .. }, "questions") => AppMsg::Catalog(CatalogMsg::QuestionsRequested),
            (Mode::Exercises { catalog, .. }, "retry") => {
                AppMsg::Catalog(CatalogMsg::Requested(catalog.key()?.clone()))
            }
            (Mode::Tutorial { .. }, "run") => AppMsg::Tutorial(TutorialMsg::RunClicked),
            (Mode::Tutorial { .. }, "check") => AppMsg::Tutorial(TutorialMsg::CheckClicked),
            (Mode::Tutorial { .. }, "hint") => AppMsg::Tutorial(TutorialMsg::HintClicked),
            (Mode::Tutorial { .. }, "next") => AppMsg::Tutorial(TutorialMsg::NextClicked),
            (Mode::Tutorial { .. }, "prev") => AppMsg::Tutorial(TutorialMsg::PreviousClicked),
            _ => return None,
        };
        Some(msg)
    }

    fn edit_code(&mut self, code: String) -> io::Result<()> {
        let msg = match self.mode {
            Mode::Exercises { .. } => AppMsg::Exercise(ExerciseMsg::CodeEdited(code)),
            Mode::Tutorial { .. } => AppMsg::Tutorial(TutorialMsg::CodeEdited(code)),
        };
        self.dispatch(msg)
    }

    fn help(&self) -> &'static str {
        match self.mode {
            Mode::Exercises { .. } => EXERCISE_HELP,
            Mode::Tutorial { .. } => TUTORIAL_HELP,
        }
    }

    /// Writes every view that changed since the last render.
    fn render(&mut self) -> io::Result<()> {
        let mut text = String::new();
        match &mut self.mode {
            Mode::Exercises { catalog, session } => {
                if catalog.consume_dirty() {
                    text.push_str(&render::render_catalog(&catalog.view()));
                }
                if session.consume_dirty() {
                    text.push_str(&render::render_exercise(&session.view()));
                }
            }
            Mode::Tutorial {
                session: Some(session),
            } => {
                if session.consume_dirty() {
                    text.push_str(&render::render_tutorial(&session.view()));
                }
            }
            Mode::Tutorial { session: None } => {}
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    /// Writes the current views regardless of changes.
    fn show(&mut self) -> io::Result<()> {
        let text = match &self.mode {
            Mode::Exercises { catalog, session } => format!(
                "{}{}",
                render::render_catalog(&catalog.view()),
                render::render_exercise(&session.view())
            ),
            Mode::Tutorial { session } => session
                .as_ref()
                .map(|s| render::render_tutorial(&s.view()))
                .unwrap_or_default(),
        };
        self.out.write_all(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use coach_core::{
        parse_question, AdvancePolicy, ContentKey, ExecutionError, ExecutionRequest, FetchError,
        GradingConfig, Tutorial, TutorialSession, TutorialStep,
    };
    use coach_engine::{CodeExecutor, ContentSource, EngineHandle};

    use super::*;

    /// Prints the code it is given, like a program that only echoes its source.
    struct Echo;

    #[async_trait::async_trait]
    impl CodeExecutor for Echo {
        async fn execute(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
            Ok(request.code.clone())
        }
    }

    struct TwoExercises;

    #[async_trait::async_trait]
    impl ContentSource for TwoExercises {
        async fn fetch(&self, _key: &ContentKey) -> Result<serde_json::Value, FetchError> {
            Ok(serde_json::json!({
                "exercises": [
                    {
                        "id": "first",
                        "title": "Say hi",
                        "initialCode": "hi",
                        "expectedOutput": "hi",
                        "hints": ["Just run it."]
                    },
                    { "id": "second", "title": "Say bye", "initialCode": "bye" }
                ]
            }))
        }

        async fn list_questions(&self) -> Result<serde_json::Value, FetchError> {
            Ok(serde_json::json!([
                { "site": "stackoverflow", "question_id": 11227809, "question_text": { "title": "Branch prediction" } }
            ]))
        }
    }

    fn engine() -> EngineHandle {
        EngineHandle::with_clients(Arc::new(Echo), Arc::new(TwoExercises))
    }

    fn run_script<W: Write>(mut app: App<W>, script: &str) -> W {
        app.run(Cursor::new(script.to_string())).unwrap();
        app.out
    }

    #[test]
    fn correct_submission_moves_to_next_exercise() {
        let mut app = App::exercises(
            EffectRunner::new(engine(), RunRoute::Exercise),
            ExerciseSession::new(GradingConfig::default(), "golang"),
            Vec::new(),
        );
        app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(ContentKey::Article(
            "text".to_string(),
        ))))
        .unwrap();

        let out = String::from_utf8(run_script(app, "hint\nrun\nsubmit\nquit\n")).unwrap();

        assert!(out.contains("Exercise 1 of 2"), "{out}");
        assert!(out.contains("Hint 1: Just run it."), "{out}");
        assert!(out.contains("Correct!"), "{out}");
        assert!(out.contains("Exercise 2 of 2"), "{out}");
        assert!(out.contains("Say bye"), "{out}");
    }

    #[test]
    fn question_listing_is_printed_without_input() {
        let mut app = App::exercises(
            EffectRunner::new(engine(), RunRoute::Exercise),
            ExerciseSession::default(),
            Vec::new(),
        );
        app.dispatch(AppMsg::Catalog(CatalogMsg::QuestionsRequested))
            .unwrap();

        let out = String::from_utf8(run_script(app, "")).unwrap();

        assert!(out.contains("Loading questions..."), "{out}");
        assert!(out.contains("  stackoverflow/11227809  Branch prediction"), "{out}");
    }

    #[test]
    fn new_article_clears_the_previous_exercise() {
        let mut app = App::exercises(
            EffectRunner::new(engine(), RunRoute::Exercise),
            ExerciseSession::default(),
            Vec::new(),
        );
        app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(ContentKey::Article(
            "first".to_string(),
        ))))
        .unwrap();
        app.run(Cursor::new(String::new())).unwrap();
        let Mode::Exercises { session, .. } = &app.mode else {
            panic!("exercise mode expected");
        };
        assert_eq!(session.view().exercise_id.as_deref(), Some("first"));

        app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(ContentKey::Article(
            "second".to_string(),
        ))))
        .unwrap();
        let Mode::Exercises { session, .. } = &app.mode else {
            panic!("exercise mode expected");
        };
        assert_eq!(session.view().exercise_id, None);
    }

    #[test]
    fn stopped_engine_ends_the_session_with_an_error() {
        let mut app = App::exercises(
            EffectRunner::new(engine(), RunRoute::Exercise),
            ExerciseSession::default(),
            Vec::new(),
        );
        app.runner.shutdown();
        app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(ContentKey::Article(
            "text".to_string(),
        ))))
        .unwrap();

        let err = app.run(Cursor::new("quit\n".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "execution engine stopped");
    }

    #[test]
    fn edited_code_is_what_runs() {
        let mut app = App::exercises(
            EffectRunner::new(engine(), RunRoute::Exercise),
            ExerciseSession::default(),
            Vec::new(),
        );
        app.dispatch(AppMsg::Catalog(CatalogMsg::Requested(ContentKey::Article(
            "text".to_string(),
        ))))
        .unwrap();

        let out = String::from_utf8(run_script(app, "code\nhello\n.\nrun\nsubmit\n")).unwrap();

        assert!(out.contains("Output:\n    hello"), "{out}");
        assert!(out.contains("Incorrect."), "{out}");
        assert!(out.contains("Expected output:\n    hi"), "{out}");
    }

    #[test]
    fn gated_tutorial_needs_a_check() {
        let step = |snippet: &str, expected: Option<&str>| TutorialStep {
            index: 0,
            instruction: format!("Type {snippet}"),
            code_snippet: String::new(),
            tree_data: None,
            expected_submission: expected.map(str::to_string),
            expected_output: None,
            hint: None,
        };
        let tutorial = Tutorial::new(
            "Basics",
            "golang",
            AdvancePolicy::Gated,
            vec![step("x := 1", Some("x := 1")), step("done", None)],
        )
        .unwrap();
        let app = App::tutorial(
            EffectRunner::new(engine(), RunRoute::Tutorial),
            TutorialSession::new(Arc::new(tutorial)),
            Vec::new(),
        );

        let out = String::from_utf8(run_script(
            app,
            "next\ncode\nx := 1\n.\ncheck\nnext\nquit\n",
        ))
        .unwrap();

        assert!(out.contains("Incorrect. Please try again."), "{out}");
        assert!(out.contains("Correct! Proceed to the next step."), "{out}");
        assert!(out.contains("Basics - step 2 of 2"), "{out}");
    }

    #[test]
    fn demo_tutorial_parses() {
        let tutorial: Tutorial = ron::from_str(include_str!("../../../../demos/go_basics.ron")).unwrap();
        assert_eq!(tutorial.advance_policy(), AdvancePolicy::Gated);
        assert_eq!(tutorial.steps().len(), 3);
        assert_eq!(tutorial.steps()[2].index, 2);
    }

    #[test]
    fn demo_question_parses() {
        let question = parse_question(include_str!("../../../../demos/question.txt")).unwrap();
        assert_eq!(question.options().len(), 4);
        assert_eq!(question.correct_answer().text, "Sorted string tables");
    }

    #[test]
    fn quiz_reprompts_until_a_valid_letter() {
        let question = parse_question(
            "Question: 2 + 2? Options: a) 3 b) 4 Correct Answer: b Explanation: Arithmetic.",
        )
        .unwrap();
        let mut out = Vec::new();
        run_quiz(&question, Cursor::new("maybe\ne\nB\n"), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Answer with a single letter."));
        assert!(out.contains("No option `e`."));
        assert!(out.contains("Correct! The answer is b) 4"));
        assert!(out.ends_with("Arithmetic.\n"));
    }
}
