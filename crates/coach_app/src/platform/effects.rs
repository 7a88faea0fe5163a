use std::time::Duration;

use coach_core::{CatalogMsg, Effect, ExerciseMsg, TutorialMsg};
use coach_engine::{EngineEvent, EngineHandle, EngineStopped};
use coach_logging::{coach_debug, coach_info};

use super::AppMsg;

/// Which session receives execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunRoute {
    Exercise,
    Tutorial,
}

/// Turns core effects into engine commands, and engine events back into messages.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
    route: RunRoute,
}

impl EffectRunner {
    pub(crate) fn new(engine: EngineHandle, route: RunRoute) -> Self {
        Self { engine, route }
    }

    /// Carries out `effects`. Effects that only concern another state machine
    /// come back as messages for the caller to dispatch.
    pub(crate) fn enqueue(&self, effects: Vec<Effect>) -> Vec<AppMsg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::ExecuteCode { ticket, request } => {
                    coach_info!(
                        "ExecuteCode ticket={} language={} code_len={}",
                        ticket,
                        request.language,
                        request.code.len()
                    );
                    self.engine.execute(ticket, request);
                }
                Effect::CancelRun { ticket } => {
                    coach_debug!("CancelRun ticket={}", ticket);
                    self.engine.cancel(ticket);
                }
                Effect::FetchExercises { key } => {
                    coach_info!("FetchExercises {}", key);
                    self.engine.fetch(key);
                }
                Effect::ListQuestions => {
                    coach_info!("ListQuestions");
                    self.engine.list_questions();
                }
                Effect::DismissExercise => {
                    follow_ups.push(AppMsg::Exercise(ExerciseMsg::Unload));
                }
                Effect::PresentExercise { exercise, question } => {
                    follow_ups.push(AppMsg::Exercise(ExerciseMsg::Load { exercise, question }));
                }
                Effect::ExerciseCompleted {
                    exercise_id,
                    correct,
                } => {
                    coach_info!("exercise {} graded, correct={}", exercise_id, correct);
                    follow_ups.push(AppMsg::Catalog(CatalogMsg::ExerciseCompleted {
                        exercise_id,
                        correct,
                    }));
                }
            }
        }
        follow_ups
    }

    pub(crate) fn poll(&self) -> Option<AppMsg> {
        self.engine.try_recv().map(|event| self.to_msg(event))
    }

    pub(crate) fn wait(&self, timeout: Duration) -> Result<Option<AppMsg>, EngineStopped> {
        Ok(self
            .engine
            .recv_timeout(timeout)?
            .map(|event| self.to_msg(event)))
    }

    #[cfg(test)]
    pub(crate) fn shutdown(&self) {
        self.engine.shutdown();
    }

    fn to_msg(&self, event: EngineEvent) -> AppMsg {
        match event {
            EngineEvent::ExecutionFinished { ticket, result } => match self.route {
                RunRoute::Exercise => AppMsg::Exercise(ExerciseMsg::RunFinished { ticket, result }),
                RunRoute::Tutorial => {
                    AppMsg::Tutorial(TutorialMsg::ExecutionFinished { ticket, result })
                }
            },
            EngineEvent::ExercisesFetched { key, result } => {
                AppMsg::Catalog(CatalogMsg::Fetched { key, result })
            }
            EngineEvent::QuestionsListed { result } => {
                AppMsg::Catalog(CatalogMsg::QuestionsListed { result })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use coach_core::{
        CatalogMsg, ContentKey, Effect, ExecutionError, ExecutionRequest, Exercise, ExerciseMsg,
        FetchError, RunTicket, TutorialMsg,
    };
    use coach_engine::{CodeExecutor, ContentSource, EngineHandle};
    use pretty_assertions::assert_eq;

    use super::{AppMsg, EffectRunner, RunRoute};

    struct Echo;

    #[async_trait::async_trait]
    impl CodeExecutor for Echo {
        async fn execute(&self, request: &ExecutionRequest) -> Result<String, ExecutionError> {
            Ok(request.code.clone())
        }
    }

    #[async_trait::async_trait]
    impl ContentSource for Echo {
        async fn fetch(&self, _key: &ContentKey) -> Result<serde_json::Value, FetchError> {
            Ok(serde_json::json!([]))
        }

        async fn list_questions(&self) -> Result<serde_json::Value, FetchError> {
            Ok(serde_json::json!([{ "site": "so", "question_id": "7" }]))
        }
    }

    fn runner(route: RunRoute) -> EffectRunner {
        EffectRunner::new(EngineHandle::with_clients(Arc::new(Echo), Arc::new(Echo)), route)
    }

    fn execute(code: &str) -> (RunTicket, Effect) {
        let ticket = RunTicket { session: 1, run: 1 };
        let effect = Effect::ExecuteCode {
            ticket,
            request: ExecutionRequest {
                language: "golang".to_string(),
                code: code.to_string(),
                site: None,
                question_id: None,
            },
        };
        (ticket, effect)
    }

    #[test]
    fn run_results_follow_the_route() {
        let runner = runner(RunRoute::Tutorial);
        let (ticket, effect) = execute("fmt.Println(1)");
        assert!(runner.enqueue(vec![effect]).is_empty());

        let msg = runner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            msg,
            Some(AppMsg::Tutorial(TutorialMsg::ExecutionFinished {
                ticket,
                result: Ok("fmt.Println(1)".to_string()),
            }))
        );
    }

    #[test]
    fn fetch_results_go_to_catalog() {
        let runner = runner(RunRoute::Exercise);
        let key = ContentKey::Article("text".to_string());
        runner.enqueue(vec![Effect::FetchExercises { key: key.clone() }]);

        let msg = runner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            msg,
            Some(AppMsg::Catalog(CatalogMsg::Fetched {
                key,
                result: Ok(serde_json::json!([])),
            }))
        );
    }

    #[test]
    fn local_effects_become_messages() {
        let runner = runner(RunRoute::Exercise);
        let exercise = Arc::new(Exercise::new("ex-1", "x"));
        let follow_ups = runner.enqueue(vec![
            Effect::PresentExercise {
                exercise: exercise.clone(),
                question: None,
            },
            Effect::ExerciseCompleted {
                exercise_id: "ex-1".to_string(),
                correct: true,
            },
            Effect::DismissExercise,
        ]);

        assert_eq!(
            follow_ups,
            vec![
                AppMsg::Exercise(ExerciseMsg::Load {
                    exercise,
                    question: None,
                }),
                AppMsg::Catalog(CatalogMsg::ExerciseCompleted {
                    exercise_id: "ex-1".to_string(),
                    correct: true,
                }),
                AppMsg::Exercise(ExerciseMsg::Unload),
            ]
        );
    }

    #[test]
    fn question_listing_goes_to_catalog() {
        let runner = runner(RunRoute::Exercise);
        assert!(runner.enqueue(vec![Effect::ListQuestions]).is_empty());

        let msg = runner.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            msg,
            Some(AppMsg::Catalog(CatalogMsg::QuestionsListed {
                result: Ok(serde_json::json!([{ "site": "so", "question_id": "7" }])),
            }))
        );
    }

    #[test]
    fn waiting_on_a_stopped_engine_fails() {
        let runner = runner(RunRoute::Exercise);
        runner.shutdown();

        let mut outcome = runner.wait(Duration::from_millis(100));
        for _ in 0..50 {
            if outcome != Ok(None) {
                break;
            }
            outcome = runner.wait(Duration::from_millis(100));
        }
        assert_eq!(outcome, Err(coach_engine::EngineStopped));
    }
}
