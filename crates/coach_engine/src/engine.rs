use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use coach_core::{ContentKey, ExecutionRequest, RunTicket};
use coach_logging::{coach_debug, coach_error, coach_warn};
use tokio_util::sync::CancellationToken;

use crate::content::{ContentSource, ReqwestContentSource};
use crate::execute::{CodeExecutor, ReqwestExecutor};
use crate::http::ServiceSettings;
use crate::{EngineEvent, EngineStopped};

enum EngineCommand {
    Execute {
        ticket: RunTicket,
        request: ExecutionRequest,
    },
    Cancel {
        ticket: RunTicket,
    },
    Fetch {
        key: ContentKey,
    },
    ListQuestions,
    Shutdown,
}

type InFlight = Arc<Mutex<HashMap<RunTicket, CancellationToken>>>;

/// Runs execution and content requests on a background tokio runtime.
///
/// Results come back as [`EngineEvent`]s; cancelled runs produce no event.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ServiceSettings) -> Self {
        Self::with_clients(
            Arc::new(ReqwestExecutor::new(settings.clone())),
            Arc::new(ReqwestContentSource::new(settings)),
        )
    }

    pub fn with_clients(executor: Arc<dyn CodeExecutor>, content: Arc<dyn ContentSource>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    coach_error!("failed to start engine runtime: {}", err);
                    return;
                }
            };
            let in_flight: InFlight = Arc::default();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Execute { ticket, request } => {
                        let token = CancellationToken::new();
                        if let Ok(mut map) = in_flight.lock() {
                            map.insert(ticket, token.clone());
                        }
                        let executor = executor.clone();
                        let event_tx = event_tx.clone();
                        let in_flight = in_flight.clone();
                        runtime.spawn(async move {
                            let outcome = token
                                .run_until_cancelled(executor.execute(&request))
                                .await;
                            if let Ok(mut map) = in_flight.lock() {
                                map.remove(&ticket);
                            }
                            match outcome {
                                Some(result) => {
                                    if let Err(err) = &result {
                                        coach_warn!("run {} failed: {}", ticket, err);
                                    }
                                    let _ = event_tx
                                        .send(EngineEvent::ExecutionFinished { ticket, result });
                                }
                                None => coach_debug!("run {} cancelled", ticket),
                            }
                        });
                    }
                    EngineCommand::Cancel { ticket } => {
                        let token = in_flight.lock().ok().and_then(|mut map| map.remove(&ticket));
                        if let Some(token) = token {
                            token.cancel();
                        }
                    }
                    EngineCommand::Fetch { key } => {
                        let content = content.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = content.fetch(&key).await;
                            if let Err(err) = &result {
                                coach_warn!("fetch for {} failed: {:?}", key, err);
                            }
                            let _ = event_tx.send(EngineEvent::ExercisesFetched { key, result });
                        });
                    }
                    EngineCommand::ListQuestions => {
                        let content = content.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = content.list_questions().await;
                            if let Err(err) = &result {
                                coach_warn!("question listing failed: {:?}", err);
                            }
                            let _ = event_tx.send(EngineEvent::QuestionsListed { result });
                        });
                    }
                    EngineCommand::Shutdown => break,
                }
            }
            coach_debug!("engine stopped");
        });

        Self { cmd_tx, event_rx }
    }

    pub fn execute(&self, ticket: RunTicket, request: ExecutionRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Execute { ticket, request });
    }

    pub fn cancel(&self, ticket: RunTicket) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { ticket });
    }

    pub fn fetch(&self, key: ContentKey) {
        let _ = self.cmd_tx.send(EngineCommand::Fetch { key });
    }

    pub fn list_questions(&self) {
        let _ = self.cmd_tx.send(EngineCommand::ListQuestions);
    }

    /// Stops the background thread; outstanding work is dropped without an event.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// `Ok(None)` on timeout. Once the background thread is gone no event can
    /// ever arrive, which is reported as [`EngineStopped`].
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }
}
