//! Session orchestrator
//!
//! A single actor task owns the session state: the current prompt, its
//! debounced token count and the live result set. Handles send commands over
//! an mpsc channel and read immutable snapshots from a watch channel.
//!
//! Superseded work is never aborted. Tokenizations carry the input generation
//! and submissions carry a sequence number; completions tagged with a stale
//! number are dropped on arrival.

use crate::models::{ModelResult, SubmissionReport, SubmitResponse};
use crate::services::estimator::Estimator;
use crate::services::gateway::{invoke_all, Gateway};
use crate::services::tokenizer::TokenizerService;
use crate::utils::error::{helpers::validation_error, AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Command channel capacity
const COMMAND_BUFFER: usize = 64;

/// Tokenize, fan out and estimate
#[derive(Clone)]
pub struct Pipeline {
    tokenizer: TokenizerService,
    gateway: Arc<dyn Gateway>,
    estimator: Arc<Estimator>,
}

impl Pipeline {
    pub fn new(tokenizer: TokenizerService, gateway: Arc<dyn Gateway>, estimator: Arc<Estimator>) -> Self {
        Self {
            tokenizer,
            gateway,
            estimator,
        }
    }

    pub fn tokenizer(&self) -> &TokenizerService {
        &self.tokenizer
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Fan the prompt out to every model, then estimate all of them for `token_count`
    ///
    /// Estimates do not depend on call outcomes; every configured model gets a
    /// result unless its coefficients are missing, which fails the whole set.
    pub async fn settle(&self, submission: u64, prompt: &str, token_count: usize) -> AppResult<SubmissionReport> {
        let model_ids = self.gateway.model_ids();
        if model_ids.is_empty() {
            return Err(AppError::Internal("No models configured".to_string()));
        }

        let failed_models = invoke_all(self.gateway.as_ref(), &model_ids, prompt).await;
        if failed_models.len() == model_ids.len() {
            warn!("Submission {}: every model call failed", submission);
        }

        let results = self.estimator.estimate_models(&model_ids, token_count)?;
        let impact = self.estimator.summarize(&results);
        let cards = results.iter().map(ModelResult::card).collect();

        Ok(SubmissionReport {
            submission,
            token_count,
            results,
            failed_models,
            impact,
            cards,
        })
    }

    /// One-shot submission: tokenize with fallback, then settle
    pub async fn run_submission(&self, submission: u64, prompt: &str) -> AppResult<SubmissionReport> {
        if prompt.trim().is_empty() {
            return Err(validation_error("Prompt is required"));
        }

        let token_count = self.tokenizer.tokenize(prompt).await;
        self.settle(submission, prompt, token_count).await
    }
}

/// Coarse session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Tokenizing,
    Estimating,
}

/// Published session state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: Phase,
    pub prompt: String,
    /// Token count of the latest settled tokenization
    pub token_count: usize,
    /// An edit is waiting for its debounce window or its tokenization
    pub tokenizing: bool,
    /// The latest submission has not settled yet
    pub estimating: bool,
    /// Number of the latest submission, 0 before the first one
    pub submission: u64,
    /// Live result set of the latest settled submission
    pub report: Option<SubmissionReport>,
    /// Failure of the latest submission; `report` is empty when set
    pub error: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            prompt: String::new(),
            token_count: 0,
            tokenizing: false,
            estimating: false,
            submission: 0,
            report: None,
            error: None,
        }
    }
}

enum Command {
    Input(String, oneshot::Sender<Snapshot>),
    Submit(oneshot::Sender<AppResult<SubmitResponse>>),
}

enum Completion {
    Tokenized { generation: u64, token_count: usize },
    Settled { submission: u64, outcome: AppResult<SubmissionReport> },
}

/// Handle to a running session actor
#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl Orchestrator {
    /// Spawn the session actor on the current runtime
    ///
    /// The actor stops once every handle has been dropped.
    pub fn spawn(pipeline: Pipeline, debounce: Duration) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(Snapshot::default());

        let session = Session {
            pipeline: Arc::new(pipeline),
            debounce,
            state: Snapshot::default(),
            generation: 0,
            deadline: None,
            publisher: snapshots_tx,
        };

        tokio::spawn(session.run(commands_rx));

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }

    /// Record an edit of the prompt and return the state right after it
    pub async fn input(&self, text: impl Into<String>) -> AppResult<Snapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Input(text.into(), reply_tx))
            .await
            .map_err(|_| session_closed())?;

        reply_rx.await.map_err(|_| session_closed())
    }

    /// Submit the current prompt with its current token count
    pub async fn submit(&self) -> AppResult<SubmitResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Submit(reply_tx))
            .await
            .map_err(|_| session_closed())?;

        reply_rx.await.map_err(|_| session_closed())?
    }

    /// Latest published state
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

fn session_closed() -> AppError {
    AppError::ServiceUnavailable("Session has stopped".to_string())
}

/// Actor-owned session state
struct Session {
    pipeline: Arc<Pipeline>,
    debounce: Duration,
    state: Snapshot,
    /// Incremented on every edit
    generation: u64,
    /// Pending debounce timer
    deadline: Option<Instant>,
    publisher: watch::Sender<Snapshot>,
}

impl Session {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (completions_tx, mut completions) = mpsc::unbounded_channel();

        loop {
            let deadline = self.deadline;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Input(text, reply)) => {
                        self.on_input(text);
                        self.publish();
                        let _ = reply.send(self.state.clone());
                    }
                    Some(Command::Submit(reply)) => {
                        let outcome = self.on_submit(&completions_tx);
                        self.publish();
                        let _ = reply.send(outcome);
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.dispatch_tokenization(&completions_tx);
                }
                Some(completion) = completions.recv() => self.on_completion(completion),
            }

            self.publish();
        }

        debug!("Session actor stopped");
    }

    fn on_input(&mut self, text: String) {
        self.generation += 1;
        self.state.prompt = text;

        if self.state.prompt.trim().is_empty() {
            // Nothing to count; also discards any tokenization still in flight
            self.deadline = None;
            self.state.token_count = 0;
            self.state.tokenizing = false;
        } else {
            self.deadline = Some(Instant::now() + self.debounce);
            self.state.tokenizing = true;
        }
    }

    fn dispatch_tokenization(&mut self, completions: &mpsc::UnboundedSender<Completion>) {
        self.deadline = None;

        let generation = self.generation;
        let text = self.state.prompt.clone();
        let pipeline = self.pipeline.clone();
        let completions = completions.clone();

        debug!("Dispatching tokenization for input generation {}", generation);

        tokio::spawn(async move {
            let token_count = pipeline.tokenizer().tokenize(&text).await;
            let _ = completions.send(Completion::Tokenized {
                generation,
                token_count,
            });
        });
    }

    fn on_submit(&mut self, completions: &mpsc::UnboundedSender<Completion>) -> AppResult<SubmitResponse> {
        if self.state.prompt.trim().is_empty() {
            return Err(validation_error("Prompt is required"));
        }

        self.state.submission += 1;
        self.state.estimating = true;
        self.state.report = None;
        self.state.error = None;

        let submission = self.state.submission;
        let token_count = self.state.token_count;
        let prompt = self.state.prompt.clone();
        let pipeline = self.pipeline.clone();
        let completions = completions.clone();

        info!("Submission {} started with {} tokens", submission, token_count);

        tokio::spawn(async move {
            let outcome = pipeline.settle(submission, &prompt, token_count).await;
            let _ = completions.send(Completion::Settled { submission, outcome });
        });

        Ok(SubmitResponse {
            submission,
            token_count,
        })
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Tokenized {
                generation,
                token_count,
            } => {
                if generation != self.generation {
                    debug!("Dropping tokenization for stale input generation {}", generation);
                    return;
                }
                self.state.token_count = token_count;
                self.state.tokenizing = false;
            }
            Completion::Settled { submission, outcome } => {
                if submission != self.state.submission {
                    debug!("Dropping results of superseded submission {}", submission);
                    return;
                }
                self.state.estimating = false;
                match outcome {
                    Ok(report) => {
                        info!(
                            "Submission {} settled: {} results, {} failed calls",
                            submission,
                            report.results.len(),
                            report.failed_models.len()
                        );
                        self.state.report = Some(report);
                    }
                    Err(e) => {
                        warn!("Submission {} failed: {}", submission, e);
                        self.state.report = None;
                        self.state.error = Some(e.to_string());
                    }
                }
            }
        }
    }

    fn publish(&mut self) {
        self.state.phase = if self.state.estimating {
            Phase::Estimating
        } else if self.state.tokenizing {
            Phase::Tokenizing
        } else {
            Phase::Idle
        };

        let state = self.state.clone();
        self.publisher.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
