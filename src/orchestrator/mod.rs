//! Drives one validation session end to end.
//!
//! [`ConversationOrchestrator`] owns no session state. Every operation takes
//! the caller's [`Session`] by `&mut`, so one session can only have one
//! request in flight, and reports progress through an observer callback
//! instead of touching any UI.
//!
//! A turn is: open an in-flight reply, fold the streamed fragments into it
//! (previewing the `message` field as it grows), settle the buffer with
//! [`finalize_reply`], then run the best-effort stage evaluation.

use futures::StreamExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError, SessionError};
use crate::llm::{within, TextGenerator};
use crate::modes::{AnalyzeParams, ChatMode, IdeaAnalyzer, ModeCore, StageEvaluator};
use crate::prompts::autopilot_chat_directive;
use crate::session::{Message, Mode, Phase, Session, Stage};
use crate::stream::{finalize_reply, ReplySource, StreamingJsonExtractor};

/// Idea submission that starts a session.
pub type StartRequest = AnalyzeParams;

/// Progress notifications delivered to the observer during an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A reply is about to stream.
    TypingStarted,
    /// A fragment arrived; `content` is the whole in-flight text so far.
    Delta { content: String },
    /// The stream ended, failed or was cancelled. Always follows `TypingStarted`.
    TypingStopped,
    /// The in-flight reply was settled and appended for good.
    ReplyFinalized {
        message: Message,
        source: ReplySource,
    },
    /// Post-turn evaluation moved the session.
    StageChanged { from: Stage, to: Stage },
}

/// Result of folding a reply stream.
struct StreamOutcome {
    extractor: StreamingJsonExtractor,
    /// Why the stream stopped early, if it did
    failure: Option<LlmError>,
}

/// Session state machine over the analyzer, the mentor chat and the
/// stage evaluator.
#[derive(Debug, Clone)]
pub struct ConversationOrchestrator {
    analyzer: IdeaAnalyzer,
    evaluator: StageEvaluator,
    chat: ChatMode,
    stream_idle_timeout: Duration,
}

impl ConversationOrchestrator {
    /// Create an orchestrator from application configuration.
    pub fn new(generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self::with_core(
            ModeCore::new(generator, config.generation.clone()),
            Duration::from_millis(config.request.stream_idle_timeout_ms),
        )
    }

    pub fn with_core(core: ModeCore, stream_idle_timeout: Duration) -> Self {
        Self {
            analyzer: IdeaAnalyzer::new(core.clone()),
            evaluator: StageEvaluator::new(core.clone()),
            chat: ChatMode::new(core),
            stream_idle_timeout,
        }
    }

    /// Submit an idea: analyze it, enter the starting stage and stream the
    /// first mentor reply.
    ///
    /// Any previous content of `session` is discarded once the analysis
    /// succeeds; a failed analysis leaves it untouched.
    pub async fn start<F>(
        &self,
        session: &mut Session,
        request: StartRequest,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> AppResult<Phase>
    where
        F: FnMut(&SessionEvent),
    {
        let analysis = cancellable(cancel, self.analyzer.analyze(&request)).await?;

        let idea = request.idea.trim().to_string();
        let region = request
            .region
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let live = match request.mode {
            Mode::Autopilot => autopilot_chat_directive(&idea, region.as_deref()),
            Mode::Guided => idea.clone(),
        };

        session.reset();
        let phase = session.begin(idea.clone(), request.mode, region, analysis);
        session.push_user(idea);

        info!(
            mode = %request.mode,
            stage = %session.stage(),
            complete = phase.is_complete(),
            "Session started"
        );

        self.run_turn(session, &live, Vec::new(), cancel, &mut observer)
            .await?;
        Ok(session.phase())
    }

    /// Send a user turn and stream the mentor's reply.
    pub async fn send<F>(
        &self,
        session: &mut Session,
        text: &str,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> AppResult<Phase>
    where
        F: FnMut(&SessionEvent),
    {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::Validation {
                field: "message".to_string(),
                reason: "Message cannot be empty".to_string(),
            }
            .into());
        }

        match session.phase() {
            Phase::NotStarted => return Err(SessionError::NotStarted.into()),
            Phase::Complete => return Err(SessionError::Complete.into()),
            Phase::Active(_) => {}
        }

        session.push_user(text);
        let history = session
            .messages()
            .split_last()
            .map(|(_, prior)| prior.to_vec())
            .unwrap_or_default();

        self.run_turn(session, text, history, cancel, &mut observer)
            .await?;
        Ok(session.phase())
    }

    /// Discard all session state.
    pub fn restart(&self, session: &mut Session) {
        session.reset();
        info!("Session restarted");
    }

    async fn run_turn<F>(
        &self,
        session: &mut Session,
        live: &str,
        history: Vec<Message>,
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> AppResult<()>
    where
        F: FnMut(&SessionEvent),
    {
        let start = Instant::now();

        session.open_reply();
        observer(&SessionEvent::TypingStarted);
        let outcome = self
            .consume_stream(session, live, &history, cancel, observer)
            .await;
        observer(&SessionEvent::TypingStopped);

        let StreamOutcome { extractor, failure } = outcome;
        let (buffer, preview) = extractor.into_parts();
        let reply = finalize_reply(&buffer, preview.as_deref());

        if reply.is_empty() {
            session.discard_reply();
            let err: AppError = match failure {
                Some(e) => e.into(),
                None => SessionError::EmptyResponse.into(),
            };
            error!(error = %err, "Reply produced no content");
            return Err(err);
        }

        let source = reply.source;
        if let Some(message) = session.close_reply(reply.message, reply.suggestions) {
            let message = message.clone();
            info!(
                source = ?source,
                chars = message.content.len(),
                suggestions = message.suggestions.as_ref().map_or(0, Vec::len),
                latency_ms = start.elapsed().as_millis() as u64,
                "Reply finalized"
            );
            observer(&SessionEvent::ReplyFinalized { message, source });
        }

        if let Some(e) = failure {
            warn!(error = %e, "Reply stream interrupted, partial content kept");
            return Err(e.into());
        }

        self.evaluate_turn(session, cancel, observer).await;
        Ok(())
    }

    /// Fold the reply stream into the in-flight message, chunk by chunk.
    async fn consume_stream<F>(
        &self,
        session: &mut Session,
        live: &str,
        history: &[Message],
        cancel: &CancellationToken,
        observer: &mut F,
    ) -> StreamOutcome
    where
        F: FnMut(&SessionEvent),
    {
        let mut extractor = StreamingJsonExtractor::new();

        let opening = within(self.stream_idle_timeout, self.chat.stream_reply(live, history));
        let mut stream = match cancellable(cancel, opening).await {
            Ok(stream) => stream,
            Err(e) => {
                return StreamOutcome {
                    extractor,
                    failure: Some(e),
                }
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LlmError::Cancelled),
                next = tokio::time::timeout(self.stream_idle_timeout, stream.next()) => {
                    next.map_err(|_| LlmError::Timeout {
                        timeout_ms: self.stream_idle_timeout.as_millis() as u64,
                    })
                }
            };

            let failure = match next {
                Ok(Some(Ok(chunk))) => {
                    let content = extractor.push(&chunk).unwrap_or_default().to_string();
                    session.update_reply(&content);
                    observer(&SessionEvent::Delta { content });
                    continue;
                }
                Ok(None) => None,
                Ok(Some(Err(e))) | Err(e) => Some(e),
            };

            debug!(
                bytes = extractor.buffer().len(),
                failed = failure.is_some(),
                "Reply stream ended"
            );
            return StreamOutcome { extractor, failure };
        }
    }

    /// Best-effort stage re-assessment after a completed turn.
    async fn evaluate_turn<F>(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
        observer: &mut F,
    ) where
        F: FnMut(&SessionEvent),
    {
        if session.phase().is_complete() {
            debug!("Session complete, skipping stage evaluation");
            return;
        }

        let result = cancellable(
            cancel,
            self.evaluator
                .evaluate(session.messages(), session.idea(), session.stage()),
        )
        .await;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, stage = %session.stage(), "Stage evaluation failed, stage unchanged");
                return;
            }
        };

        if let Some(change) = session.apply_evaluation(report.stage) {
            info!(
                from = %change.from,
                to = %change.to,
                regression = change.is_regression(),
                gating_decision = ?report.gating_decision,
                "Stage changed"
            );
            observer(&SessionEvent::StageChanged {
                from: change.from,
                to: change.to,
            });
        }
    }
}

/// Race `future` against cancellation.
async fn cancellable<T, E, Fut>(cancel: &CancellationToken, future: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<LlmError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled.into()),
        result = future => result,
    }
}
