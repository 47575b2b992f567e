//! Session state and the Stage-Gate state machine.
//!
//! A [`Session`] is plain data owned by the caller and passed by `&mut` into
//! each orchestrator operation. The phase logic itself is the pure function
//! [`Phase::next`], so it can be tested without any I/O.

mod analysis;
mod history;
mod message;

pub use analysis::*;
pub use history::*;
pub use message::*;

use serde::Serialize;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum Phase {
    /// No idea submitted yet.
    NotStarted,
    /// Coaching in progress at a stage below Validation.
    Active(Stage),
    /// Validation reached; the full report replaces the chat.
    Complete,
}

/// Inputs that can move a session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Idea submitted; analysis reported this starting stage.
    Submitted(Stage),
    /// Post-turn evaluation reported this stage.
    Evaluated(Stage),
    /// Explicit restart.
    Restart,
}

impl Phase {
    /// Phase for a started session sitting at `stage`.
    pub fn at(stage: Stage) -> Phase {
        if stage.is_final() {
            Phase::Complete
        } else {
            Phase::Active(stage)
        }
    }

    /// Next phase for `event`. Events that do not apply leave the phase as is.
    pub fn next(self, event: PhaseEvent) -> Phase {
        match (self, event) {
            (_, PhaseEvent::Restart) => Phase::NotStarted,
            (Phase::NotStarted, PhaseEvent::Submitted(stage)) => Phase::at(stage),
            (Phase::Active(current), PhaseEvent::Evaluated(reported)) if reported != current => {
                Phase::at(reported)
            }
            (phase, _) => phase,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Phase::Complete)
    }
}

/// A stage change applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageChange {
    pub from: Stage,
    pub to: Stage,
}

impl StageChange {
    pub fn is_regression(&self) -> bool {
        self.to < self.from
    }
}

/// Mutable state of one validation session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    idea: String,
    region: Option<String>,
    mode: Mode,
    messages: Vec<Message>,
    analysis: Option<IdeaAnalysis>,
    stage: Stage,
    phase: PhaseState,
    /// Index of the assistant message still receiving content
    in_flight: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PhaseState {
    #[default]
    NotStarted,
    Started,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn analysis(&self) -> Option<&IdeaAnalysis> {
        self.analysis.as_ref()
    }

    /// Current stage (Discovery before the session starts)
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn phase(&self) -> Phase {
        match self.phase {
            PhaseState::NotStarted => Phase::NotStarted,
            PhaseState::Started => Phase::at(self.stage),
        }
    }

    /// The assistant message currently receiving streamed content
    pub fn in_flight(&self) -> Option<&Message> {
        self.in_flight.and_then(|i| self.messages.get(i))
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record a submitted idea and its analysis, entering the starting stage.
    pub fn begin(
        &mut self,
        idea: impl Into<String>,
        mode: Mode,
        region: Option<String>,
        analysis: IdeaAnalysis,
    ) -> Phase {
        let start = analysis.starting_stage();
        self.idea = idea.into();
        self.mode = mode;
        self.region = region;
        self.analysis = Some(analysis);
        self.stage = start;
        self.phase = PhaseState::Started;
        Phase::NotStarted.next(PhaseEvent::Submitted(start))
    }

    /// Append a finished user turn, settling any reply left open.
    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.settle_in_flight();
        self.messages.push(Message::user(content));
        &self.messages[self.messages.len() - 1]
    }

    /// Append an empty assistant message that will receive streamed content.
    ///
    /// A reply left open by an abandoned operation is settled first.
    pub fn open_reply(&mut self) -> &Message {
        self.settle_in_flight();
        self.messages.push(Message::assistant(String::new()));
        self.in_flight = Some(self.messages.len() - 1);
        &self.messages[self.messages.len() - 1]
    }

    /// Replace the in-flight message's content. No-op when nothing is in flight.
    pub fn update_reply(&mut self, content: &str) {
        if let Some(message) = self.in_flight.and_then(|i| self.messages.get_mut(i)) {
            message.content.clear();
            message.content.push_str(content);
        }
    }

    /// Freeze the in-flight message with its final content and suggestions.
    pub fn close_reply(&mut self, content: String, suggestions: Vec<String>) -> Option<&Message> {
        let index = self.in_flight.take()?;
        let message = self.messages.get_mut(index)?;
        message.content = content;
        message.suggestions = Some(suggestions);
        Some(&*message)
    }

    /// Drop the in-flight message; used when nothing at all arrived.
    pub fn discard_reply(&mut self) -> Option<Message> {
        let index = self.in_flight.take()?;
        (index < self.messages.len()).then(|| self.messages.remove(index))
    }

    /// Keep a dangling in-flight message if it has content, remove it otherwise.
    fn settle_in_flight(&mut self) {
        let Some(index) = self.in_flight else {
            return;
        };
        let empty = self
            .messages
            .get(index)
            .map(|m| m.content.is_empty())
            .unwrap_or(true);
        if empty {
            self.discard_reply();
        } else {
            self.in_flight = None;
        }
    }

    /// Apply an evaluator-reported stage.
    ///
    /// Only the reported endpoint is applied. A change appends exactly one
    /// announcement message.
    pub fn apply_evaluation(&mut self, reported: Stage) -> Option<StageChange> {
        let before = self.phase();
        let after = before.next(PhaseEvent::Evaluated(reported));
        if after == before {
            return None;
        }

        let change = StageChange {
            from: self.stage,
            to: reported,
        };
        self.stage = reported;
        self.messages
            .push(Message::stage_announcement(change.from, change.to));
        Some(change)
    }

    /// Discard everything and return to a freshly created session.
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// Serializable view for front ends.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            mode: self.mode,
            idea: self.idea.clone(),
            region: self.region.clone(),
            stage: self.stage,
            stage_name: self.stage.name(),
            messages: self.messages.clone(),
            analysis: self.analysis.clone(),
        }
    }
}

/// Read-only rendering view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub mode: Mode,
    pub idea: String,
    pub region: Option<String>,
    pub stage: Stage,
    pub stage_name: &'static str,
    pub messages: Vec<Message>,
    pub analysis: Option<IdeaAnalysis>,
}
