//! Transcript plus the Idle / Awaiting / Disposed state machine.
//!
//! Everything here is synchronous. [`crate::DialogueSession`] adds the timed
//! delivery on top.

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    error::{DialogueError, DialogueResult},
    picker::{ResponsePicker, UniformPicker},
    script::Script,
    types::{Attachment, Classification, Message},
};

/// Kind of turn awaiting delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Reply,
    Analysis,
    Handoff,
}

/// Handle to the reply scheduled by an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub ticket: u64,
    pub kind: TurnKind,
    pub delay: Duration,
}

#[derive(Debug)]
struct PendingReply {
    pending: Pending,
    text: String,
    classification: Option<Classification>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Awaiting(PendingReply),
    Disposed,
}

/// One open assistant conversation.
///
/// The transcript starts with the script's greeting and only ever grows.
pub struct Conversation {
    script: Arc<Script>,
    picker: Box<dyn ResponsePicker>,
    transcript: Vec<Message>,
    phase: Phase,
    next_ticket: u64,
}

impl Conversation {
    pub fn new(script: Arc<Script>) -> Self {
        Self::with_picker(script, UniformPicker)
    }

    pub fn with_picker(script: Arc<Script>, picker: impl ResponsePicker + 'static) -> Self {
        Self::with_boxed_picker(script, Box::new(picker))
    }

    pub fn with_boxed_picker(script: Arc<Script>, picker: Box<dyn ResponsePicker>) -> Self {
        let transcript = vec![Message::assistant(script.greeting())];
        Self {
            script,
            picker,
            transcript,
            phase: Phase::Idle,
            next_ticket: 0,
        }
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn last(&self) -> Option<&Message> {
        self.transcript.last()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.phase, Phase::Disposed)
    }

    pub fn pending(&self) -> Option<Pending> {
        match &self.phase {
            Phase::Awaiting(reply) => Some(reply.pending),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        self.script.suggestions()
    }

    /// Selection algorithm for a free-text utterance, without touching the
    /// transcript.
    pub fn compute_response(&mut self, utterance: &str) -> String {
        self.script.compute_response(utterance, self.picker.as_mut())
    }

    /// Appends the user's message and schedules the matching reply.
    ///
    /// Rejected with [`DialogueError::Busy`] while a reply is pending; a
    /// rejected call leaves the transcript untouched.
    pub fn submit(&mut self, utterance: &str) -> DialogueResult<Pending> {
        self.ensure_accepting(utterance)?;
        let text = self.compute_response(utterance);
        let delay = self.script.delays().reply;

        self.transcript.push(Message::user(utterance));
        Ok(self.await_reply(TurnKind::Reply, delay, text, None))
    }

    /// Appends a user message carrying `attachment` and schedules a canned
    /// analysis result.
    pub fn submit_image(&mut self, attachment: Attachment) -> DialogueResult<Pending> {
        self.ensure_idle()?;
        let classification = self
            .script
            .classify(self.picker.as_mut())
            .cloned()
            .ok_or_else(|| DialogueError::invalid_script("script has no classification records"))?;
        let text = self.script.templates().render_analysis(&classification);
        let delay = self.script.delays().analysis;

        self.transcript
            .push(Message::user(self.script.image_prompt()).with_attachment(attachment));
        Ok(self.await_reply(TurnKind::Analysis, delay, text, Some(classification)))
    }

    /// Opens the conversation with a prompt handed over by another screen.
    pub fn submit_handoff(&mut self, prompt: &str) -> DialogueResult<Pending> {
        self.ensure_accepting(prompt)?;
        let text = self.script.templates().render_handoff(prompt);
        let delay = self.script.delays().handoff;

        self.transcript.push(Message::user(prompt));
        Ok(self.await_reply(TurnKind::Handoff, delay, text, None))
    }

    /// Appends whatever reply is pending and returns to Idle.
    pub fn deliver_response(&mut self) -> DialogueResult<&Message> {
        let ticket = match &self.phase {
            Phase::Awaiting(reply) => reply.pending.ticket,
            Phase::Idle => return Err(DialogueError::NotAwaiting),
            Phase::Disposed => return Err(DialogueError::Disposed),
        };
        self.deliver(ticket)
    }

    /// Delivers only if `ticket` is still the pending one.
    pub fn deliver(&mut self, ticket: u64) -> DialogueResult<&Message> {
        let reply = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Awaiting(reply) if reply.pending.ticket == ticket => reply,
            Phase::Disposed => {
                self.phase = Phase::Disposed;
                return Err(DialogueError::Disposed);
            }
            other => {
                self.phase = other;
                return Err(DialogueError::NotAwaiting);
            }
        };

        let mut message = Message::assistant(reply.text);
        if let Some(classification) = reply.classification {
            message = message.with_classification(classification);
        }
        debug!(ticket, kind = ?reply.pending.kind, "Delivering assistant reply");
        self.transcript.push(message);
        self.transcript.last().ok_or(DialogueError::NotAwaiting)
    }

    /// Tears the conversation down. A pending reply is dropped and every
    /// later call is rejected with [`DialogueError::Disposed`].
    ///
    /// Returns `false` if it was already disposed.
    pub fn dispose(&mut self) -> bool {
        match std::mem::replace(&mut self.phase, Phase::Disposed) {
            Phase::Disposed => false,
            Phase::Awaiting(reply) => {
                debug!(ticket = reply.pending.ticket, "Dropping pending reply on dispose");
                true
            }
            Phase::Idle => true,
        }
    }

    fn ensure_idle(&self) -> DialogueResult<()> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Awaiting(_) => {
                warn!("Rejecting submission while a reply is pending");
                Err(DialogueError::Busy)
            }
            Phase::Disposed => Err(DialogueError::Disposed),
        }
    }

    fn ensure_accepting(&self, text: &str) -> DialogueResult<()> {
        if self.is_disposed() {
            return Err(DialogueError::Disposed);
        }
        if text.trim().is_empty() {
            return Err(DialogueError::EmptyInput);
        }
        self.ensure_idle()
    }

    fn await_reply(
        &mut self,
        kind: TurnKind,
        delay: Duration,
        text: String,
        classification: Option<Classification>,
    ) -> Pending {
        self.next_ticket += 1;
        let pending = Pending {
            ticket: self.next_ticket,
            kind,
            delay,
        };
        self.phase = Phase::Awaiting(PendingReply {
            pending,
            text,
            classification,
        });
        pending
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("messages", &self.transcript.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
