//! Async driver that delivers replies after the simulated delay.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    conversation::{Conversation, Pending},
    error::{DialogueError, DialogueResult},
    picker::{ResponsePicker, UniformPicker},
    script::Script,
    timer::{Timer, TokioTimer},
    types::{Attachment, Message},
};

/// Observable transcript changes, in the order they happen.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    MessageAppended(Message),
    Busy,
    Idle,
    Disposed,
}

/// A conversation bound to the Tokio runtime.
///
/// Each accepted submission spawns one delivery task. Disposing the session
/// (explicitly or by dropping it) cancels that task and guarantees nothing is
/// appended afterwards. Must be used from within a Tokio runtime.
pub struct DialogueSession {
    conversation: Arc<Mutex<Conversation>>,
    timer: Arc<dyn Timer>,
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<TranscriptEvent>,
}

impl DialogueSession {
    pub fn new(script: Arc<Script>) -> Self {
        Self::with_parts(script, Box::new(UniformPicker), Arc::new(TokioTimer))
    }

    pub fn with_parts(
        script: Arc<Script>,
        picker: Box<dyn ResponsePicker>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            conversation: Arc::new(Mutex::new(Conversation::with_boxed_picker(script, picker))),
            timer,
            shutdown: CancellationToken::new(),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Message> {
        self.conversation.lock().transcript().to_vec()
    }

    /// Number of messages in the transcript, greeting included, so never zero.
    pub fn message_count(&self) -> usize {
        self.conversation.lock().transcript().len()
    }

    pub fn is_busy(&self) -> bool {
        self.conversation.lock().is_busy()
    }

    pub fn is_disposed(&self) -> bool {
        self.conversation.lock().is_disposed()
    }

    pub fn script(&self) -> Arc<Script> {
        Arc::clone(self.conversation.lock().script())
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.conversation.lock().suggestions().to_vec()
    }

    pub fn submit(&self, utterance: &str) -> DialogueResult<()> {
        self.accept(|conversation| conversation.submit(utterance))
    }

    pub fn submit_image(&self, attachment: Attachment) -> DialogueResult<()> {
        self.accept(|conversation| conversation.submit_image(attachment))
    }

    pub fn submit_handoff(&self, prompt: &str) -> DialogueResult<()> {
        self.accept(|conversation| conversation.submit_handoff(prompt))
    }

    /// Resolves once no reply is pending.
    pub async fn wait_idle(&self) -> DialogueResult<()> {
        let mut event_rx = self.event_tx.subscribe();
        loop {
            {
                let conversation = self.conversation.lock();
                if conversation.is_disposed() {
                    return Err(DialogueError::Disposed);
                }
                if !conversation.is_busy() {
                    return Ok(());
                }
            }
            match event_rx.recv().await {
                Ok(TranscriptEvent::Idle) => return Ok(()),
                Ok(TranscriptEvent::Disposed) | Err(RecvError::Closed) => {
                    return Err(DialogueError::Disposed);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    }

    /// Closes the conversation. Idempotent.
    pub fn dispose(&self) {
        let disposed = self.conversation.lock().dispose();
        self.shutdown.cancel();
        if disposed {
            info!("Dialogue session disposed");
            let _ = self.event_tx.send(TranscriptEvent::Disposed);
        }
    }

    fn accept(
        &self,
        submit: impl FnOnce(&mut Conversation) -> DialogueResult<Pending>,
    ) -> DialogueResult<()> {
        let deadline = Instant::now();
        let pending = {
            let mut conversation = self.conversation.lock();
            let pending = submit(&mut *conversation)?;
            // Published under the lock so subscribers see transcript order.
            if let Some(message) = conversation.last() {
                let _ = self
                    .event_tx
                    .send(TranscriptEvent::MessageAppended(message.clone()));
            }
            let _ = self.event_tx.send(TranscriptEvent::Busy);
            pending
        };

        self.schedule(pending, deadline + pending.delay);
        Ok(())
    }

    fn schedule(&self, pending: Pending, deadline: Instant) {
        let conversation = Arc::clone(&self.conversation);
        let timer = Arc::clone(&self.timer);
        let shutdown = self.shutdown.clone();
        let event_tx = self.event_tx.clone();

        debug!(
            ticket = pending.ticket,
            kind = ?pending.kind,
            delay = ?pending.delay,
            "Scheduling assistant reply"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(ticket = pending.ticket, "Reply cancelled");
                    return;
                }
                _ = timer.sleep_until(deadline) => {}
            }

            let mut conversation = conversation.lock();
            match conversation.deliver(pending.ticket) {
                Ok(message) => {
                    let _ = event_tx.send(TranscriptEvent::MessageAppended(message.clone()));
                    let _ = event_tx.send(TranscriptEvent::Idle);
                }
                Err(err) => {
                    debug!(ticket = pending.ticket, "Reply not delivered: {err}");
                }
            }
        });
    }
}

impl Drop for DialogueSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for DialogueSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueSession")
            .field("conversation", &*self.conversation.lock())
            .finish_non_exhaustive()
    }
}
