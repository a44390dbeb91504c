//! Scripted assistant dialogue engine.
//!
//! A [`Conversation`] keeps an append-only transcript and answers free text
//! from an ordered keyword table, falling back to canned replies. A
//! [`DialogueSession`] delivers those replies after a simulated delay on the
//! Tokio runtime.

pub use conversation::{Conversation, Pending, TurnKind};
pub use error::{DialogueError, DialogueResult};
pub use picker::{FixedPicker, ResponsePicker, UniformPicker};
pub use presets::Preset;
pub use rules::{KeywordRule, RuleTable};
pub use script::{Delays, Script, Templates};
pub use session::{DialogueSession, TranscriptEvent};
pub use timer::{Timer, TokioTimer};
pub use types::{Attachment, Classification, Message, Role};

mod conversation;
mod error;
mod picker;
pub mod presets;
mod rules;
mod script;
mod session;
mod timer;
mod types;
