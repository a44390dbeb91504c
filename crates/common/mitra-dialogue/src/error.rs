use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Assistant is still answering the previous message")]
    Busy,

    #[error("Conversation has been disposed")]
    Disposed,

    #[error("No response is pending")]
    NotAwaiting,

    #[error("Invalid script: {reason}")]
    InvalidScript { reason: String },

    #[error("Failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

impl DialogueError {
    pub fn invalid_script<S: ToString>(reason: S) -> Self {
        DialogueError::InvalidScript {
            reason: reason.to_string(),
        }
    }

    /// True for the rejections a caller can simply retry later.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DialogueError::EmptyInput | DialogueError::Busy | DialogueError::Disposed
        )
    }
}

pub type DialogueResult<T> = std::result::Result<T, DialogueError>;
