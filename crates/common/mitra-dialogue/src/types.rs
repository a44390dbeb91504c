use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Opaque reference to a captured image. The engine never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment(String);

impl Attachment {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn reference(&self) -> &str {
        &self.0
    }
}

/// Canned result of a simulated crop image analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Percentage, 0..=100.
    pub confidence: u8,
    pub advice: String,
}

/// One turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    classification: Option<Classification>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into())
    }

    fn new(role: Role, text: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text,
            created_at: Utc::now(),
            attachment: None,
            classification: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_no_extras() {
        let msg = Message::user("hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.text(), "hello");
        assert!(msg.attachment().is_none());
        assert!(msg.classification().is_none());
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::assistant("a");
        let b = Message::assistant("b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn optional_fields_are_skipped_when_serialized() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("attachment").is_none());
        assert!(json.get("classification").is_none());
    }

    #[test]
    fn classification_survives_serialization() {
        let msg = Message::assistant("done").with_classification(Classification {
            label: "Early Blight".into(),
            confidence: 87,
            advice: "Apply copper-based fungicide.".into(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.classification(), msg.classification());
        assert_eq!(back.id(), msg.id());
    }
}
