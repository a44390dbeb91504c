//! Keyword table and first-match selection.

use serde::{Deserialize, Serialize};

use crate::{
    error::{DialogueError, DialogueResult},
    picker::{ResponsePicker, choose},
};

/// Maps trigger substrings to canned responses.
///
/// A rule matches when any trigger occurs in the lower-cased input. When it
/// carries several responses one of them is picked at random.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    triggers: Vec<String>,
    responses: Vec<String>,
}

impl KeywordRule {
    pub fn new(trigger: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            triggers: vec![trigger.into()],
            responses: vec![response.into()],
        }
    }

    pub fn any_of<T, R>(
        triggers: impl IntoIterator<Item = T>,
        responses: impl IntoIterator<Item = R>,
    ) -> Self
    where
        T: Into<String>,
        R: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            responses: responses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// `normalized` must already be lower-cased.
    fn matches(&self, normalized: &str) -> bool {
        self.triggers
            .iter()
            .any(|trigger| normalized.contains(trigger.as_str()))
    }

    fn normalize(mut self, position: usize) -> DialogueResult<Self> {
        if self.triggers.is_empty() {
            return Err(DialogueError::invalid_script(format!(
                "rule {position} has no triggers"
            )));
        }
        if self.responses.is_empty() {
            return Err(DialogueError::invalid_script(format!(
                "rule {position} has no responses"
            )));
        }
        for trigger in &mut self.triggers {
            if trigger.trim().is_empty() {
                return Err(DialogueError::invalid_script(format!(
                    "rule {position} has an empty trigger"
                )));
            }
            // Surrounding spaces are part of the trigger.
            *trigger = trigger.to_lowercase();
        }
        if self.responses.iter().any(|r| r.trim().is_empty()) {
            return Err(DialogueError::invalid_script(format!(
                "rule {position} has an empty response"
            )));
        }
        Ok(self)
    }
}

/// Ordered, immutable list of keyword rules. Table order is the precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<KeywordRule>,
}

impl RuleTable {
    /// Validates every rule and lower-cases its triggers.
    pub fn new(rules: Vec<KeywordRule>) -> DialogueResult<Self> {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(position, rule)| rule.normalize(position))
            .collect::<DialogueResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule, in table order, with a trigger contained in `utterance`.
    pub fn find(&self, utterance: &str) -> Option<&KeywordRule> {
        let normalized = utterance.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }

    /// Response of the first matching rule, or `None` when nothing matches.
    pub fn select(&self, utterance: &str, picker: &mut dyn ResponsePicker) -> Option<&str> {
        self.find(utterance)
            .and_then(|rule| choose(picker, &rule.responses))
            .map(String::as_str)
    }
}
