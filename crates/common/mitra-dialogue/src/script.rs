//! Static configuration a conversation runs against.

use std::{path::Path, time::Duration};

use bon::bon;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{DialogueError, DialogueResult},
    picker::{ResponsePicker, choose},
    rules::{KeywordRule, RuleTable},
    types::Classification,
};

pub const DEFAULT_IMAGE_PROMPT: &str = "Please analyze this crop image";

const DEFAULT_ANALYSIS_TEMPLATE: &str = "### Analysis Complete! 🔍\n\n\
**Detected:** {label}\n\
**Confidence:** {confidence}%\n\n\
**Recommendations:**\n{advice}";

const DEFAULT_HANDOFF_TEMPLATE: &str = "You said: {prompt}\n\nHow can I help you with that?";

/// Simulated "thinking" time for each kind of turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    #[serde(with = "humantime_serde")]
    pub reply: Duration,
    #[serde(with = "humantime_serde")]
    pub analysis: Duration,
    #[serde(with = "humantime_serde")]
    pub handoff: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            reply: Duration::from_millis(1500),
            analysis: Duration::from_millis(3000),
            handoff: Duration::from_millis(1500),
        }
    }
}

impl Delays {
    /// Same delay for every kind of turn.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            reply: delay,
            analysis: delay,
            handoff: delay,
        }
    }
}

/// Text templates with `{placeholder}` substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    /// Placeholders: `{label}`, `{confidence}`, `{advice}`.
    pub analysis: String,
    /// Placeholder: `{prompt}`.
    pub handoff: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            analysis: DEFAULT_ANALYSIS_TEMPLATE.to_string(),
            handoff: DEFAULT_HANDOFF_TEMPLATE.to_string(),
        }
    }
}

impl Templates {
    pub fn render_analysis(&self, classification: &Classification) -> String {
        self.analysis
            .replace("{label}", &classification.label)
            .replace("{confidence}", &classification.confidence.to_string())
            .replace("{advice}", &classification.advice)
    }

    pub fn render_handoff(&self, prompt: &str) -> String {
        self.handoff.replace("{prompt}", prompt)
    }
}

/// On-disk shape of a script. Converted through [`Script::builder`] so file
/// and code paths share validation.
#[derive(Debug, Deserialize)]
struct ScriptFile {
    greeting: String,
    #[serde(default)]
    image_prompt: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    rules: Vec<KeywordRule>,
    fallbacks: Vec<String>,
    #[serde(default)]
    classifications: Vec<Classification>,
    #[serde(default)]
    delays: Delays,
    #[serde(default)]
    templates: Templates,
}

/// Immutable per-conversation configuration: keyword table, fallback and
/// classification sets, delays and texts. Share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Script {
    greeting: String,
    image_prompt: String,
    suggestions: Vec<String>,
    rules: RuleTable,
    fallbacks: Vec<String>,
    classifications: Vec<Classification>,
    delays: Delays,
    templates: Templates,
}

#[bon]
impl Script {
    /// Creates a validated script.
    ///
    /// # Example
    ///
    /// ```
    /// use mitra_dialogue::{KeywordRule, Script};
    ///
    /// let script = Script::builder()
    ///     .greeting("Hello! Ask me anything about your farm.")
    ///     .rules(vec![KeywordRule::new("water", "Use drip irrigation.")])
    ///     .fallbacks(vec!["Let me look into that.".to_string()])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(script.rules().len(), 1);
    /// ```
    #[builder]
    pub fn new(
        #[builder(into)] greeting: String,
        #[builder(into, default = DEFAULT_IMAGE_PROMPT.to_string())] image_prompt: String,
        #[builder(default)] suggestions: Vec<String>,
        #[builder(default)] rules: Vec<KeywordRule>,
        fallbacks: Vec<String>,
        #[builder(default)] classifications: Vec<Classification>,
        #[builder(default)] delays: Delays,
        #[builder(default)] templates: Templates,
    ) -> DialogueResult<Self> {
        if greeting.trim().is_empty() {
            return Err(DialogueError::invalid_script("greeting cannot be empty"));
        }
        if image_prompt.trim().is_empty() {
            return Err(DialogueError::invalid_script("image prompt cannot be empty"));
        }
        if fallbacks.is_empty() {
            return Err(DialogueError::invalid_script(
                "at least one fallback response is required",
            ));
        }
        if fallbacks.iter().any(|f| f.trim().is_empty()) {
            return Err(DialogueError::invalid_script(
                "fallback responses cannot be empty",
            ));
        }
        for classification in &classifications {
            if classification.label.trim().is_empty() {
                return Err(DialogueError::invalid_script(
                    "classification label cannot be empty",
                ));
            }
            if classification.confidence > 100 {
                return Err(DialogueError::invalid_script(format!(
                    "confidence for '{}' cannot be greater than 100",
                    classification.label
                )));
            }
        }
        let rules = RuleTable::new(rules)?;

        Ok(Self {
            greeting,
            image_prompt,
            suggestions,
            rules,
            fallbacks,
            classifications,
            delays,
            templates,
        })
    }
}

impl Script {
    pub fn from_toml_str(source: &str) -> DialogueResult<Self> {
        let file: ScriptFile = toml::from_str(source)?;
        Self::builder()
            .greeting(file.greeting)
            .maybe_image_prompt(file.image_prompt)
            .suggestions(file.suggestions)
            .rules(file.rules)
            .fallbacks(file.fallbacks)
            .classifications(file.classifications)
            .delays(file.delays)
            .templates(file.templates)
            .build()
    }

    pub fn load(path: impl AsRef<Path>) -> DialogueResult<Self> {
        let path = path.as_ref();
        debug!("Loading dialogue script from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn image_prompt(&self) -> &str {
        &self.image_prompt
    }

    /// Quick questions the UI can offer before the user types anything.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    pub fn classifications(&self) -> &[Classification] {
        &self.classifications
    }

    pub fn delays(&self) -> &Delays {
        &self.delays
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Selects the reply for `utterance`: the first matching rule's
    /// response, otherwise a random fallback.
    ///
    /// Non-deterministic unless `picker` is; callers testing unmatched input
    /// should check membership in [`Script::fallbacks`].
    pub fn compute_response(&self, utterance: &str, picker: &mut dyn ResponsePicker) -> String {
        if let Some(response) = self.rules.select(utterance, picker) {
            return response.to_string();
        }
        choose(picker, &self.fallbacks)
            .cloned()
            .unwrap_or_default()
    }

    /// Picks a canned classification record, `None` if the script has none.
    pub fn classify(&self, picker: &mut dyn ResponsePicker) -> Option<&Classification> {
        choose(picker, &self.classifications)
    }
}
