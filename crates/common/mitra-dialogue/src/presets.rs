//! Scripts bundled with the app.

use crate::{error::DialogueResult, script::Script};

const ADVISOR_SOURCE: &str = include_str!("../scripts/advisor.toml");
const PROFILE_SOURCE: &str = include_str!("../scripts/profile.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Crop advisory chat with simulated image analysis.
    Advisor,
    /// Short tips on the profile page.
    Profile,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Advisor, Preset::Profile];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Advisor => "advisor",
            Preset::Profile => "profile",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Preset::Advisor => ADVISOR_SOURCE,
            Preset::Profile => PROFILE_SOURCE,
        }
    }

    pub fn script(self) -> DialogueResult<Script> {
        Script::from_toml_str(self.source())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(name))
    }
}

pub fn advisor() -> DialogueResult<Script> {
    Preset::Advisor.script()
}

pub fn profile() -> DialogueResult<Script> {
    Preset::Profile.script()
}
