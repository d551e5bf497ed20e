//! The session's user profile

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who is using the app on this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Individual,
    Parent,
    Minor,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Individual => "individual",
            Role::Parent => "parent",
            Role::Minor => "minor",
            Role::Guest => "guest",
        };
        f.write_str(s)
    }
}

/// Profile created at onboarding and replaced wholesale on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,

    /// Email address or phone number used to sign in
    pub contact: String,

    #[serde(default)]
    pub role: Role,

    /// BCP 47 language tag
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergies: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl UserProfile {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            role: Role::default(),
            language: default_language(),
            sensitivities: Vec::new(),
            allergies: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sensitivities(mut self, sensitivities: Vec<String>) -> Self {
        self.sensitivities = sensitivities;
        self
    }

    pub fn with_allergies(mut self, allergies: Vec<String>) -> Self {
        self.allergies = allergies;
        self
    }

    /// Guest sessions have no account behind them
    pub fn guest() -> Self {
        Self::new("Guest", "").with_role(Role::Guest)
    }
}
