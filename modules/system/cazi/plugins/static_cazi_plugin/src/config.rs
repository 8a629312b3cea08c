//! Configuration for the static CAZI plugin.

use std::collections::HashSet;

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticCaziPluginConfig {
    /// Policy mode.
    pub mode: PolicyMode,

    /// Resource type a subject reference must carry.
    pub subject_type: String,

    /// Resource type of the protected objects.
    pub object_type: String,

    /// Record property holding the owner's subject id.
    pub owner_property: String,

    /// Optional variable the property is accessed through, e.g. `widget`
    /// turns the filter into `widget.owner_id == '...'`.
    pub binding: Option<String>,

    /// Language of the emitted filter expressions.
    pub language: String,

    /// Verbs allowed unconditionally.
    pub allow_verbs: Vec<String>,

    /// Verbs allowed only on objects the subject owns.
    pub owner_verbs: Vec<String>,

    /// Verbs always denied.
    pub deny_verbs: Vec<String>,
}

impl Default for StaticCaziPluginConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Ownership,
            subject_type: "user".to_owned(),
            object_type: "widget".to_owned(),
            owner_property: "owner_id".to_owned(),
            binding: None,
            language: cazi_sdk::languages::CEL.to_owned(),
            allow_verbs: vec!["create".to_owned()],
            owner_verbs: vec!["read".to_owned()],
            deny_verbs: Vec::new(),
        }
    }
}

impl StaticCaziPluginConfig {
    /// Reject configurations the service cannot serve.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for empty identifiers or a verb listed under
    /// more than one rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("subject_type", &self.subject_type),
            ("object_type", &self.object_type),
            ("owner_property", &self.owner_property),
            ("language", &self.language),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(field));
            }
        }

        let mut seen = HashSet::new();
        for verb in self
            .allow_verbs
            .iter()
            .chain(&self.owner_verbs)
            .chain(&self.deny_verbs)
        {
            if !seen.insert(verb.as_str()) {
                return Err(ConfigError::ConflictingVerb(verb.clone()));
            }
        }
        Ok(())
    }
}

/// Policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Apply the verb rules: allow, owner-only, or deny.
    #[default]
    Ownership,
    /// Allow every well-formed request. Development only.
    AllowAll,
}

/// Invalid plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("verb `{0}` is listed under more than one rule")]
    ConflictingVerb(String),
}
