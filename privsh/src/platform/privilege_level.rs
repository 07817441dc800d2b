//! Privilege level definition.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::channel::{CompiledPrompt, compile_prompt_pattern};
use crate::error::{Error, Result};

/// A privilege level definition for a network device.
///
/// Privilege levels form a tree where each level can have a parent
/// (previous_priv) and commands to escalate/de-escalate between the two.
///
/// Patterns are compiled with [`compile_prompt_pattern`], so they are always
/// case-insensitive and multi-line, and are anchored to the end of a line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PrivilegeLevelDef", into = "PrivilegeLevelDef")]
pub struct PrivilegeLevel {
    /// Name of this privilege level (e.g., "exec", "cli", "configuration").
    pub name: String,

    /// Regex pattern to match the prompt for this privilege level.
    pub pattern: Regex,

    /// Name of the parent privilege level (None for root level).
    pub previous_priv: Option<String>,

    /// Command to escalate TO this level from the parent.
    pub escalate_command: Option<String>,

    /// Command to de-escalate FROM this level to the parent.
    pub deescalate_command: Option<String>,

    /// Whether escalation requires authentication (password).
    pub escalate_auth: bool,

    /// Pattern to match the authentication prompt (if escalate_auth is true).
    pub escalate_prompt: Option<Regex>,

    /// Strings that must NOT be in the prompt for this level to match.
    /// Used for disambiguation (e.g., "#" matches both priv and config modes).
    pub not_contains: Vec<String>,

    /// Example prompts that must match this level and no other.
    pub sample_prompts: Vec<String>,
}

impl PrivilegeLevel {
    /// Create a new privilege level with minimal required fields.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            pattern: compile_prompt_pattern(pattern)?,
            previous_priv: None,
            escalate_command: None,
            deescalate_command: None,
            escalate_auth: false,
            escalate_prompt: None,
            not_contains: vec![],
            sample_prompts: vec![],
        })
    }

    /// Set the parent privilege level.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.previous_priv = Some(parent.into());
        self
    }

    /// Set the escalation command.
    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    /// Set the de-escalation command.
    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = Some(command.into());
        self
    }

    /// Set that escalation requires authentication.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self> {
        self.escalate_auth = true;
        self.escalate_prompt = Some(compile_prompt_pattern(prompt_pattern)?);
        Ok(self)
    }

    /// Add a not_contains pattern.
    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Add a sample prompt used to validate that prompts don't overlap.
    pub fn with_sample_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.sample_prompts.push(prompt.into());
        self
    }

    /// Check if this privilege level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc)) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }

    /// The prompt as a matcher candidate, `not_contains` included.
    pub fn prompt(&self) -> CompiledPrompt {
        CompiledPrompt::from_regex(self.pattern.clone(), self.not_contains.clone())
    }

    /// The authentication sub-prompt as a matcher candidate.
    pub fn auth_prompt(&self) -> Option<CompiledPrompt> {
        if !self.escalate_auth {
            return None;
        }
        self.escalate_prompt
            .clone()
            .map(|p| CompiledPrompt::from_regex(p, vec![]))
    }
}

/// Serializable form of [`PrivilegeLevel`] with patterns as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeLevelDef {
    pub name: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_priv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deescalate_command: Option<String>,
    #[serde(default)]
    pub escalate_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_prompts: Vec<String>,
}

impl TryFrom<PrivilegeLevelDef> for PrivilegeLevel {
    type Error = Error;

    fn try_from(def: PrivilegeLevelDef) -> Result<Self> {
        let escalate_prompt = def
            .escalate_prompt
            .as_deref()
            .map(compile_prompt_pattern)
            .transpose()?;

        Ok(Self {
            pattern: compile_prompt_pattern(&def.pattern)?,
            name: def.name,
            previous_priv: def.previous_priv,
            escalate_command: def.escalate_command,
            deescalate_command: def.deescalate_command,
            escalate_auth: def.escalate_auth,
            escalate_prompt,
            not_contains: def.not_contains,
            sample_prompts: def.sample_prompts,
        })
    }
}

impl From<PrivilegeLevel> for PrivilegeLevelDef {
    fn from(level: PrivilegeLevel) -> Self {
        Self {
            name: level.name,
            pattern: level.pattern.as_str().to_string(),
            previous_priv: level.previous_priv,
            escalate_command: level.escalate_command,
            deescalate_command: level.deescalate_command,
            escalate_auth: level.escalate_auth,
            escalate_prompt: level.escalate_prompt.map(|p| p.as_str().to_string()),
            not_contains: level.not_contains,
            sample_prompts: level.sample_prompts,
        }
    }
}
