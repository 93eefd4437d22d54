use std::fmt;

use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accounting attached to every completion/analysis response.
///
/// Some endpoints (moderation, rerank) only report `total_tokens`, so the
/// components are optional while the total is always required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    pub total_tokens: u64,
}

impl Usage {
    /// Prompt tokens counted by the service (0 when not reported).
    pub fn prompt(&self) -> u64 {
        self.prompt_tokens.unwrap_or(0)
    }

    /// Completion tokens counted by the service (0 when not reported).
    pub fn completion(&self) -> u64 {
        self.completion_tokens.unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total_tokens
    }

    /// Check `total == prompt + completion` when both components are reported.
    pub fn check(&self) -> Result<(), String> {
        if let (Some(prompt), Some(completion)) = (self.prompt_tokens, self.completion_tokens) {
            let sum = prompt.saturating_add(completion);
            if sum != self.total_tokens {
                return Err(format!(
                    "usage total_tokens {} does not equal prompt_tokens {} + completion_tokens {}",
                    self.total_tokens, prompt, completion
                ));
            }
        }
        Ok(())
    }
}
