use serde::{Deserialize, Serialize};

use super::intent::{Intent, Parameters};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

/// Result of one handled chat turn, as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub intent: Intent,
    pub parameters: Parameters,
    pub reply: String,
    pub status: u16,
    pub success: bool,
}
