use std::time::Duration;

use chrono::Local;

use crate::models::{ConversationMessage, Role, TurnOutcome};
use crate::services::actions::dispatch;
use crate::services::ai::intent::extract_intent;
use crate::services::ai::LlmProvider;
use crate::services::api::AcademicApi;

const GREETING: &str = "Olá! Sou seu assistente para gerenciar Matérias, Professores e Reservas. \
O que você gostaria de fazer? (Ex: listar professores, cadastrar matéria, reservar laboratório, \
excluir reserva ID 5)";

/// In-memory transcript for one chat session. Append-only.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ConversationMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ConversationMessage {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ConversationMessage {
            role,
            content: content.into(),
        });
    }
}

/// Handles one user turn: extract, dispatch, record both sides.
pub async fn process_message(
    llm: &dyn LlmProvider,
    api: &dyn AcademicApi,
    session: &mut ChatSession,
    message: &str,
    llm_timeout: Duration,
) -> TurnOutcome {
    session.push(Role::User, message);

    let extracted = extract_intent(llm, message, llm_timeout).await;

    tracing::info!(
        intent = extracted.intent.as_str(),
        parameters = ?extracted.parameters,
        "detected intent"
    );

    let result = dispatch(api, &extracted, Local::now().date_naive()).await;
    let success = result.is_success();

    if success {
        tracing::info!(status = result.status, "action completed");
    } else {
        tracing::warn!(status = result.status, reply = %result.message, "action failed");
    }

    session.push(Role::Assistant, result.message.clone());

    TurnOutcome {
        intent: extracted.intent,
        parameters: extracted.parameters,
        reply: result.message,
        status: result.status,
        success,
    }
}
