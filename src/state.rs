use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::services::ai::LlmProvider;
use crate::services::api::AcademicApi;
use crate::services::conversation::ChatSession;

pub struct AppState {
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub api: Box<dyn AcademicApi>,
    /// Held for a whole turn, so turns never interleave.
    pub session: Mutex<ChatSession>,
}
