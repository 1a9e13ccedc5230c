//! LLM 层：消息、客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{CompletionOptions, LlmClient};

use crate::config::ModelCredentials;

/// 根据凭据构建模型客户端；凭据缺失时返回 None，由级联把需要模型的层级视为失败
pub fn create_llm_from_credentials(
    credentials: Option<&ModelCredentials>,
) -> Option<Arc<dyn LlmClient>> {
    match credentials {
        Some(c) => {
            tracing::info!("Using OpenAI-compatible LLM ({} @ {})", c.model, c.endpoint);
            Some(Arc::new(OpenAiClient::from_credentials(c)))
        }
        None => {
            tracing::warn!("Model credentials missing, proceeding without remote model");
            None
        }
    }
}
