//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete 以固定采样参数返回首条回复文本。

use async_trait::async_trait;

use crate::llm::Message;

/// 单次补全的采样参数：token 上限与温度（由调用方给定，不随请求变化）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            temperature: 0.7,
        }
    }
}

/// LLM 客户端 trait：非流式补全
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式补全；错误以字符串描述（鉴权、网络、配额等），由调用方决定如何降级
    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
