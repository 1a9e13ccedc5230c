//! 级联层级实现
//!
//! 每个层级实现 Tier：成功返回 Generation，失败返回 TierError 交由 Cascade 降级。
//! 本地模式与离线兜底不依赖任何外部服务，以普通函数给出，永不失败。

use std::sync::Arc;

use async_trait::async_trait;

use crate::capabilities::CapabilityRegistry;
use crate::cascade::{Generation, Planner, Query, TierKind};
use crate::core::TierError;
use crate::llm::{CompletionOptions, LlmClient, Message};

pub const LOCAL_MODE_TRACE: &str = "No external services used; running in local mode.";
pub const DIRECT_COMPLETION_TRACE: &str = "Used direct chat completion fallback.";
pub const OFFLINE_FALLBACK_TRACE: &str = "No remote model used; full local fallback.";

pub const DIRECT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant meant to assist the user by answering their queries.";

/// 直接补全的固定采样参数
pub const DIRECT_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 400,
    temperature: 0.7,
};

/// 级联中的一个可失败层级
#[async_trait]
pub trait Tier: Send + Sync {
    fn kind(&self) -> TierKind;

    async fn attempt(&self, query: &Query) -> Result<Generation, TierError>;
}

/// 本地模式：不访问任何依赖，回显查询
pub fn local_mode_response(query: &Query) -> Generation {
    Generation::new(
        format!(
            "Local mode: you asked '{}'. This is a simulated offline response.",
            query.text()
        ),
        LOCAL_MODE_TRACE,
    )
}

/// 离线兜底：所有远端层级失败后的固定回复
pub fn offline_fallback_response(query: &Query) -> Generation {
    Generation::new(
        format!(
            "Offline mode: I cannot reach external services right now. You asked: '{}'.",
            query.text()
        ),
        OFFLINE_FALLBACK_TRACE,
    )
}

/// 规划生成：按请求开关选出能力集合，规划并执行；trace 为序列化的计划
pub struct PlannerTier {
    registry: Arc<CapabilityRegistry>,
    planner: Option<Arc<dyn Planner>>,
}

impl PlannerTier {
    /// planner 为 None 表示未配置模型，该层总是失败
    pub fn new(registry: Arc<CapabilityRegistry>, planner: Option<Arc<dyn Planner>>) -> Self {
        Self { registry, planner }
    }
}

#[async_trait]
impl Tier for PlannerTier {
    fn kind(&self) -> TierKind {
        TierKind::Planner
    }

    async fn attempt(&self, query: &Query) -> Result<Generation, TierError> {
        let planner = self.planner.as_ref().ok_or(TierError::MissingCredentials)?;
        let capabilities = self.registry.select(query.flags());
        let plan = planner.plan(&capabilities, query).await?;
        let text = planner.execute(&plan, &capabilities, query).await?;
        Ok(Generation::new(text, plan.describe()))
    }
}

/// 直接补全：跳过规划，固定 system 指令 + 原始查询
pub struct DirectCompletionTier {
    llm: Option<Arc<dyn LlmClient>>,
}

impl DirectCompletionTier {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tier for DirectCompletionTier {
    fn kind(&self) -> TierKind {
        TierKind::DirectCompletion
    }

    async fn attempt(&self, query: &Query) -> Result<Generation, TierError> {
        let llm = self.llm.as_ref().ok_or(TierError::MissingCredentials)?;
        let messages = [
            Message::system(DIRECT_SYSTEM_PROMPT),
            Message::user(query.text()),
        ];
        let text = llm
            .complete(&messages, DIRECT_OPTIONS)
            .await
            .map_err(TierError::LlmError)?;
        Ok(Generation::new(text, DIRECT_COMPLETION_TRACE))
    }
}
