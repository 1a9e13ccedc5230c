//! 问答编排器
//!
//! 负责：对一个 Query 运行级联、用 {查询, 回复} 组装 Exchange 交给记录器，再把回复返回调用方。
//! 每个到达终态的请求都恰好尝试记录一次（含本地模式）；记录失败不影响回复。

use std::sync::Arc;

use crate::capabilities::{registry_from_config, CapabilityFlags, CapabilityRegistry};
use crate::cascade::{Cascade, CascadeOutcome, Query, Response};
use crate::config::AppConfig;
use crate::core::QueryError;
use crate::exchange::{Exchange, ExchangeLogger};
use crate::llm::{create_llm_from_credentials, LlmClient};

/// 编排器：持有只读的级联与记录器，可放入 Arc 在并发请求间共享
pub struct ExchangeOrchestrator {
    cascade: Cascade,
    logger: ExchangeLogger,
    /// 级联所用的模型客户端，仅用于读取累计 token 用量
    llm: Option<Arc<dyn LlmClient>>,
}

impl ExchangeOrchestrator {
    pub fn new(cascade: Cascade, logger: ExchangeLogger) -> Self {
        Self {
            cascade,
            logger,
            llm: None,
        }
    }

    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmClient>>) -> Self {
        self.llm = llm;
        self
    }

    /// 累计 token 用量 (prompt, completion, total)；无模型时为 0
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm
            .as_ref()
            .map(|llm| llm.token_usage())
            .unwrap_or((0, 0, 0))
    }

    /// 处理一个查询，返回回复；从不返回错误
    pub async fn handle(&self, query: Query) -> Response {
        self.handle_detailed(query).await.response
    }

    /// 同 handle，但保留各层级的尝试记录
    pub async fn handle_detailed(&self, query: Query) -> CascadeOutcome {
        let outcome = self.cascade.run(&query).await;
        let (prompt_tokens, completion_tokens, total_tokens) = self.token_usage();
        tracing::info!(
            tier = %outcome.response.tier,
            attempts = outcome.attempts.len(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "query answered"
        );
        self.logger
            .record(Exchange::new(query.text(), outcome.response.text.clone()))
            .await;
        outcome
    }

    /// 入站便捷入口：先校验非空再进入级联
    pub async fn handle_text(
        &self,
        text: impl Into<String>,
        flags: CapabilityFlags,
    ) -> Result<Response, QueryError> {
        let query = Query::new(text, flags)?;
        Ok(self.handle(query).await)
    }
}

/// 根据配置构建编排器：本地模式下不加载能力、不创建模型客户端
pub fn build_orchestrator(cfg: &AppConfig) -> ExchangeOrchestrator {
    let logger = ExchangeLogger::to_file(&cfg.exchange_log.path);

    if cfg.local_mode() {
        tracing::info!("Local mode enabled, external services disabled");
        let cascade = Cascade::standard(true, Arc::new(CapabilityRegistry::new()), None, 0);
        return ExchangeOrchestrator::new(cascade, logger);
    }

    let registry = Arc::new(registry_from_config(&cfg.capabilities));
    let llm = create_llm_from_credentials(cfg.model_credentials().as_ref());
    let cascade = Cascade::standard(false, registry, llm.clone(), cfg.planner.max_steps);
    ExchangeOrchestrator::new(cascade, logger).with_llm(llm)
}
