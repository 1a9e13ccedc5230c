//! Sage - 逐级降级的问答级联
//!
//! 模块划分：
//! - **capabilities**: 增强能力注册表与实现（网页搜索 / 文档检索 / 图谱查询）
//! - **cascade**: 生成级联（本地模式 → 规划生成 → 直接补全 → 离线兜底）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与问答编排器
//! - **exchange**: 问答记录与追加式存储
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化

pub mod capabilities;
pub mod cascade;
pub mod config;
pub mod core;
pub mod exchange;
pub mod llm;
pub mod observability;

pub use capabilities::CapabilityFlags;
pub use cascade::{Query, Response, TierKind};
pub use core::{build_orchestrator, ExchangeOrchestrator};
