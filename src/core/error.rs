//! 错误类型
//!
//! TierError：级联单个层级的失败原因，只用于决定是否降级，从不返回给调用方；
//! QueryError：入站校验（空查询）；ExchangeLogError：记录器内部 I/O / 序列化失败，只在记录器内消化。

use thiserror::Error;

/// 级联层级失败原因（依赖不可用与远端瞬时失败同等处理：降级到下一层）
#[derive(Error, Debug)]
pub enum TierError {
    #[error("Model credentials missing")]
    MissingCredentials,

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Plan construction failed: {0}")]
    PlanFailed(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),
}

/// 入站查询校验失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query text is empty")]
    Empty,
}

/// 记录器内部错误
#[derive(Error, Debug)]
pub enum ExchangeLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
