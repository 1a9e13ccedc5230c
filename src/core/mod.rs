//! 核心编排层：错误类型与问答编排器

pub mod error;
pub mod orchestrator;

pub use error::{ExchangeLogError, QueryError, TierError};
pub use orchestrator::{build_orchestrator, ExchangeOrchestrator};
