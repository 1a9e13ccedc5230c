//! 生成级联：查询类型、规划器、各层级与按序降级的执行器

pub mod planner;
pub mod runner;
pub mod tiers;
pub mod types;

pub use planner::{parse_plan, LlmPlanner, Plan, PlanStep, Planner};
pub use runner::{Cascade, CascadeOutcome};
pub use tiers::{
    local_mode_response, offline_fallback_response, DirectCompletionTier, PlannerTier, Tier,
    DIRECT_COMPLETION_TRACE, LOCAL_MODE_TRACE, OFFLINE_FALLBACK_TRACE,
};
pub use types::{AttemptOutcome, Generation, GenerationAttempt, Query, Response, TierKind};
