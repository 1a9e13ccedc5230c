//! Cascade：按优先级依次尝试各层级
//!
//! 1. 本地模式开启时直接回显，不尝试任何依赖；
//! 2. 否则依次尝试有序层级列表（规划生成 → 直接补全），首个成功者胜出，失败原因记录后降级；
//! 3. 全部失败时落到离线兜底，永不向调用方返回错误。
//! 每次尝试输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use crate::capabilities::CapabilityRegistry;
use crate::cascade::tiers::{local_mode_response, offline_fallback_response};
use crate::cascade::{
    AttemptOutcome, DirectCompletionTier, Generation, GenerationAttempt, LlmPlanner, Planner,
    PlannerTier, Query, Response, Tier, TierKind,
};
use crate::core::TierError;
use crate::llm::LlmClient;

/// 一次级联的结果：最终回复与各层级的尝试记录
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub response: Response,
    pub attempts: Vec<GenerationAttempt>,
}

/// 生成级联；构造后只读，可在并发请求间共享
pub struct Cascade {
    local_mode: bool,
    tiers: Vec<Arc<dyn Tier>>,
}

impl Cascade {
    pub fn new(local_mode: bool, tiers: Vec<Arc<dyn Tier>>) -> Self {
        Self { local_mode, tiers }
    }

    /// 标准层级：规划生成 → 直接补全；llm 为 None 时两层都会以缺少凭据失败
    pub fn standard(
        local_mode: bool,
        registry: Arc<CapabilityRegistry>,
        llm: Option<Arc<dyn LlmClient>>,
        max_steps: usize,
    ) -> Self {
        let planner = llm
            .clone()
            .map(|llm| Arc::new(LlmPlanner::new(llm, max_steps)) as Arc<dyn Planner>);
        Self::new(
            local_mode,
            vec![
                Arc::new(PlannerTier::new(registry, planner)) as Arc<dyn Tier>,
                Arc::new(DirectCompletionTier::new(llm)) as Arc<dyn Tier>,
            ],
        )
    }

    pub fn local_mode(&self) -> bool {
        self.local_mode
    }

    pub async fn run(&self, query: &Query) -> CascadeOutcome {
        if self.local_mode {
            let started = Instant::now();
            let generation = local_mode_response(query);
            let attempt = finish(TierKind::LocalMode, started, Ok(generation));
            return resolve(TierKind::LocalMode, vec![attempt]);
        }

        let mut attempts = Vec::with_capacity(self.tiers.len() + 1);
        for tier in &self.tiers {
            let kind = tier.kind();
            let started = Instant::now();
            let result = tier.attempt(query).await.and_then(|g| {
                if g.text.trim().is_empty() {
                    Err(TierError::EmptyResponse(kind.as_str()))
                } else {
                    Ok(g)
                }
            });
            if let Err(e) = &result {
                tracing::warn!(tier = %kind, "Tier failed, falling back: {}", e);
            }
            let attempt = finish(kind, started, result);
            let succeeded = attempt.succeeded();
            attempts.push(attempt);
            if succeeded {
                return resolve(kind, attempts);
            }
        }

        let started = Instant::now();
        let generation = offline_fallback_response(query);
        attempts.push(finish(TierKind::OfflineFallback, started, Ok(generation)));
        resolve(TierKind::OfflineFallback, attempts)
    }
}

fn finish(
    tier: TierKind,
    started: Instant,
    result: Result<Generation, TierError>,
) -> GenerationAttempt {
    let duration = started.elapsed();
    let outcome = match result {
        Ok(generation) => AttemptOutcome::Succeeded(generation),
        Err(e) => AttemptOutcome::Failed {
            cause: e.to_string(),
        },
    };
    let cause = match &outcome {
        AttemptOutcome::Failed { cause } => Some(cause.as_str()),
        AttemptOutcome::Succeeded(_) => None,
    };
    let audit = serde_json::json!({
        "event": "tier_attempt",
        "tier": tier.as_str(),
        "ok": cause.is_none(),
        "duration_ms": duration.as_millis() as u64,
        "cause": cause,
    });
    tracing::info!(audit = %audit.to_string(), "cascade");
    GenerationAttempt {
        tier,
        outcome,
        duration,
    }
}

/// 由最后一次（成功的）尝试组装回复；trace 为空时用层级名代替
fn resolve(tier: TierKind, attempts: Vec<GenerationAttempt>) -> CascadeOutcome {
    let generation = attempts
        .iter()
        .rev()
        .find_map(|a| match &a.outcome {
            AttemptOutcome::Succeeded(g) if a.tier == tier => Some(g.clone()),
            _ => None,
        })
        .unwrap_or_else(|| Generation::new("", ""));
    let trace = if generation.trace.trim().is_empty() {
        format!("Answered by {}.", tier)
    } else {
        generation.trace
    };
    CascadeOutcome {
        response: Response {
            text: generation.text,
            trace,
            tier,
        },
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::capabilities::CapabilityFlags;
    use crate::cascade::tiers::{DIRECT_COMPLETION_TRACE, LOCAL_MODE_TRACE, OFFLINE_FALLBACK_TRACE};
    use crate::llm::MockLlmClient;

    struct StubTier {
        kind: TierKind,
        reply: Option<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    impl StubTier {
        fn ok(kind: TierKind, text: &'static str, trace: &'static str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Some((text, trace)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(kind: TierKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn tiers(stubs: &[&Arc<StubTier>]) -> Vec<Arc<dyn Tier>> {
        stubs.iter().map(|s| Arc::clone(s) as Arc<dyn Tier>).collect()
    }

    #[async_trait]
    impl Tier for StubTier {
        fn kind(&self) -> TierKind {
            self.kind
        }

        async fn attempt(&self, _query: &Query) -> Result<Generation, TierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(|(text, trace)| Generation::new(text, trace))
                .ok_or_else(|| TierError::LlmError("network unreachable".into()))
        }
    }

    fn query() -> Query {
        Query::new("What is the capital of France?", CapabilityFlags::default()).unwrap()
    }

    #[tokio::test]
    async fn test_local_mode_skips_all_tiers() {
        let planner = StubTier::ok(TierKind::Planner, "plan", "p");
        let cascade = Cascade::new(true, tiers(&[&planner]));

        let outcome = cascade.run(&query()).await;

        assert_eq!(outcome.response.tier, TierKind::LocalMode);
        assert_eq!(outcome.response.trace, LOCAL_MODE_TRACE);
        assert!(outcome.response.text.contains("What is the capital of France?"));
        assert_eq!(planner.calls(), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let planner = StubTier::ok(TierKind::Planner, "Paris.", "{\"steps\":[]}");
        let direct = StubTier::ok(TierKind::DirectCompletion, "other", "d");
        let cascade = Cascade::new(false, tiers(&[&planner, &direct]));

        let outcome = cascade.run(&query()).await;

        assert_eq!(outcome.response.text, "Paris.");
        assert_eq!(outcome.response.trace, "{\"steps\":[]}");
        assert_eq!(outcome.response.tier, TierKind::Planner);
        assert_eq!(direct.calls(), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_second_tier() {
        let planner = StubTier::failing(TierKind::Planner);
        let direct = StubTier::ok(TierKind::DirectCompletion, "Paris.", DIRECT_COMPLETION_TRACE);
        let cascade = Cascade::new(false, tiers(&[&planner, &direct]));

        let outcome = cascade.run(&query()).await;

        assert_eq!(outcome.response.tier, TierKind::DirectCompletion);
        assert_eq!(outcome.response.trace, DIRECT_COMPLETION_TRACE);
        assert_eq!((planner.calls(), direct.calls()), (1, 1));
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Failed { ref cause } if cause.contains("network unreachable")
        ));
    }

    #[tokio::test]
    async fn test_all_failures_reach_offline_floor() {
        let planner = StubTier::failing(TierKind::Planner);
        let direct = StubTier::failing(TierKind::DirectCompletion);
        let cascade = Cascade::new(false, tiers(&[&planner, &direct]));

        let outcome = cascade.run(&query()).await;

        assert_eq!(outcome.response.tier, TierKind::OfflineFallback);
        assert_eq!(outcome.response.trace, OFFLINE_FALLBACK_TRACE);
        assert!(!outcome.response.text.is_empty());
        let tiers: Vec<_> = outcome.attempts.iter().map(|a| a.tier).collect();
        assert_eq!(
            tiers,
            vec![TierKind::Planner, TierKind::DirectCompletion, TierKind::OfflineFallback]
        );
    }

    #[tokio::test]
    async fn test_blank_text_counts_as_failure() {
        let planner = StubTier::ok(TierKind::Planner, "   ", "p");
        let direct = StubTier::ok(TierKind::DirectCompletion, "Paris.", "");
        let cascade = Cascade::new(false, tiers(&[&planner, &direct]));

        let outcome = cascade.run(&query()).await;

        assert_eq!(outcome.response.text, "Paris.");
        assert_eq!(outcome.response.trace, "Answered by direct_completion.");
    }

    #[tokio::test]
    async fn test_standard_without_credentials_is_offline() {
        let cascade = Cascade::standard(false, Arc::new(CapabilityRegistry::new()), None, 4);
        let outcome = cascade.run(&query()).await;
        assert_eq!(outcome.response.tier, TierKind::OfflineFallback);
        assert!(outcome.attempts[..2].iter().all(|a| matches!(
            a.outcome,
            AttemptOutcome::Failed { ref cause } if cause == "Model credentials missing"
        )));
    }

    #[tokio::test]
    async fn test_standard_planner_failure_uses_direct_completion() {
        // 规划输出不是 JSON → 规划失败；第二条回复供直接补全使用
        let llm = Arc::new(MockLlmClient::scripted(["not a plan", "Paris."]));
        let mut registry = CapabilityRegistry::new();
        registry.register(crate::capabilities::GraphCapability::new(
            Default::default(),
            5,
        ));
        let cascade = Cascade::standard(false, Arc::new(registry), Some(llm.clone() as Arc<dyn LlmClient>), 4);
        let q = Query::new("What is the capital of France?", CapabilityFlags::all()).unwrap();

        let outcome = cascade.run(&q).await;

        assert_eq!(outcome.response.tier, TierKind::DirectCompletion);
        assert_eq!(outcome.response.text, "Paris.");
        assert_eq!(llm.calls(), 2);
    }
}
