//! Planner：基于能力集合的规划与执行
//!
//! plan 让模型在可用能力中挑选步骤，输出 JSON 计划；execute 并发执行各步骤取回上下文，
//! 再让模型结合上下文写出最终回答。计划序列化后作为该层的 trace。

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::capabilities::{CapabilityKind, CapabilitySet};
use crate::cascade::Query;
use crate::core::TierError;
use crate::llm::{CompletionOptions, LlmClient, Message};

const PLAN_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 300,
    temperature: 0.0,
};

const WRITE_OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 800,
    temperature: 0.7,
};

const WRITER_PROMPT: &str = "You are a helpful AI assistant. Answer the user's question. \
When context is provided, ground the answer in it and mention the sources you used.";

/// 计划中的一步：向某个能力发起一次检索
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub capability: CapabilityKind,
    pub input: String,
}

/// 针对一个查询的可执行计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// 人类可读的计划描述（pretty JSON）
    pub fn describe(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// 规划器：构造计划并执行
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, capabilities: &CapabilitySet, query: &Query) -> Result<Plan, TierError>;

    async fn execute(
        &self,
        plan: &Plan,
        capabilities: &CapabilitySet,
        query: &Query,
    ) -> Result<String, TierError>;
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    capability: String,
    #[serde(default)]
    input: Option<String>,
}

/// 从模型输出中提取 JSON 块（```json ... ``` 或首个 `{` 到末个 `}`）
fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 解析模型给出的计划：未知能力名视为构造失败，空 input 用原始查询代替，超出 max_steps 的步骤丢弃
pub fn parse_plan(output: &str, query: &Query, max_steps: usize) -> Result<Plan, TierError> {
    let json = extract_json(output)
        .ok_or_else(|| TierError::PlanFailed(format!("no JSON plan in model output: {}", output.trim())))?;
    let raw: RawPlan = serde_json::from_str(json)
        .map_err(|e| TierError::PlanFailed(format!("{}: {}", e, json)))?;

    let steps = raw
        .steps
        .into_iter()
        .take(max_steps)
        .map(|step| {
            let capability = CapabilityKind::parse(&step.capability).ok_or_else(|| {
                TierError::PlanFailed(format!("unknown capability: {}", step.capability))
            })?;
            let input = step
                .input
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| query.text().to_string());
            Ok(PlanStep { capability, input })
        })
        .collect::<Result<Vec<_>, TierError>>()?;

    Ok(Plan {
        goal: query.text().to_string(),
        steps,
    })
}

/// 以模型驱动的默认规划器
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    max_steps: usize,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, max_steps: usize) -> Self {
        Self { llm, max_steps }
    }

    fn planning_prompt(&self, capabilities: &CapabilitySet) -> String {
        let listing = capabilities
            .descriptions()
            .into_iter()
            .map(|(kind, desc)| format!("- {}: {}", kind, desc))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You plan how to answer a user question using the capabilities below.\n\
             Available capabilities:\n{listing}\n\n\
             Respond with JSON only, in the form \
             {{\"steps\": [{{\"capability\": \"<name>\", \"input\": \"<search text>\"}}]}}.\n\
             Use at most {max} steps. Use an empty list when no capability helps.",
            listing = listing,
            max = self.max_steps
        )
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, capabilities: &CapabilitySet, query: &Query) -> Result<Plan, TierError> {
        if capabilities.is_empty() {
            return Ok(Plan {
                goal: query.text().to_string(),
                steps: Vec::new(),
            });
        }
        let messages = [
            Message::system(self.planning_prompt(capabilities)),
            Message::user(query.text()),
        ];
        let output = self
            .llm
            .complete(&messages, PLAN_OPTIONS)
            .await
            .map_err(TierError::LlmError)?;
        parse_plan(&output, query, self.max_steps)
    }

    async fn execute(
        &self,
        plan: &Plan,
        capabilities: &CapabilitySet,
        query: &Query,
    ) -> Result<String, TierError> {
        let gathered = try_join_all(
            plan.steps
                .iter()
                .map(|step| capabilities.gather(step.capability, &step.input)),
        )
        .await?;

        let context = plan
            .steps
            .iter()
            .zip(gathered)
            .filter(|(_, text)| !text.is_empty())
            .map(|(step, text)| format!("### {} ({})\n{}", step.capability, step.input, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let user = if context.is_empty() {
            query.text().to_string()
        } else {
            format!("Context:\n{}\n\nQuestion: {}", context, query.text())
        };
        let messages = [Message::system(WRITER_PROMPT), Message::user(user)];
        let answer = self
            .llm
            .complete(&messages, WRITE_OPTIONS)
            .await
            .map_err(TierError::LlmError)?;

        if answer.trim().is_empty() {
            return Err(TierError::EmptyResponse("planner"));
        }
        Ok(answer)
    }
}
