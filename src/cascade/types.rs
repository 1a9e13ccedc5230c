//! 级联的数据类型：查询、层级、单次尝试与最终回复

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::capabilities::CapabilityFlags;
use crate::core::QueryError;

/// 用户查询：非空文本 + 能力开关；构造后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    flags: CapabilityFlags,
}

impl Query {
    /// 空白查询在进入级联前即被拒绝
    pub fn new(text: impl Into<String>, flags: CapabilityFlags) -> Result<Self, QueryError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self { text, flags })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }
}

/// 级联层级，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    LocalMode,
    Planner,
    DirectCompletion,
    OfflineFallback,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::LocalMode => "local_mode",
            TierKind::Planner => "planner",
            TierKind::DirectCompletion => "direct_completion",
            TierKind::OfflineFallback => "offline_fallback",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某一层级成功时产出的文本与说明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub trace: String,
}

impl Generation {
    pub fn new(text: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            trace: trace.into(),
        }
    }
}

/// 单次尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded(Generation),
    Failed { cause: String },
}

/// 一个层级的一次执行
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub tier: TierKind,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
}

impl GenerationAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded(_))
    }
}

/// 返回给调用方的回复：文本、由哪一层产出的说明（trace）与层级标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub text: String,
    pub trace: String,
    pub tier: TierKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rejects_blank_text() {
        assert_eq!(
            Query::new("", CapabilityFlags::default()),
            Err(QueryError::Empty)
        );
        assert_eq!(
            Query::new(" \n\t", CapabilityFlags::default()),
            Err(QueryError::Empty)
        );
    }

    #[test]
    fn test_query_keeps_literal_text() {
        let q = Query::new("  hi  ", CapabilityFlags::all()).unwrap();
        assert_eq!(q.text(), "  hi  ");
        assert!(q.flags().graph);
    }
}
