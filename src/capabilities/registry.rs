//! 能力注册表
//!
//! 所有增强能力实现 Capability trait（kind / description / gather），启动时注册一次；
//! 每个请求按开关 select 出只读的 CapabilitySet 视图，不修改注册表。
//! 未启用、未注册与「检索不到」对调用方完全一致：都贡献空上下文。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::TierError;

/// 能力种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    WebSearch,
    IndexedSearch,
    Graph,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::WebSearch,
        CapabilityKind::IndexedSearch,
        CapabilityKind::Graph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::WebSearch => "web_search",
            CapabilityKind::IndexedSearch => "indexed_search",
            CapabilityKind::Graph => "graph",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个请求的能力开关（默认全部关闭）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    pub web_search: bool,
    pub indexed_search: bool,
    pub graph: bool,
}

impl CapabilityFlags {
    pub fn all() -> Self {
        Self {
            web_search: true,
            indexed_search: true,
            graph: true,
        }
    }

    pub fn is_enabled(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::WebSearch => self.web_search,
            CapabilityKind::IndexedSearch => self.indexed_search,
            CapabilityKind::Graph => self.graph,
        }
    }
}

/// 能力 trait：给定查询，返回补充上下文；空字符串表示没有可用内容
#[async_trait]
pub trait Capability: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    /// 能力描述（供规划模型理解用途）
    fn description(&self) -> &str;

    async fn gather(&self, query: &str) -> Result<String, String>;
}

/// 能力注册表：按种类存储，每种至多一个
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册能力；同种类重复注册时后者覆盖前者
    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.register_arc(Arc::new(capability));
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        let kind = capability.kind();
        if self.capabilities.insert(kind, capability).is_some() {
            tracing::warn!("Capability {} registered twice, keeping the latest", kind);
        }
    }

    pub fn kinds(&self) -> Vec<CapabilityKind> {
        self.capabilities.keys().copied().collect()
    }

    /// 选出本次请求启用且已注册的能力
    pub fn select(&self, flags: CapabilityFlags) -> CapabilitySet {
        let entries = self
            .capabilities
            .iter()
            .filter(|(kind, _)| flags.is_enabled(**kind))
            .map(|(kind, cap)| (*kind, Arc::clone(cap)))
            .collect();
        CapabilitySet { entries }
    }
}

/// 单个请求可用的能力集合（启用且已注册）
#[derive(Clone, Default)]
pub struct CapabilitySet {
    entries: BTreeMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilitySet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kinds(&self) -> Vec<CapabilityKind> {
        self.entries.keys().copied().collect()
    }

    /// 返回 (种类, 描述) 列表，用于生成规划 prompt 中的能力段落
    pub fn descriptions(&self) -> Vec<(CapabilityKind, String)> {
        self.entries
            .iter()
            .map(|(kind, cap)| (*kind, cap.description().to_string()))
            .collect()
    }

    /// 向指定能力取上下文；不在集合中时返回空字符串，能力自身出错时返回 CapabilityUnavailable
    pub async fn gather(&self, kind: CapabilityKind, query: &str) -> Result<String, TierError> {
        let Some(capability) = self.entries.get(&kind) else {
            return Ok(String::new());
        };
        capability
            .gather(query)
            .await
            .map(|s| s.trim().to_string())
            .map_err(|e| TierError::CapabilityUnavailable(format!("{}: {}", kind, e)))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
