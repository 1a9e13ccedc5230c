//! 图谱查询能力
//!
//! 注册时从 TOML 文件加载节点与关系；gather 找出标签在查询中整词出现（不区分大小写）的节点，
//! 返回其属性与相邻关系组成的事实列表。

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::capabilities::{Capability, CapabilityKind};

#[derive(Debug, Clone, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

/// 图谱文件结构：[[nodes]] 与 [[edges]]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

pub struct GraphCapability {
    graph: KnowledgeGraph,
    matchers: Vec<(usize, Regex)>,
    max_facts: usize,
}

impl GraphCapability {
    pub fn new(graph: KnowledgeGraph, max_facts: usize) -> Self {
        let matchers = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.label.trim().is_empty())
            .filter_map(|(i, n)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(n.label.trim()));
                Regex::new(&pattern).ok().map(|re| (i, re))
            })
            .collect();
        Self {
            graph,
            matchers,
            max_facts,
        }
    }

    pub fn from_file(path: impl AsRef<Path>, max_facts: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let graph = KnowledgeGraph::from_toml_str(&raw)?;
        tracing::info!(
            "Loaded graph {} ({} nodes, {} edges)",
            path.display(),
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(Self::new(graph, max_facts))
    }

    fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.graph
            .nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.label.as_str())
            .unwrap_or(id)
    }

    fn facts(&self, query: &str) -> Vec<String> {
        let mut facts = Vec::new();
        for (index, re) in &self.matchers {
            if !re.is_match(query) {
                continue;
            }
            let node = &self.graph.nodes[*index];
            if let Some(kind) = &node.kind {
                facts.push(format!("{} is a {}", node.label, kind));
            }
            let mut props: Vec<_> = node.properties.iter().collect();
            props.sort();
            for (key, value) in props {
                facts.push(format!("{} {}: {}", node.label, key, value));
            }
            for edge in &self.graph.edges {
                if edge.source == node.id || edge.target == node.id {
                    facts.push(format!(
                        "{} {} {}",
                        self.label_of(&edge.source),
                        edge.relationship,
                        self.label_of(&edge.target)
                    ));
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        facts.retain(|f| seen.insert(f.clone()));
        facts.truncate(self.max_facts);
        facts
    }
}

#[async_trait]
impl Capability for GraphCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Graph
    }

    fn description(&self) -> &str {
        "Look up known entities mentioned in the input text and return their facts and relationships."
    }

    async fn gather(&self, query: &str) -> Result<String, String> {
        Ok(self
            .facts(query)
            .into_iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
