//! 增强能力：注册表与具体实现（网页搜索 / 文档检索 / 图谱查询）

pub mod graph;
pub mod indexed_search;
pub mod registry;
pub mod tokenizer;
pub mod web_search;

pub use graph::{GraphCapability, KnowledgeGraph};
pub use indexed_search::IndexedSearchCapability;
pub use registry::{Capability, CapabilityFlags, CapabilityKind, CapabilityRegistry, CapabilitySet};
pub use web_search::WebSearchCapability;

use crate::config::CapabilitiesSection;

/// 按配置注册能力：只注册配置了数据源的能力，加载失败的能力跳过并告警
pub fn registry_from_config(section: &CapabilitiesSection) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    if let Some(web) = WebSearchCapability::from_config(&section.web_search) {
        registry.register(web);
    }

    if let Some(root) = &section.indexed_search.root {
        match IndexedSearchCapability::from_dir(
            root,
            section.indexed_search.chunk_size,
            section.indexed_search.max_hits,
        ) {
            Ok(cap) => registry.register(cap),
            Err(e) => tracing::warn!("Indexed search disabled ({}): {}", root.display(), e),
        }
    }

    if let Some(path) = &section.graph.path {
        match GraphCapability::from_file(path, section.graph.max_facts) {
            Ok(cap) => registry.register(cap),
            Err(e) => tracing::warn!("Graph lookup disabled ({}): {}", path.display(), e),
        }
    }

    tracing::info!("Capabilities registered: {:?}", registry.kinds());
    registry
}
