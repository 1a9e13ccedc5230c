//! 文档检索能力
//!
//! 注册时遍历根目录下的 .md / .txt 文件，按段落切块并预先分词；
//! gather 按查询词与分块的加权重叠打分，返回得分最高的若干块（带来源路径）。

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::capabilities::tokenizer::{overlap_score, tokenize_to_set};
use crate::capabilities::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
struct IndexedChunk {
    source: String,
    text: String,
    terms: HashSet<String>,
}

/// 文档检索：逐块全量打分，适合中小规模文档目录
#[derive(Debug, Default)]
pub struct IndexedSearchCapability {
    chunks: Vec<IndexedChunk>,
    max_hits: usize,
}

fn is_indexable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("md") | Some("markdown") | Some("txt")
    )
}

/// 按空行切段，段落累积到 chunk_size 字符为止；超长段落按字符硬切
fn split_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = paragraph.chars().count();
        if para_len > chunk_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = paragraph.chars().collect();
            chunks.extend(chars.chunks(chunk_size).map(|c| c.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() && current.chars().count() + 2 + para_len > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl IndexedSearchCapability {
    /// 由 (来源, 全文) 列表建立索引
    pub fn from_documents<I, S, T>(documents: I, chunk_size: usize, max_hits: usize) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut chunks = Vec::new();
        for (source, text) in documents {
            let source = source.into();
            for text in split_chunks(text.as_ref(), chunk_size) {
                let terms = tokenize_to_set(&text);
                if terms.is_empty() {
                    continue;
                }
                chunks.push(IndexedChunk {
                    source: source.clone(),
                    text,
                    terms,
                });
            }
        }
        Self { chunks, max_hits }
    }

    /// 遍历目录建立索引；无法读取的单个文件跳过并告警
    pub fn from_dir(root: impl AsRef<Path>, chunk_size: usize, max_hits: usize) -> std::io::Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            ));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && is_indexable(e.path()))
        {
            let path = entry.path();
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let source = path
                        .strip_prefix(root)
                        .unwrap_or(path)
                        .display()
                        .to_string();
                    documents.push((source, text));
                }
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        let capability = Self::from_documents(documents, chunk_size, max_hits);
        tracing::info!(
            "Indexed {} chunks under {}",
            capability.chunks.len(),
            root.display()
        );
        Ok(capability)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn search(&self, query: &str) -> Vec<&IndexedChunk> {
        let query_terms = tokenize_to_set(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(f32, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (overlap_score(&query_terms, &c.terms), i))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        // 同分时保持索引顺序
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.max_hits)
            .map(|(_, i)| &self.chunks[i])
            .collect()
    }
}

#[async_trait]
impl Capability for IndexedSearchCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::IndexedSearch
    }

    fn description(&self) -> &str {
        "Search the indexed document collection for passages relevant to the input text."
    }

    async fn gather(&self, query: &str) -> Result<String, String> {
        Ok(self
            .search(query)
            .into_iter()
            .map(|c| format!("[{}]\n{}", c.source, c.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
