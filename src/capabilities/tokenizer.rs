//! 检索分词
//!
//! 中英文混合：含 CJK 时用 jieba 搜索模式切词，否则按非字母数字字符切分；统一小写并去掉常见英文停用词。
//! 供文档检索对查询与分块打分。

use std::collections::HashSet;
use std::sync::OnceLock;

use jieba_rs::Jieba;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "for", "from", "how", "in", "is", "it",
    "me", "of", "on", "or", "the", "to", "was", "what", "when", "where", "which", "who", "why",
    "with", "you",
];

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}' |
        '\u{3040}'..='\u{309F}' |
        '\u{30A0}'..='\u{30FF}'
    )
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

fn keep(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => is_cjk(c) || c.is_ascii_digit(),
        _ => !STOPWORDS.contains(&token),
    }
}

/// 分词，返回小写词序列（保留重复）
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let raw: Vec<String> = if contains_cjk(text) {
        jieba()
            .cut_for_search(text, true)
            .into_iter()
            .flat_map(|w| {
                w.split(|c: char| !c.is_alphanumeric())
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>()
            })
            .collect()
    } else {
        text.split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .collect()
    };

    raw.into_iter().filter(|t| keep(t)).collect()
}

pub fn tokenize_to_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// 查询词与文档词集合的加权重叠：较长的词权重更高（sqrt(字符数)）
pub fn overlap_score(query: &HashSet<String>, document: &HashSet<String>) -> f32 {
    query
        .intersection(document)
        .map(|t| (t.chars().count() as f32).sqrt())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_strips_punctuation_and_stopwords() {
        let tokens = tokenize("What is the capital of France?");
        assert_eq!(tokens, vec!["capital".to_string(), "france".to_string()]);
    }

    #[test]
    fn test_chinese_is_segmented() {
        let tokens = tokenize("我喜欢编程和人工智能");
        assert!(tokens.iter().any(|t| t.contains("编程") || t.contains("智能")));
    }

    #[test]
    fn test_overlap_prefers_longer_terms() {
        let q = tokenize_to_set("rust borrow checker");
        let a = tokenize_to_set("the borrow checker rejects aliasing");
        let b = tokenize_to_set("rust is fast");
        assert!(overlap_score(&q, &a) > overlap_score(&q, &b));
        assert_eq!(overlap_score(&q, &tokenize_to_set("unrelated words")), 0.0);
    }
}
