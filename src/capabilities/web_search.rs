//! 网页搜索能力
//!
//! 调用 Bing 风格的搜索 API：GET {endpoint}?q=...&count=N，可选 `Ocp-Apim-Subscription-Key` 头；
//! 读取 webPages.value[] 的 name / snippet / url，摘要中的 HTML 转为纯文本，总长超过上限时截断。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::Deserialize;

use crate::capabilities::{Capability, CapabilityKind};
use crate::config::WebSearchSection;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Default, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    url: String,
}

pub struct WebSearchCapability {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: usize,
    max_result_chars: usize,
}

fn snippet_to_text(snippet: &str) -> String {
    if !snippet.contains('<') {
        return snippet.trim().to_string();
    }
    match from_read(snippet.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        _ => snippet.trim().to_string(),
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        text
    }
}

impl WebSearchCapability {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        max_results: usize,
        max_result_chars: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("sage/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_results,
            max_result_chars,
        }
    }

    /// endpoint 未配置时返回 None（不注册该能力）
    pub fn from_config(section: &WebSearchSection) -> Option<Self> {
        let endpoint = section.endpoint.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self::new(
            endpoint,
            section.api_key.clone(),
            section.timeout_secs,
            section.max_results,
            section.max_result_chars,
        ))
    }

    fn render(&self, response: SearchResponse) -> String {
        let pages = response.web_pages.map(|p| p.value).unwrap_or_default();
        let text = pages
            .into_iter()
            .take(self.max_results)
            .map(|p| format!("{}\n{}\n{}", p.name.trim(), snippet_to_text(&p.snippet), p.url.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate_chars(text, self.max_result_chars)
    }
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::WebSearch
    }

    fn description(&self) -> &str {
        "Search the web and return titles, snippets and links for the input text."
    }

    async fn gather(&self, query: &str) -> Result<String, String> {
        tracing::info!(query = %query, "web search");
        let count = self.max_results.to_string();
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("count", count.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("Ocp-Apim-Subscription-Key", key);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| format!("Invalid search response: {}", e))?;
        Ok(self.render(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(max_results: usize, max_chars: usize) -> WebSearchCapability {
        WebSearchCapability::new("http://127.0.0.1:9/search", None, 1, max_results, max_chars)
    }

    #[test]
    fn test_render_pages() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"webPages":{"value":[
                {"name":"Paris - Wikipedia","snippet":"Paris is the capital of France.","url":"https://en.wikipedia.org/wiki/Paris"},
                {"name":"Second","snippet":"ignored","url":"https://example.com"}
            ]}}"#,
        )
        .unwrap();
        let out = capability(1, 4000).render(body);
        assert_eq!(
            out,
            "Paris - Wikipedia\nParis is the capital of France.\nhttps://en.wikipedia.org/wiki/Paris"
        );
    }

    #[test]
    fn test_snippet_html_is_flattened() {
        let text = snippet_to_text("<p>The <i>City of Light</i>\n is in France.</p>");
        assert!(!text.contains('<'));
        assert!(text.contains("City of Light"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_render_without_pages_is_empty() {
        let body: SearchResponse = serde_json::from_str(r#"{"_type":"SearchResponse"}"#).unwrap();
        assert_eq!(capability(5, 4000).render(body), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_chars("abcdef".into(), 3), "abc\n...[truncated]");
        assert_eq!(truncate_chars("abc".into(), 3), "abc");
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let mut section = WebSearchSection::default();
        assert!(WebSearchCapability::from_config(&section).is_none());
        section.endpoint = Some("https://api.bing.microsoft.com/v7.0/search".into());
        assert!(WebSearchCapability::from_config(&section).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        assert!(capability(5, 4000).gather("anything").await.is_err());
    }
}
