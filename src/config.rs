//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SAGE__*` 覆盖（双下划线表示嵌套，如 `SAGE__APP__LOCAL_MODE=true`）。
//! 最后对仍未设置的项回退到扁平变量 `LOCAL_MODE`、`OPENAI_KEY`、`OPENAI_ENDPOINT`、`OPENAI_CHAT_MODEL`。
//! 配置在启动时加载一次，之后作为不可变值显式传给编排器与级联。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub exchange_log: ExchangeLogSection,
    pub planner: PlannerSection,
    pub capabilities: CapabilitiesSection,
}

/// [app] 段：应用名与离线开关
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 为 true 时不访问任何外部依赖，直接返回本地回显；未设置时由扁平变量 LOCAL_MODE 补齐，默认 false
    #[serde(default)]
    pub local_mode: Option<bool>,
}

/// [llm] 段：模型端点、密钥与模型名；三者齐全才视为有凭据
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// 模型凭据（三项均非空）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCredentials {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// [exchange_log] 段：问答记录文件
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeLogSection {
    #[serde(default = "default_exchange_log_path")]
    pub path: PathBuf,
}

impl Default for ExchangeLogSection {
    fn default() -> Self {
        Self {
            path: default_exchange_log_path(),
        }
    }
}

fn default_exchange_log_path() -> PathBuf {
    PathBuf::from("local_queue_log.txt")
}

/// [planner] 段：单个计划的最大步骤数
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    4
}

/// [capabilities] 段：各增强能力的数据源；未配置来源的能力不注册
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapabilitiesSection {
    #[serde(default)]
    pub web_search: WebSearchSection,
    #[serde(default)]
    pub indexed_search: IndexedSearchSection,
    #[serde(default)]
    pub graph: GraphSection,
}

/// [capabilities.web_search] 段：搜索 API 端点、密钥、超时与结果上限
#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_search_timeout_secs(),
            max_results: default_max_results(),
            max_result_chars: default_max_result_chars(),
        }
    }
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> usize {
    5
}

fn default_max_result_chars() -> usize {
    4000
}

/// [capabilities.indexed_search] 段：文档根目录（.md / .txt）、命中数与分块大小
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedSearchSection {
    pub root: Option<PathBuf>,
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for IndexedSearchSection {
    fn default() -> Self {
        Self {
            root: None,
            max_hits: default_max_hits(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_hits() -> usize {
    3
}

fn default_chunk_size() -> usize {
    500
}

/// [capabilities.graph] 段：图谱 TOML 文件与单次返回的事实上限
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            path: None,
            max_facts: default_max_facts(),
        }
    }
}

fn default_max_facts() -> usize {
    10
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl AppConfig {
    /// 是否处于本地模式（未设置视为 false）
    pub fn local_mode(&self) -> bool {
        self.app.local_mode.unwrap_or(false)
    }

    /// 端点、密钥、模型名均非空时返回凭据，否则 None（级联将跳过需要模型的层级）
    pub fn model_credentials(&self) -> Option<ModelCredentials> {
        Some(ModelCredentials {
            endpoint: non_empty(&self.llm.endpoint)?,
            api_key: non_empty(&self.llm.api_key)?,
            model: non_empty(&self.llm.model)?,
        })
    }

    /// 用扁平变量补齐未设置的项；lookup 通常为 `std::env::var(..).ok()`
    pub fn apply_flat_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.app.local_mode.is_none() {
            self.app.local_mode =
                lookup("LOCAL_MODE").map(|v| v.trim().eq_ignore_ascii_case("true"));
        }
        if non_empty(&self.llm.api_key).is_none() {
            self.llm.api_key = lookup("OPENAI_KEY");
        }
        if non_empty(&self.llm.endpoint).is_none() {
            self.llm.endpoint = lookup("OPENAI_ENDPOINT");
        }
        if non_empty(&self.llm.model).is_none() {
            self.llm.model = lookup("OPENAI_CHAT_MODEL");
        }
    }
}

/// 从 config 目录加载配置，环境变量 SAGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 SAGE__*（双下划线表示嵌套键）
/// 4. 扁平变量补齐仍为空的离线开关与模型凭据
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SAGE")
            .separator("__")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.apply_flat_vars(|key| std::env::var(key).ok());
    Ok(cfg)
}

/// 加载配置；失败时记录警告并使用默认值（默认值即完整级联、无凭据）
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        let mut cfg = AppConfig::default();
        cfg.apply_flat_vars(|key| std::env::var(key).ok());
        cfg
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(!cfg.local_mode());
        assert!(cfg.model_credentials().is_none());
        assert_eq!(cfg.exchange_log.path, PathBuf::from("local_queue_log.txt"));
        assert_eq!(cfg.planner.max_steps, 4);
        assert_eq!(cfg.capabilities.web_search.timeout_secs, 15);
    }

    #[test]
    fn test_credentials_require_all_fields() {
        let mut cfg = AppConfig::default();
        cfg.llm.endpoint = Some("https://example.invalid/v1".into());
        cfg.llm.api_key = Some("key".into());
        assert!(cfg.model_credentials().is_none());

        cfg.llm.model = Some("   ".into());
        assert!(cfg.model_credentials().is_none());

        cfg.llm.model = Some("gpt-4o-mini".into());
        let creds = cfg.model_credentials().unwrap();
        assert_eq!(creds.model, "gpt-4o-mini");
        assert_eq!(creds.api_key, "key");
    }

    #[test]
    fn test_flat_vars_fill_missing_values() {
        let env = vars(&[
            ("LOCAL_MODE", "TRUE"),
            ("OPENAI_KEY", "k"),
            ("OPENAI_ENDPOINT", "https://e"),
            ("OPENAI_CHAT_MODEL", "m"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.llm.model = Some("configured".into());
        cfg.apply_flat_vars(|k| env.get(k).cloned());

        assert!(cfg.local_mode());
        assert_eq!(cfg.llm.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.llm.endpoint.as_deref(), Some("https://e"));
        assert_eq!(cfg.llm.model.as_deref(), Some("configured"));
    }

    #[test]
    fn test_local_mode_flag_only_enables_on_true() {
        let env = vars(&[("LOCAL_MODE", "yes")]);
        let mut cfg = AppConfig::default();
        cfg.apply_flat_vars(|k| env.get(k).cloned());
        assert!(!cfg.local_mode());
    }

    #[test]
    fn test_explicit_local_mode_wins_over_flat_var() {
        let env = vars(&[("LOCAL_MODE", "true")]);
        let mut cfg = AppConfig::default();
        cfg.app.local_mode = Some(false);
        cfg.apply_flat_vars(|k| env.get(k).cloned());
        assert!(!cfg.local_mode());

        let raw = "[app]\nlocal_mode = false\n";
        let mut from_file: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        from_file.apply_flat_vars(|k| env.get(k).cloned());
        assert!(!from_file.local_mode());
    }

    #[test]
    fn test_deserialize_sections() {
        let raw = r#"
            [app]
            local_mode = true

            [llm]
            endpoint = "https://api.example.invalid/v1"
            api_key = "secret"
            model = "gpt-4o-mini"

            [exchange_log]
            path = "logs/exchanges.jsonl"

            [capabilities.indexed_search]
            root = "docs"
            max_hits = 2
        "#;
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(cfg.local_mode());
        assert!(cfg.model_credentials().is_some());
        assert_eq!(cfg.exchange_log.path, PathBuf::from("logs/exchanges.jsonl"));
        assert_eq!(cfg.capabilities.indexed_search.max_hits, 2);
        assert_eq!(cfg.capabilities.indexed_search.chunk_size, 500);
        assert!(cfg.capabilities.graph.path.is_none());
    }
}
