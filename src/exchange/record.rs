//! 问答记录
//!
//! Exchange 为构造期的草稿（各字段可缺省），ExchangeRecord 为补齐默认值后的持久化形态：
//! 固定顺序的四个字符串字段 Id / Date / UserQuery / AssistantResponse，每条一行 JSON。

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date 字段格式：yyyy-MM-dd HH:mm:ss
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 一次问答（未补齐默认值）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    pub id: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub user_query: Option<String>,
    pub assistant_response: Option<String>,
}

impl Exchange {
    pub fn new(user_query: impl Into<String>, assistant_response: impl Into<String>) -> Self {
        Self {
            user_query: Some(user_query.into()),
            assistant_response: Some(assistant_response.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// 补齐缺省字段：新 UUID、当前本地时间、空字符串
    pub fn into_record(self) -> ExchangeRecord {
        let timestamp = self.timestamp.unwrap_or_else(|| Local::now().naive_local());
        ExchangeRecord {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            date: timestamp.format(DATE_FORMAT).to_string(),
            user_query: self.user_query.unwrap_or_default(),
            assistant_response: self.assistant_response.unwrap_or_default(),
        }
    }
}

/// 持久化的问答记录；字段声明顺序即序列化顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExchangeRecord {
    pub id: String,
    pub date: String,
    pub user_query: String,
    pub assistant_response: String,
}

impl ExchangeRecord {
    /// 紧凑 JSON，不含换行（字符串内换行被转义），可作为单行整体追加
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
