//! 问答记录器
//!
//! record 补齐默认字段、序列化为单行 JSON 并追加到存储；任何失败只写入运行日志（tracing::error!），
//! 绝不向调用方返回错误，也不影响已生成的回复。

use std::sync::Arc;

use crate::core::ExchangeLogError;
use crate::exchange::{Exchange, ExchangeRecord, ExchangeStore, FileExchangeStore};

/// 问答记录器：持有追加式存储，可在多个并发请求间共享
#[derive(Clone)]
pub struct ExchangeLogger {
    store: Arc<dyn ExchangeStore>,
}

impl ExchangeLogger {
    pub fn new(store: Arc<dyn ExchangeStore>) -> Self {
        Self { store }
    }

    /// 记录到本地文件（每条一行）
    pub fn to_file(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(Arc::new(FileExchangeStore::new(path)))
    }

    /// 追加一条问答；失败时仅记录运行日志
    pub async fn record(&self, exchange: Exchange) {
        let record = exchange.into_record();
        match self.try_record(&record).await {
            Ok(()) => tracing::debug!(
                id = %record.id,
                sink = %self.store.describe(),
                "exchange recorded"
            ),
            Err(e) => tracing::error!(
                id = %record.id,
                sink = %self.store.describe(),
                error = %e,
                "failed to record exchange"
            ),
        }
    }

    async fn try_record(&self, record: &ExchangeRecord) -> Result<(), ExchangeLogError> {
        let line = record.to_line()?;
        self.store.append(&line).await
    }
}
