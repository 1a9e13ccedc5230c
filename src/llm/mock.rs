//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 默认回显最后一条 User 消息；也可固定回复、按顺序回放脚本或始终失败。记录调用次数，便于断言「未发起外部调用」。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, Message, Role};

#[derive(Debug)]
enum Behavior {
    Echo,
    Reply(String),
    Script(Mutex<VecDeque<String>>),
    Fail(String),
}

/// Mock 客户端
#[derive(Debug)]
pub struct MockLlmClient {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::with_behavior(Behavior::Echo)
    }
}

impl MockLlmClient {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// 回显最后一条 User 消息
    pub fn echo() -> Self {
        Self::default()
    }

    /// 每次都返回同一段文本
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Reply(text.into()))
    }

    /// 依次返回脚本中的回复，用尽后报错
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = replies.into_iter().map(Into::into).collect();
        Self::with_behavior(Behavior::Script(Mutex::new(queue)))
    }

    /// 每次都失败（模拟鉴权、网络或配额错误）
    pub fn failing(error: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(error.into()))
    }

    /// 已收到的 complete 调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _options: CompletionOptions,
    ) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Echo => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(format!("Echo from Mock: {}", last_user))
            }
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Script(queue) => {
                let mut queue = queue
                    .lock()
                    .map_err(|_| "mock script poisoned".to_string())?;
                queue
                    .pop_front()
                    .ok_or_else(|| "mock script exhausted".to_string())
            }
            Behavior::Fail(error) => Err(error.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_uses_last_user_message() {
        let mock = MockLlmClient::echo();
        let messages = vec![
            Message::system("sys"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ];
        let out = mock
            .complete(&messages, CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "Echo from Mock: second");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_script_exhausts() {
        let mock = MockLlmClient::scripted(["a"]);
        let opts = CompletionOptions::default();
        assert_eq!(mock.complete(&[], opts).await.unwrap(), "a");
        assert!(mock.complete(&[], opts).await.is_err());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_counts_calls() {
        let mock = MockLlmClient::failing("quota exceeded");
        let err = mock
            .complete(&[Message::user("hi")], CompletionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, "quota exceeded");
        assert_eq!(mock.calls(), 1);
    }
}
