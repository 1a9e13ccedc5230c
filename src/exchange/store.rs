//! 问答记录的持久化目标
//!
//! ExchangeStore 只负责「追加一行」：文件实现以 O_APPEND 打开，在按路径共享的锁内以单次 write_all
//! 追加整行（含换行符）。同一进程内指向同一文件的多个存储实例共用一把锁，记录不会交错；
//! 内存实现用于测试与嵌入场景。

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;

use crate::core::ExchangeLogError;

/// 追加式存储：只追加，不覆盖、不重排、不压缩
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// 追加一条记录（不含换行符的单行文本）
    async fn append(&self, line: &str) -> Result<(), ExchangeLogError>;

    /// 存储位置描述（用于运行日志）
    fn describe(&self) -> String;
}

/// 进程内按规范化路径共享的写锁表
fn path_lock(key: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key.to_path_buf()).or_default())
}

/// 父目录规范化后拼接文件名，使 `a/../log.txt` 与 `log.txt` 得到同一把锁
fn lock_key(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn append_blocking(path: &Path, buf: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let lock = path_lock(&lock_key(path));
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(buf)?;
    file.flush()
}

/// 本地文件：每条记录一行
#[derive(Debug, Clone)]
pub struct FileExchangeStore {
    path: PathBuf,
}

impl FileExchangeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ExchangeStore for FileExchangeStore {
    async fn append(&self, line: &str) -> Result<(), ExchangeLogError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_blocking(&path, buf.as_bytes()))
            .await
            .map_err(|e| ExchangeLogError::Unavailable(format!("append task failed: {e}")))??;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// 内存存储：保留追加顺序
#[derive(Debug, Default)]
pub struct MemoryExchangeStore {
    lines: Mutex<Vec<String>>,
}

impl MemoryExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExchangeStore for MemoryExchangeStore {
    async fn append(&self, line: &str) -> Result<(), ExchangeLogError> {
        self.lines
            .lock()
            .map_err(|_| ExchangeLogError::Unavailable("memory store poisoned".into()))?
            .push(line.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log.txt");
        let store = FileExchangeStore::new(&path);

        store.append("first").await.unwrap();
        store.append("second").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_file_store_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "earlier\n").unwrap();

        FileExchangeStore::new(&path).append("later").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "earlier\nlater\n");
    }

    #[tokio::test]
    async fn test_file_store_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // 目录本身不能作为文件打开
        let store = FileExchangeStore::new(dir.path());
        assert!(matches!(
            store.append("x").await,
            Err(ExchangeLogError::Io(_))
        ));
    }

    #[test]
    fn test_lock_key_shared_across_spellings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        let direct = dir.path().join("log.txt");
        let detour = dir.path().join("sub").join("..").join("log.txt");
        assert_eq!(lock_key(&direct), lock_key(&detour));
        assert!(Arc::ptr_eq(
            &path_lock(&lock_key(&direct)),
            &path_lock(&lock_key(&detour))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_keeps_order() {
        let store = MemoryExchangeStore::new();
        store.append("a").await.unwrap();
        store.append("b").await.unwrap();
        assert_eq!(store.lines(), vec!["a".to_string(), "b".to_string()]);
    }
}
