//! 候选源：宿主提供的外部迭代器及几种内置适配
//!
//! 候选源本身不要求线程安全（只要求 `Send`），所有访问都由 `BatchSource`
//! 的互斥锁串行化。候选句柄的“释放”即 drop，同样只在该锁内发生。
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{self as channel, Receiver};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::SourceError;

/// 候选句柄：排序只看打分结果，与句柄本身无关
pub trait Candidate {
    /// 参与匹配的文本视图
    fn text(&self) -> &str;
}

impl Candidate for String {
    fn text(&self) -> &str {
        self
    }
}

impl Candidate for &str {
    fn text(&self) -> &str {
        self
    }
}

impl Candidate for Arc<str> {
    fn text(&self) -> &str {
        self
    }
}

/// 外部候选流
/// - `None`：流结束
/// - `Some(Err(_))`：上游失败（与结束区分）
pub trait CandidateSource: Send {
    type Item: Candidate + Send;

    fn next_candidate(&mut self) -> Option<Result<Self::Item, SourceError>>;
}

/// 任意 `Iterator<Item = Result<T, SourceError>>` 的适配
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, T> CandidateSource for IterSource<I>
where
    I: Iterator<Item = Result<T, SourceError>> + Send,
    T: Candidate + Send,
{
    type Item = T;

    fn next_candidate(&mut self) -> Option<Result<T, SourceError>> {
        self.iter.next()
    }
}

/// 从不会失败的迭代器构造候选源
pub fn from_iter<I, T>(iter: I) -> IterSource<impl Iterator<Item = Result<T, SourceError>> + Send>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send,
    T: Candidate + Send,
{
    IterSource::new(iter.into_iter().map(Ok))
}

/// 基于 crossbeam 通道的候选源：生产者线程可以边产出边匹配
pub struct ChannelSource<T> {
    rx: Receiver<Result<T, SourceError>>,
}

impl<T> ChannelSource<T> {
    pub fn new(rx: Receiver<Result<T, SourceError>>) -> Self {
        Self { rx }
    }
}

impl<T: Candidate + Send> CandidateSource for ChannelSource<T> {
    type Item = T;

    fn next_candidate(&mut self) -> Option<Result<T, SourceError>> {
        // 所有 Sender 被丢弃即视为流结束
        self.rx.recv().ok()
    }
}

/// 通道容量（条目数）
const WALK_CHANNEL_CAP: usize = 4096;

/// 后台遍历目录，按相对 `root` 的路径产出普通文件
/// - 遍历出错时发送一条 `SourceError` 并停止
pub fn walk_source(root: &Path) -> ChannelSource<String> {
    let (tx, rx) = channel::bounded(WALK_CHANNEL_CAP);
    let root: PathBuf = root.to_path_buf();
    thread::spawn(move || {
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "directory walk failed");
                    let _ = tx.send(Err(SourceError::new(format!("walk {}: {err}", root.display()))));
                    return;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            let item = rel.to_string_lossy().into_owned();
            if tx.send(Ok(item)).is_err() {
                // 接收端已放弃（请求失败），不再继续遍历
                return;
            }
        }
    });
    ChannelSource::new(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn drain<S: CandidateSource>(mut s: S) -> (Vec<String>, Option<SourceError>) {
        let mut out = Vec::new();
        while let Some(next) = s.next_candidate() {
            match next {
                Ok(item) => out.push(item.text().to_string()),
                Err(e) => return (out, Some(e)),
            }
        }
        (out, None)
    }

    #[test]
    fn test_iter_source_yields_then_ends() {
        let (items, err) = drain(from_iter(vec!["a", "b"]));
        assert_eq!(items, vec!["a", "b"]);
        assert!(err.is_none());
    }

    #[test]
    fn test_iter_source_surfaces_failure() {
        let src = IterSource::new(
            vec![Ok("a".to_string()), Err(SourceError::new("boom"))].into_iter(),
        );
        let (items, err) = drain(src);
        assert_eq!(items, vec!["a"]);
        assert_eq!(err.map(|e| e.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_walk_source_lists_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/engine")).unwrap();
        fs::write(dir.path().join("src/engine/batch.rs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let (mut items, err) = drain(walk_source(dir.path()));
        assert!(err.is_none());
        items.sort();
        let nested = format!("src{0}engine{0}batch.rs", std::path::MAIN_SEPARATOR);
        assert_eq!(items, vec!["README.md".to_string(), nested]);
    }

    #[test]
    fn test_walk_source_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (items, err) = drain(walk_source(&dir.path().join("missing")));
        assert!(items.is_empty());
        assert!(err.is_some());
    }
}
