//! 批量取数适配器：把单一外部候选流安全地分发给多个 worker
//!
//! 设计要点：
//! - 外部迭代器、结束标志、失败标志、中止标志放在同一把 `Mutex` 保护的状态里，
//!   worker 只能通过 `pull_batch` / `release` 访问，拿不到原始迭代器。
//! - 每次持锁按“字节数”取一批，摊薄加锁次数，同时限制单次持锁时间与内存占用。
//! - 被拒绝（未命中、被淘汰）的候选句柄在持锁状态下 drop，因为宿主句柄的释放
//!   不保证线程安全。
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::SourceError;
use crate::source::{Candidate, CandidateSource};

/// 默认每批字节数。
///
/// 足够大以摊平不同候选之间的匹配耗时差异、减少锁的来回争用；又足够小以尽量
/// 留在 L1 数据缓存里。数值为经验值，与线程数无关。
pub const BATCH_SIZE_BYTES: usize = 8192;

/// 一次取数的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// 本批已填入（可能为空）
    Ready,
    /// 流已耗尽，且本批为空
    Exhausted,
    /// 上游失败或本次请求已中止，不应继续打分
    Failed,
}

/// 已从源中取出、尚未打分的候选；`index` 为全局到达序号，用作排序的稳定次序
pub struct Pending<T> {
    pub index: usize,
    pub item: T,
}

struct SourceState<S: CandidateSource> {
    source: S,
    next_index: usize,
    exhausted: bool,
    failure: Option<SourceError>,
    aborted: bool,
}

/// 互斥保护的候选源适配器
pub struct BatchSource<S: CandidateSource> {
    state: Mutex<SourceState<S>>,
}

impl<S: CandidateSource> BatchSource<S> {
    pub fn new(source: S) -> Self {
        Self {
            state: Mutex::new(SourceState {
                source,
                next_index: 0,
                exhausted: false,
                failure: None,
                aborted: false,
            }),
        }
    }

    // 持锁期间只做取数/释放，worker panic 不会留下半更新的状态
    fn lock(&self) -> MutexGuard<'_, SourceState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 先释放 `rejected`，再取一批候选到 `batch`（调用方保证 `batch` 为空）
    /// - 已结束 / 已失败 / 已中止时不再推进外部迭代器
    /// - 累计文本字节数达到 `max_bytes`、源结束或源失败时停止
    pub fn pull_batch(
        &self,
        max_bytes: usize,
        batch: &mut Vec<Pending<S::Item>>,
        rejected: &mut Vec<S::Item>,
    ) -> Pull {
        let mut st = self.lock();
        rejected.clear();
        if st.failure.is_some() || st.aborted {
            return Pull::Failed;
        }
        if st.exhausted {
            return Pull::Exhausted;
        }

        let mut batch_bytes = 0usize;
        while batch_bytes < max_bytes {
            match st.source.next_candidate() {
                Some(Ok(item)) => {
                    batch_bytes += item.text().len();
                    let index = st.next_index;
                    st.next_index += 1;
                    batch.push(Pending { index, item });
                }
                Some(Err(err)) => {
                    warn!(error = %err, "candidate source failed");
                    st.failure = Some(err);
                    // 已取出的本批同样在锁内释放
                    batch.clear();
                    return Pull::Failed;
                }
                None => {
                    st.exhausted = true;
                    break;
                }
            }
        }
        if batch.is_empty() {
            Pull::Exhausted
        } else {
            Pull::Ready
        }
    }

    /// 持锁释放一组句柄
    pub fn release(&self, rejected: &mut Vec<S::Item>) {
        if rejected.is_empty() {
            return;
        }
        let _st = self.lock();
        rejected.clear();
    }

    /// 标记本次请求已中止（打分失败），其他 worker 在下次取数时停止
    pub fn abort(&self) {
        self.lock().aborted = true;
    }

    /// 取走上游失败（若有）
    pub fn take_failure(&self) -> Option<SourceError> {
        self.lock().failure.take()
    }

    /// 目前为止从外部源取出的候选总数
    pub fn candidates_seen(&self) -> usize {
        self.lock().next_index
    }
}

/// 作用域释放器：无论正常结束、提前返回还是 panic，析构时都在锁内释放持有的句柄
pub struct ReleaseGuard<'a, S: CandidateSource> {
    source: &'a BatchSource<S>,
    pub items: Vec<S::Item>,
}

impl<'a, S: CandidateSource> ReleaseGuard<'a, S> {
    pub fn new(source: &'a BatchSource<S>) -> Self {
        Self { source, items: Vec::new() }
    }
}

impl<S: CandidateSource> Drop for ReleaseGuard<'_, S> {
    fn drop(&mut self) {
        let mut items = mem::take(&mut self.items);
        self.source.release(&mut items);
    }
}
