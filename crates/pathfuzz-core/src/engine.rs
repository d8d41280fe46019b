//! 匹配主流程与并行调度
//!
//! 每次请求：
//! - 按 CPU 核数（受 `max_threads` 限制，至少 1）建一个临时 Rayon 线程池，
//!   每个线程跑一个 worker（`broadcast`），全部结束后线程池即丢弃；
//! - worker 经 `BatchSource` 批量取数、打分、维护各自的有界最优集合；
//! - 汇合后先检查打分失败，再检查上游失败，任何失败都不返回部分结果；
//! - 合并出全局名次后，按需对入选结果做高亮重建。
use tracing::{debug, warn};

use crate::batch::{BatchSource, Pending, Pull, ReleaseGuard};
use crate::error::{MatchError, Result};
use crate::highlight::{highlight_finalists, Highlight};
use crate::matches::{merge_ranked, BoundedBest, Match};
use crate::options::{HighlightMode, MatchOptions, MatchStats};
use crate::query::prepare_query;
use crate::scorer::Scorer;
use crate::source::{Candidate, CandidateSource};

/// 一次匹配请求的输出
/// - `items`：按名次排列的候选句柄
/// - `highlights`：开启高亮时与 `items` 一一对应，否则为空
#[derive(Debug)]
pub struct MatchOutput<T> {
    pub items: Vec<T>,
    pub highlights: Vec<Highlight>,
    pub stats: MatchStats,
}

/// 单个 worker 的产出
struct WorkerReport<T> {
    matches: Vec<Match<T>>,
    matched: usize,
}

/// worker 数：CPU 核数，`max_threads > 0` 时不超过它，至少为 1
pub fn worker_count(max_threads: usize) -> usize {
    let n = num_cpus::get().max(1);
    if max_threads > 0 {
        n.min(max_threads)
    } else {
        n
    }
}

/// 对候选源中的全部候选做模糊匹配，返回前 `limit` 个结果
pub fn match_candidates<S, M>(
    source: S,
    scorer: &M,
    query: &str,
    opts: &MatchOptions,
) -> Result<MatchOutput<S::Item>>
where
    S: CandidateSource,
    M: Scorer,
{
    opts.validate()?;
    let query = prepare_query(query, opts.query_inverting_delimiter.as_deref())?;
    let threads = worker_count(opts.max_threads);
    debug!(threads, limit = opts.limit, mode = ?opts.match_mode, "starting match");

    let source = BatchSource::new(source);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("pathfuzz-worker-{i}"))
        .build()?;
    let reports = pool.broadcast(|ctx| run_worker(ctx.index(), &source, scorer, &query, opts));
    drop(pool);

    // 未入选或需丢弃的句柄统一在锁内释放
    let mut dropped = ReleaseGuard::new(&source);
    let mut parts = Vec::with_capacity(reports.len());
    let mut matched = 0;
    let mut first_err = None;
    for report in reports {
        match report {
            Ok(r) => {
                matched += r.matched;
                parts.push(r.matches);
            }
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_err {
        dropped.items.extend(parts.into_iter().flatten().map(|m| m.item));
        return Err(err);
    }
    if let Some(err) = source.take_failure() {
        dropped.items.extend(parts.into_iter().flatten().map(|m| m.item));
        return Err(MatchError::Source(err));
    }

    let finalists = merge_ranked(parts, opts.limit, &mut dropped.items);

    let highlights = if opts.highlight_mode == HighlightMode::None {
        Vec::new()
    } else {
        match highlight_finalists(&finalists, scorer, &query, opts) {
            Ok(h) => h,
            Err(err) => {
                dropped.items.extend(finalists.into_iter().map(|m| m.item));
                return Err(err);
            }
        }
    };

    let stats = MatchStats {
        threads,
        candidates_seen: source.candidates_seen(),
        matched,
        returned: finalists.len(),
    };
    debug!(?stats, "match finished");
    Ok(MatchOutput {
        items: finalists.into_iter().map(|m| m.item).collect(),
        highlights,
        stats,
    })
}

/// 单个 worker：取批 → 打分 → 维护有界最优集合，直到源耗尽或出现失败
fn run_worker<S, M>(
    worker: usize,
    source: &BatchSource<S>,
    scorer: &M,
    query: &str,
    opts: &MatchOptions,
) -> Result<WorkerReport<S::Item>>
where
    S: CandidateSource,
    M: Scorer,
{
    // 未命中、被淘汰的句柄；下次取数或退出时在锁内释放
    let mut rejected = ReleaseGuard::new(source);
    let mut batch: Vec<Pending<S::Item>> = Vec::new();
    let mut best = BoundedBest::new(opts.limit);
    let mut scratch = M::Scratch::default();
    let mut scored = 0usize;
    let mut matched = 0usize;

    loop {
        match source.pull_batch(opts.batch_size_bytes, &mut batch, &mut rejected.items) {
            Pull::Ready => {}
            Pull::Exhausted | Pull::Failed => break,
        }
        let mut pending = batch.drain(..);
        while let Some(Pending { index, item }) = pending.next() {
            scored += 1;
            let scoped = opts.match_mode.apply(item.text());
            match scorer.match_text(query, scoped.text, None, &mut scratch) {
                Ok(Some(score)) => {
                    matched += 1;
                    if let Some(out) = best.offer(Match::new(item, score, index)) {
                        rejected.items.push(out);
                    }
                }
                Ok(None) => rejected.items.push(item),
                Err(err) => {
                    warn!(worker, error = %err, "scorer failed, aborting match");
                    rejected.items.push(item);
                    rejected.items.extend(pending.map(|p| p.item));
                    rejected.items.extend(best.into_vec().into_iter().map(|m| m.item));
                    source.abort();
                    return Err(MatchError::Scorer(err));
                }
            }
        }
    }

    debug!(worker, scored, matched, kept = best.len(), "worker finished");
    Ok(WorkerReport { matches: best.into_vec(), matched })
}
