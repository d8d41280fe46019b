//! 模糊路径匹配核心库
//!
//! 设计要点：
//! - 单一外部候选流由 `BatchSource` 持锁批量分发给 N 个 worker，句柄的释放同样在锁内完成。
//! - 每个 worker 只保留自己见过的前 `limit` 个命中（小顶堆，插入即淘汰）。
//! - 汇合后按“分数降序 → 到达序号升序”合并，输出与线程数、调度顺序无关。
//! - 需要高亮时，对入选结果再次调用打分器取命中位置，并换算回原始文本坐标。
//! - 任何失败（上游、打分、高亮重匹配、配置）都让整次请求失败，不返回部分结果。

mod batch;
mod engine;
mod error;
mod highlight;
mod matches;
mod options;
pub mod path_util;
mod query;
mod scorer;
mod source;

pub use batch::BATCH_SIZE_BYTES;
pub use engine::{match_candidates, worker_count, MatchOutput};
pub use error::{MatchError, Result, ScorerError, SourceError};
pub use highlight::{vim_patterns, Highlight};
pub use options::{HighlightMode, MatchMode, MatchOptions, MatchStats, Scoped};
pub use query::prepare_query;
pub use scorer::{PathScorer, PathScratch, Scorer};
pub use source::{from_iter, walk_source, Candidate, CandidateSource, ChannelSource, IterSource};
