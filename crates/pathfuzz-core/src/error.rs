//! 错误类型（对外暴露）
use thiserror::Error;

/// 候选源（外部迭代器）报告的失败，与“迭代结束”区分
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// 打分器（匹配 oracle）自身抛出的失败
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ScorerError {
    message: String,
}

impl ScorerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// 一次匹配请求的整体失败；任何一种都不返回部分结果
#[derive(Debug, Error)]
pub enum MatchError {
    /// 候选源中途失败
    #[error("candidate source failed: {0}")]
    Source(#[source] SourceError),

    /// 打分阶段失败（多个 worker 失败时只报告第一个）
    #[error("scorer failed: {0}")]
    Scorer(#[source] ScorerError),

    /// 高亮阶段重新匹配已知结果失败：违反了打分确定性
    #[error("failed to re-match known match '{text}' during highlight pass")]
    Rematch { text: String },

    /// 选项组合非法，在任何 worker 启动前报告
    #[error("invalid option: {0}")]
    Config(String),

    /// 线程池构建失败
    #[error("build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T, E = MatchError> = std::result::Result<T, E>;
