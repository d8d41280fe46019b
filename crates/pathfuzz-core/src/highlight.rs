//! 高亮重建：对入选结果重新匹配以取得命中位置，并生成高亮描述
use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::matches::Match;
use crate::options::{HighlightMode, MatchOptions};
use crate::scorer::Scorer;
use crate::source::Candidate;

/// 单个入选结果的高亮描述
/// - `positions`：命中字符的字符下标（升序）；`highlight_scoped` 时相对整行，否则相对作用域子串
/// - `patterns`：供 Vim 使用的高亮模式（`\V\C` 字面量模式）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub positions: Vec<usize>,
    pub patterns: Vec<String>,
}

/// 为每个入选结果生成高亮描述（顺序与 `finalists` 一致）
/// - 重新匹配失败视为内部一致性错误，整次请求失败
pub fn highlight_finalists<T, M>(
    finalists: &[Match<T>],
    scorer: &M,
    query: &str,
    opts: &MatchOptions,
) -> Result<Vec<Highlight>>
where
    T: Candidate,
    M: Scorer,
{
    let mut scratch = M::Scratch::default();
    let mut out = Vec::with_capacity(finalists.len());
    for m in finalists {
        let full = m.item.text();
        let mut positions = rematch_positions(scorer, query, full, opts, &mut scratch)?;
        // 模式总是针对整行；位置按 highlight_scoped 决定参照系
        let patterns = vim_patterns(opts.highlight_mode, full, &positions);
        if !opts.highlight_scoped {
            let base = opts.match_mode.apply(full).char_offset(full);
            for pos in &mut positions {
                *pos -= base;
            }
        }
        out.push(Highlight { positions, patterns });
    }
    Ok(out)
}

/// 对已知命中重新匹配，返回相对原始文本的字符位置
/// - 与匹配阶段使用同一对（查询, 作用域子串），否则打分器可能给出不同结论
pub fn rematch_positions<M: Scorer>(
    scorer: &M,
    query: &str,
    full: &str,
    opts: &MatchOptions,
    scratch: &mut M::Scratch,
) -> Result<Vec<usize>> {
    let scoped = opts.match_mode.apply(full);
    let mut positions = Vec::new();
    let matched = scorer
        .match_text(query, scoped.text, Some(&mut positions), scratch)
        .map_err(MatchError::Scorer)?;
    if matched.is_none() {
        return Err(MatchError::Rematch { text: scoped.text.to_string() });
    }
    if scoped.byte_offset > 0 {
        let base = scoped.char_offset(full);
        for pos in &mut positions {
            *pos += base;
        }
    }
    Ok(positions)
}

/// 根据高亮模式由命中位置生成 Vim 模式
pub fn vim_patterns(mode: HighlightMode, text: &str, positions: &[usize]) -> Vec<String> {
    let (Some(&first), Some(&last)) = (positions.first(), positions.last()) else {
        return Vec::new();
    };
    match mode {
        HighlightMode::None => Vec::new(),
        HighlightMode::Basic => vec![vim_pattern(text, first, last)],
        HighlightMode::Detailed => {
            let mut out = Vec::new();
            let mut start = first;
            let mut prev = first;
            for &pos in &positions[1..] {
                if pos != prev + 1 {
                    out.push(vim_pattern(text, start, prev));
                    start = pos;
                }
                prev = pos;
            }
            out.push(vim_pattern(text, start, prev));
            out
        }
    }
}

// 字符区间 [first, last] 高亮，前缀锚定到行首
fn vim_pattern(text: &str, first: usize, last: usize) -> String {
    let byte_at = |ci: usize| text.char_indices().nth(ci).map_or(text.len(), |(b, _)| b);
    let start = byte_at(first);
    let end = byte_at(last + 1);
    format!(
        "\\V\\C^{}\\zs{}\\ze",
        vim_escape(&text[..start]),
        vim_escape(&text[start..end])
    )
}

fn vim_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MatchMode;
    use crate::path_util::PATH_SEPARATOR;
    use crate::scorer::PathScorer;

    #[test]
    fn test_basic_pattern_spans_first_to_last() {
        let pats = vim_patterns(HighlightMode::Basic, "src/main.rs", &[4, 6, 7]);
        assert_eq!(pats, vec!["\\V\\C^src/\\zsmain\\ze".to_string()]);
    }

    #[test]
    fn test_detailed_pattern_per_run() {
        let pats = vim_patterns(HighlightMode::Detailed, "abcdef", &[0, 1, 4]);
        assert_eq!(
            pats,
            vec!["\\V\\C^\\zsab\\ze".to_string(), "\\V\\C^abcd\\zse\\ze".to_string()]
        );
    }

    #[test]
    fn test_patterns_escape_backslash_and_handle_multibyte() {
        let pats = vim_patterns(HighlightMode::Basic, "é\\x", &[2]);
        assert_eq!(pats, vec!["\\V\\C^é\\\\\\zsx\\ze".to_string()]);
        assert!(vim_patterns(HighlightMode::None, "abc", &[0]).is_empty());
        assert!(vim_patterns(HighlightMode::Basic, "abc", &[]).is_empty());
    }

    #[test]
    fn test_rematch_shifts_scoped_positions() {
        let path = format!("dir{PATH_SEPARATOR}sub{PATH_SEPARATOR}file.rs");
        let opts = MatchOptions {
            match_mode: MatchMode::FilenameOnly,
            highlight_mode: HighlightMode::Basic,
            ..MatchOptions::default()
        };
        let scorer = PathScorer::new(&opts);
        let mut scratch = Default::default();

        let mut raw = Vec::new();
        scorer.match_text("fr", "file.rs", Some(&mut raw), &mut scratch).unwrap().unwrap();
        let shifted = rematch_positions(&scorer, "fr", &path, &opts, &mut scratch).unwrap();
        let k = "dir/sub/".len();
        assert_eq!(shifted, raw.iter().map(|r| r + k).collect::<Vec<_>>());
    }

    #[test]
    fn test_unscoped_reports_positions_within_scope() {
        let sep = PATH_SEPARATOR;
        let path = format!("ab{sep}xab");
        let scoped = MatchOptions { match_mode: MatchMode::FilenameOnly, ..MatchOptions::default() };
        let unscoped = MatchOptions { highlight_scoped: false, ..scoped.clone() };
        let scorer = PathScorer::new(&scoped);
        let m = [Match { item: path.clone(), score: 0, index: 0 }];

        let a = highlight_finalists(&m, &scorer, "ab", &scoped).unwrap();
        let b = highlight_finalists(&m, &scorer, "ab", &unscoped).unwrap();
        assert_eq!(a[0].positions, vec![4, 5]);
        assert_eq!(b[0].positions, vec![1, 2]);
        assert_eq!(a[0].patterns, b[0].patterns);
    }

    #[test]
    fn test_rematch_failure_is_hard_error() {
        let opts = MatchOptions::default();
        let scorer = PathScorer::new(&opts);
        let mut scratch = Default::default();
        let err = rematch_positions(&scorer, "zz", "abc", &opts, &mut scratch).unwrap_err();
        assert!(matches!(err, MatchError::Rematch { .. }));
    }
}
