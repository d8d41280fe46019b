//! 打分器（匹配 oracle）接口与内置的路径打分实现
//!
//! 编排层只依赖 `Scorer` 契约：
//! - 可被多个 worker 并发调用，每个 worker 持有独立的 `Scratch`；
//! - 对固定的 (query, text) 结果确定：命中与否、分数都不变。高亮阶段依赖这一点
//!   对已知命中做第二次“只取位置”的匹配。
use crate::error::ScorerError;
use crate::options::MatchOptions;
use crate::path_util::{components, path_distance, PATH_SEPARATOR};

/// 匹配 oracle
pub trait Scorer: Sync {
    /// 跨调用复用的缓冲区，避免重复分配
    type Scratch: Default + Send;

    /// 对 `text` 匹配 `query`
    /// - `Ok(None)`：未命中
    /// - `Ok(Some(score))`：命中，分数越高越好
    /// - `positions` 非空时，按升序追加命中字符在 `text` 中的字符下标
    fn match_text(
        &self,
        query: &str,
        text: &str,
        positions: Option<&mut Vec<usize>>,
        scratch: &mut Self::Scratch,
    ) -> Result<Option<i64>, ScorerError>;
}

/// 连续命中奖励
const BONUS_CONSECUTIVE: i64 = 16;
/// 单词起始处命中奖励
const BONUS_WORD_START: i64 = 8;
/// 全部命中落在文件名内的奖励
const BONUS_BASENAME: i64 = 32;

/// 内置路径打分器：智能大小写的子序列匹配
/// - 优先在文件名内完成匹配，其次整条路径
/// - 奖励连续命中与单词起始命中，惩罚间隔、长度以及与当前文件的路径距离
/// - 全程整数运算，保证确定性
#[derive(Debug, Clone, Default)]
pub struct PathScorer {
    is_path: bool,
    match_crfile: bool,
    cur_file: String,
}

/// `PathScorer` 的每 worker 缓冲区
#[derive(Debug, Default)]
pub struct PathScratch {
    text: Vec<char>,
    folded: Vec<char>,
    query: Vec<char>,
    spots: Vec<usize>,
}

impl PathScorer {
    pub fn new(opts: &MatchOptions) -> Self {
        Self {
            is_path: opts.is_path,
            match_crfile: opts.match_crfile,
            cur_file: opts.cur_file.clone(),
        }
    }

    fn distance_penalty(&self, text: &str) -> i64 {
        if !self.is_path || self.cur_file.is_empty() {
            return 0;
        }
        path_distance(&components(text), &components(&self.cur_file)) as i64
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn is_word_start(text: &[char], pos: usize) -> bool {
    let Some(&prev) = pos.checked_sub(1).and_then(|p| text.get(p)) else {
        return true;
    };
    let cur = text[pos];
    prev == PATH_SEPARATOR
        || matches!(prev, '/' | '_' | '-' | '.' | ' ' | '\t')
        || (prev.is_lowercase() && cur.is_uppercase())
}

/// 在 `hay[from..]` 中寻找 `needle` 的紧凑子序列出现：
/// 先正向找到最左完整匹配的终点，再从终点反向贪心，得到尽量靠后的起点。
/// 成功时 `spots` 为升序下标。
fn find_compact(hay: &[char], needle: &[char], from: usize, spots: &mut Vec<usize>) -> bool {
    spots.clear();
    let mut qi = 0;
    let mut end = None;
    for (i, &c) in hay.iter().enumerate().skip(from) {
        if c == needle[qi] {
            qi += 1;
            if qi == needle.len() {
                end = Some(i);
                break;
            }
        }
    }
    let Some(end) = end else {
        return false;
    };
    let mut qi = needle.len();
    let mut i = end + 1;
    while qi > 0 {
        i -= 1;
        if hay[i] == needle[qi - 1] {
            qi -= 1;
            spots.push(i);
        }
    }
    spots.reverse();
    true
}

impl Scorer for PathScorer {
    type Scratch = PathScratch;

    fn match_text(
        &self,
        query: &str,
        text: &str,
        positions: Option<&mut Vec<usize>>,
        scratch: &mut PathScratch,
    ) -> Result<Option<i64>, ScorerError> {
        if self.is_path && !self.match_crfile && !self.cur_file.is_empty() && text == self.cur_file {
            return Ok(None);
        }

        let case_sensitive = query.chars().any(char::is_uppercase);
        scratch.query.clear();
        scratch.text.clear();
        scratch.folded.clear();
        scratch.text.extend(text.chars());
        if case_sensitive {
            scratch.query.extend(query.chars());
            scratch.folded.extend_from_slice(&scratch.text);
        } else {
            scratch.query.extend(query.chars().map(fold));
            scratch.folded.extend(scratch.text.iter().copied().map(fold));
        }

        let text_len = scratch.text.len() as i64;
        let penalty = self.distance_penalty(text);
        if scratch.query.is_empty() {
            return Ok(Some(-penalty - text_len));
        }

        let base_start = if self.is_path {
            scratch
                .text
                .iter()
                .rposition(|&c| c == PATH_SEPARATOR)
                .map_or(0, |p| p + 1)
        } else {
            0
        };
        let in_basename = base_start > 0
            && find_compact(&scratch.folded, &scratch.query, base_start, &mut scratch.spots);
        if !in_basename && !find_compact(&scratch.folded, &scratch.query, 0, &mut scratch.spots) {
            return Ok(None);
        }

        let spots = &scratch.spots;
        let mut score = 0i64;
        for (k, &pos) in spots.iter().enumerate() {
            if k > 0 && spots[k - 1] + 1 == pos {
                score += BONUS_CONSECUTIVE;
            }
            if is_word_start(&scratch.text, pos) {
                score += BONUS_WORD_START;
            }
        }
        if let (Some(&first), Some(&last)) = (spots.first(), spots.last()) {
            let gaps = (last - first + 1 - spots.len()) as i64;
            score -= gaps;
        }
        if in_basename || (self.is_path && base_start == 0) {
            score += BONUS_BASENAME;
        }
        score -= text_len + penalty;

        if let Some(out) = positions {
            out.extend_from_slice(spots);
        }
        Ok(Some(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> String {
        s.replace('/', &PATH_SEPARATOR.to_string())
    }

    fn score(scorer: &PathScorer, query: &str, text: &str) -> Option<i64> {
        scorer.match_text(query, text, None, &mut PathScratch::default()).unwrap()
    }

    fn positions(scorer: &PathScorer, query: &str, text: &str) -> Vec<usize> {
        let mut out = Vec::new();
        scorer
            .match_text(query, text, Some(&mut out), &mut PathScratch::default())
            .unwrap()
            .expect("should match");
        out
    }

    #[test]
    fn test_subsequence_required() {
        let s = PathScorer::new(&MatchOptions::default());
        assert!(score(&s, "abc", "ab").is_none());
        assert!(score(&s, "abc", "a_b_c").is_some());
        assert!(score(&s, "cba", "abc").is_none());
    }

    #[test]
    fn test_exact_beats_repeated_and_embedded() {
        let s = PathScorer::new(&MatchOptions::default());
        let exact = score(&s, "abc", "abc").unwrap();
        let repeated = score(&s, "abc", "abcabc").unwrap();
        let embedded = score(&s, "abc", "xabcx").unwrap();
        assert!(exact > repeated);
        assert!(repeated > embedded);
    }

    #[test]
    fn test_smart_case() {
        let s = PathScorer::new(&MatchOptions::default());
        assert!(score(&s, "abc", "ABC").is_some());
        assert!(score(&s, "Abc", "abc").is_none());
        assert!(score(&s, "Abc", "Abc").is_some());
    }

    #[test]
    fn test_prefers_basename() {
        let s = PathScorer::new(&MatchOptions::default());
        let in_name = score(&s, "lib", &p("src/xlib.rs")).unwrap();
        let in_dir = score(&s, "lib", &p("lib/xyz.rs")).unwrap();
        assert!(in_name > in_dir, "{in_name} vs {in_dir}");
        assert_eq!(positions(&s, "lib", &p("lib/lib.rs")), vec![4, 5, 6]);
    }

    #[test]
    fn test_positions_are_compact() {
        let s = PathScorer::new(&MatchOptions { is_path: false, ..MatchOptions::default() });
        assert_eq!(positions(&s, "abc", "a-abc"), vec![2, 3, 4]);
        assert_eq!(positions(&s, "ac", "abac"), vec![2, 3]);
    }

    #[test]
    fn test_current_file_handling() {
        let cur = p("src/engine/mod.rs");
        let opts = MatchOptions { cur_file: cur.clone(), ..MatchOptions::default() };
        let s = PathScorer::new(&opts);
        assert!(score(&s, "mod", &cur).is_none());

        let near = score(&s, "batch", &p("src/engine/batch.rs")).unwrap();
        let far = score(&s, "batch", &p("docs/old/batch.rs")).unwrap();
        assert!(near > far);

        let s = PathScorer::new(&MatchOptions { match_crfile: true, ..opts });
        assert!(score(&s, "mod", &cur).is_some());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let s = PathScorer::new(&MatchOptions::default());
        assert!(score(&s, "", "anything").is_some());
        assert!(positions(&s, "", "anything").is_empty());
    }

    #[test]
    fn test_deterministic_with_reused_scratch() {
        let s = PathScorer::new(&MatchOptions::default());
        let mut scratch = PathScratch::default();
        let text = p("crates/core/src/batch.rs");
        let first = s.match_text("cbat", &text, None, &mut scratch).unwrap();
        s.match_text("zzz", "other", None, &mut scratch).unwrap();
        let mut pos = Vec::new();
        let second = s.match_text("cbat", &text, Some(&mut pos), &mut scratch).unwrap();
        assert_eq!(first, second);
        assert_eq!(pos.len(), 4);
    }
}
