//! 命中项、worker 内有界最优集合、全局合并
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// 单个命中：候选句柄 + 分数 + 全局到达序号
#[derive(Debug)]
pub struct Match<T> {
    pub item: T,
    pub score: i64,
    pub index: usize,
}

impl<T> Match<T> {
    pub fn new(item: T, score: i64, index: usize) -> Self {
        Self { item, score, index }
    }

    /// “更好”排在前：分数降序 → 到达序号升序（保证可复现）
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score.cmp(&self.score).then_with(|| self.index.cmp(&other.index))
    }
}

// Ord 表示“强弱”：越强越大。只依赖分数和序号，不看句柄。
impl<T> PartialEq for Match<T> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.index == other.index
    }
}

impl<T> Eq for Match<T> {}

impl<T> PartialOrd for Match<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Match<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank_cmp(self)
    }
}

/// worker 私有的有界最优集合
/// - `limit == 0`：不限量，直接追加
/// - 否则以小顶堆维护，堆顶即当前最弱者，满时“插入即淘汰”
pub struct BoundedBest<T> {
    limit: usize,
    heap: BinaryHeap<Reverse<Match<T>>>,
}

impl<T> BoundedBest<T> {
    pub fn new(limit: usize) -> Self {
        let heap = if limit > 0 { BinaryHeap::with_capacity(limit + 1) } else { BinaryHeap::new() };
        Self { limit, heap }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// 提交一个命中；返回不再保留的句柄（被淘汰的最弱者，或新命中本身）
    pub fn offer(&mut self, m: Match<T>) -> Option<T> {
        if self.limit == 0 || self.heap.len() < self.limit {
            self.heap.push(Reverse(m));
            return None;
        }
        match self.heap.peek() {
            Some(Reverse(weakest)) if m > *weakest => {
                let evicted = self.heap.pop().map(|Reverse(w)| w.item);
                self.heap.push(Reverse(m));
                evicted
            }
            _ => Some(m.item),
        }
    }

    pub fn into_vec(self) -> Vec<Match<T>> {
        self.heap.into_iter().map(|Reverse(m)| m).collect()
    }
}

/// 合并所有 worker 的结果，取全局前 `limit` 个并按名次排序
/// - `limit == 0`：全部排序返回
/// - 否则先部分选择（O(M)）再对前 `limit` 个排序（O(L log L)）
/// - 未入选的句柄写入 `dropped`，由调用方负责在锁内释放
pub fn merge_ranked<T>(parts: Vec<Vec<Match<T>>>, limit: usize, dropped: &mut Vec<T>) -> Vec<Match<T>> {
    let total = parts.iter().map(Vec::len).sum();
    let mut all: Vec<Match<T>> = Vec::with_capacity(total);
    for part in parts {
        all.extend(part);
    }
    if limit > 0 && all.len() > limit {
        all.select_nth_unstable_by(limit - 1, Match::rank_cmp);
        dropped.extend(all.drain(limit..).map(|m| m.item));
    }
    all.sort_unstable_by(Match::rank_cmp);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(item: &'static str, score: i64, index: usize) -> Match<&'static str> {
        Match::new(item, score, index)
    }

    fn items(v: &[Match<&'static str>]) -> Vec<&'static str> {
        v.iter().map(|m| m.item).collect()
    }

    #[test]
    fn test_stronger_means_higher_score_then_earlier() {
        assert!(m("a", 10, 5) > m("b", 9, 0));
        assert!(m("a", 10, 0) > m("b", 10, 1));
        assert_eq!(m("a", 3, 2).rank_cmp(&m("b", 3, 2)), Ordering::Equal);
    }

    #[test]
    fn test_bounded_best_evicts_weakest() {
        let mut best = BoundedBest::new(2);
        assert_eq!(best.offer(m("low", 1, 0)), None);
        assert_eq!(best.offer(m("mid", 5, 1)), None);
        assert_eq!(best.offer(m("high", 9, 2)), Some("low"));
        assert_eq!(best.offer(m("tiny", 0, 3)), Some("tiny"));
        // 同分时先到者更强
        assert_eq!(best.offer(m("late-mid", 5, 4)), Some("late-mid"));
        assert_eq!(best.len(), 2);

        let mut kept = best.into_vec();
        kept.sort_by(Match::rank_cmp);
        assert_eq!(items(&kept), vec!["high", "mid"]);
    }

    #[test]
    fn test_bounded_best_unbounded_keeps_all() {
        let mut best = BoundedBest::new(0);
        for i in 0..100 {
            assert_eq!(best.offer(m("x", i as i64 % 3, i)), None);
        }
        assert_eq!(best.len(), 100);
    }

    #[test]
    fn test_merge_limits_and_orders() {
        let parts = vec![
            vec![m("a", 3, 0), m("b", 7, 3)],
            vec![m("c", 5, 1), m("d", 7, 2)],
            vec![],
            vec![m("e", 1, 4)],
        ];
        let mut dropped = Vec::new();
        let merged = merge_ranked(parts, 3, &mut dropped);
        assert_eq!(items(&merged), vec!["d", "b", "c"]);
        dropped.sort();
        assert_eq!(dropped, vec!["a", "e"]);
    }

    #[test]
    fn test_merge_unbounded_sorts_everything() {
        let parts = vec![vec![m("a", 1, 0), m("b", 2, 1)], vec![m("c", 3, 2)]];
        let mut dropped = Vec::new();
        let merged = merge_ranked(parts, 0, &mut dropped);
        assert_eq!(items(&merged), vec!["c", "b", "a"]);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_merge_limit_larger_than_matches() {
        let parts = vec![vec![m("a", 1, 0)], vec![m("b", 2, 1)]];
        let mut dropped = Vec::new();
        let merged = merge_ranked(parts, 10, &mut dropped);
        assert_eq!(items(&merged), vec!["b", "a"]);
        assert!(dropped.is_empty());
    }
}
