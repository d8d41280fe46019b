//! 路径分解工具（纯函数，无状态）
//!
//! - 组件保留结尾分隔符，且不做任何归一化（不处理 `.`/`..`，不折叠大小写），
//!   因此按顺序拼接所有组件即可还原原始路径。
//! - 路径距离只对同根路径（同为绝对路径，或相对同一基准）有意义，这里不做校验。

/// 平台路径分隔符
pub const PATH_SEPARATOR: char = std::path::MAIN_SEPARATOR;

/// 返回最后一个分隔符之后的部分；没有分隔符时返回整个字符串
pub fn basename(path: &str) -> &str {
    match path.rfind(PATH_SEPARATOR) {
        Some(pos) => &path[pos + PATH_SEPARATOR.len_utf8()..],
        None => path,
    }
}

/// 拆分为带结尾分隔符的非空组件；空输入得到空序列
pub fn components(path: &str) -> Vec<&str> {
    path.split_inclusive(PATH_SEPARATOR).collect()
}

/// 两个序列开头按值相等的元素个数
pub fn common_prefix_len<T: PartialEq>(x: &[T], y: &[T]) -> usize {
    x.iter().zip(y.iter()).take_while(|(a, b)| a == b).count()
}

/// 两条已分解路径之间的距离：|X| + |Y| - 2 * 公共前缀长度
pub fn path_distance<T: PartialEq>(x: &[T], y: &[T]) -> usize {
    x.len() + y.len() - 2 * common_prefix_len(x, y)
}
