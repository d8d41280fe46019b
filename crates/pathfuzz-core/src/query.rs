//! 查询预处理
use crate::error::{MatchError, Result};

/// 按反转分隔符切分查询，逆序拼接（去掉分隔符本身）
/// - 例如 `"foo bar"` + `' '` → `"barfoo"`，便于先输入文件名再输入目录
/// - 分隔符为空时原样返回；多于一个字符时报配置错误
pub fn prepare_query(query: &str, inverting_delimiter: Option<&str>) -> Result<String> {
    let delim = match inverting_delimiter {
        None | Some("") => return Ok(query.to_string()),
        Some(d) => d,
    };
    let mut chars = delim.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(MatchError::Config(
            "query inverting delimiter must be a single character".into(),
        ));
    };
    Ok(query.split(ch).rev().collect())
}
