//! 匹配选项、统计信息与配置文件加载（模块）
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::batch::BATCH_SIZE_BYTES;
use crate::error::{MatchError, Result};
use crate::path_util::basename;

/// 匹配范围（作用于候选文本的子串变换）
/// - FullLine：整行参与匹配
/// - FilenameOnly：只匹配最后一个分隔符之后的部分
/// - FirstNonTab：只匹配第一个制表符之前的部分
/// - UntilLastTab：只匹配最后一个制表符之前的部分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    #[default]
    FullLine,
    FilenameOnly,
    FirstNonTab,
    UntilLastTab,
}

/// 作用域变换后的子串，以及它在原文中的字节起点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoped<'t> {
    pub text: &'t str,
    pub byte_offset: usize,
}

impl<'t> Scoped<'t> {
    /// 子串起点在原文中的字符偏移（高亮位置以字符计）
    pub fn char_offset(&self, full: &str) -> usize {
        full[..self.byte_offset].chars().count()
    }
}

impl MatchMode {
    pub fn apply(self, text: &str) -> Scoped<'_> {
        match self {
            MatchMode::FullLine => Scoped { text, byte_offset: 0 },
            MatchMode::FilenameOnly => {
                let name = basename(text);
                Scoped { text: name, byte_offset: text.len() - name.len() }
            }
            MatchMode::FirstNonTab => {
                let end = text.find('\t').unwrap_or(text.len());
                Scoped { text: &text[..end], byte_offset: 0 }
            }
            MatchMode::UntilLastTab => {
                let end = text.rfind('\t').unwrap_or(text.len());
                Scoped { text: &text[..end], byte_offset: 0 }
            }
        }
    }
}

impl FromStr for MatchMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "full-line" => Ok(MatchMode::FullLine),
            "filename-only" => Ok(MatchMode::FilenameOnly),
            "first-non-tab" => Ok(MatchMode::FirstNonTab),
            "until-last-tab" => Ok(MatchMode::UntilLastTab),
            other => Err(MatchError::Config(format!("unknown match mode '{other}'"))),
        }
    }
}

/// 高亮模式
/// - None：不做高亮
/// - Basic：一条模式覆盖首个到最后一个命中字符
/// - Detailed：每段连续命中字符各一条模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    #[default]
    None,
    Basic,
    Detailed,
}

impl FromStr for HighlightMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(HighlightMode::None),
            "basic" => Ok(HighlightMode::Basic),
            "detailed" => Ok(HighlightMode::Detailed),
            other => Err(MatchError::Config(format!("unknown highlight mode '{other}'"))),
        }
    }
}

/// 匹配选项（可由 TOML 配置文件提供，命令行参数覆盖）
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    /// 最多返回条数；0 表示不限
    pub limit: usize,
    /// 最大 worker 数；0 表示使用全部 CPU 核
    pub max_threads: usize,
    /// 匹配范围
    pub match_mode: MatchMode,
    /// 高亮模式
    pub highlight_mode: HighlightMode,
    /// 高亮位置是否换算到整行（否则相对作用域子串）；重匹配总是针对作用域子串
    pub highlight_scoped: bool,
    /// 候选是否为路径（影响打分与当前文件处理）
    pub is_path: bool,
    /// 当前文件路径，用于路径距离打分
    pub cur_file: String,
    /// 是否允许当前文件本身命中
    pub match_crfile: bool,
    /// 查询反转分隔符（单个字符）：按其切分查询后逆序拼接
    pub query_inverting_delimiter: Option<String>,
    /// 每批取数的字节数
    pub batch_size_bytes: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            max_threads: 0,
            match_mode: MatchMode::FullLine,
            highlight_mode: HighlightMode::None,
            highlight_scoped: true,
            is_path: true,
            cur_file: String::new(),
            match_crfile: false,
            query_inverting_delimiter: None,
            batch_size_bytes: BATCH_SIZE_BYTES,
        }
    }
}

impl MatchOptions {
    /// 从 TOML 文件加载；缺省字段取默认值，未知字段报错
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&txt)
    }

    pub fn from_toml_str(txt: &str) -> Result<Self> {
        toml::from_str(txt).map_err(|e| MatchError::Config(format!("parse config: {e}")))
    }

    /// 启动 worker 前的一致性检查
    pub fn validate(&self) -> Result<()> {
        if self.batch_size_bytes == 0 {
            return Err(MatchError::Config("batch_size_bytes must be positive".into()));
        }
        if let Some(delim) = &self.query_inverting_delimiter {
            if delim.chars().count() > 1 {
                return Err(MatchError::Config(
                    "query inverting delimiter must be a single character".into(),
                ));
            }
        }
        Ok(())
    }
}

/// 匹配统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, Serialize)]
pub struct MatchStats {
    pub threads: usize,
    pub candidates_seen: usize,
    pub matched: usize,
    pub returned: usize,
}
