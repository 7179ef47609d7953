//! 扫描选项与统计信息（模块）
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::layout::{RecordLayout, DEFAULT_DB_PATH, DEFAULT_RECORD_COUNT};

/// 记录总数 N 的确定方式
/// - Fixed：固定数目，数据不足即报错（默认，等于完整数据库大小）
/// - FromHeader：读取头记录中的 total 字段
/// - FromFileSize：按文件长度推算，末尾不足一条的字节忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCount {
    Fixed(u64),
    FromHeader,
    FromFileSize,
}

impl Default for RecordCount {
    fn default() -> Self {
        RecordCount::Fixed(DEFAULT_RECORD_COUNT)
    }
}

impl FromStr for RecordCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(RecordCount::FromHeader),
            "file-size" | "auto" => Ok(RecordCount::FromFileSize),
            _ => s
                .replace('_', "")
                .parse::<u64>()
                .map(RecordCount::Fixed)
                .map_err(|_| format!("expected a record count, \"header\" or \"file-size\", got {:?}", s)),
        }
    }
}

/// 输出格式
/// - Text：每行一个十进制下标
/// - Json：流式 JSON 数组
/// - Index：每个下标 4 字节大端 u32（bbchallenge 索引文件格式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Index,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "index" => Ok(OutputFormat::Index),
            other => Err(format!("unknown output format {:?}", other)),
        }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 数据库文件路径
    pub db_path: PathBuf,
    /// 记录几何形状（大小、步长、采样数）
    pub layout: RecordLayout,
    /// 记录总数策略
    pub records: RecordCount,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    pub format: OutputFormat,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            layout: RecordLayout::default(),
            records: RecordCount::default(),
            threads: Some(1),
            format: OutputFormat::Text,
        }
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub records_scanned: u64,
    pub matches_written: u64,
}
