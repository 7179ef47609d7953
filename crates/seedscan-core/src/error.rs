//! 错误类型（对外暴露）
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 扫描过程中的所有错误；均为致命错误，不做恢复
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("cannot stat {path}: {source}")]
    Metadata { path: PathBuf, source: io::Error },

    #[error("failed to read header record: {0}")]
    Header(#[source] io::Error),

    #[error("failed to read record {index}: {source}")]
    Record { index: u64, source: io::Error },

    #[error("invalid record layout: {0}")]
    Layout(String),

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("record index {0} does not fit in a u32 index file")]
    IndexOverflow(u64),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl ScanError {
    /// 失败处的记录下标（仅记录读取错误）
    pub fn record_index(&self) -> Option<u64> {
        match self {
            ScanError::Record { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
