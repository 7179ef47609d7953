//! 全局头记录解析
//!
//! 头记录与普通记录等长（30 字节），前 13 字节有意义：
//! - [0..4)   因时间上限未判定的机器数（u32 大端）
//! - [4..8)   因空间上限未判定的机器数（u32 大端）
//! - [8..12)  机器总数（u32 大端）
//! - [12]     非零表示记录按字典序排列
//!
//! 扫描本身从不解析头记录；只有 `info` 命令与 `RecordCount::FromHeader` 会用到。
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, ScanError};
use crate::layout::RecordLayout;

/// 头记录中有意义的字节数
pub const HEADER_FIELDS_LEN: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedHeader {
    pub undecided_time: u32,
    pub undecided_space: u32,
    pub total: u32,
    pub sorted: bool,
}

impl SeedHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_FIELDS_LEN {
            return Err(ScanError::Header(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("header needs {} bytes, got {}", HEADER_FIELDS_LEN, bytes.len()),
            )));
        }
        let be = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Ok(Self {
            undecided_time: be(0),
            undecided_space: be(4),
            total: be(8),
            sorted: bytes[12] != 0,
        })
    }

    /// 时间 + 空间两类计数是否与总数一致
    pub fn is_consistent(&self) -> bool {
        u64::from(self.undecided_time) + u64::from(self.undecided_space) == u64::from(self.total)
    }
}

/// 只读取头记录（不扫描记录体）
pub fn read_header(path: &Path, layout: &RecordLayout) -> Result<SeedHeader> {
    layout.validate()?;
    let file = File::open(path).map_err(|source| ScanError::Open { path: path.to_path_buf(), source })?;
    let mut reader = BufReader::new(file);
    let mut buf = vec![0u8; layout.record_size];
    reader.read_exact(&mut buf).map_err(ScanError::Header)?;
    SeedHeader::parse(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut h = vec![0u8; 30];
        h[0..4].copy_from_slice(&14_322_029u32.to_be_bytes());
        h[4..8].copy_from_slice(&74_342_035u32.to_be_bytes());
        h[8..12].copy_from_slice(&88_664_064u32.to_be_bytes());
        h[12] = 1;
        h
    }

    #[test]
    fn parses_seed_database_header() {
        let h = SeedHeader::parse(&sample_header()).unwrap();
        assert_eq!(h.undecided_time, 14_322_029);
        assert_eq!(h.undecided_space, 74_342_035);
        assert_eq!(h.total, 88_664_064);
        assert!(h.sorted);
        assert!(h.is_consistent());
    }

    #[test]
    fn short_header_is_an_error() {
        let err = SeedHeader::parse(&[0u8; 5]).unwrap_err();
        assert!(matches!(err, ScanError::Header(_)));
    }

    #[test]
    fn all_zero_header_is_consistent_and_unsorted() {
        let h = SeedHeader::parse(&[0u8; 30]).unwrap();
        assert_eq!(h.total, 0);
        assert!(!h.sorted);
        assert!(h.is_consistent());
    }
}
