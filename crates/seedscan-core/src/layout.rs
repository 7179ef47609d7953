//! 记录布局与匹配谓词
//!
//! 种子数据库中每条记录是一台 5 状态 2 符号图灵机，共 10 个转移，每个转移 3 字节。
//! 谓词只看每个转移的首字节：全部非零即视为“描述完整”。

use crate::error::{Result, ScanError};

/// 单条记录大小（字节）
pub const RECORD_SIZE: usize = 30;
/// 采样步长（字节）
pub const SAMPLE_STRIDE: usize = 3;
/// 采样位置个数
pub const SAMPLE_COUNT: usize = 10;
/// 头记录之后的记录总数（完整种子数据库）
pub const DEFAULT_RECORD_COUNT: u64 = 88_664_064;
/// 默认数据库路径（相对当前目录）
pub const DEFAULT_DB_PATH: &str = "../all_5_states_undecided_machines_with_global_header";

/// 定长记录的几何形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub record_size: usize,
    pub sample_stride: usize,
    pub sample_count: usize,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            record_size: RECORD_SIZE,
            sample_stride: SAMPLE_STRIDE,
            sample_count: SAMPLE_COUNT,
        }
    }
}

impl RecordLayout {
    /// 校验：所有采样位置都必须落在记录内部
    pub fn validate(&self) -> Result<()> {
        if self.record_size == 0 {
            return Err(ScanError::Layout("record_size must be positive".into()));
        }
        if self.sample_count == 0 || self.sample_stride == 0 {
            return Err(ScanError::Layout("sample_count and sample_stride must be positive".into()));
        }
        let last = (self.sample_count - 1)
            .checked_mul(self.sample_stride)
            .ok_or_else(|| ScanError::Layout("sample offsets overflow".into()))?;
        if last >= self.record_size {
            return Err(ScanError::Layout(format!(
                "last sampled offset {} is outside a {}-byte record",
                last, self.record_size
            )));
        }
        Ok(())
    }

    /// 采样偏移：0, K, 2K, ...
    pub fn sample_offsets(&self) -> impl Iterator<Item = usize> {
        let stride = self.sample_stride;
        (0..self.sample_count).map(move |j| j * stride)
    }

    /// 所有采样字节均非零则匹配；遇到第一个零字节即停止
    ///
    /// 采样位置超出 `record` 长度时视为不匹配。
    #[inline]
    pub fn matches(&self, record: &[u8]) -> bool {
        debug_assert_eq!(record.len(), self.record_size);
        self.sample_offsets().all(|off| matches!(record.get(off), Some(&b) if b != 0))
    }

    /// 头记录 + `records` 条记录所需的总字节数
    pub fn file_len_for(&self, records: u64) -> u64 {
        (self.record_size as u64).saturating_mul(records.saturating_add(1))
    }
}
