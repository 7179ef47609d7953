//! 定长记录扫描器（顺序读取 + 区间读取）
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, ScanError};
use crate::header::SeedHeader;
use crate::layout::RecordLayout;
use crate::options::RecordCount;

/// 读缓冲大小（字节）
pub(crate) const READ_BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4 MiB

/// 顺序扫描器：跳过头记录后逐条读取，惰性产出匹配记录的下标
///
/// 读取失败（含数据不足一条记录）时产出一次 `Err`，之后迭代结束。
/// 文件句柄随扫描器一起释放。
pub struct RecordScanner {
    reader: BufReader<File>,
    layout: RecordLayout,
    header: Vec<u8>,
    total: u64,
    available: u64,
    next: u64,
    buf: Vec<u8>,
    done: bool,
}

impl RecordScanner {
    /// 打开文件、读取头记录并确定记录总数
    pub fn open(path: &Path, layout: RecordLayout, count: RecordCount) -> Result<Self> {
        layout.validate()?;
        let file = File::open(path).map_err(|source| ScanError::Open { path: path.to_path_buf(), source })?;
        let file_len = file
            .metadata()
            .map_err(|source| ScanError::Metadata { path: path.to_path_buf(), source })?
            .len();

        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        let mut header = vec![0u8; layout.record_size];
        reader.read_exact(&mut header).map_err(ScanError::Header)?;

        let total = resolve_record_count(count, &header, file_len, &layout)?;
        debug!(?path, file_len, total, "record stream opened");

        Ok(Self {
            reader,
            layout,
            header,
            total,
            available: file_len.saturating_sub(layout.record_size as u64) / layout.record_size as u64,
            next: 0,
            buf: vec![0u8; layout.record_size],
            done: false,
        })
    }

    /// 头记录原始字节（不参与匹配）
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn seed_header(&self) -> Result<SeedHeader> {
        SeedHeader::parse(self.header())
    }

    /// 本次扫描计划读取的记录数 N
    pub fn records_total(&self) -> u64 {
        self.total
    }

    /// 打开时文件中完整记录的条数（不含头记录）
    pub fn records_available(&self) -> u64 {
        self.available
    }

    /// 已完整读取的记录数
    pub fn records_read(&self) -> u64 {
        self.next
    }
}

impl Iterator for RecordScanner {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while self.next < self.total {
            let index = self.next;
            if let Err(source) = self.reader.read_exact(&mut self.buf) {
                self.done = true;
                return Some(Err(ScanError::Record { index, source }));
            }
            self.next += 1;
            if self.layout.matches(&self.buf) {
                return Some(Ok(index));
            }
        }
        self.done = true;
        None
    }
}

impl std::iter::FusedIterator for RecordScanner {}

/// 按策略确定 N；文件长度只用于提示，不做预先拒绝
pub(crate) fn resolve_record_count(count: RecordCount, header: &[u8], file_len: u64, layout: &RecordLayout) -> Result<u64> {
    let rs = layout.record_size as u64;
    let body_len = file_len.saturating_sub(rs);
    let total = match count {
        RecordCount::Fixed(n) => n,
        RecordCount::FromHeader => u64::from(SeedHeader::parse(header)?.total),
        RecordCount::FromFileSize => {
            let rem = body_len % rs;
            if rem != 0 {
                warn!(trailing_bytes = rem, "file ends with a partial record; ignoring it");
            }
            return Ok(body_len / rs);
        }
    };

    let expected = layout.file_len_for(total);
    if file_len > expected {
        warn!(file_len, expected, "file is larger than header + {} records; trailing bytes ignored", total);
    } else if file_len < expected {
        warn!(
            file_len,
            expected,
            available = body_len / rs,
            "file is shorter than header + {} records; scan will stop at the first short read",
            total
        );
    }
    Ok(total)
}

/// 区间扫描结果：出错前找到的匹配仍然保留
#[derive(Debug, Default)]
pub struct RangeScan {
    pub matches: Vec<u64>,
    pub records_read: u64,
    pub error: Option<ScanError>,
}

/// 扫描记录区间 `[start, end)`（下标不含头记录）；供并行调度使用
///
/// 每次调用独立打开文件句柄，定位到 `(start + 1) * record_size`。
pub fn scan_range(path: &Path, layout: &RecordLayout, start: u64, end: u64) -> RangeScan {
    let mut out = RangeScan::default();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(source) => {
            out.error = Some(ScanError::Open { path: path.to_path_buf(), source });
            return out;
        }
    };
    let capacity = READ_BUFFER_SIZE.min(layout.record_size.saturating_mul((end - start) as usize).max(1));
    let mut reader = BufReader::with_capacity(capacity, file);
    let offset = (start + 1) * layout.record_size as u64;
    if let Err(source) = reader.seek(SeekFrom::Start(offset)) {
        out.error = Some(ScanError::Record { index: start, source });
        return out;
    }

    let mut buf = vec![0u8; layout.record_size];
    for index in start..end {
        if let Err(source) = reader.read_exact(&mut buf) {
            out.error = Some(ScanError::Record { index, source });
            break;
        }
        out.records_read += 1;
        if layout.matches(&buf) {
            out.matches.push(index);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_db(records: &[[u8; 30]], tail: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&[0u8; 30]).unwrap();
        for r in records {
            f.write_all(r).unwrap();
        }
        f.write_all(tail).unwrap();
        f.flush().unwrap();
        f
    }

    fn full() -> [u8; 30] {
        [7u8; 30]
    }

    #[test]
    fn iterator_yields_matches_then_stops() {
        let mut hole = full();
        hole[9] = 0;
        let f = write_db(&[full(), hole, full()], &[]);
        let scanner = RecordScanner::open(f.path(), RecordLayout::default(), RecordCount::Fixed(3)).unwrap();
        let got: Vec<u64> = scanner.map(|r| r.unwrap()).collect();
        assert_eq!(got, vec![0, 2]);
    }

    #[test]
    fn error_is_yielded_once_and_iterator_is_fused() {
        let f = write_db(&[full()], &[1u8; 10]);
        let mut scanner = RecordScanner::open(f.path(), RecordLayout::default(), RecordCount::Fixed(5)).unwrap();
        assert_eq!(scanner.next().unwrap().unwrap(), 0);
        let err = scanner.next().unwrap().unwrap_err();
        assert_eq!(err.record_index(), Some(1));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
        assert_eq!(scanner.records_read(), 1);
    }

    #[test]
    fn count_from_file_size_ignores_partial_tail() {
        let f = write_db(&[full(), full()], &[1u8; 29]);
        let scanner = RecordScanner::open(f.path(), RecordLayout::default(), RecordCount::FromFileSize).unwrap();
        assert_eq!(scanner.records_total(), 2);
        assert_eq!(scanner.records_available(), 2);
        assert_eq!(scanner.header(), &[0u8; 30][..]);
        assert_eq!(scanner.count(), 2);
    }

    #[test]
    fn count_from_header_uses_total_field() {
        let mut header = [0u8; 30];
        header[8..12].copy_from_slice(&1u32.to_be_bytes());
        assert_eq!(
            resolve_record_count(RecordCount::FromHeader, &header, 90, &RecordLayout::default()).unwrap(),
            1
        );
    }

    #[test]
    fn range_scan_keeps_matches_before_short_read() {
        let f = write_db(&[full(), full(), full()], &[3u8; 4]);
        let r = scan_range(f.path(), &RecordLayout::default(), 1, 5);
        assert_eq!(r.matches, vec![1, 2]);
        assert_eq!(r.records_read, 2);
        assert_eq!(r.error.unwrap().record_index(), Some(3));
    }

    #[test]
    fn range_scan_on_missing_file_reports_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = scan_range(&dir.path().join("missing"), &RecordLayout::default(), 0, 1);
        assert!(matches!(r.error, Some(ScanError::Open { .. })));
        assert!(r.matches.is_empty());
    }
}
