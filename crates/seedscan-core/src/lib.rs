//! bbchallenge 种子数据库扫描库
//!
//! 设计要点：
//! - 数据库是“头记录 + N 条定长记录”的扁平文件，单次顺序扫描即可。
//! - 谓词只看每条记录中固定步长的采样字节，全部非零即匹配。
//! - 输出严格按下标升序；并行模式通过按区间重排保持同样的顺序。
//! - 任何 I/O 错误都是致命的，已写出的匹配不回滚。

mod config;
mod error;
mod header;
mod layout;
mod options;
mod output;
mod scan;
mod scanner;

pub use config::{load_config, parse_config, parse_threads, ScanConfig};
pub use error::{Result, ScanError};
pub use header::{read_header, SeedHeader};
pub use layout::{RecordLayout, DEFAULT_DB_PATH, DEFAULT_RECORD_COUNT, RECORD_SIZE, SAMPLE_COUNT, SAMPLE_STRIDE};
pub use options::{OutputFormat, RecordCount, ScanOptions, ScanStats};
pub use output::MatchWriter;
pub use scan::scan_and_write;
pub use scanner::{scan_range, RangeScan, RecordScanner};
