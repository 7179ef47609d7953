//! 配置文件加载（TOML）
//!
//! 示例：
//! ```toml
//! [database]
//! path = "../all_5_states_undecided_machines_with_global_header"
//!
//! [layout]
//! record_size = 30
//! sample_stride = 3
//! sample_count = 10
//!
//! [scan]
//! records = "header"   # 或整数，或 "file-size"
//! threads = 4          # 或 "auto"
//! format = "text"
//! ```
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};
use crate::options::{OutputFormat, RecordCount, ScanOptions};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutSection {
    #[serde(default)]
    record_size: Option<usize>,
    #[serde(default)]
    sample_stride: Option<usize>,
    #[serde(default)]
    sample_count: Option<usize>,
}

/// 整数或字符串（"header" / "file-size" / "auto"）
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrWord {
    Number(u64),
    Word(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    #[serde(default)]
    records: Option<NumberOrWord>,
    #[serde(default)]
    threads: Option<NumberOrWord>,
    #[serde(default)]
    format: Option<OutputFormat>,
}

/// 顶层配置文件结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    layout: LayoutSection,
    #[serde(default)]
    scan: ScanSection,
}

/// 归一化后的配置；未出现的项为 None，由调用方决定默认值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanConfig {
    pub db_path: Option<PathBuf>,
    pub record_size: Option<usize>,
    pub sample_stride: Option<usize>,
    pub sample_count: Option<usize>,
    pub records: Option<RecordCount>,
    /// Some(None) 表示 "auto"
    pub threads: Option<Option<usize>>,
    pub format: Option<OutputFormat>,
}

impl ScanConfig {
    /// 将配置项覆盖到 `opts` 上（配置文件优先于内置默认值）
    pub fn apply_to(&self, opts: &mut ScanOptions) {
        if let Some(p) = &self.db_path { opts.db_path = p.clone(); }
        if let Some(v) = self.record_size { opts.layout.record_size = v; }
        if let Some(v) = self.sample_stride { opts.layout.sample_stride = v; }
        if let Some(v) = self.sample_count { opts.layout.sample_count = v; }
        if let Some(v) = self.records { opts.records = v; }
        if let Some(v) = self.threads { opts.threads = v; }
        if let Some(v) = self.format { opts.format = v; }
    }
}

/// 解析线程参数："auto" 表示自动（等于 CPU 核数）；其他为 ≥1 的整数
pub fn parse_threads(s: &str) -> std::result::Result<Option<usize>, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(format!("expected a positive thread count or \"auto\", got {:?}", s)),
    }
}

/// 从 TOML 字符串解析配置；`path` 仅用于错误信息
pub fn parse_config(txt: &str, path: &Path) -> Result<ScanConfig> {
    let config_err = |message: String| ScanError::Config { path: path.to_path_buf(), message };
    let parsed: ConfigFile = toml::from_str(txt).map_err(|e| config_err(e.to_string()))?;

    let records = match parsed.scan.records {
        None => None,
        Some(NumberOrWord::Number(n)) => Some(RecordCount::Fixed(n)),
        Some(NumberOrWord::Word(w)) => Some(w.parse::<RecordCount>().map_err(config_err)?),
    };
    let threads = match parsed.scan.threads {
        None => None,
        Some(NumberOrWord::Number(0)) => return Err(config_err("threads must be at least 1".into())),
        Some(NumberOrWord::Number(n)) => Some(Some(n as usize)),
        Some(NumberOrWord::Word(w)) => Some(parse_threads(&w).map_err(config_err)?),
    };

    Ok(ScanConfig {
        db_path: parsed.database.path,
        record_size: parsed.layout.record_size,
        sample_stride: parsed.layout.sample_stride,
        sample_count: parsed.layout.sample_count,
        records,
        threads,
        format: parsed.scan.format,
    })
}

/// 从 TOML 文件加载配置
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let txt = std::fs::read_to_string(path).map_err(|source| ScanError::Open { path: path.to_path_buf(), source })?;
    parse_config(&txt, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RecordLayout;

    fn parse(txt: &str) -> Result<ScanConfig> {
        parse_config(txt, Path::new("test.toml"))
    }

    #[test]
    fn empty_config_changes_nothing() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, ScanConfig::default());
        let mut opts = ScanOptions::default();
        cfg.apply_to(&mut opts);
        assert_eq!(opts.layout, RecordLayout::default());
    }

    #[test]
    fn full_config_is_applied() {
        let cfg = parse(
            r#"
            [database]
            path = "db.bin"
            [layout]
            record_size = 12
            sample_stride = 4
            sample_count = 3
            [scan]
            records = "header"
            threads = "auto"
            format = "index"
            "#,
        )
        .unwrap();
        let mut opts = ScanOptions::default();
        cfg.apply_to(&mut opts);
        assert_eq!(opts.db_path, PathBuf::from("db.bin"));
        assert_eq!(opts.layout, RecordLayout { record_size: 12, sample_stride: 4, sample_count: 3 });
        assert_eq!(opts.records, RecordCount::FromHeader);
        assert_eq!(opts.threads, None);
        assert_eq!(opts.format, OutputFormat::Index);
    }

    #[test]
    fn numeric_records_and_threads() {
        let cfg = parse("[scan]\nrecords = 1000\nthreads = 2\n").unwrap();
        assert_eq!(cfg.records, Some(RecordCount::Fixed(1000)));
        assert_eq!(cfg.threads, Some(Some(2)));
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(parse("[scan]\nthreads = 0\n"), Err(ScanError::Config { .. })));
        assert!(matches!(parse("[scan]\nrecords = \"lots\"\n"), Err(ScanError::Config { .. })));
        assert!(matches!(parse("[scan]\nformat = \"csv\"\n"), Err(ScanError::Config { .. })));
        assert!(matches!(parse("[extra]\nx = 1\n"), Err(ScanError::Config { .. })));
    }

    #[test]
    fn example_config_matches_defaults() {
        let cfg = parse(include_str!("../../../config/seedscan.example.toml")).unwrap();
        let mut opts = ScanOptions::default();
        cfg.apply_to(&mut opts);
        let defaults = ScanOptions::default();
        assert_eq!(opts.db_path, defaults.db_path);
        assert_eq!(opts.layout, defaults.layout);
        assert_eq!(opts.records, defaults.records);
        assert_eq!(opts.threads, defaults.threads);
        assert_eq!(opts.format, defaults.format);
    }

    #[test]
    fn thread_argument_parsing() {
        assert_eq!(parse_threads("auto"), Ok(None));
        assert_eq!(parse_threads("AUTO"), Ok(None));
        assert_eq!(parse_threads("3"), Ok(Some(3)));
        assert!(parse_threads("0").is_err());
        assert!(parse_threads("x").is_err());
    }
}
