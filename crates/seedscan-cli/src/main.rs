use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use seedscan_core::{
    load_config, parse_threads, read_header, scan_and_write, OutputFormat, RecordCount, ScanOptions, SeedHeader,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "seedscan", version, about = "bbchallenge 种子数据库扫描：列出转移表完整的机器下标")]
struct Cli {
    /// 不带子命令时等同于 `scan`（全部使用默认值）
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描数据库，输出匹配记录的下标
    Scan(ScanArgs),
    /// 打印数据库头记录
    Info(InfoArgs),
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// 数据库文件（默认 ../all_5_states_undecided_machines_with_global_header）
    #[arg(long)]
    db: Option<PathBuf>,

    /// 输出文件；缺省写到标准输出
    #[arg(long)]
    output: Option<PathBuf>,

    /// 输出格式：text、json 或 index（大端 u32）
    #[arg(long)]
    format: Option<OutputFormat>,

    /// 记录数：整数、"header"（读头记录）或 "file-size"（按文件长度推算）
    #[arg(long)]
    records: Option<RecordCount>,

    /// 线程数（"auto"=CPU 核心数；默认 1，即串行）
    #[arg(long)]
    threads: Option<String>,

    /// 配置文件路径（TOML）
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// 数据库文件
    #[arg(long)]
    db: Option<PathBuf>,

    /// 以 JSON 输出
    #[arg(long)]
    json: bool,

    /// 配置文件路径（TOML），用于读取路径与记录大小
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Scan(ScanArgs::default())) {
        Commands::Scan(args) => run_scan(args),
        Commands::Info(args) => run_info(args),
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let opts = build_options(args.config.as_ref(), args.db, |opts| {
        if let Some(f) = args.format { opts.format = f; }
        if let Some(r) = args.records { opts.records = r; }
        if let Some(t) = &args.threads {
            opts.threads = parse_threads(t).map_err(|e| anyhow!(e))?;
        }
        Ok(())
    })?;
    info!(db = ?opts.db_path, output = ?args.output, format = ?opts.format, "starting scan");

    // 以缓冲方式打开输出；标准输出只承载结果，日志走标准错误
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("create output file {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    let res = scan_and_write(&mut out, &opts);
    // 出错时也冲刷已写出的匹配
    let flushed = out.flush();
    let stats = res.context("scan failed")?;
    flushed.context("flush output")?;

    info!(records_scanned = stats.records_scanned, matches_written = stats.matches_written, "scan finished");
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let opts = build_options(args.config.as_ref(), args.db, |_| Ok(()))?;
    let header = read_header(&opts.db_path, &opts.layout)
        .with_context(|| format!("read header of {}", opts.db_path.display()))?;
    let file_len = std::fs::metadata(&opts.db_path).context("stat database")?.len();
    let record_size = opts.layout.record_size as u64;
    let records_in_file = file_len.saturating_sub(record_size) / record_size;

    if args.json {
        let item = serde_json::json!({
            "path": opts.db_path,
            "header": header,
            "consistent": header.is_consistent(),
            "file_len": file_len,
            "records_in_file": records_in_file,
        });
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        for line in info_lines(&opts.db_path, &header, records_in_file) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// `info` 的文本输出：标签左对齐，值从同一列开始
fn info_lines(path: &std::path::Path, header: &SeedHeader, records_in_file: u64) -> Vec<String> {
    let rows = [
        ("path:", path.display().to_string()),
        ("undecided (time):", header.undecided_time.to_string()),
        ("undecided (space):", header.undecided_space.to_string()),
        ("total:", header.total.to_string()),
        ("sorted:", header.sorted.to_string()),
        ("consistent:", header.is_consistent().to_string()),
        ("records in file:", records_in_file.to_string()),
    ];
    rows.iter().map(|(label, value)| format!("{:<19}{}", label, value)).collect()
}

/// 组装扫描参数：内置默认值 < 配置文件 < 命令行
fn build_options(
    config: Option<&PathBuf>,
    db: Option<PathBuf>,
    overrides: impl FnOnce(&mut ScanOptions) -> Result<()>,
) -> Result<ScanOptions> {
    let mut opts = ScanOptions::default();
    if let Some(path) = config {
        let cfg = load_config(path).with_context(|| format!("load config {}", path.display()))?;
        cfg.apply_to(&mut opts);
    }
    if let Some(db) = db { opts.db_path = db; }
    overrides(&mut opts)?;
    Ok(opts)
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_default_scan() {
        let cli = Cli::try_parse_from(["seedscan"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn scan_flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "seedscan", "scan", "--db", "x.bin", "--records", "header", "--format", "index", "--threads", "auto",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Scan(args)) => {
                assert_eq!(args.db, Some(PathBuf::from("x.bin")));
                assert_eq!(args.records, Some(RecordCount::FromHeader));
                assert_eq!(args.format, Some(OutputFormat::Index));
                assert_eq!(args.threads.as_deref(), Some("auto"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn bad_record_count_is_rejected_by_clap() {
        assert!(Cli::try_parse_from(["seedscan", "scan", "--records", "many"]).is_err());
    }

    #[test]
    fn info_values_start_in_one_column() {
        let header = SeedHeader { undecided_time: 1, undecided_space: 2, total: 3, sorted: true };
        let lines = info_lines(std::path::Path::new("db"), &header, 3);
        assert_eq!(lines[2], "undecided (space): 2");
        assert!(lines.iter().all(|l| l.len() > 19 && l.as_bytes()[18] == b' ' && l.as_bytes()[19] != b' '));
    }

    #[test]
    fn command_line_overrides_defaults() {
        let opts = build_options(None, Some(PathBuf::from("db")), |o| {
            o.threads = None;
            Ok(())
        })
        .unwrap();
        assert_eq!(opts.db_path, PathBuf::from("db"));
        assert_eq!(opts.threads, None);
        assert_eq!(opts.records, RecordCount::default());
    }
}
