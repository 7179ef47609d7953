//! 扫描主流程与并行调度
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::options::{ScanOptions, ScanStats};
use crate::output::MatchWriter;
use crate::scanner::{scan_range, RangeScan, RecordScanner};

/// 并行模式下每个任务负责的记录数
pub(crate) const CHUNK_RECORDS: u64 = 1 << 20;

/// 扫描数据库并将匹配下标按升序写入 `out`
///
/// 稳定性保证：串行与并行两条路径输出完全一致。
/// 出错时已写出的匹配保留在 `out` 中，随后返回错误。
pub fn scan_and_write(out: &mut dyn Write, opts: &ScanOptions) -> Result<ScanStats> {
    // 串行与并行都先打开一次：校验布局、读取头记录、确定 N
    let scanner = RecordScanner::open(&opts.db_path, opts.layout, opts.records)?;
    let total = scanner.records_total();

    let threads = opts.threads.unwrap_or_else(num_cpus::get);
    let use_parallel = threads > 1 && total > CHUNK_RECORDS;
    info!(db = ?opts.db_path, records = total, threads = if use_parallel { threads } else { 1 }, "scanning");

    let mut writer = MatchWriter::new(out, opts.format);
    writer.begin()?;

    let stats = if use_parallel {
        // 只规划文件实际可读的范围；多出的一条用于在首个缺失记录处报错，与串行一致
        let planned = total.min(scanner.records_available().saturating_add(1));
        drop(scanner);
        scan_parallel(&mut writer, opts, planned, threads)?
    } else {
        scan_serial(&mut writer, scanner)?
    };

    writer.finish()?;
    Ok(stats)
}

/// 串行路径：逐条读取，命中即写
fn scan_serial(writer: &mut MatchWriter<'_>, mut scanner: RecordScanner) -> Result<ScanStats> {
    for item in scanner.by_ref() {
        let index = item?;
        writer.write(index)?;
    }
    Ok(ScanStats { records_scanned: scanner.records_read(), matches_written: writer.written() })
}

/// 并行调度：
/// - 将 `[0, N)` 切分为定长区间，在 Rayon 线程池中各自打开文件扫描
/// - 单线程 Writer 按区间序号重排并流式写出，保证与串行一致的顺序
/// - 轮到的区间带有错误时，先写出其已找到的匹配，再返回错误
/// - `stop_after` 记录已知出错的最小区间序号，序号更大的区间不再启动；
///   序号更小的区间总会被扫描并发送，因此 writer 不会漏掉前缀
fn scan_parallel(writer: &mut MatchWriter<'_>, opts: &ScanOptions, total: u64, threads: usize) -> Result<ScanStats> {
    use crossbeam_channel as channel;
    use rayon::prelude::*;
    use std::collections::BTreeMap;

    let chunks: Vec<(usize, u64, u64)> = (0..total)
        .step_by(CHUNK_RECORDS as usize)
        .enumerate()
        .map(|(idx, start)| (idx, start, start.saturating_add(CHUNK_RECORDS).min(total)))
        .collect();
    debug!(chunks = chunks.len(), "parallel scan plan");

    let (tx, rx) = channel::bounded::<(usize, RangeScan)>(threads * 2);
    let stop_after = Arc::new(AtomicUsize::new(usize::MAX));

    let path = opts.db_path.clone();
    let layout = opts.layout;
    let worker_stop = Arc::clone(&stop_after);
    let scan_thread = std::thread::spawn(move || -> std::result::Result<(), rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        pool.install(|| {
            chunks.par_iter().for_each(|&(idx, start, end)| {
                if idx > worker_stop.load(Ordering::Relaxed) {
                    return;
                }
                let res = scan_range(&path, &layout, start, end);
                if res.error.is_some() {
                    worker_stop.fetch_min(idx, Ordering::Relaxed);
                }
                // 接收端已关闭说明 writer 提前退出
                let _ = tx.send((idx, res));
            });
        });
        Ok(())
    });

    // Writer：维护 next_idx 与缓存，按序输出
    let mut stats = ScanStats::default();
    let mut next_idx: usize = 0;
    let mut buffer: BTreeMap<usize, RangeScan> = BTreeMap::new();
    let mut failure: Option<ScanError> = None;

    'recv: while let Ok((idx, res)) = rx.recv() {
        buffer.insert(idx, res);
        while let Some(res) = buffer.remove(&next_idx) {
            stats.records_scanned += res.records_read;
            if let Err(e) = writer.write_all(&res.matches) {
                failure = Some(e);
                break 'recv;
            }
            if let Some(e) = res.error {
                failure = Some(e);
                break 'recv;
            }
            next_idx += 1;
        }
    }

    // writer 已退出：剩余区间全部跳过
    stop_after.store(0, Ordering::Relaxed);
    drop(rx);
    match scan_thread.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(ScanError::Output(std::io::Error::new(std::io::ErrorKind::Other, e)));
        }
        Err(_) => {
            return Err(ScanError::Output(std::io::Error::new(std::io::ErrorKind::Other, "scan thread panicked")));
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    stats.matches_written = writer.written();
    Ok(stats)
}
