//! 匹配下标的流式写出（text / json / index）
use std::io::Write;

use crate::error::{Result, ScanError};
use crate::options::OutputFormat;

/// 按格式把匹配下标写入 `out`
///
/// 使用顺序：`begin` → 多次 `write` → `finish`。扫描中途出错时不调用 `finish`，
/// 已写出的内容保持原样（JSON 数组因此不闭合）。
pub struct MatchWriter<'a> {
    out: &'a mut dyn Write,
    format: OutputFormat,
    first: bool,
    written: u64,
}

impl<'a> MatchWriter<'a> {
    pub fn new(out: &'a mut dyn Write, format: OutputFormat) -> Self {
        Self { out, format, first: true, written: 0 }
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            write!(self.out, "[")?;
        }
        Ok(())
    }

    pub fn write(&mut self, index: u64) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", index)?,
            OutputFormat::Json => {
                if !self.first { write!(self.out, ",")?; }
                serde_json::to_writer(&mut *self.out, &index).map_err(std::io::Error::from)?;
            }
            OutputFormat::Index => {
                let v = u32::try_from(index).map_err(|_| ScanError::IndexOverflow(index))?;
                self.out.write_all(&v.to_be_bytes())?;
            }
        }
        self.first = false;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, indices: &[u64]) -> Result<()> {
        for &i in indices {
            self.write(i)?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            write!(self.out, "]")?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
