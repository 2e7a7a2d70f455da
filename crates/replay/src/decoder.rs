//! 行级记录解码器
//!
//! 把原始文本行逐行独立解码为结构化记录：空行静默跳过；
//! 无法解析的行计为解码失败并丢弃（不中止构建）；解析成功的
//! 行按原始顺序输出，不重排、不缓冲、不去重。写入端仍在活动时
//! 被截断的末尾行不会影响之前各行的解码。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use schedlog_domain::Record;
use schedlog_errors::{SchedlogError, SchedlogResult};

/// 一行成功解码的结果
#[derive(Debug, Clone)]
pub struct DecodedLine {
    /// 1起始的行号，用于错误上下文
    pub lineno: usize,
    /// 这一行的原始JSON值
    pub raw: Value,
    /// 按事件类型判别式解码出的记录；
    /// 缺少判别式的行为None，由构建器忽略
    pub record: Option<Record>,
}

/// 一次完整解码的输出
#[derive(Debug, Default)]
pub struct DecodedStream {
    /// 按流顺序排列的成功解码行
    pub lines: Vec<DecodedLine>,
    /// 逐行解码失败，仅用于诊断
    pub failures: Vec<SchedlogError>,
}

impl DecodedStream {
    /// 成功解码的行数（无论事件类型是否被识别）
    pub fn decoded_events(&self) -> usize {
        self.lines.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// 从reader逐行解码。IO错误立即返回，不做内部重试。
pub fn decode_reader<R: BufRead>(reader: R) -> SchedlogResult<DecodedStream> {
    let mut stream = DecodedStream::default();

    for (ix, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = ix + 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(raw) => {
                let record = match Record::deserialize(&raw) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        // 缺少判别式或已识别类型缺少必要字段：
                        // 该行计入事件数但不参与模型构建
                        debug!("第{}行不构成可处理的事件记录: {}", lineno, err);
                        None
                    }
                };
                stream.lines.push(DecodedLine { lineno, raw, record });
            }
            Err(err) => {
                warn!("第{}行解码失败，已跳过: {}", lineno, err);
                stream
                    .failures
                    .push(SchedlogError::decode_error(lineno, err.to_string()));
            }
        }
    }

    Ok(stream)
}

/// 打开文件并解码全部行
pub fn decode_path<P: AsRef<Path>>(path: P) -> SchedlogResult<DecodedStream> {
    let file = File::open(path)?;
    decode_reader(BufReader::new(file))
}
