//! 包装进程日志构建器
//!
//! 针对第二类记录流的独立重建：每条WRAPAPP记录一比一映射为
//! 一个WrapApp，按流顺序追加，不做跨记录合并。与事件日志构建器
//! 只共享解码器的逐行容错策略；顶层IO失败产生显式的构建失败，
//! 而不是部分结果。

use std::io::BufRead;
use std::path::Path;

use schedlog_domain::{Record, WrapApp, WrapAppRecord, WrapLog};
use schedlog_errors::SchedlogResult;

use crate::decoder::{self, DecodedStream};

/// 从文件构建包装日志
pub fn load_path<P: AsRef<Path>>(path: P) -> SchedlogResult<WrapLog> {
    Ok(build(decoder::decode_path(path)?))
}

/// 从reader构建包装日志
pub fn load_reader<R: BufRead>(reader: R) -> SchedlogResult<WrapLog> {
    Ok(build(decoder::decode_reader(reader)?))
}

fn build(stream: DecodedStream) -> WrapLog {
    let mut log = WrapLog {
        apps: Vec::new(),
        decoded_events: stream.decoded_events(),
        decode_failures: stream.failure_count(),
    };
    for line in stream.lines {
        if let Some(Record::WrapApp(record)) = line.record {
            log.apps.push(wrap_app_from(record));
        }
    }
    log
}

fn wrap_app_from(record: WrapAppRecord) -> WrapApp {
    let mut app = WrapApp {
        tasks: record.tasks,
        name: record.name,
        size: record.size,
        status: record.status,
        signaled: record.signaled,
        signaled_signal: record.signaled_signal,
        id: None,
        added: None,
        started: None,
        finished: None,
        aborted: None,
        state: None,
    };
    // 关联的任务结束子记录存在时拷贝其时间与状态；
    // 没有承载任务的包装进程写出空的endtask对象
    if let Some(endtask) = record.endtask {
        if let Some(id) = endtask.id {
            app.id = Some(id);
            if let Some(times) = endtask.times {
                app.added = Some(times.added);
                app.started = Some(times.started);
                app.finished = Some(times.finished);
                app.aborted = Some(times.aborted);
            }
            app.state = endtask.state;
        }
    }
    app
}
