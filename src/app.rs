use anyhow::{Context, Result};
use tracing::{info, warn};

use schedlog_domain::{EventLog, Statistic};
use schedlog_replay::{wrap, EventLogBuilder};

/// 查询事件日志的一个命名统计项并打印结果
pub fn run_stat(logfile: &str, metric: &str) -> Result<()> {
    let log = EventLogBuilder::load_path(logfile)
        .with_context(|| format!("重建事件日志失败: {logfile}"))?;
    report_decode_failures(&log);
    let value = log
        .stat_by_name(metric)
        .with_context(|| format!("查询统计项失败: {metric}"))?;
    println!("{value}");
    Ok(())
}

/// 重建事件日志并打印模型概要
pub fn run_summary(logfile: &str) -> Result<()> {
    let log = EventLogBuilder::load_path(logfile)
        .with_context(|| format!("重建事件日志失败: {logfile}"))?;
    report_decode_failures(&log);

    println!("resources: {}", log.resources.join(", "));
    if let Some(algorithm) = &log.algorithm {
        println!(
            "algorithm: {} ({} parameters)",
            algorithm.name,
            algorithm.parameters.len()
        );
    }
    println!("tasks: {}", log.tasks.len());
    for task in log.tasks.values() {
        let name = task.name.as_deref().unwrap_or("?");
        let parts: Vec<String> = task
            .parts
            .iter()
            .map(|p| format!("{}[{}-{:?}]", p.res_short, p.start, p.stop))
            .collect();
        println!("  #{} {} parts: {}", task.id, name, parts.join(" "));
    }
    println!("applications: {}", log.apps.len());
    for (ix, application) in log.apps.iter().enumerate() {
        let tids: Vec<String> = application.tids.iter().map(|t| t.to_string()).collect();
        println!("  app {}: {{{}}}", ix, tids.join(", "));
    }
    println!("schedules: {}", log.schedules.len());
    println!("measurements: {}", log.measurements.len());

    for statistic in Statistic::ALL {
        match log.stat(statistic) {
            Ok(value) => println!("{}: {}", statistic.name(), value),
            Err(err) => println!("{}: {}", statistic.name(), err),
        }
    }
    if let Some(start) = log.start_time() {
        println!("started: {start}");
    }
    Ok(())
}

/// 重建包装进程日志并打印应用列表
pub fn run_wrap(logfile: &str) -> Result<()> {
    let log =
        wrap::load_path(logfile).with_context(|| format!("重建包装日志失败: {logfile}"))?;
    if log.decode_failures > 0 {
        warn!("包装日志中有{}行解码失败", log.decode_failures);
    }

    info!("包装日志包含{}个应用", log.apps.len());
    for (ix, app) in log.apps.iter().enumerate() {
        let name = app.name.as_deref().unwrap_or("?");
        let tasks: Vec<String> = app.tasks.iter().map(|t| t.to_string()).collect();
        let state = app.state.as_deref().unwrap_or("-");
        println!(
            "#{} {} size={:?} status={:?} signaled={:?} tasks=[{}] state={}",
            ix,
            name,
            app.size,
            app.status,
            app.signaled,
            tasks.join(", "),
            state
        );
    }
    Ok(())
}

fn report_decode_failures(log: &EventLog) {
    if log.decode_failures > 0 {
        warn!(
            "{}行解码失败，已跳过（成功解码{}行）",
            log.decode_failures, log.decoded_events
        );
    }
}
