//! 事件日志统计查询
//!
//! 对构建完成的EventLog进行命名的派生查询。未知的统计项名
//! 返回显式错误，已知但无法观测的值返回"不可用"错误，
//! 从不返回0或空值冒充成功。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use schedlog_errors::{SchedlogError, SchedlogResult};

use crate::entities::{EventLog, RunMarker};

/// 可查询的统计项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// 最早区间起点到最晚区间终点的间隔
    Makespan,
    /// 最早观测到的区间起点
    MinTime,
    /// 最晚观测到的区间终点
    MaxTime,
    /// 成功解码的行数
    Events,
    /// 运行起止标记之间的单调时钟间隔
    Length,
    /// 运行起止标记之间的间隔，优先使用墙钟字段
    RealLength,
}

impl Statistic {
    pub const ALL: [Statistic; 6] = [
        Statistic::Makespan,
        Statistic::MinTime,
        Statistic::MaxTime,
        Statistic::Events,
        Statistic::Length,
        Statistic::RealLength,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Makespan => "makespan",
            Statistic::MinTime => "mintime",
            Statistic::MaxTime => "maxtime",
            Statistic::Events => "events",
            Statistic::Length => "length",
            Statistic::RealLength => "real_length",
        }
    }
}

impl FromStr for Statistic {
    type Err = SchedlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "makespan" => Ok(Statistic::Makespan),
            "mintime" => Ok(Statistic::MinTime),
            "maxtime" => Ok(Statistic::MaxTime),
            "events" => Ok(Statistic::Events),
            "length" => Ok(Statistic::Length),
            "real_length" => Ok(Statistic::RealLength),
            other => Err(SchedlogError::unknown_statistic(other)),
        }
    }
}

/// 统计查询结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    /// 以秒计的时间量
    Seconds(f64),
    /// 计数
    Count(usize),
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Seconds(s) => *s,
            StatValue::Count(c) => *c as f64,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Seconds(s) => write!(f, "{s}"),
            StatValue::Count(c) => write!(f, "{c}"),
        }
    }
}

impl EventLog {
    /// 查询一个命名统计项
    pub fn stat(&self, statistic: Statistic) -> SchedlogResult<StatValue> {
        let unavailable = || SchedlogError::statistic_unavailable(statistic.name());
        match statistic {
            Statistic::Makespan => match (self.min_start, self.max_stop) {
                (Some(min), Some(max)) => Ok(StatValue::Seconds(max - min)),
                _ => Err(unavailable()),
            },
            Statistic::MinTime => self
                .min_start
                .map(StatValue::Seconds)
                .ok_or_else(unavailable),
            Statistic::MaxTime => self
                .max_stop
                .map(StatValue::Seconds)
                .ok_or_else(unavailable),
            Statistic::Events => Ok(StatValue::Count(self.decoded_events)),
            Statistic::Length => self.length().map(StatValue::Seconds).ok_or_else(unavailable),
            Statistic::RealLength => self
                .real_length()
                .map(StatValue::Seconds)
                .ok_or_else(unavailable),
        }
    }

    /// 按名字查询统计项，未知名字返回显式错误
    pub fn stat_by_name(&self, name: &str) -> SchedlogResult<StatValue> {
        self.stat(name.parse()?)
    }

    /// 运行起止标记之间的单调时钟间隔
    pub fn length(&self) -> Option<f64> {
        let (start, stop) = self.run_bracket()?;
        Some(stop.time? - start.time?)
    }

    /// 运行起止标记之间的间隔，两端都有墙钟字段时优先使用
    pub fn real_length(&self) -> Option<f64> {
        let (start, stop) = self.run_bracket()?;
        if let (Some(ws), Some(we)) = (start.walltime, stop.walltime) {
            return Some(we - ws);
        }
        Some(stop.time? - start.time?)
    }

    /// 运行开始的墙钟时间，由SCHEDULER_START的realtime字段解析
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        let realtime = self.run_start.as_ref()?.realtime.as_deref()?;
        parse_realtime(realtime)
    }

    /// 运行结束的墙钟时间（开始时间加运行长度）
    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        let start = self.start_time()?;
        let length = self.length()?;
        let nanos = (length * 1e9).round() as i64;
        start.checked_add_signed(Duration::nanoseconds(nanos))
    }

    fn run_bracket(&self) -> Option<(&RunMarker, &RunMarker)> {
        Some((self.run_start.as_ref()?, self.run_stop.as_ref()?))
    }
}

/// 解析"sec.nsec"形式的墙钟时间字符串
fn parse_realtime(realtime: &str) -> Option<DateTime<Utc>> {
    let (secs, nsecs) = match realtime.split_once('.') {
        Some((s, n)) => (s.parse::<i64>().ok()?, n.parse::<u32>().ok()?),
        None => (realtime.parse::<i64>().ok()?, 0),
    };
    DateTime::from_timestamp(secs, nsecs)
}
