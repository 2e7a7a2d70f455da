//! 事件日志记录类型
//!
//! 每行日志携带一个"event"字符串字段作为判别式，解码为带标签的
//! 枚举后按变体穷尽分发。日志器为每行加上单调时钟前缀
//! `{"time":"SEC.NSEC",...}`，仿真日志使用"walltime"前缀，
//! 因此时间字段可能是字符串也可能是数字。

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::entities::{LogTime, TaskId, TaskTimes};

/// 一行事件日志解码出的结构化记录
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum Record {
    /// 运行开始标记，重置所有累积状态
    #[serde(rename = "SCHEDULER_START")]
    SchedulerStart {
        #[serde(default, deserialize_with = "de_opt_time")]
        time: Option<LogTime>,
        #[serde(default, deserialize_with = "de_opt_time")]
        walltime: Option<LogTime>,
        #[serde(default)]
        realtime: Option<String>,
    },
    /// 运行结束标记
    #[serde(rename = "SCHEDULER_STOP")]
    SchedulerStop {
        #[serde(default, deserialize_with = "de_opt_time")]
        time: Option<LogTime>,
        #[serde(default, deserialize_with = "de_opt_time")]
        walltime: Option<LogTime>,
    },
    /// 调度策略选择
    #[serde(rename = "ALGORITHM")]
    Algorithm { algorithm: String },
    /// 调度策略参数，在一轮结束时按到达顺序合并
    #[serde(rename = "ALGORITHM_PARAM")]
    AlgorithmParam {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        value: Option<Value>,
    },
    /// 资源声明
    #[serde(rename = "RESOURCES")]
    Resources { resources: Vec<String> },
    /// 任务定义
    #[serde(rename = "NEWTASK")]
    NewTask {
        id: TaskId,
        #[serde(default)]
        dep: Vec<TaskId>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        size: Option<u64>,
        #[serde(default)]
        checkpoints: Option<u32>,
        #[serde(default, alias = "walltime", deserialize_with = "de_opt_time")]
        time: Option<LogTime>,
    },
    /// 任务结束，附带最终状态和生命周期时间
    #[serde(rename = "ENDTASK")]
    EndTask {
        id: TaskId,
        #[serde(default)]
        times: Option<TaskTimes>,
        #[serde(default)]
        state: Option<String>,
    },
    /// 任务在某资源上开始执行
    #[serde(rename = "TASK_START")]
    TaskStart {
        id: TaskId,
        res: String,
        #[serde(alias = "walltime", deserialize_with = "de_time")]
        time: LogTime,
    },
    /// 执行开始的确认，不要求修改状态
    #[serde(rename = "TASK_STARTED")]
    TaskStarted {
        id: TaskId,
        #[serde(default)]
        res: Option<String>,
    },
    /// 任务被暂停，关闭当前区间
    #[serde(rename = "TASK_SUSPENDED")]
    TaskSuspended {
        id: TaskId,
        #[serde(alias = "walltime", deserialize_with = "de_time")]
        time: LogTime,
        #[serde(default)]
        progress: Option<u32>,
    },
    /// 任务完成，关闭当前区间并终结任务
    #[serde(rename = "TASK_FINISHED")]
    TaskFinished {
        id: TaskId,
        #[serde(alias = "walltime", deserialize_with = "de_time")]
        time: LogTime,
    },
    /// 调度算法调用开始
    #[serde(rename = "COMPUTER_ALGOSTART")]
    AlgoStart {
        #[serde(alias = "walltime", deserialize_with = "de_time")]
        time: LogTime,
    },
    /// 调度算法调用结束，关闭最近一个未关闭的调用
    #[serde(rename = "COMPUTER_ALGOSTOP")]
    AlgoStop {
        #[serde(alias = "walltime", deserialize_with = "de_time")]
        time: LogTime,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// 调度决策快照，原样追加
    #[serde(rename = "SCHEDULE")]
    Schedule {
        #[serde(default, alias = "walltime", deserialize_with = "de_opt_time")]
        time: Option<LogTime>,
    },
    /// 测量采样，原样追加
    #[serde(rename = "MEASURE")]
    Measure,
    /// 包装进程生命周期记录（仅出现在包装日志中）
    #[serde(rename = "WRAPAPP")]
    WrapApp(WrapAppRecord),
    /// 其余已知但无需修改模型的事件类型
    #[serde(other)]
    Unhandled,
}

/// WRAPAPP记录的载荷
#[derive(Debug, Clone, Deserialize)]
pub struct WrapAppRecord {
    #[serde(default)]
    pub tasks: Vec<TaskId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub signaled: Option<i32>,
    #[serde(default)]
    pub signaled_signal: Option<i32>,
    #[serde(default)]
    pub endtask: Option<EndTaskCorrelation>,
}

/// WRAPAPP中关联的任务结束子记录。
/// 没有承载任务时日志器写出空对象`{}`，所有字段均为空。
#[derive(Debug, Clone, Deserialize)]
pub struct EndTaskCorrelation {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub times: Option<TaskTimes>,
    #[serde(default)]
    pub state: Option<String>,
}

/// 接受字符串或数字形式的时间戳
fn de_time<'de, D>(deserializer: D) -> Result<LogTime, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_time(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("无法将时间字段解析为数值: {value}"))
    })
}

fn de_opt_time<'de, D>(deserializer: D) -> Result<Option<LogTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    coerce_time(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("无法将时间字段解析为数值: {value}")))
}

fn coerce_time(value: &Value) -> Option<LogTime> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
