use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 任务ID类型
pub type TaskId = i64;

/// 事件日志时间戳类型（单调时钟，秒）
pub type LogTime = f64;

/// 测量采样原样保留，不做解释
pub type MeasureSample = Value;

/// 默认资源列表，在日志未声明资源时安装。
/// 最后一项是表示调度器自身决策时间线的伪资源。
pub const DEFAULT_RESOURCES: [&str; 4] = ["IntelXeon", "NvidiaTesla", "MaxelerVectis", "Scheduler"];

/// 资源名的单字符缩写，未知资源返回原名
pub fn resource_short_name(res: &str) -> &str {
    match res {
        "IntelXeon" => "C",
        "NvidiaTesla" => "G",
        "MaxelerVectis" => "F",
        other => other,
    }
}

/// 一个可调度的工作单元，由NEWTASK记录创建。
///
/// 通过TASK_START以未知id出现的任务会先创建占位实例，
/// 此时除id和parts以外的字段为空。
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub name: Option<String>,
    pub size: Option<u64>,
    /// 到达时间（来自NEWTASK记录的时间戳）
    pub arrival: Option<LogTime>,
    /// 进度粒度：任务总检查点数
    pub checkpoints: Option<u32>,
    /// 声明的依赖任务id
    pub dependencies: Vec<TaskId>,
    /// 按时间顺序排列的执行区间
    pub parts: Vec<TaskPart>,
    /// ENDTASK记录的最终状态
    pub state: Option<String>,
    /// ENDTASK记录的生命周期时间
    pub times: Option<TaskTimes>,
    /// TASK_FINISHED的时间戳
    pub finish: Option<LogTime>,
    /// 原始NEWTASK记录
    pub defined: Option<Value>,
    /// 原始ENDTASK记录
    pub ended: Option<Value>,
}

impl Task {
    /// 创建只有id的占位任务
    pub fn placeholder(id: TaskId) -> Self {
        Self {
            id,
            name: None,
            size: None,
            arrival: None,
            checkpoints: None,
            dependencies: Vec::new(),
            parts: Vec::new(),
            state: None,
            times: None,
            finish: None,
            defined: None,
            ended: None,
        }
    }
}

/// 任务在一个资源上的一段连续占用
#[derive(Debug, Clone, Serialize)]
pub struct TaskPart {
    /// 资源名
    pub res: String,
    /// 资源名缩写
    pub res_short: String,
    pub start: LogTime,
    pub stop: Option<LogTime>,
    /// 起始进度，由上一个区间的结束进度延续而来
    pub start_progress: u32,
    /// 结束进度（暂停时上报，完成时强制为检查点总数）
    pub progress: Option<u32>,
    /// 原始TASK_START记录
    pub start_record: Value,
    /// 原始TASK_SUSPENDED/TASK_FINISHED记录
    pub stop_record: Option<Value>,
}

/// 任务包装进程上报的生命周期时间（纳秒计数）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskTimes {
    pub added: i64,
    pub started: i64,
    pub finished: i64,
    pub aborted: i64,
}

/// 一次调度决策快照，原样追加，从不修改
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    /// 记录时间戳
    pub time: Option<LogTime>,
    /// 完整的SCHEDULE记录
    pub raw: Value,
}

impl Schedule {
    /// 调度算法计算耗时（纳秒）
    pub fn compute_duration(&self) -> Option<f64> {
        self.raw
            .get("schedule")
            .and_then(|s| s.get("compute_duration"))
            .and_then(Value::as_f64)
    }
}

/// 本次运行激活的调度策略及其参数
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmRun {
    pub name: String,
    /// 原始ALGORITHM记录
    pub raw: Value,
    /// 按到达顺序合并的ALGORITHM_PARAM记录
    pub parameters: Vec<Value>,
}

/// 一次调度算法调用的起止区间
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AlgoInvocation {
    pub start: LogTime,
    pub stop: Option<LogTime>,
}

/// 通过依赖关系连通的极大任务集合
#[derive(Debug, Clone, Serialize)]
pub struct Application {
    /// 成员任务id，升序排列
    pub tids: Vec<TaskId>,
}

impl Application {
    pub fn min_task_id(&self) -> Option<TaskId> {
        self.tids.first().copied()
    }
}

/// SCHEDULER_START/SCHEDULER_STOP记录的时间字段
#[derive(Debug, Clone, Serialize)]
pub struct RunMarker {
    /// 单调时钟时间戳
    pub time: Option<LogTime>,
    /// 墙钟时间戳（仿真日志）
    pub walltime: Option<LogTime>,
    /// 墙钟时间字符串 "sec.nsec"（仅SCHEDULER_START）
    pub realtime: Option<String>,
    pub raw: Value,
}

/// 一次实验运行重建出的完整模型（聚合根）。
///
/// 构建完成后不再修改，可被任意数量的消费者并发只读访问。
#[derive(Debug, Clone, Serialize)]
pub struct EventLog {
    /// 有序资源名列表
    pub resources: Vec<String>,
    /// 按id索引的任务表
    pub tasks: BTreeMap<TaskId, Task>,
    /// 按流顺序的调度决策
    pub schedules: Vec<Schedule>,
    /// 激活的调度策略
    pub algorithm: Option<AlgorithmRun>,
    /// 算法调用起止区间
    pub invocations: Vec<AlgoInvocation>,
    /// 依赖连通分量
    pub apps: Vec<Application>,
    /// 按流顺序的测量采样
    pub measurements: Vec<MeasureSample>,
    /// 所有观测到的区间起点中最早的一个
    pub min_start: Option<LogTime>,
    /// 所有观测到的区间终点中最晚的一个
    pub max_stop: Option<LogTime>,
    /// 每个资源上最后一次区间结束时间
    pub res_stop: HashMap<String, LogTime>,
    pub run_start: Option<RunMarker>,
    pub run_stop: Option<RunMarker>,
    /// 成功解码的行数（无论事件类型是否被识别）
    pub decoded_events: usize,
    /// 解码失败的行数
    pub decode_failures: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            tasks: BTreeMap::new(),
            schedules: Vec::new(),
            algorithm: None,
            invocations: Vec::new(),
            apps: Vec::new(),
            measurements: Vec::new(),
            min_start: None,
            max_stop: None,
            res_stop: HashMap::new(),
            run_start: None,
            run_stop: None,
            decoded_events: 0,
            decode_failures: 0,
        }
    }

    /// 返回任务所属应用在apps中的下标，未知任务返回None
    pub fn app_index_of(&self, task_id: TaskId) -> Option<usize> {
        self.apps.iter().position(|a| a.tids.contains(&task_id))
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// 一个被外部包装的进程上报的生命周期
#[derive(Debug, Clone, Serialize)]
pub struct WrapApp {
    /// 包装进程承载的任务id
    pub tasks: Vec<TaskId>,
    pub name: Option<String>,
    pub size: Option<u64>,
    /// 进程退出码
    pub status: Option<i32>,
    pub signaled: Option<i32>,
    pub signaled_signal: Option<i32>,
    /// 关联的任务结束记录（存在时拷贝以下字段）
    pub id: Option<TaskId>,
    pub added: Option<i64>,
    pub started: Option<i64>,
    pub finished: Option<i64>,
    pub aborted: Option<i64>,
    pub state: Option<String>,
}

/// 包装进程日志的重建结果
#[derive(Debug, Clone, Serialize)]
pub struct WrapLog {
    /// 按流顺序的WrapApp记录，逐条对应，不做合并
    pub apps: Vec<WrapApp>,
    pub decoded_events: usize,
    pub decode_failures: usize,
}
