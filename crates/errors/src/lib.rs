use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedlogError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("解码错误: 第{line}行无法解析: {message}")]
    Decode { line: usize, message: String },
    #[error("引用错误: 第{line}行引用了未知任务 {task_id}")]
    UnknownTask { task_id: i64, line: usize },
    #[error("引用错误: 任务 {task_id} 在第{line}行没有未关闭的执行区间")]
    NoOpenPart { task_id: i64, line: usize },
    #[error("引用错误: 第{line}行的算法停止事件没有对应的未关闭调用")]
    NoOpenInvocation { line: usize },
    #[error("查询错误: 未知统计项: {name}")]
    UnknownStatistic { name: String },
    #[error("查询错误: 统计项 {name} 在当前日志中不可用")]
    StatisticUnavailable { name: String },
    #[error("日志格式错误: {0}")]
    Format(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SchedlogResult<T> = Result<T, SchedlogError>;

impl SchedlogError {
    pub fn decode_error<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Decode {
            line,
            message: message.into(),
        }
    }
    pub fn unknown_task(task_id: i64, line: usize) -> Self {
        Self::UnknownTask { task_id, line }
    }
    pub fn no_open_part(task_id: i64, line: usize) -> Self {
        Self::NoOpenPart { task_id, line }
    }
    pub fn no_open_invocation(line: usize) -> Self {
        Self::NoOpenInvocation { line }
    }
    pub fn unknown_statistic<S: Into<String>>(name: S) -> Self {
        Self::UnknownStatistic { name: name.into() }
    }
    pub fn statistic_unavailable<S: Into<String>>(name: S) -> Self {
        Self::StatisticUnavailable { name: name.into() }
    }
    pub fn format_error<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 致命错误会中止当前一次重建，非致命错误允许处理继续
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SchedlogError::Decode { .. }
                | SchedlogError::UnknownStatistic { .. }
                | SchedlogError::StatisticUnavailable { .. }
        )
    }

    /// 查询类错误返回显式的"不可用"结果而不是默认值
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            SchedlogError::UnknownStatistic { .. } | SchedlogError::StatisticUnavailable { .. }
        )
    }
}

impl From<serde_json::Error> for SchedlogError {
    fn from(err: serde_json::Error) -> Self {
        SchedlogError::Serialization(err.to_string())
    }
}
