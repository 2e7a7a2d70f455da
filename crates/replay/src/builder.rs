//! 事件日志模型构建器
//!
//! 严格按流顺序消费解码后的记录，按事件类型分发并修改聚合模型。
//! SCHEDULER_START重置全部累积状态，因此只有流中最后一次运行
//! 开始之后的记录才会进入最终模型。每个输入流各自构建一个独立的
//! 构建器值，构建期间独占可变状态，互不共享。

use std::io::BufRead;
use std::mem;
use std::path::Path;

use tracing::debug;

use schedlog_domain::{
    resource_short_name, AlgoInvocation, AlgorithmRun, ApplicationService, EventLog, Record,
    RunMarker, Schedule, Task, TaskPart,
};
use schedlog_errors::{SchedlogError, SchedlogResult};

use crate::decoder::{self, DecodedLine, DecodedStream};

/// 每个输入流构建一次的事件日志构建器
#[derive(Debug, Default)]
pub struct EventLogBuilder {
    log: EventLog,
    /// 等待在一轮结束时合并进算法记录的参数
    pending_params: Vec<serde_json::Value>,
}

impl EventLogBuilder {
    pub fn new() -> Self {
        Self {
            log: EventLog::new(),
            pending_params: Vec::new(),
        }
    }

    /// 从文件构建完整模型
    pub fn load_path<P: AsRef<Path>>(path: P) -> SchedlogResult<EventLog> {
        Self::build(decoder::decode_path(path)?)
    }

    /// 从reader构建完整模型
    pub fn load_reader<R: BufRead>(reader: R) -> SchedlogResult<EventLog> {
        Self::build(decoder::decode_reader(reader)?)
    }

    /// 消费一次解码输出，构建完整模型
    pub fn build(stream: DecodedStream) -> SchedlogResult<EventLog> {
        let mut builder = Self::new();
        builder.log.decoded_events = stream.decoded_events();
        builder.log.decode_failures = stream.failure_count();
        for line in stream.lines {
            builder.apply(line)?;
        }
        Ok(builder.finish())
    }

    /// 运行开始标记：丢弃此前累积的全部状态。
    /// 已捕获的起止标记由后续捕获覆盖，不在此清除。
    fn reset(&mut self) {
        let log = &mut self.log;
        log.resources.clear();
        log.tasks.clear();
        log.schedules.clear();
        log.algorithm = None;
        log.invocations.clear();
        log.apps.clear();
        log.measurements.clear();
        log.min_start = None;
        log.max_stop = None;
        log.res_stop.clear();
        self.pending_params.clear();
    }

    /// 处理一行解码记录；缺少判别式或未识别类型的行被忽略
    pub fn apply(&mut self, line: DecodedLine) -> SchedlogResult<()> {
        let DecodedLine { lineno, raw, record } = line;
        let Some(record) = record else {
            return Ok(());
        };

        match record {
            Record::SchedulerStart { time, walltime, realtime } => {
                self.reset();
                self.log.run_start = Some(RunMarker { time, walltime, realtime, raw });
            }
            Record::SchedulerStop { time, walltime } => {
                self.log.run_stop = Some(RunMarker {
                    time,
                    walltime,
                    realtime: None,
                    raw,
                });
            }
            Record::Algorithm { algorithm } => {
                self.log.algorithm = Some(AlgorithmRun {
                    name: algorithm,
                    raw,
                    parameters: Vec::new(),
                });
            }
            Record::AlgorithmParam { .. } => {
                self.pending_params.push(raw);
            }
            Record::Resources { resources } => {
                self.log.resources = resources;
            }
            Record::NewTask { id, dep, name, size, checkpoints, time } => {
                // 同id重复定义时后写覆盖，不做字段合并
                let task = Task {
                    id,
                    name,
                    size,
                    arrival: time,
                    checkpoints,
                    dependencies: dep,
                    parts: Vec::new(),
                    state: None,
                    times: None,
                    finish: None,
                    defined: Some(raw),
                    ended: None,
                };
                self.log.tasks.insert(id, task);
            }
            Record::EndTask { id, times, state } => match self.log.tasks.get_mut(&id) {
                Some(task) => {
                    task.times = times;
                    task.state = state;
                    task.ended = Some(raw);
                }
                None => {
                    debug!("第{}行的ENDTASK引用未知任务 {}，忽略", lineno, id);
                }
            },
            Record::TaskStart { id, res, time } => {
                let task = self
                    .log
                    .tasks
                    .entry(id)
                    .or_insert_with(|| Task::placeholder(id));
                if !task.lifecycle().accepts_new_part() {
                    // 运行中的重复TASK_START是补发的状态更新；
                    // 已完成的任务不再打开新区间
                    debug!("第{}行的TASK_START对任务 {} 重复或过时，抑制", lineno, id);
                    return Ok(());
                }
                let part = TaskPart {
                    res_short: resource_short_name(&res).to_string(),
                    res,
                    start: time,
                    stop: None,
                    start_progress: task.next_start_progress(),
                    progress: None,
                    start_record: raw,
                    stop_record: None,
                };
                task.parts.push(part);
                if self.log.min_start.map_or(true, |min| time < min) {
                    self.log.min_start = Some(time);
                }
            }
            Record::TaskStarted { id, .. } => {
                // 确认消息，不要求修改状态
                debug!("第{}行: 任务 {} 开始执行确认", lineno, id);
            }
            Record::TaskSuspended { id, time, progress } => {
                let task = self
                    .log
                    .tasks
                    .get_mut(&id)
                    .ok_or_else(|| SchedlogError::unknown_task(id, lineno))?;
                let part = match task.parts.last_mut() {
                    Some(part) if part.stop.is_none() => part,
                    _ => return Err(SchedlogError::no_open_part(id, lineno)),
                };
                part.stop = Some(time);
                part.progress = Some(progress.unwrap_or(0));
                part.stop_record = Some(raw);
                if self.log.max_stop.map_or(true, |max| time > max) {
                    self.log.max_stop = Some(time);
                }
            }
            Record::TaskFinished { id, time } => {
                let task = self
                    .log
                    .tasks
                    .get_mut(&id)
                    .ok_or_else(|| SchedlogError::unknown_task(id, lineno))?;
                let checkpoints = task.checkpoints;
                let part = match task.parts.last_mut() {
                    Some(part) if part.stop.is_none() => part,
                    _ => return Err(SchedlogError::no_open_part(id, lineno)),
                };
                part.stop = Some(time);
                // 完成时进度强制为任务的检查点总数
                part.progress = checkpoints;
                part.stop_record = Some(raw);
                task.finish = Some(time);
                if self.log.max_stop.map_or(true, |max| time > max) {
                    self.log.max_stop = Some(time);
                }
            }
            Record::AlgoStart { time } => {
                self.log.invocations.push(AlgoInvocation {
                    start: time,
                    stop: None,
                });
                if self.log.min_start.map_or(true, |min| time < min) {
                    self.log.min_start = Some(time);
                }
            }
            Record::AlgoStop { time, .. } => {
                let open = self
                    .log
                    .invocations
                    .iter_mut()
                    .rev()
                    .find(|inv| inv.stop.is_none())
                    .ok_or_else(|| SchedlogError::no_open_invocation(lineno))?;
                open.stop = Some(time);
            }
            Record::Schedule { time } => {
                self.log.schedules.push(Schedule { time, raw });
            }
            Record::Measure => {
                self.log.measurements.push(raw);
            }
            Record::WrapApp(_) => {
                // 包装日志记录不属于实验事件日志
                debug!("第{}行的WRAPAPP记录在事件日志中被忽略", lineno);
            }
            Record::Unhandled => {}
        }
        Ok(())
    }

    /// 结束一轮构建：合并算法参数、计算每资源最后结束时间、
    /// 安装默认资源列表、对任务集合做应用划分
    pub fn finish(mut self) -> EventLog {
        let log = &mut self.log;

        if let Some(algorithm) = &mut log.algorithm {
            algorithm.parameters = mem::take(&mut self.pending_params);
        }

        for task in log.tasks.values() {
            for part in &task.parts {
                let entry = log.res_stop.entry(part.res.clone()).or_insert(0.0);
                if let Some(stop) = part.stop {
                    if stop > *entry {
                        *entry = stop;
                    }
                }
            }
        }

        if log.resources.is_empty() {
            log.resources = schedlog_domain::DEFAULT_RESOURCES
                .iter()
                .map(|r| r.to_string())
                .collect();
        }

        log.apps = ApplicationService::group(&log.tasks);

        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedlog_domain::{PartLifecycle, SchedlogError, Statistic, StatValue};
    use std::io::Cursor;

    fn build(lines: &[&str]) -> SchedlogResult<EventLog> {
        let input = lines.join("\n");
        EventLogBuilder::load_reader(Cursor::new(input))
    }

    #[test]
    fn test_single_task_lifecycle() {
        // 场景A：定义、启动、完成
        let log = build(&[
            r#"{"time":"0.5","event":"SCHEDULER_START","realtime":"1560000000.000000000"}"#,
            r#"{"time":"0.9","event":"NEWTASK","id":1,"dep":[],"name":"correlation","size":64,"checkpoints":4}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"3.0","event":"TASK_FINISHED","id":1}"#,
        ])
        .unwrap();

        assert_eq!(log.tasks.len(), 1);
        let task = &log.tasks[&1];
        assert_eq!(task.name.as_deref(), Some("correlation"));
        assert_eq!(task.checkpoints, Some(4));
        assert_eq!(task.parts.len(), 1);
        let part = &task.parts[0];
        assert_eq!(part.start, 1.0);
        assert_eq!(part.stop, Some(3.0));
        assert_eq!(part.progress, Some(4));
        assert_eq!(part.res_short, "C");
        assert_eq!(task.finish, Some(3.0));
        assert_eq!(task.lifecycle(), PartLifecycle::Finished);

        assert_eq!(log.min_start, Some(1.0));
        assert_eq!(log.max_stop, Some(3.0));
        assert_eq!(log.stat(Statistic::Makespan).unwrap(), StatValue::Seconds(2.0));
        assert_eq!(log.apps.len(), 1);
        assert_eq!(log.apps[0].tids, vec![1]);
    }

    #[test]
    fn test_duplicate_task_start_is_suppressed() {
        // 场景B：连续两个TASK_START只产生一个区间
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":2}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"1.5","event":"TASK_START","id":1,"res":"NvidiaTesla"}"#,
        ])
        .unwrap();
        let task = &log.tasks[&1];
        assert_eq!(task.parts.len(), 1);
        assert_eq!(task.parts[0].res, "IntelXeon");
    }

    #[test]
    fn test_run_start_resets_accumulated_state() {
        // 两个SCHEDULER_START：只有第二个之后的实体存活
        let log = build(&[
            r#"{"time":"0.1","event":"SCHEDULER_START","realtime":"1560000000.0"}"#,
            r#"{"time":"0.2","event":"RESOURCES","resources":["IntelXeon"]}"#,
            r#"{"time":"0.3","event":"NEWTASK","id":1,"dep":[],"name":"old","size":1,"checkpoints":1}"#,
            r#"{"time":"0.4","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"5.0","event":"SCHEDULER_START","realtime":"1560000100.0"}"#,
            r#"{"time":"5.1","event":"NEWTASK","id":2,"dep":[],"name":"new","size":1,"checkpoints":1}"#,
        ])
        .unwrap();

        assert!(!log.tasks.contains_key(&1));
        assert!(log.tasks.contains_key(&2));
        assert_eq!(log.min_start, None);
        // 重置也清掉了声明的资源，安装默认列表
        assert_eq!(log.resources.len(), 4);
        assert_eq!(log.resources[3], "Scheduler");
        assert_eq!(
            log.run_start.as_ref().unwrap().realtime.as_deref(),
            Some("1560000100.0")
        );
    }

    #[test]
    fn test_suspend_carries_progress_into_next_part() {
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":8}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"2.0","event":"TASK_SUSPENDED","id":1,"progress":3}"#,
            r#"{"time":"4.0","event":"TASK_START","id":1,"res":"NvidiaTesla"}"#,
            r#"{"time":"6.0","event":"TASK_FINISHED","id":1}"#,
        ])
        .unwrap();

        let task = &log.tasks[&1];
        assert_eq!(task.parts.len(), 2);
        assert_eq!(task.parts[0].progress, Some(3));
        assert_eq!(task.parts[1].start_progress, 3);
        assert_eq!(task.parts[1].progress, Some(8));
        // 区间按时间排列且互不重叠
        assert!(task.parts[0].stop.unwrap() <= task.parts[1].start);
    }

    #[test]
    fn test_suspend_without_progress_defaults_to_zero() {
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":8}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"2.0","event":"TASK_SUSPENDED","id":1}"#,
        ])
        .unwrap();
        assert_eq!(log.tasks[&1].parts[0].progress, Some(0));
    }

    #[test]
    fn test_task_start_for_unknown_id_creates_placeholder() {
        let log = build(&[
            r#"{"time":"1.0","event":"TASK_START","id":7,"res":"MaxelerVectis"}"#,
            r#"{"time":"2.0","event":"TASK_SUSPENDED","id":7,"progress":1}"#,
        ])
        .unwrap();
        let task = &log.tasks[&7];
        assert!(task.name.is_none());
        assert!(task.checkpoints.is_none());
        assert_eq!(task.parts.len(), 1);
        assert_eq!(task.parts[0].res_short, "F");
    }

    #[test]
    fn test_suspend_without_open_part_is_hard_error() {
        let err = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":1}"#,
            r#"{"time":"2.0","event":"TASK_SUSPENDED","id":1,"progress":1}"#,
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            SchedlogError::NoOpenPart { task_id: 1, line: 2 }
        ));
    }

    #[test]
    fn test_finish_for_unknown_task_is_hard_error() {
        let err = build(&[r#"{"time":"2.0","event":"TASK_FINISHED","id":9}"#]).unwrap_err();
        assert!(matches!(
            err,
            SchedlogError::UnknownTask { task_id: 9, line: 1 }
        ));
    }

    #[test]
    fn test_finished_task_never_reopens() {
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":2}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"2.0","event":"TASK_FINISHED","id":1}"#,
            r#"{"time":"3.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
        ])
        .unwrap();
        assert_eq!(log.tasks[&1].parts.len(), 1);
    }

    #[test]
    fn test_endtask_attaches_state_and_unknown_id_is_dropped() {
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":1}"#,
            r#"{"time":"2.0","event":"ENDTASK","id":1,"times":{"added":10,"started":20,"finished":30,"aborted":0},"state":"POST_END"}"#,
            r#"{"time":"2.1","event":"ENDTASK","id":42,"times":{"added":1,"started":2,"finished":3,"aborted":0},"state":"POST_END"}"#,
        ])
        .unwrap();
        let task = &log.tasks[&1];
        assert_eq!(task.state.as_deref(), Some("POST_END"));
        assert_eq!(task.times.unwrap().finished, 30);
        assert!(!log.tasks.contains_key(&42));
    }

    #[test]
    fn test_algorithm_params_merged_in_arrival_order() {
        let log = build(&[
            r#"{"time":"0.1","event":"ALGORITHM","algorithm":"MinMinMig2"}"#,
            r#"{"time":"0.2","event":"ALGORITHM_PARAM","name":"kpb_percentage","value":0.2}"#,
            r#"{"time":"0.3","event":"ALGORITHM_PARAM","name":"genetic_seed","value":42}"#,
        ])
        .unwrap();
        let algorithm = log.algorithm.as_ref().unwrap();
        assert_eq!(algorithm.name, "MinMinMig2");
        assert_eq!(algorithm.parameters.len(), 2);
        assert_eq!(algorithm.parameters[0]["name"], "kpb_percentage");
        assert_eq!(algorithm.parameters[1]["name"], "genetic_seed");
    }

    #[test]
    fn test_algo_invocations_bracket_and_min_start() {
        let log = build(&[
            r#"{"time":"0.5","event":"COMPUTER_ALGOSTART"}"#,
            r#"{"time":"0.8","event":"COMPUTER_ALGOSTOP","duration":0.3}"#,
            r#"{"time":"1.5","event":"COMPUTER_ALGOSTART"}"#,
        ])
        .unwrap();
        assert_eq!(log.invocations.len(), 2);
        assert_eq!(log.invocations[0].stop, Some(0.8));
        assert_eq!(log.invocations[1].stop, None);
        // 算法调用起点参与全局最早起点
        assert_eq!(log.min_start, Some(0.5));
    }

    #[test]
    fn test_algo_stop_without_open_invocation_is_hard_error() {
        let err = build(&[r#"{"time":"0.8","event":"COMPUTER_ALGOSTOP"}"#]).unwrap_err();
        assert!(matches!(err, SchedlogError::NoOpenInvocation { line: 1 }));
    }

    #[test]
    fn test_schedules_and_measurements_appended_verbatim() {
        let log = build(&[
            r#"{"time":"1.0","event":"SCHEDULE","schedule":{"compute_duration":500000,"tasks":[[],[]]}}"#,
            r#"{"time":"1.5","event":"MEASURE","cpu_power":[35.0,36.5],"gpu_power":55.0,"fpga_power":20.0,"sys_power":140.0}"#,
        ])
        .unwrap();
        assert_eq!(log.schedules.len(), 1);
        assert_eq!(log.schedules[0].time, Some(1.0));
        assert_eq!(log.schedules[0].compute_duration(), Some(500000.0));
        assert_eq!(log.measurements.len(), 1);
        assert_eq!(log.measurements[0]["gpu_power"], 55.0);
    }

    #[test]
    fn test_res_stop_computed_per_resource() {
        let log = build(&[
            r#"{"time":"0.5","event":"NEWTASK","id":1,"dep":[],"name":"t","size":1,"checkpoints":4}"#,
            r#"{"time":"1.0","event":"TASK_START","id":1,"res":"IntelXeon"}"#,
            r#"{"time":"2.0","event":"TASK_SUSPENDED","id":1,"progress":2}"#,
            r#"{"time":"3.0","event":"TASK_START","id":1,"res":"NvidiaTesla"}"#,
        ])
        .unwrap();
        assert_eq!(log.res_stop["IntelXeon"], 2.0);
        // 有区间但尚无结束时间的资源登记为0
        assert_eq!(log.res_stop["NvidiaTesla"], 0.0);
    }

    #[test]
    fn test_declared_resources_preserved_in_order() {
        let log = build(&[
            r#"{"time":"0.1","event":"RESOURCES","resources":["NvidiaTesla","IntelXeon"]}"#,
        ])
        .unwrap();
        assert_eq!(log.resources, vec!["NvidiaTesla", "IntelXeon"]);
    }

    #[test]
    fn test_dependent_tasks_grouped_into_one_app() {
        // 场景C：依赖先于被依赖任务定义
        let log = build(&[
            r#"{"time":"0.1","event":"NEWTASK","id":2,"dep":[1],"name":"b","size":1,"checkpoints":1}"#,
            r#"{"time":"0.2","event":"NEWTASK","id":1,"dep":[],"name":"a","size":1,"checkpoints":1}"#,
        ])
        .unwrap();
        assert_eq!(log.apps.len(), 1);
        assert_eq!(log.apps[0].tids, vec![1, 2]);
        assert_eq!(log.app_index_of(2), Some(0));
    }

    #[test]
    fn test_last_task_definition_wins() {
        let log = build(&[
            r#"{"time":"0.1","event":"NEWTASK","id":1,"dep":[],"name":"first","size":1,"checkpoints":1}"#,
            r#"{"time":"0.2","event":"NEWTASK","id":1,"dep":[],"name":"second","size":2,"checkpoints":3}"#,
        ])
        .unwrap();
        let task = &log.tasks[&1];
        assert_eq!(task.name.as_deref(), Some("second"));
        assert_eq!(task.size, Some(2));
        assert_eq!(task.checkpoints, Some(3));
    }
}
