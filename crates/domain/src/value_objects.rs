use serde::{Deserialize, Serialize};

use crate::entities::Task;

/// 任务执行区间历史的生命周期状态。
///
/// Pending -> Running -> Idle -> Running -> ... -> Finished。
/// Running状态下收到的重复TASK_START是底层进程重启后补发的
/// 状态更新，必须被抑制；Finished是终态，后续事件不再打开新区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartLifecycle {
    /// 尚无执行区间
    Pending,
    /// 最后一个区间未关闭
    Running,
    /// 最后一个区间被暂停关闭
    Idle,
    /// 任务已完成（终态）
    Finished,
}

impl PartLifecycle {
    /// 此状态下的TASK_START是否允许打开新区间
    pub fn accepts_new_part(&self) -> bool {
        matches!(self, PartLifecycle::Pending | PartLifecycle::Idle)
    }

    /// 此状态下是否存在可被暂停/完成关闭的区间
    pub fn has_open_part(&self) -> bool {
        matches!(self, PartLifecycle::Running)
    }
}

impl Task {
    /// 由区间历史推导当前生命周期状态
    pub fn lifecycle(&self) -> PartLifecycle {
        if self.finish.is_some() {
            return PartLifecycle::Finished;
        }
        match self.parts.last() {
            None => PartLifecycle::Pending,
            Some(part) if part.stop.is_none() => PartLifecycle::Running,
            Some(_) => PartLifecycle::Idle,
        }
    }

    /// 下一个区间的起始进度：延续上一个区间的结束进度，默认0
    pub fn next_start_progress(&self) -> u32 {
        self.parts.last().and_then(|p| p.progress).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{resource_short_name, Task, TaskPart};
    use serde_json::json;

    fn part(start: f64, stop: Option<f64>, progress: Option<u32>) -> TaskPart {
        TaskPart {
            res: "IntelXeon".to_string(),
            res_short: resource_short_name("IntelXeon").to_string(),
            start,
            stop,
            start_progress: 0,
            progress,
            start_record: json!({}),
            stop_record: None,
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut task = Task::placeholder(1);
        assert_eq!(task.lifecycle(), PartLifecycle::Pending);
        assert!(task.lifecycle().accepts_new_part());

        task.parts.push(part(1.0, None, None));
        assert_eq!(task.lifecycle(), PartLifecycle::Running);
        assert!(!task.lifecycle().accepts_new_part());
        assert!(task.lifecycle().has_open_part());

        task.parts.last_mut().unwrap().stop = Some(2.0);
        task.parts.last_mut().unwrap().progress = Some(3);
        assert_eq!(task.lifecycle(), PartLifecycle::Idle);
        assert!(task.lifecycle().accepts_new_part());

        task.finish = Some(4.0);
        assert_eq!(task.lifecycle(), PartLifecycle::Finished);
        assert!(!task.lifecycle().accepts_new_part());
        assert!(!task.lifecycle().has_open_part());
    }

    #[test]
    fn test_start_progress_carries_forward() {
        let mut task = Task::placeholder(1);
        assert_eq!(task.next_start_progress(), 0);

        task.parts.push(part(1.0, Some(2.0), Some(5)));
        assert_eq!(task.next_start_progress(), 5);

        // 暂停时未上报进度的区间延续默认值0
        task.parts.push(part(3.0, Some(4.0), None));
        assert_eq!(task.next_start_progress(), 0);
    }
}
