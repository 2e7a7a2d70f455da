use std::collections::BTreeMap;

use tracing::debug;

use crate::entities::{Application, Task, TaskId};

/// Domain service partitioning tasks into dependency-connected applications.
/// This contains the core union/merge algorithm over task dependency sets.
pub struct ApplicationService;

impl ApplicationService {
    /// Partition all known tasks into maximal dependency-connected groups.
    ///
    /// Starts from one singleton pool per task id and, iterating tasks in
    /// ascending id order, merges a task's pool with the pool containing
    /// each of its dependency ids. Dependency ids outside the known task
    /// set are ignored. The resulting partition is order-independent;
    /// member lists are sorted ascending and the application list is
    /// sorted by smallest member id.
    pub fn group(tasks: &BTreeMap<TaskId, Task>) -> Vec<Application> {
        let mut pools: Vec<Vec<TaskId>> = tasks.keys().map(|&tid| vec![tid]).collect();

        for (&tid, task) in tasks {
            // pull out the pool holding this task
            let own_ix = pools
                .iter()
                .position(|p| p.contains(&tid))
                .expect("every known task id is seeded into a pool");
            let mut own = pools.remove(own_ix);

            for &dep in &task.dependencies {
                if own.contains(&dep) {
                    continue;
                }
                match pools.iter().position(|p| p.contains(&dep)) {
                    Some(ix) => {
                        let dep_pool = pools.remove(ix);
                        own.extend(dep_pool);
                    }
                    None => {
                        debug!("任务 {} 的依赖 {} 不在任务集合中，忽略", tid, dep);
                    }
                }
            }

            pools.push(own);
        }

        let mut apps: Vec<Application> = pools
            .into_iter()
            .map(|mut tids| {
                tids.sort_unstable();
                Application { tids }
            })
            .collect();
        apps.sort_by_key(|a| a.min_task_id());
        apps
    }
}
