//! Optimistic mutations as explicit state machines.
//!
//! Each mutation goes `apply` → `send` → (`reconcile` | `rollback`). `apply`
//! captures a snapshot of exactly what it changed, and `rollback` inverts the
//! change from that snapshot alone, so both halves are testable without a
//! server.

use std::future::Future;

use crate::api::{ApiResult, TaskApi};
use crate::models::{Credential, Task, TaskId, TaskPatch};

use super::Operation;

pub trait OptimisticMutation: Send + Sync {
    /// What `apply` changed, enough to undo it.
    type Snapshot: Send + Sync;
    type Response: Send;
    type Output;

    const OPERATION: Operation;
    /// Failure notification text when the error has no better description.
    const FAILURE_MESSAGE: &'static str;

    /// Change the collection locally. `None` when the target is not present.
    fn apply(&self, tasks: &mut Vec<Task>) -> Option<Self::Snapshot>;

    fn send<'a, A: TaskApi>(
        &'a self,
        api: &'a A,
        credential: &'a Credential,
        snapshot: &'a Self::Snapshot,
    ) -> impl Future<Output = ApiResult<Self::Response>> + Send + 'a;

    /// Fold the server's confirmation into the collection.
    fn reconcile(&self, tasks: &mut [Task], response: &Self::Response) -> Self::Output;

    fn rollback(&self, tasks: &mut Vec<Task>, snapshot: Self::Snapshot);

    fn success_message(&self, output: &Self::Output) -> String;
}

/// Delete a task, restoring it at its original index on failure.
#[derive(Debug, Clone, Copy)]
pub struct Remove {
    pub id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedTask {
    pub index: usize,
    pub task: Task,
}

impl OptimisticMutation for Remove {
    type Snapshot = RemovedTask;
    type Response = ();
    type Output = ();

    const OPERATION: Operation = Operation::Remove;
    const FAILURE_MESSAGE: &'static str = "Failed to delete task. Please try again.";

    fn apply(&self, tasks: &mut Vec<Task>) -> Option<RemovedTask> {
        let index = tasks.iter().position(|task| task.id == self.id)?;
        let task = tasks.remove(index);
        Some(RemovedTask { index, task })
    }

    fn send<'a, A: TaskApi>(
        &'a self,
        api: &'a A,
        credential: &'a Credential,
        _snapshot: &'a RemovedTask,
    ) -> impl Future<Output = ApiResult<()>> + Send + 'a {
        async move { api.delete_task(credential, self.id).await }
    }

    fn reconcile(&self, _tasks: &mut [Task], _response: &()) {}

    fn rollback(&self, tasks: &mut Vec<Task>, snapshot: RemovedTask) {
        // A reload may already have brought it back.
        if tasks.iter().any(|task| task.id == snapshot.task.id) {
            return;
        }
        let index = snapshot.index.min(tasks.len());
        tasks.insert(index, snapshot.task);
    }

    fn success_message(&self, _output: &()) -> String {
        "Task deleted successfully!".to_string()
    }
}

/// Flip a task's completion flag.
#[derive(Debug, Clone, Copy)]
pub struct Toggle {
    pub id: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggledTask {
    pub id: TaskId,
    /// Value read at apply time; the rollback target for this toggle only.
    pub previous: bool,
    pub predicted: bool,
}

impl OptimisticMutation for Toggle {
    type Snapshot = ToggledTask;
    type Response = TaskPatch;
    type Output = bool;

    const OPERATION: Operation = Operation::Toggle;
    const FAILURE_MESSAGE: &'static str = "Failed to update task. Please try again.";

    fn apply(&self, tasks: &mut Vec<Task>) -> Option<ToggledTask> {
        let task = tasks.iter_mut().find(|task| task.id == self.id)?;
        let previous = task.is_completed;
        task.is_completed = !previous;
        Some(ToggledTask {
            id: self.id,
            previous,
            predicted: !previous,
        })
    }

    fn send<'a, A: TaskApi>(
        &'a self,
        api: &'a A,
        credential: &'a Credential,
        snapshot: &'a ToggledTask,
    ) -> impl Future<Output = ApiResult<TaskPatch>> + Send + 'a {
        async move {
            api.set_completion(credential, snapshot.id, snapshot.predicted)
                .await
        }
    }

    /// Server is canonical; a payload without the field keeps the local value.
    fn reconcile(&self, tasks: &mut [Task], response: &TaskPatch) -> bool {
        let Some(task) = tasks.iter_mut().find(|task| task.id == self.id) else {
            return response.is_completed.unwrap_or_default();
        };
        task.apply_patch(response);
        task.is_completed
    }

    fn rollback(&self, tasks: &mut Vec<Task>, snapshot: ToggledTask) {
        if let Some(task) = tasks.iter_mut().find(|task| task.id == snapshot.id) {
            task.is_completed = snapshot.previous;
        }
    }

    fn success_message(&self, is_completed: &bool) -> String {
        let label = if *is_completed {
            "completed"
        } else {
            "incomplete"
        };
        format!("Task marked as {label}!")
    }
}
