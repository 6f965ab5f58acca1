//! Task store: the client's view of the task collection.
//!
//! Removals and completion toggles are optimistic: the collection changes
//! first and is rolled back from a snapshot if the server rejects the change.
//! Creation waits for the server-assigned id, and edits stay in a local draft
//! until the server accepts them.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::{ApiError, TaskApi, NOT_FOUND_MESSAGE};
use crate::error::{Error, Result};
use crate::models::{Credential, Task, TaskDraft, TaskId, TaskPatch};
use crate::notify::NotificationScheduler;
use crate::session::{SessionManager, Termination, SESSION_EXPIRED_MESSAGE};

mod edit;
pub mod optimistic;

pub use edit::PendingEdit;

use optimistic::{OptimisticMutation, Remove, Toggle};

const LOAD_FAILED_MESSAGE: &str = "Failed to fetch tasks. Please try again.";
const CREATE_FAILED_MESSAGE: &str = "Failed to create task.";
const UPDATE_FAILED_MESSAGE: &str = "Failed to update task. Please try again.";
const NOT_AUTHENTICATED_MESSAGE: &str = "Please log in to manage your tasks.";
const NO_EDIT_MESSAGE: &str = "No edit in progress for this task.";

/// Network-issuing operations, tracked for busy indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Load,
    Create,
    Remove,
    Toggle,
    SaveEdit,
}

#[derive(Debug, Default)]
struct TaskState {
    tasks: Vec<Task>,
    pending_edit: Option<PendingEdit>,
    in_flight: BTreeMap<Operation, usize>,
}

/// Marks an operation in flight until dropped.
struct BusyGuard<'a> {
    state: &'a Mutex<TaskState>,
    operation: Operation,
}

impl<'a> BusyGuard<'a> {
    fn new(state: &'a Mutex<TaskState>, operation: Operation) -> Self {
        *state.lock().in_flight.entry(operation).or_default() += 1;
        Self { state, operation }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(count) = state.in_flight.get_mut(&self.operation) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(&self.operation);
            }
        }
    }
}

pub struct TaskStore<A: TaskApi> {
    api: Arc<A>,
    session: Arc<SessionManager>,
    notifications: NotificationScheduler,
    state: Mutex<TaskState>,
}

impl<A: TaskApi> TaskStore<A> {
    pub fn new(
        api: Arc<A>,
        session: Arc<SessionManager>,
        notifications: NotificationScheduler,
    ) -> Self {
        Self {
            api,
            session,
            notifications,
            state: Mutex::new(TaskState::default()),
        }
    }

    /// Replace the collection with the server's list.
    pub async fn load(&self) -> Result<usize> {
        let (credential, generation) = self.authorize()?;
        let _busy = BusyGuard::new(&self.state, Operation::Load);

        let result = self.api.list_tasks(&credential).await;
        self.ensure_current(generation, Operation::Load)?;

        match result {
            Ok(tasks) => {
                let count = tasks.len();
                self.state.lock().tasks = tasks;
                tracing::info!("Loaded {} tasks", count);
                Ok(count)
            }
            Err(error) => {
                if !error.is_unauthorized() {
                    self.state.lock().tasks.clear();
                }
                Err(self.report_failure(error, LOAD_FAILED_MESSAGE))
            }
        }
    }

    /// Create a task. It only joins the collection once the server returns it.
    pub async fn create(&self, title: &str, description: &str) -> Result<Task> {
        let (credential, generation) = self.authorize()?;
        let draft = self.validate(title, description)?;
        let _busy = BusyGuard::new(&self.state, Operation::Create);

        let result = self.api.create_task(&credential, &draft).await;
        self.ensure_current(generation, Operation::Create)?;

        match result {
            Ok(task) => {
                {
                    let mut state = self.state.lock();
                    match state.tasks.iter_mut().find(|existing| existing.id == task.id) {
                        Some(existing) => existing.clone_from(&task),
                        None => state.tasks.push(task.clone()),
                    }
                }
                tracing::info!("Created task {}", task.id);
                self.notifications.success("Task created successfully!");
                Ok(task)
            }
            Err(error) => Err(self.report_failure(error, CREATE_FAILED_MESSAGE)),
        }
    }

    pub async fn remove(&self, id: TaskId) -> Result<()> {
        self.run_optimistic(Remove { id }).await
    }

    /// Flip completion. Returns the value the server settled on.
    pub async fn toggle_completion(&self, id: TaskId) -> Result<bool> {
        self.run_optimistic(Toggle { id }).await
    }

    /// Start editing `task`, replacing any other draft.
    pub fn begin_edit(&self, task: &Task) -> PendingEdit {
        let edit = PendingEdit::for_task(task);
        self.state.lock().pending_edit = Some(edit.clone());
        edit
    }

    pub fn set_draft(&self, title: Option<&str>, description: Option<&str>) -> Result<PendingEdit> {
        let mut state = self.state.lock();
        let edit = state
            .pending_edit
            .as_mut()
            .ok_or_else(|| Error::InvariantViolation("no edit in progress".to_string()))?;
        edit.update(title, description);
        Ok(edit.clone())
    }

    pub fn cancel_edit(&self) -> Option<PendingEdit> {
        self.state.lock().pending_edit.take()
    }

    /// Send the draft for `id`. The visible task only changes on success; on
    /// failure the draft is kept for a retry or cancel.
    ///
    /// Only title and description are reconciled, so a toggle still in flight
    /// keeps its optimistic value. Returns `None` when the task left the
    /// collection while the save was in flight.
    pub async fn save_edit(&self, id: TaskId) -> Result<Option<Task>> {
        let (credential, generation) = self.authorize()?;
        let pending = self
            .state
            .lock()
            .pending_edit
            .clone()
            .filter(|edit| edit.task_id == id);
        let Some(pending) = pending else {
            self.notifications.failure(NO_EDIT_MESSAGE);
            return Err(Error::Validation(NO_EDIT_MESSAGE.to_string()));
        };
        let draft = self.validate(&pending.draft_title, &pending.draft_description)?;
        let _busy = BusyGuard::new(&self.state, Operation::SaveEdit);

        let result = self.api.replace_task(&credential, id, &draft).await;
        self.ensure_current(generation, Operation::SaveEdit)?;

        let patch = match result {
            Ok(patch) => patch,
            Err(error) => return Err(self.report_failure(error, UPDATE_FAILED_MESSAGE)),
        };
        let accepted = TaskPatch {
            title: Some(patch.title.unwrap_or(draft.title)),
            description: Some(patch.description.unwrap_or(draft.description)),
            ..TaskPatch::default()
        };

        let updated = {
            let mut state = self.state.lock();
            if state
                .pending_edit
                .as_ref()
                .is_some_and(|edit| edit.task_id == id)
            {
                state.pending_edit = None;
            }
            state.tasks.iter_mut().find(|task| task.id == id).map(|task| {
                task.apply_patch(&accepted);
                task.clone()
            })
        };

        if updated.is_none() {
            tracing::debug!("Task {} left the collection before its edit landed", id);
        }
        tracing::info!("Updated task {}", id);
        self.notifications.success("Task updated successfully!");
        Ok(updated)
    }

    /// Empty the collection and drop any draft.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tasks.clear();
        state.pending_edit = None;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.state
            .lock()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    pub fn pending_edit(&self) -> Option<PendingEdit> {
        self.state.lock().pending_edit.clone()
    }

    pub fn is_busy(&self) -> bool {
        !self.state.lock().in_flight.is_empty()
    }

    pub fn is_busy_with(&self, operation: Operation) -> bool {
        self.state.lock().in_flight.contains_key(&operation)
    }

    async fn run_optimistic<M: OptimisticMutation>(&self, mutation: M) -> Result<M::Output> {
        let (credential, generation) = self.authorize()?;
        let snapshot = mutation.apply(&mut self.state.lock().tasks);
        let Some(snapshot) = snapshot else {
            self.notifications.failure(NOT_FOUND_MESSAGE);
            return Err(Error::Api(ApiError::NotFound));
        };
        let _busy = BusyGuard::new(&self.state, M::OPERATION);

        let result = mutation.send(&*self.api, &credential, &snapshot).await;
        self.ensure_current(generation, M::OPERATION)?;

        match result {
            Ok(response) => {
                let output = mutation.reconcile(&mut self.state.lock().tasks, &response);
                self.notifications.success(mutation.success_message(&output));
                Ok(output)
            }
            Err(error) => {
                if !error.is_unauthorized() {
                    tracing::warn!("{:?} rolled back: {}", M::OPERATION, error);
                    mutation.rollback(&mut self.state.lock().tasks, snapshot);
                }
                Err(self.report_failure(error, M::FAILURE_MESSAGE))
            }
        }
    }

    fn authorize(&self) -> Result<(Credential, u64)> {
        self.session.authorize().inspect_err(|_| {
            self.notifications.failure(NOT_AUTHENTICATED_MESSAGE);
        })
    }

    fn validate(&self, title: &str, description: &str) -> Result<TaskDraft> {
        TaskDraft::new(title, description).map_err(|message| {
            self.notifications.failure(message.clone());
            Error::Validation(message)
        })
    }

    /// Guard for continuations: the session may have ended while suspended.
    fn ensure_current(&self, generation: u64, operation: Operation) -> Result<()> {
        if self.session.is_current(generation) {
            Ok(())
        } else {
            tracing::debug!("Discarding {:?} result for an ended session", operation);
            Err(Error::Superseded)
        }
    }

    fn report_failure(&self, error: ApiError, fallback: &str) -> Error {
        if error.is_unauthorized() {
            return self.expire_session();
        }
        self.notifications.failure(error.user_message(fallback));
        Error::Api(error)
    }

    fn expire_session(&self) -> Error {
        if self.session.terminate(Termination::Expired).is_some() {
            tracing::info!("Credential rejected; session expired");
        }
        self.clear();
        self.notifications.failure(SESSION_EXPIRED_MESSAGE);
        Error::SessionExpired
    }
}
