//! Data models for TaskFlow

mod task;
mod user;

pub use task::{Task, TaskDraft, TaskId, TaskPatch};
pub use user::{AuthGrant, Credential, Role, UserProfile};
