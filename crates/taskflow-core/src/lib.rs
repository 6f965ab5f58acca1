//! taskflow-core - Core library for TaskFlow
//!
//! This crate contains the client-side state core shared by every TaskFlow
//! front end: the session lifecycle, the optimistic task store, and the
//! transient notification scheduler, plus the HTTP client they talk through.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod router;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use app::TaskflowApp;
pub use error::{Error, Result};
pub use models::{Credential, Role, Task, TaskId, UserProfile};
