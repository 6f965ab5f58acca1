use chrono::{DateTime, Utc};
use serde::Serialize;
use taskflow_core::api::{HttpApiClient, TaskApi};
use taskflow_core::notify::Outcome;
use taskflow_core::{Error, Task, TaskId, TaskflowApp};

use crate::auth::KeyringStore;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub type CliApp = TaskflowApp<HttpApiClient>;

pub const LOGIN_HINT: &str =
    "Run `taskflow auth login --username <name> --password <password>` to sign in.";

/// Build the app for the resolved profile and restore its stored session.
pub fn open_app(global_profile: Option<&str>) -> Result<(String, CliApp), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let client_config = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .to_client_config()
        .map_err(CliError::Config)?;
    tracing::debug!(
        "Using profile '{}' against {}",
        profile_name,
        client_config.api_base_url
    );

    let app = TaskflowApp::connect(&client_config, KeyringStore::new(&profile_name))?;
    app.start();
    Ok((profile_name, app))
}

/// Print the pending notification and map the outcome for `main`.
pub fn settle<A: TaskApi, T>(
    app: &TaskflowApp<A>,
    result: taskflow_core::Result<T>,
) -> Result<T, CliError> {
    let printed = print_notification(app);
    match result {
        Ok(value) => Ok(value),
        Err(error) => {
            if matches!(error, Error::SessionExpired | Error::NotAuthenticated) {
                eprintln!("{LOGIN_HINT}");
            }
            if printed {
                Err(CliError::Reported(error))
            } else {
                Err(error.into())
            }
        }
    }
}

/// Success goes to stdout, failure to stderr. Returns whether anything printed.
pub fn print_notification<A: TaskApi>(app: &TaskflowApp<A>) -> bool {
    let Some(notification) = app.notifications().current() else {
        return false;
    };
    app.notifications().clear();
    match notification.outcome {
        Outcome::Success => println!("{}", notification.text),
        Outcome::Failure => eprintln!("{}", notification.text),
    }
    true
}

pub fn parse_task_id(id: &str) -> Result<TaskId, CliError> {
    id.parse()
        .map_err(|_| CliError::InvalidTaskId(id.trim().to_string()))
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
}

pub fn task_to_list_item(task: &Task, now: DateTime<Utc>) -> TaskListItem {
    TaskListItem {
        id: task.id.get(),
        title: task.title.clone(),
        description: task.description.clone(),
        is_completed: task.is_completed,
        created_at: task.created_at,
        relative_time: format_relative_time(task.created_at, now),
        created_by: task.created_by,
    }
}

/// One line per task. Admins also see the owning user id.
pub fn format_task_lines(tasks: &[Task], show_owner: bool, now: DateTime<Utc>) -> Vec<String> {
    tasks
        .iter()
        .map(|task| {
            let mark = if task.is_completed { 'x' } else { ' ' };
            let title = preview(&task.title, 40);
            let relative_time = format_relative_time(task.created_at, now);
            let id = task.id.get();
            let line = format!("{id:>5}  [{mark}]  {title:<40}  {relative_time}");
            match task.created_by {
                Some(owner) if show_owner => format!("{line:<70}  user {owner}"),
                _ => line,
            }
        })
        .collect()
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(timestamp);
    let seconds = delta.num_seconds().max(0);
    match seconds {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", seconds / 60),
        3_600..=86_399 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}
