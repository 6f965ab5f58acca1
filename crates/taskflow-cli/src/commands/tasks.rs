use chrono::Utc;

use crate::commands::common::{
    format_task_lines, open_app, parse_task_id, settle, task_to_list_item, TaskListItem,
};
use crate::error::CliError;

pub async fn run_list(as_json: bool, profile: Option<&str>) -> Result<(), CliError> {
    let (_, app) = open_app(profile)?;
    settle(&app, app.load().await)?;

    let tasks = app.tasks().tasks();
    let now = Utc::now();
    if as_json {
        let items = tasks
            .iter()
            .map(|task| task_to_list_item(task, now))
            .collect::<Vec<TaskListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if tasks.is_empty() {
        println!("No tasks yet. Create one with `taskflow add <title> --description <text>`.");
    } else {
        let show_owner = app
            .session()
            .profile()
            .is_some_and(|user| user.is_admin());
        for line in format_task_lines(&tasks, show_owner, now) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_add(
    title: &str,
    description: &str,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let (_, app) = open_app(profile)?;
    let task = settle(&app, app.create(title, description).await)?;
    println!("{}", task.id);
    Ok(())
}

pub async fn run_toggle(id: &str, profile: Option<&str>) -> Result<(), CliError> {
    let id = parse_task_id(id)?;
    let (_, app) = open_app(profile)?;
    settle(&app, app.load().await)?;
    settle(&app, app.toggle_completion(id).await)?;
    Ok(())
}

pub async fn run_delete(id: &str, profile: Option<&str>) -> Result<(), CliError> {
    let id = parse_task_id(id)?;
    let (_, app) = open_app(profile)?;
    settle(&app, app.load().await)?;
    settle(&app, app.remove(id).await)
}

pub async fn run_edit(
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
    profile: Option<&str>,
) -> Result<(), CliError> {
    if title.is_none() && description.is_none() {
        return Err(CliError::NothingToEdit);
    }
    let id = parse_task_id(id)?;
    let (_, app) = open_app(profile)?;
    settle(&app, app.load().await)?;
    settle(&app, app.begin_edit(id))?;
    settle(&app, app.set_draft(title, description))?;
    settle(&app, app.save_edit(id).await)?;
    Ok(())
}
