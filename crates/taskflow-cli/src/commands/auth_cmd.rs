use taskflow_core::session::SessionState;

use crate::cli::AuthCommands;
use crate::commands::common::{open_app, settle};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let (profile_name, app) = open_app(global_profile)?;
    match command {
        AuthCommands::Register {
            username,
            email,
            password,
        } => {
            let user = settle(&app, app.register(&username, &email, &password).await)?;
            println!("Signed in profile '{profile_name}' as {}", user.username);
            Ok(())
        }
        AuthCommands::Login { username, password } => {
            let user = settle(&app, app.login(&username, &password).await)?;
            println!("Signed in profile '{profile_name}' as {}", user.username);
            Ok(())
        }
        AuthCommands::Status => {
            match app.session().state() {
                SessionState::Authenticated { profile, .. } => {
                    let email_label = profile.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Profile '{}' is signed in as {} <{}> (role: {})",
                        profile_name, profile.username, email_label, profile.role
                    );
                }
                SessionState::Anonymous => {
                    println!("Profile '{profile_name}' is not signed in.");
                }
            }
            Ok(())
        }
        AuthCommands::Logout => {
            if app.logout().is_some() {
                println!("Signed out profile '{profile_name}'");
            } else {
                println!("Profile '{profile_name}' was not signed in.");
            }
            Ok(())
        }
    }
}
