use taskflow_core::config::{normalize_base_url, AuthScheme};

use crate::cli::ConfigCommands;
use crate::config_profiles::{default_config_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            auth_scheme,
            timeout_secs,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(global_profile);
            apply_init(
                &mut config,
                &profile_name,
                api_url.as_deref(),
                auth_scheme.as_deref(),
                timeout_secs,
                no_activate,
            )?;
            let path = config.save().map_err(CliError::Config)?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            Ok(())
        }
        ConfigCommands::Show => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(global_profile);
            let profile = config.profile(&profile_name).cloned().unwrap_or_default();
            let client = profile.to_client_config().map_err(CliError::Config)?;
            let path = default_config_path().map_err(CliError::Config)?;

            println!("config:      {}", path.display());
            println!("profile:     {profile_name}");
            println!("api_url:     {}", client.api_base_url);
            println!("auth_scheme: {}", client.auth_scheme);
            println!("timeout:     {}s", client.request_timeout.as_secs());
            Ok(())
        }
    }
}

/// Merge explicit `config init` flags into the named profile.
pub fn apply_init(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    api_url: Option<&str>,
    auth_scheme: Option<&str>,
    timeout_secs: Option<u64>,
    no_activate: bool,
) -> Result<CliProfile, CliError> {
    let api_url = api_url
        .map(normalize_base_url)
        .transpose()
        .map_err(CliError::Config)?;
    let auth_scheme = auth_scheme
        .map(str::parse::<AuthScheme>)
        .transpose()
        .map_err(CliError::Config)?;
    if timeout_secs == Some(0) {
        return Err(CliError::Config(
            "timeout must be greater than zero".to_string(),
        ));
    }

    let profile = config.profile_mut_or_default(profile_name);
    if let Some(url) = api_url {
        profile.api_base_url = Some(url);
    }
    if let Some(scheme) = auth_scheme {
        profile.auth_scheme = Some(scheme);
    }
    if let Some(secs) = timeout_secs {
        profile.request_timeout_secs = Some(secs);
    }
    let profile = profile.clone();

    if !no_activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(profile)
}
