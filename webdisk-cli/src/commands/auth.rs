//! Account commands - register, login and password change
//!
//! Log events from these commands never carry the username or password.

use std::env;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password as PasswordPrompt;
use webdisk_core::{Error, LogEvent, Password};

use super::{get_context, get_logger, log_event};

/// Env var supplying the password non-interactively
pub const PASSWORD_ENV: &str = "WEBDISK_PASSWORD";

/// Get password from --password flag, WEBDISK_PASSWORD env var, or prompt
fn get_password_or_prompt(password_flag: Option<String>, prompt: &str) -> Result<Password> {
    if let Some(p) = password_flag {
        return Ok(p.into());
    }

    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p.into());
    }

    let p = PasswordPrompt::new().with_prompt(prompt).interact()?;
    Ok(p.into())
}

/// Get a new password, prompting twice when interactive
fn get_password_with_confirm(password_flag: Option<String>, prompt: &str) -> Result<Password> {
    if let Some(p) = password_flag {
        return Ok(p.into());
    }

    if let Ok(p) = env::var(PASSWORD_ENV) {
        return Ok(p.into());
    }

    let p = PasswordPrompt::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(p.into())
}

pub fn run_register(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("register_started").with_command("register"));

    let pwd = get_password_with_confirm(password, "Choose a password")?;
    let ctx = get_context()?;

    let account = match ctx.credentials.register(username, pwd) {
        Ok(account) => account,
        Err(e) => {
            let event = match &e {
                Error::DuplicateIdentifier(_) => "register_duplicate",
                _ => "register_failed",
            };
            log_event(
                &logger,
                LogEvent::new(event)
                    .with_command("register")
                    .with_error(error_kind(&e)),
            );
            return Err(e.into());
        }
    };
    ctx.close()?;

    log_event(&logger, LogEvent::new("register_completed").with_command("register"));

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        println!("{}", format!("Registered {}", account.identifier).green());
    }

    Ok(())
}

pub fn run_login(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    let pwd = get_password_or_prompt(password, "Password")?;
    let ctx = get_context()?;

    let result = ctx.credentials.authenticate(username, pwd);
    ctx.close()?;

    match result {
        Ok(account) => {
            log_event(&logger, LogEvent::new("login_completed").with_command("login"));
            if json {
                println!(
                    "{}",
                    serde_json::json!({"authenticated": true, "account": account})
                );
            } else {
                println!("{}", format!("Logged in as {}", account.identifier).green());
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("login_failed")
                    .with_command("login")
                    .with_error(error_kind(&e)),
            );
            if e.is_auth_failure() && json {
                println!("{}", serde_json::json!({"authenticated": false}));
            }
            Err(e.into())
        }
    }
}

pub fn run_passwd(
    username: &str,
    current: Option<String>,
    new_password: Option<String>,
    json: bool,
) -> Result<()> {
    let logger = get_logger();
    let current = get_password_or_prompt(current, "Current password")?;
    let new_password = match new_password {
        Some(p) => Password::from(p),
        None => PasswordPrompt::new()
            .with_prompt("New password")
            .with_confirmation("Confirm new password", "Passwords do not match")
            .interact()?
            .into(),
    };

    let ctx = get_context()?;
    let result = ctx
        .credentials
        .change_password(username, current, new_password);
    ctx.close()?;

    match result {
        Ok(account) => {
            log_event(&logger, LogEvent::new("passwd_completed").with_command("passwd"));
            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                println!("{}", "Password changed".green());
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("passwd_failed")
                    .with_command("passwd")
                    .with_error(error_kind(&e)),
            );
            Err(e.into())
        }
    }
}

/// Short error category for the log; never includes user input
fn error_kind(e: &Error) -> &'static str {
    match e {
        Error::DuplicateIdentifier(_) => "duplicate identifier",
        Error::InvalidCredentials => "invalid credentials",
        Error::InvalidIdentifier(_) => "invalid identifier",
        Error::InvalidPassword(_) => "invalid password",
        Error::Config(_) => "configuration",
        Error::Database(_) => "database",
        Error::Credential(_) => "credential",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_password_takes_priority() {
        let pwd = get_password_or_prompt(Some("from-flag".to_string()), "unused").unwrap();
        assert_eq!(pwd.as_bytes(), b"from-flag");
    }

    #[test]
    fn test_error_kind_never_echoes_input() {
        let e = Error::DuplicateIdentifier("alice".to_string());
        assert!(!error_kind(&e).contains("alice"));
        assert_eq!(error_kind(&Error::InvalidCredentials), "invalid credentials");
    }
}
