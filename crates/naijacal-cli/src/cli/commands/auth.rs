//! Auth command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use naijacal_core::NaijaCal;
use naijacal_core::config::{Config, paths};

enum Action {
    Login,
    Register { email: Option<String> },
}

pub async fn login(
    config: &Config,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    authenticate(config, Action::Login, username, password).await
}

pub async fn register(
    config: &Config,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    authenticate(config, Action::Register { email }, username, password).await
}

async fn authenticate(
    config: &Config,
    action: Action,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let app = NaijaCal::from_config(config)?;

    // Check if already logged in
    app.restore().await;
    if let Some(existing) = app.whoami() {
        println!("Already logged in as {existing}");
        let answer = prompt("Do you want to replace the existing session? [y/N] ")?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Login cancelled.");
            return Ok(());
        }
        app.logout();
    }

    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    match &action {
        Action::Login => app.login(&username, &password).await?,
        Action::Register { email } => {
            let email = email.as_deref().map(str::trim).filter(|e| !e.is_empty());
            app.register(&username, &password, email).await?;
            println!("✓ Account created");
        }
    }

    println!(
        "✓ Logged in as {}",
        app.whoami().unwrap_or_else(|| username.trim().to_string())
    );
    println!(
        "  Session saved to: {}",
        paths::credentials_path().display()
    );
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let app = NaijaCal::from_config(config)?;

    if app.logout() {
        println!("✓ Logged out");
        println!(
            "  Session removed from: {}",
            paths::credentials_path().display()
        );
    } else {
        println!("Not logged in (no stored session found).");
    }

    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let app = NaijaCal::from_config(config)?;
    app.restore().await;

    let Some(username) = app.whoami() else {
        anyhow::bail!("Not logged in. Run `naijacal login` first.");
    };
    println!("{username}");
    Ok(())
}

/// Prints `label` and reads one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    Ok(read_line(label)?.trim().to_string())
}

/// Reads a password line. Only the line ending is stripped.
fn prompt_password() -> Result<String> {
    let line = read_line("Password (input is visible): ")?;
    Ok(strip_line_ending(&line).to_string())
}

fn read_line(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read from stdin")?;
    Ok(input)
}

fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l))
}
