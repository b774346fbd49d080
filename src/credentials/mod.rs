use crate::error::UsageError;
use anyhow::{Context, Result};
use std::fmt;
use std::io::{self, BufRead, Write};

pub const USERNAME_ENV: &str = "IG_USER";
pub const PASSWORD_ENV: &str = "IG_PASSWORD";

/// Source of interactive input for values that were not supplied otherwise.
pub trait Prompter {
    fn prompt_text(&self, label: &str) -> Result<String>;

    /// Reads a value without echoing it.
    fn prompt_hidden(&self, label: &str) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt_text(&self, label: &str) -> Result<String> {
        print!("{}: ", label);
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        io::stdin()
            .lock()
            .read_line(&mut input)
            .context("Failed to read user input")?;
        Ok(input.trim().to_string())
    }

    fn prompt_hidden(&self, label: &str) -> Result<String> {
        rpassword::prompt_password(format!("{}: ", label)).context("Failed to read password")
    }
}

/// Resolves a value from the flag, then the environment, then an interactive
/// prompt. Empty values fall through to the next source.
pub fn resolve_field<F>(
    flag: Option<String>,
    env: Option<String>,
    prompt: F,
) -> Result<Option<String>>
where
    F: FnOnce() -> Result<String>,
{
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    if let Some(value) = non_empty(flag).or_else(|| non_empty(env)) {
        return Ok(Some(value));
    }
    Ok(non_empty(Some(prompt()?)))
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// `env` looks up an environment variable by name; injected so tests do
    /// not depend on the process environment.
    pub fn resolve<E>(
        username: Option<String>,
        password: Option<String>,
        env: E,
        prompter: &dyn Prompter,
    ) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let username = resolve_field(username, env(USERNAME_ENV), || {
            prompter.prompt_text("Username")
        })?
        .ok_or(UsageError::MissingUsername)?;

        let password = resolve_field(password, env(PASSWORD_ENV), || {
            prompter.prompt_hidden("Password")
        })?
        .ok_or(UsageError::MissingPassword)?;

        Ok(Self {
            username: username.trim().to_string(),
            password,
        })
    }
}

/// Reads variables from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
