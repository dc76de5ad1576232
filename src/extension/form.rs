use super::console::{ConsoleBuffer, CONSOLE_LINES};
use super::simple_ssh::{DESCRIPTION, TITLE};
use super::ui::{Button, Form, FormField, Validator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const IP_KEY: &str = "ip";
pub const PORT_KEY: &str = "port";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const COMMAND_KEY: &str = "command";
pub const CONSOLE_KEY: &str = "console";

pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_COMMAND: &str = "echo 'Hello, World!'";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Connection settings entered through the form. Serialized flat, the host
/// owns persistence.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub command: String,
}

impl Default for FormData {
    fn default() -> Self {
        FormData {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            command: DEFAULT_COMMAND.to_string(),
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for FormData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormData")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("command", &self.command)
            .finish()
    }
}

impl FormData {
    /// Applies every recognized key of `data` and validates the result.
    /// Unknown keys are ignored. On error `self` is left untouched.
    pub fn ingest(&mut self, data: &HashMap<String, String>) -> Result<(), ValidationError> {
        let mut next = self.clone();

        for (key, value) in data {
            match key.as_str() {
                IP_KEY => next.ip = value.trim().to_string(),
                PORT_KEY => next.port = parse_port(value)?,
                USERNAME_KEY => next.username = value.clone(),
                PASSWORD_KEY => next.password = value.clone(),
                COMMAND_KEY => next.command = value.clone(),
                _ => {}
            }
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ip.is_empty() {
            return Err(ValidationError::Empty(IP_KEY));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort(self.port.to_string()));
        }
        if self.username.is_empty() {
            return Err(ValidationError::Empty(USERNAME_KEY));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Empty(PASSWORD_KEY));
        }
        if self.command.trim().is_empty() {
            return Err(ValidationError::Empty(COMMAND_KEY));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn parse_port(value: &str) -> Result<u16, ValidationError> {
    let value = value.trim();
    if !Validator::DigitsOnly.accepts(value) {
        return Err(ValidationError::InvalidPort(value.to_string()));
    }
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ValidationError::InvalidPort(value.to_string())),
    }
}

pub fn render(data: &FormData, console: &ConsoleBuffer) -> Form {
    Form {
        title: TITLE.to_string(),
        description: DESCRIPTION.to_string(),
        buttons: vec![Button::Cancel, Button::Submit],
        fields: vec![
            FormField::input(IP_KEY, "IP", &data.ip).with_placeholder("Server address"),
            FormField::input(PORT_KEY, "Port", data.port.to_string())
                .with_placeholder("SSH port")
                .with_validator(Validator::DigitsOnly),
            FormField::input(USERNAME_KEY, "Username", &data.username),
            FormField::password(PASSWORD_KEY, "Password", &data.password),
            FormField::input(COMMAND_KEY, "Command", &data.command)
                .with_placeholder("Command to run on the server"),
            FormField::console(CONSOLE_KEY, "Console", console.text(), CONSOLE_LINES),
        ],
    }
}
