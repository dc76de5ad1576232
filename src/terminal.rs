//! Minimal terminal host: prints what the extension asks to show and keeps
//! its form data between runs.

use crate::extension::{FieldType, Form, Host};
use anyhow::{Context, Result};
use colored::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, `warn` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub struct TerminalHost {
    last_console: Mutex<String>,
}

impl TerminalHost {
    pub fn new() -> Self {
        TerminalHost {
            last_console: Mutex::new(String::new()),
        }
    }

    pub fn show_form(&self, form: &Form) {
        println!("{}", form.title.bright_green());
        println!("{}", form.description.dimmed());
        for field in &form.fields {
            match field.field_type {
                FieldType::Console => {
                    println!("{}:", field.label.bright_blue());
                    for line in field.value.lines().take(field.lines.unwrap_or(usize::MAX)) {
                        println!("  {}", line);
                    }
                }
                _ => println!("{:>10}: {}", field.label.bright_blue(), field.display_value()),
            }
        }
        *self.last_console.lock() = console_value(form);
    }

    /// The part of `current` that was prepended since `previous` was shown.
    fn fresh_entries<'a>(previous: &str, current: &'a str) -> &'a str {
        if current.ends_with(previous) {
            &current[..current.len() - previous.len()]
        } else {
            current
        }
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

fn console_value(form: &Form) -> String {
    form.fields
        .iter()
        .find(|field| field.field_type == FieldType::Console)
        .map(|field| field.value.clone())
        .unwrap_or_default()
}

impl Host for TerminalHost {
    fn update_ui(&self, form: Form) {
        let current = console_value(&form);
        let mut last = self.last_console.lock();
        let fresh = Self::fresh_entries(&last, &current);
        if !fresh.is_empty() {
            print!("{}", fresh);
        }
        *last = current;
    }

    fn show_message(&self, title: &str, body: &str) {
        eprintln!("{}: {}", title.bright_red(), body);
    }
}

/// JSON file holding the extension's stored data.
pub struct DataStore {
    path: PathBuf,
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DataStore { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_default();
        path.push(".simple-ssh");
        path.push("extension_data.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let value = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(value))
    }

    pub fn save(&self, value: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    }
}
