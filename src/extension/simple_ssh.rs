use super::console::ConsoleBuffer;
use super::form::{self, FormData};
use super::registry::{register_extension, ExtensionFactory};
use super::runner::{CommandRunner, SshRunner};
use super::task::{TaskHandle, TaskSlot};
use super::ui::Form;
use super::{Extension, Host};
use anyhow::Context;
use colored::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const EXTENSION_ID: &str = "github.com/aleskxyz/hiddify_extension_simple_ssh/hiddify_extension";
pub const TITLE: &str = "hiddify_extension_simple_ssh";
pub const DESCRIPTION: &str = "Run a command on a remote server over SSH";

const CANCELED: &str = "Background Task Canceled";

struct State {
    data: FormData,
    console: ConsoleBuffer,
    task: TaskSlot,
}

/// State plus the host, shared between the foreground callbacks and the runner.
#[derive(Clone)]
struct Shared {
    host: Arc<dyn Host>,
    state: Arc<Mutex<State>>,
}

impl Shared {
    /// Runs `f` under the instance lock and pushes a fresh form to the host
    /// if the console changed. The push happens before the lock is released,
    /// so the host receives forms in the order the console changed.
    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock();
        let before = state.console.len();
        let result = f(&mut state);
        if state.console.len() != before {
            self.host.update_ui(form::render(&state.data, &state.console));
        }
        result
    }

    fn append_if_owner(&self, id: Uuid, line: String) {
        self.update(|state| {
            if state.task.current_id() == Some(id) {
                state.console.append([line]);
            }
        });
    }

    /// Releases the slot if `id` still owns it and logs the terminal line.
    fn finish(&self, id: Uuid, line: Option<String>) {
        self.update(|state| {
            if state.task.clear_if(id) {
                if let Some(line) = line {
                    state.console.append([line]);
                }
            } else {
                debug!(task = %id, "stale task finished");
            }
        });
    }
}

pub struct SimpleSshExtension {
    shared: Shared,
    runner: Arc<dyn CommandRunner>,
    runtime: Handle,
}

impl SimpleSshExtension {
    /// Must be called from within a tokio runtime; runners are spawned on it.
    pub fn new(host: Arc<dyn Host>) -> anyhow::Result<Self> {
        Self::with_runner(host, Arc::new(SshRunner::new()))
    }

    pub fn with_runner(host: Arc<dyn Host>, runner: Arc<dyn CommandRunner>) -> anyhow::Result<Self> {
        let runtime = Handle::try_current().context("simple ssh extension needs a tokio runtime")?;
        let console = ConsoleBuffer::with_greeting([
            "Welcome to".yellow().to_string(),
            TITLE.green().to_string(),
        ]);
        Ok(SimpleSshExtension {
            shared: Shared {
                host,
                state: Arc::new(Mutex::new(State {
                    data: FormData::default(),
                    console,
                    task: TaskSlot::new(),
                })),
            },
            runner,
            runtime,
        })
    }

    pub fn current_task(&self) -> Option<Uuid> {
        self.shared.state.lock().task.current_id()
    }

    pub fn console(&self) -> ConsoleBuffer {
        self.shared.state.lock().console.clone()
    }

    pub fn form_data(&self) -> FormData {
        self.shared.state.lock().data.clone()
    }

    fn spawn(&self, data: FormData, handle: TaskHandle) {
        let shared = self.shared.clone();
        let runner = self.runner.clone();
        self.runtime.spawn(async move {
            let id = handle.id();
            info!(task = %id, host = %data.ip, port = data.port, "starting ssh task");
            shared.append_if_owner(
                id,
                format!("Connecting to {}@{}...", data.username, data.address())
                    .yellow()
                    .to_string(),
            );

            let outcome = runner.run(data, handle.token()).await;
            debug!(task = %id, ?outcome, "ssh task finished");
            shared.finish(id, outcome.console_line());
        });
    }
}

impl Extension for SimpleSshExtension {
    fn get_ui(&self) -> Form {
        let state = self.shared.state.lock();
        form::render(&state.data, &state.console)
    }

    fn submit_data(&self, data: &HashMap<String, String>) -> anyhow::Result<()> {
        let submitted = self.shared.update(|state| {
            if let Err(err) = state.data.ingest(data) {
                return Err(err);
            }
            let (handle, preempted) = state.task.replace();
            if preempted {
                info!("preempting running task");
                state.console.append([CANCELED.red().to_string()]);
            }
            Ok((state.data.clone(), handle))
        });

        match submitted {
            Ok((data, handle)) => {
                self.spawn(data, handle);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "rejected submission");
                self.shared.host.show_message("Invalid data", &err.to_string());
                Err(err.into())
            }
        }
    }

    fn cancel(&self) -> anyhow::Result<()> {
        self.shared.update(|state| {
            if state.task.cancel() {
                info!("task cancelled");
                state.console.append([CANCELED.red().to_string()]);
            }
        });
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.cancel()
    }

    fn before_connect(&self, _host_config: &mut Value, _tunnel_config: &mut Value) -> anyhow::Result<()> {
        Ok(())
    }

    fn stored_data(&self) -> anyhow::Result<Value> {
        let state = self.shared.state.lock();
        Ok(serde_json::to_value(&state.data)?)
    }

    fn restore_data(&self, data: Value) -> anyhow::Result<()> {
        let data: FormData = serde_json::from_value(data).context("Invalid stored form data")?;
        self.shared.update(|state| state.data = data);
        Ok(())
    }
}

fn build(host: Arc<dyn Host>) -> anyhow::Result<Box<dyn Extension>> {
    Ok(Box::new(SimpleSshExtension::new(host)?))
}

/// Adds this extension to the process-wide registry.
pub fn register() -> anyhow::Result<()> {
    register_extension(ExtensionFactory {
        id: EXTENSION_ID.to_string(),
        title: TITLE.to_string(),
        description: DESCRIPTION.to_string(),
        builder: build,
    })
}
