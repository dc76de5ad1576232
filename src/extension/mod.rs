mod console;
mod form;
mod host;
mod registry;
mod runner;
mod simple_ssh;
#[cfg(test)]
mod sshd;
mod task;
mod ui;

pub use console::{ConsoleBuffer, CONSOLE_LINES};
pub use form::{FormData, ValidationError};
pub use host::Host;
pub use registry::{
    build_extension, list_extensions, register_extension, ExtensionBuilder, ExtensionFactory,
    ExtensionRegistry,
};
pub use runner::{CommandRunner, RunError, RunOutcome, SshRunner, DIAL_TIMEOUT};
pub use simple_ssh::{register, SimpleSshExtension, DESCRIPTION, EXTENSION_ID, TITLE};
pub use task::{TaskHandle, TaskSlot};
pub use ui::{Button, FieldType, Form, FormField, Validator};

use serde_json::Value;
use std::collections::HashMap;

/// What a host can do with a loaded extension. All calls come from the
/// host's UI thread and are serialized by it.
pub trait Extension: Send + Sync {
    fn get_ui(&self) -> Form;
    fn submit_data(&self, data: &HashMap<String, String>) -> anyhow::Result<()>;
    fn cancel(&self) -> anyhow::Result<()>;
    /// Called when the host unloads the extension.
    fn stop(&self) -> anyhow::Result<()>;
    /// Hook to adjust the host's outer connection settings before it connects.
    fn before_connect(&self, host_config: &mut Value, tunnel_config: &mut Value) -> anyhow::Result<()>;
    fn stored_data(&self) -> anyhow::Result<Value>;
    fn restore_data(&self, data: Value) -> anyhow::Result<()>;
}
