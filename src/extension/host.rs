use super::ui::Form;

/// Services the embedding application provides to an extension.
///
/// Both calls may arrive from the background runner, so implementations must
/// be thread-safe. `update_ui` runs while the extension holds its state lock:
/// it must not call back into the extension.
pub trait Host: Send + Sync {
    fn update_ui(&self, form: Form);
    fn show_message(&self, title: &str, body: &str);
}
