use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifies one runner and carries the token that stops it.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Uuid,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new() -> Self {
        TaskHandle {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the handle of the one runner that currently owns the extension.
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: Option<TaskHandle>,
}

impl TaskSlot {
    pub fn new() -> Self {
        TaskSlot { current: None }
    }

    /// Trips the current handle, if any, then installs a fresh one.
    /// Returns the new handle and whether a live task was preempted.
    pub fn replace(&mut self) -> (TaskHandle, bool) {
        let preempted = self.cancel();
        let handle = TaskHandle::new();
        self.current = Some(handle.clone());
        (handle, preempted)
    }

    /// Returns true when a task was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Clears the slot only while it still belongs to `id`.
    pub fn clear_if(&mut self, id: Uuid) -> bool {
        if self.current_id() == Some(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|handle| handle.id())
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_cancels_previous() {
        let mut slot = TaskSlot::new();
        let (first, preempted) = slot.replace();
        assert!(!preempted);
        assert!(!first.is_cancelled());

        let (second, preempted) = slot.replace();
        assert!(preempted);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(slot.current_id(), Some(second.id()));
    }

    #[test]
    fn test_stale_clear_keeps_newer_handle() {
        let mut slot = TaskSlot::new();
        let (first, _) = slot.replace();
        let (second, _) = slot.replace();

        assert!(!slot.clear_if(first.id()));
        assert_eq!(slot.current_id(), Some(second.id()));

        assert!(slot.clear_if(second.id()));
        assert!(!slot.is_running());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut slot = TaskSlot::new();
        let (handle, _) = slot.replace();
        assert!(slot.cancel());
        assert!(handle.is_cancelled());
        assert!(!slot.cancel());
        assert!(!slot.is_running());
    }
}
