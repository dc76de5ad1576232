use std::collections::VecDeque;
use std::fmt::Display;

pub const CONSOLE_LINES: usize = 20;

/// Newest-first log shown in the form's console field.
#[derive(Debug, Clone, Default)]
pub struct ConsoleBuffer {
    entries: VecDeque<String>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        ConsoleBuffer {
            entries: VecDeque::new(),
        }
    }

    pub fn with_greeting<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let mut console = Self::new();
        console.append(parts);
        console
    }

    /// Joins `parts` with single spaces, terminates the entry with a newline
    /// and puts it in front of everything already logged.
    pub fn append<I>(&mut self, parts: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let mut entry = parts
            .into_iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        entry.push('\n');
        self.entries.push_front(entry);
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn text(&self) -> String {
        self.entries.iter().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_prepends_and_keeps_previous_content() {
        let mut console = ConsoleBuffer::new();
        console.append(["first"]);
        let before = console.text();

        console.append(["second", "entry"]);
        let after = console.text();

        assert!(after.starts_with("second entry\n"));
        assert_eq!(&after["second entry\n".len()..], before);
        assert_eq!(console.latest(), Some("second entry\n"));
        assert_eq!(console.len(), 2);
    }

    #[test]
    fn test_append_mixed_displayables() {
        let mut console = ConsoleBuffer::new();
        let parts: [&dyn Display; 3] = [&1, &"of", &3.5];
        console.append(parts);
        assert_eq!(console.text(), "1 of 3.5\n");
    }

    #[test]
    fn test_multiline_entry_is_one_entry() {
        let mut console = ConsoleBuffer::with_greeting(["hello"]);
        console.append(["Command executed successfully:\nhi\n"]);
        assert_eq!(console.len(), 2);
        assert_eq!(console.latest(), Some("Command executed successfully:\nhi\n\n"));
    }
}
