use chrono::{DateTime, Local};

pub const HISTORY_WINDOW: usize = 11;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub command: String,
}

/// Names of routed commands, oldest first.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    max_entries: usize,
    entries: Vec<HistoryEntry>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            max_entries: 1000,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, command: &str) {
        self.entries.push(HistoryEntry {
            timestamp: Local::now(),
            command: command.to_string(),
        });

        // Maintain size limit
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn get_last_n(&self, n: usize) -> Vec<&HistoryEntry> {
        let n = n.min(self.entries.len());
        let start_idx = self.entries.len() - n;
        self.entries[start_idx..].iter().collect()
    }

    pub fn recent_names(&self) -> Vec<&str> {
        self.get_last_n(HISTORY_WINDOW)
            .into_iter()
            .map(|entry| entry.command.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataEvent {
    Initialised,
    Loaded,
    Saved,
}

impl MetadataEvent {
    pub fn label(&self) -> &'static str {
        match self {
            MetadataEvent::Initialised => "Initialisation",
            MetadataEvent::Loaded => "Loaded from file",
            MetadataEvent::Saved => "Saved to file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataEntry {
    pub timestamp: DateTime<Local>,
    pub event: MetadataEvent,
    pub elements: usize,
    pub detail: Option<String>,
}

impl std::fmt::Display for MetadataEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} - Elements: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event.label(),
            self.elements
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Append-only log of initialise/load/save events.
#[derive(Debug, Clone, Default)]
pub struct MetadataLog {
    entries: Vec<MetadataEntry>,
}

impl MetadataLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: MetadataEvent, elements: usize, detail: Option<String>) {
        self.entries.push(MetadataEntry {
            timestamp: Local::now(),
            event,
            elements,
            detail,
        });
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_names_window() {
        let mut history = CommandHistory::new();
        for i in 0..15 {
            history.record(&format!("cmd{}", i));
        }
        let names = history.recent_names();
        assert_eq!(names.len(), HISTORY_WINDOW);
        assert_eq!(names.first(), Some(&"cmd4"));
        assert_eq!(names.last(), Some(&"cmd14"));
    }

    #[test]
    fn test_history_limit() {
        let mut history = CommandHistory::new();
        for _ in 0..1005 {
            history.record("show");
        }
        assert_eq!(history.len(), 1000);
    }

    #[test]
    fn test_metadata_entry_format() {
        let mut log = MetadataLog::new();
        log.record(MetadataEvent::Initialised, 0, None);
        log.record(MetadataEvent::Saved, 3, Some("sha256 abcd".to_string()));
        let lines: Vec<String> = log.entries().iter().map(|e| e.to_string()).collect();
        assert!(lines[0].ends_with("] Initialisation - Elements: 0"));
        assert!(lines[1].ends_with("] Saved to file - Elements: 3 (sha256 abcd)"));
        assert!(lines[0].starts_with('['));
    }
}
