use std::collections::VecDeque;

/// Server-reported project stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    #[default]
    NotStarted,
    Running,
    Done,
}

impl StatusCode {
    /// Any code other than "not started" or "running" is treated as finished.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => StatusCode::NotStarted,
            1 => StatusCode::Running,
            _ => StatusCode::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub timestamp: String,
}

/// One status poll result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectStatus {
    pub code: StatusCode,
    pub message: Option<String>,
    pub completion: u8,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    #[default]
    Idle,
    Polling,
    Terminated,
}

/// Progress bar and log table of a running project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusView {
    progress: u8,
    message: Option<String>,
    log: VecDeque<LogEntry>,
    /// Number of server log entries consumed so far, including evicted ones.
    consumed: usize,
    /// Entries ever appended to `log`; never decreases, even on a log reset.
    appended: usize,
}

impl StatusView {
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Running count of entries appended to the log view. The newest
    /// `appended - n` entries are the ones added since the count was `n`.
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub(crate) fn set_initial_progress(&mut self, completion: u8) {
        self.progress = completion.min(100);
    }

    /// Applies a poll result: progress only moves forward, and log entries
    /// not yet shown are appended in server order, keeping at most
    /// `max_entries`.
    pub(crate) fn apply(&mut self, status: &ProjectStatus, max_entries: usize) {
        if status.completion > 0 {
            self.progress = self.progress.max(status.completion.min(100));
        }
        if status.message.is_some() {
            self.message = status.message.clone();
        }

        if status.log.len() < self.consumed {
            // Server log was reset; take it as-is.
            self.log.clear();
            self.consumed = 0;
        }
        for entry in &status.log[self.consumed..] {
            self.log.push_back(entry.clone());
            self.appended += 1;
        }
        self.consumed = status.log.len();

        while self.log.len() > max_entries {
            self.log.pop_front();
        }
    }
}
