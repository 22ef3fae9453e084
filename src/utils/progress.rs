//! Lightweight progress markers for playlist rewriting

use colored::Colorize;
use console::Term;

/// Number of entries between two progress markers
pub const DEFAULT_MARKER_INTERVAL: usize = 10;

/// Running entry counter that prints a `.` every `interval` entries
pub struct Progress {
    interval: usize,
    count: usize,
    term: Option<Term>,
}

impl Progress {
    /// Progress that writes markers to stdout
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            count: 0,
            term: Some(Term::stdout()),
        }
    }

    /// Progress that only counts, for quiet runs
    pub fn hidden() -> Self {
        Self {
            interval: DEFAULT_MARKER_INTERVAL,
            count: 0,
            term: None,
        }
    }

    /// Number of entries processed so far
    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Record one processed entry
    pub fn tick(&mut self) {
        self.count += 1;

        if self.interval == 0 || self.count % self.interval != 0 {
            return;
        }
        if let Some(term) = &self.term {
            // Markers are best effort
            let _ = term.write_str(".");
            let _ = term.flush();
        }
    }

    /// Terminate the marker line with the completion message
    pub fn finish(&self) {
        if let Some(term) = &self.term {
            let _ = term.write_line("");
            let _ = term.write_line(&format!("{}", "Done".green()));
        }
    }
}
