//! Bounded collector for human-readable repair descriptions.
//!
//! Every strategy records one entry per applied repair. The collector stores
//! at most `cap` entries; further repairs are still counted so callers can
//! report how much was suppressed. Pathological input (thousands of
//! occurrences of the same malformation) therefore cannot grow the log
//! without limit.

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: Vec<String>,
    cap: usize,
    applied: usize,
}

impl DiagnosticLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap,
            applied: 0,
        }
    }

    /// Record one applied repair. Entries past the cap are counted, not stored.
    pub fn push(&mut self, message: String) {
        self.applied += 1;
        if self.entries.len() < self.cap {
            self.entries.push(message);
        }
    }

    /// Total repairs recorded, including those past the cap.
    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.applied == 0
    }

    /// Repairs that were applied but not stored.
    pub fn suppressed(&self) -> usize {
        self.applied.saturating_sub(self.entries.len())
    }

    /// Consume the log, appending a single summary line when entries were
    /// suppressed. The summary replaces the last stored entry so the result
    /// never exceeds the cap.
    pub fn into_entries(self) -> Vec<String> {
        let suppressed = self.suppressed();
        let mut entries = self.entries;
        if suppressed > 0 {
            if let Some(last) = entries.last_mut() {
                *last = format!("{last} (+{suppressed} further repairs of this kind)");
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_past_cap_without_storing() {
        let mut log = DiagnosticLog::new(3);
        for i in 0..10 {
            log.push(format!("repair {i}"));
        }
        assert_eq!(log.applied(), 10);
        assert_eq!(log.suppressed(), 7);
        let entries = log.into_entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[2].contains("+7 further repairs"));
    }

    #[test]
    fn under_cap_is_verbatim() {
        let mut log = DiagnosticLog::new(20);
        log.push("one".to_string());
        log.push("two".to_string());
        assert_eq!(log.into_entries(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn empty_log() {
        let log = DiagnosticLog::new(20);
        assert!(log.is_empty());
        assert!(log.into_entries().is_empty());
    }
}
