//! Byte-count progress for streamed downloads.

/// Streamed search results never report more than this before completion.
pub const STREAM_PROGRESS_CAP: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Advanced {
        received: u64,
        total: Option<u64>,
        percent: f64,
    },
    Completed,
}

/// Running byte count against an optional declared length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteProgress {
    received: u64,
    total: Option<u64>,
}

impl ByteProgress {
    pub fn new(total: Option<u64>) -> Self {
        Self { received: 0, total }
    }

    pub fn record(&mut self, bytes: usize) {
        self.received = self.received.saturating_add(bytes as u64);
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Percentage of the declared length, or 0 when the length is unknown.
    pub fn percent(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.received as f64 / total as f64 * 100.0).min(100.0),
            _ => 0.0,
        }
    }

    /// `percent` held below `STREAM_PROGRESS_CAP` until the stream completes.
    pub fn stream_percent(&self) -> f64 {
        self.percent().min(STREAM_PROGRESS_CAP)
    }

    pub fn event(&self, percent: f64) -> ProgressEvent {
        ProgressEvent::Advanced {
            received: self.received,
            total: self.total,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_percent_is_capped() {
        let mut progress = ByteProgress::new(Some(100));
        progress.record(50);
        assert_eq!(progress.stream_percent(), 50.0);
        progress.record(50);
        assert_eq!(progress.percent(), 100.0);
        assert_eq!(progress.stream_percent(), STREAM_PROGRESS_CAP);
    }

    #[test]
    fn unknown_length_reports_zero() {
        let mut progress = ByteProgress::new(None);
        progress.record(4096);
        assert_eq!(progress.percent(), 0.0);
        assert_eq!(progress.received(), 4096);

        let zero = ByteProgress::new(Some(0));
        assert_eq!(zero.percent(), 0.0);
    }

    #[test]
    fn overshoot_is_clamped() {
        let mut progress = ByteProgress::new(Some(10));
        progress.record(25);
        assert_eq!(progress.percent(), 100.0);
    }
}
