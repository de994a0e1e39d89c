//! Debounced change-notice buffer

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::TriggerConfig;
use crate::domain::ChangeNotice;

/// Buffers change notices until the user stops editing
///
/// Every insertion resets the debounce timer. A flush keeps the most recent
/// value per field path and, when more than one notice triggered it, caps
/// delivery to the most recently timestamped notices.
#[derive(Debug)]
pub struct TriggerQueue {
    debounce: Duration,
    max_delivered: usize,
    pending: Vec<ChangeNotice>,
    last_insert: Option<Instant>,
}

impl TriggerQueue {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            debounce: config.debounce(),
            max_delivered: config.max_delivered.max(1),
            pending: Vec::new(),
            last_insert: None,
        }
    }

    pub fn push(&mut self, notice: ChangeNotice, now: Instant) {
        debug!(field_path = %notice.field_path, "TriggerQueue::push: called");
        self.pending.push(notice);
        self.last_insert = Some(now);
    }

    pub fn extend(&mut self, notices: impl IntoIterator<Item = ChangeNotice>, now: Instant) {
        for notice in notices {
            self.push(notice, now);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// When the pending batch becomes due
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_insert.map(|t| t + self.debounce)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|d| now >= d)
    }

    /// Flush if the quiet period has elapsed, otherwise return nothing
    pub fn poll(&mut self, now: Instant) -> Vec<ChangeNotice> {
        if self.is_due(now) { self.flush() } else { Vec::new() }
    }

    /// Flush unconditionally; delivered most recent first
    pub fn flush(&mut self) -> Vec<ChangeNotice> {
        let batch = std::mem::take(&mut self.pending);
        self.last_insert = None;
        let batch_size = batch.len();

        // Last write per path wins; remember insertion order for ties
        let mut latest: HashMap<String, (usize, ChangeNotice)> = HashMap::new();
        for (seq, notice) in batch.into_iter().enumerate() {
            latest.insert(notice.field_path.clone(), (seq, notice));
        }
        let mut deduped: Vec<(usize, ChangeNotice)> = latest.into_values().collect();
        deduped.sort_by(|(sa, a), (sb, b)| b.timestamp.cmp(&a.timestamp).then(sb.cmp(sa)));

        if batch_size > 1 && deduped.len() > self.max_delivered {
            debug!(
                batch_size,
                dropped = deduped.len() - self.max_delivered,
                "TriggerQueue::flush: capping delivery"
            );
            deduped.truncate(self.max_delivered);
        }

        debug!(batch_size, delivered = deduped.len(), "TriggerQueue::flush: done");
        deduped.into_iter().map(|(_, notice)| notice).collect()
    }
}
