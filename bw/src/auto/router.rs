//! Queue for system-initiated turns

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::RouterConfig;
use crate::domain::{ArchitectEvent, Chapter};

#[derive(Debug)]
struct Pending {
    seq: u64,
    event: ArchitectEvent,
}

/// Debounced, deduplicated, rate-limited auto-turn queue
///
/// Events are deduplicated by `(type, chapter, payload)` within a rolling
/// window. A flush happens once the queue has been quiet for the debounce
/// period; it delivers at most one event, the most urgent, and drops the
/// rest. Anything due within the minimum spacing of the previous delivery
/// is dropped rather than deferred, as is anything over the per-chapter cap.
#[derive(Debug)]
pub struct EventRouter {
    debounce: Duration,
    dedupe_window: Duration,
    min_spacing: Duration,
    per_chapter_cap: u32,
    pending: Vec<Pending>,
    seen: VecDeque<(String, Instant)>,
    last_enqueue: Option<Instant>,
    last_delivered: Option<Instant>,
    delivered_per_chapter: HashMap<Chapter, u32>,
    next_seq: u64,
}

impl EventRouter {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            debounce: config.debounce(),
            dedupe_window: config.dedupe_window(),
            min_spacing: config.min_spacing(),
            per_chapter_cap: config.per_chapter_cap,
            pending: Vec::new(),
            seen: VecDeque::new(),
            last_enqueue: None,
            last_delivered: None,
            delivered_per_chapter: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Queue an event; returns false when it duplicates a recent one
    pub fn enqueue(&mut self, event: ArchitectEvent, now: Instant) -> bool {
        debug!(event_type = %event.event_type, chapter = ?event.chapter, "EventRouter::enqueue: called");
        while let Some((_, at)) = self.seen.front() {
            if now.duration_since(*at) < self.dedupe_window {
                break;
            }
            self.seen.pop_front();
        }

        let key = event.dedupe_key();
        if self.seen.iter().any(|(k, _)| *k == key) {
            debug!(%key, "EventRouter::enqueue: duplicate within window");
            return false;
        }
        self.seen.push_back((key, now));

        self.pending.push(Pending {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
        self.last_enqueue = Some(now);
        true
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
        self.last_enqueue.map(|t| t + self.debounce)
    }

    /// Auto-turns delivered so far in a chapter
    pub fn delivered_in(&self, chapter: Chapter) -> u32 {
        self.delivered_per_chapter.get(&chapter).copied().unwrap_or(0)
    }

    /// Flush when due and the session gates are open
    ///
    /// While `gates_open` is false, pending events are held untouched.
    pub fn poll(&mut self, now: Instant, gates_open: bool) -> Option<ArchitectEvent> {
        if !self.deadline().is_some_and(|d| now >= d) {
            return None;
        }
        if !gates_open {
            debug!(pending = self.pending.len(), "EventRouter::poll: gates closed, holding");
            return None;
        }

        let mut batch = std::mem::take(&mut self.pending);
        self.last_enqueue = None;
        // Most urgent first, then oldest
        batch.sort_by(|a, b| b.event.priority.cmp(&a.event.priority).then(a.seq.cmp(&b.seq)));

        let mut delivered = None;
        for Pending { event, .. } in batch {
            if delivered.is_some() {
                debug!(event_type = %event.event_type, "EventRouter::poll: dropped, batch already delivered");
                continue;
            }
            if let Some(last) = self.last_delivered {
                let since = now.duration_since(last);
                if since < self.min_spacing {
                    info!(
                        event_type = %event.event_type,
                        since_ms = since.as_millis() as u64,
                        "EventRouter: dropped, minimum spacing not met"
                    );
                    continue;
                }
            }
            if let Some(chapter) = event.chapter {
                if self.delivered_in(chapter) >= self.per_chapter_cap {
                    info!(event_type = %event.event_type, %chapter, "EventRouter: dropped, chapter cap reached");
                    continue;
                }
                *self.delivered_per_chapter.entry(chapter).or_insert(0) += 1;
            }
            self.last_delivered = Some(now);
            delivered = Some(event);
        }

        if let Some(event) = &delivered {
            debug!(event_type = %event.event_type, id = %event.id, "EventRouter::poll: delivering");
        }
        delivered
    }
}
