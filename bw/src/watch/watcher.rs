//! Structural diff of project record snapshots

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DetectionConfig;
use crate::domain::{Chapter, ChangeNotice, Origin, ProjectRecord};

/// Deep-diffs two snapshots into field-level change notices
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    max_depth: usize,
}

impl Default for ChangeWatcher {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}

impl ChangeWatcher {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            max_depth: config.max_diff_depth.max(1),
        }
    }

    /// Diff `prev` against `next`
    ///
    /// Returns nothing at all unless the change came from the user.
    pub fn diff(&self, prev: &ProjectRecord, next: &ProjectRecord, origin: Origin) -> Vec<ChangeNotice> {
        match origin {
            Origin::User => {}
            Origin::Assistant | Origin::System => {
                debug!(%origin, "ChangeWatcher::diff: non-user origin, ignoring");
                return Vec::new();
            }
        }

        let now = Utc::now();
        let empty = Value::Object(Map::new());
        let mut notices = Vec::new();
        for chapter in Chapter::ALL {
            let before = prev.answers.get(&chapter).unwrap_or(&empty);
            let after = next.answers.get(&chapter).unwrap_or(&empty);
            if before == after {
                continue;
            }
            let mut walk = Walk {
                chapter,
                max_depth: self.max_depth,
                now,
                out: &mut notices,
            };
            walk.value(chapter.key(), Some(before), Some(after), 1);
        }

        debug!(count = notices.len(), "ChangeWatcher::diff: done");
        notices
    }
}

struct Walk<'a> {
    chapter: Chapter,
    max_depth: usize,
    now: DateTime<Utc>,
    out: &'a mut Vec<ChangeNotice>,
}

impl Walk<'_> {
    fn value(&mut self, path: &str, before: Option<&Value>, after: Option<&Value>, depth: usize) {
        if before == after {
            return;
        }

        // Plain objects on both sides recurse; arrays and scalars are atomic
        if let (Some(Value::Object(a)), Some(Value::Object(b)), true) = (before, after, depth < self.max_depth) {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{}.{}", path, key);
                self.value(&child, a.get(key), b.get(key), depth + 1);
            }
            return;
        }

        self.out.push(ChangeNotice {
            field_path: path.to_string(),
            chapter: self.chapter,
            previous_value: before.cloned(),
            new_value: after.cloned(),
            confidence: 1.0,
            origin: Origin::User,
            timestamp: self.now,
        });
    }
}
