// ── Notification ledger ──
//
// Append-only, monotonically numbered log of fall notifications. The
// sequence lives behind a `watch` channel: appends validate and publish
// under the channel's lock, readers get `Arc` snapshots that later
// appends never touch.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::Notification;
use crate::stream::NotificationStream;

/// Append-only notification log with copy-on-write snapshots.
pub struct NotificationLedger {
    entries: watch::Sender<Arc<Vec<Notification>>>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(Vec::new()));
        Self { entries }
    }

    /// Append a batch whose ids the caller has already assigned.
    ///
    /// Ids must be strictly increasing within the batch and strictly greater
    /// than the current maximum. On violation nothing is stored. Returns
    /// the number of notifications appended.
    pub fn append(&self, batch: Vec<Notification>) -> Result<usize, CoreError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        let mut violation = None;

        // `send_if_modified` holds the channel's write lock for the whole
        // closure, so validation and publish are one step.
        self.entries.send_if_modified(|entries| {
            let mut last = entries.last().map_or(0, |n| n.id);
            for n in &batch {
                if n.id <= last {
                    violation = Some(CoreError::InvariantViolation {
                        message: format!(
                            "notification id {} is not greater than {last}",
                            n.id
                        ),
                    });
                    return false;
                }
                last = n.id;
            }
            // Clones only when a reader still holds the previous snapshot.
            Arc::make_mut(entries).extend(batch);
            true
        });

        match violation {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Point-in-time copy of the whole log, oldest first.
    pub fn snapshot(&self) -> Arc<Vec<Notification>> {
        self.entries.borrow().clone()
    }

    /// Number of notifications recorded (the fall-event counter).
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest id issued so far, `0` when empty.
    pub fn last_id(&self) -> u64 {
        self.entries.borrow().last().map_or(0, |n| n.id)
    }

    /// The id the next notification should carry.
    pub fn next_id(&self) -> u64 {
        self.last_id().saturating_add(1)
    }

    /// Subscribe to ledger changes.
    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream::new(self.entries.subscribe())
    }
}

impl Default for NotificationLedger {
    fn default() -> Self {
        Self::new()
    }
}
