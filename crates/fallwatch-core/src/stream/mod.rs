// ── Reactive ledger stream ──
//
// Subscription type for consuming ledger changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Notification;

/// A subscription to the notification ledger.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct NotificationStream {
    current: Arc<Vec<Notification>>,
    receiver: watch::Receiver<Arc<Vec<Notification>>>,
}

impl NotificationStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Notification>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<Vec<Notification>> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<Vec<Notification>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next append, returning the new snapshot.
    /// Returns `None` once the ledger has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Notification>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait for the next append and return only the notifications added
    /// since the previous call (or since subscription).
    pub async fn next_batch(&mut self) -> Option<Vec<Notification>> {
        let seen = self.current.last().map_or(0, |n| n.id);
        let snap = self.changed().await?;
        Some(snap.iter().filter(|n| n.id > seen).cloned().collect())
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> NotificationWatchStream {
        NotificationWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the full ledger snapshot, first immediately and then once per
/// append.
pub struct NotificationWatchStream {
    inner: WatchStream<Arc<Vec<Notification>>>,
}

impl Stream for NotificationWatchStream {
    type Item = Arc<Vec<Notification>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
