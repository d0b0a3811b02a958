// ── Device event stream ──
//
// Consumer side of the watcher's event channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::diff::DeviceStateChange;

/// The single reader of a [`DeviceWatcher`](crate::DeviceWatcher)'s events.
///
/// Yields changes in the order they were detected. Ends exactly once,
/// when the watcher terminates; check
/// [`DeviceWatcher::last_error`](crate::DeviceWatcher::last_error) at that
/// point to tell a clean shutdown from a failure.
pub struct DeviceEventStream {
    inner: ReceiverStream<DeviceStateChange>,
}

impl DeviceEventStream {
    pub(crate) fn new(receiver: mpsc::Receiver<DeviceStateChange>) -> Self {
        Self {
            inner: ReceiverStream::new(receiver),
        }
    }

    /// Wait for the next change. `None` once the watcher has terminated.
    pub async fn recv(&mut self) -> Option<DeviceStateChange> {
        self.inner.next().await
    }
}

impl Stream for DeviceEventStream {
    type Item = DeviceStateChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
