// ── Tracking session ──
//
// Opens `host:track-devices` and decodes the device lists the server
// pushes afterwards, one per message.

use adbwatch_wire::{Dialer, MessageCodec, read_status_failure_as_error};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::error::WatchError;
use crate::states::DeviceStates;

/// Host service that streams the device list on every change.
pub const TRACK_DEVICES: &str = "host:track-devices";

/// A live `host:track-devices` connection.
///
/// Dropping it closes the connection.
pub struct TrackingSession<C> {
    framed: Framed<C, MessageCodec>,
}

/// Dial the server, request device tracking, and check the status.
///
/// On any failure the connection is dropped before returning.
pub async fn open_tracking_session<D: Dialer>(
    dialer: &D,
) -> Result<TrackingSession<D::Conn>, WatchError> {
    let conn = dialer.dial().await.map_err(WatchError::Dial)?;
    let mut framed = Framed::new(conn, MessageCodec);

    framed.send(TRACK_DEVICES).await?;
    read_status_failure_as_error(&mut framed, TRACK_DEVICES).await?;

    tracing::debug!(command = TRACK_DEVICES, "tracking session open");
    Ok(TrackingSession { framed })
}

impl<C> TrackingSession<C>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    /// Wait for the next device list.
    ///
    /// A server that closes the stream between messages is reported as
    /// [`WatchError::ConnectionReset`].
    pub async fn next_states(&mut self) -> Result<DeviceStates, WatchError> {
        let payload = self
            .framed
            .next()
            .await
            .ok_or(WatchError::ConnectionReset)??;

        let text = String::from_utf8_lossy(&payload);
        tracing::trace!(payload = %text, "device list message");
        DeviceStates::parse(&text)
    }
}
