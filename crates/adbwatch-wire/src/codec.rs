//! Length-prefixed message framing for the adb smart-socket protocol.
//!
//! Every message, in either direction, is a 4-digit ASCII hex length
//! followed by that many payload bytes:
//!
//! ```text
//! 0012host:track-devices
//! ```
//!
//! Responses to a request start with a bare 4-byte status (`OKAY` or
//! `FAIL`). A `FAIL` is followed by a length-prefixed message explaining
//! why. [`read_status_failure_as_error`] handles that exchange; all later
//! traffic goes through [`MessageCodec`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::error::Error;

/// Largest payload that fits the 4-digit hex header.
pub const MAX_MESSAGE_LEN: usize = 0xFFFF;

const HEADER_LEN: usize = 4;
const STATUS_OKAY: &[u8; 4] = b"OKAY";
const STATUS_FAIL: &[u8; 4] = b"FAIL";

// ── Codec ────────────────────────────────────────────────────────────

/// `tokio_util` codec for adb length-prefixed messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Error> {
        let Some(header) = src.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let len = parse_length(header)?;

        let frame_len = HEADER_LEN + len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // Whatever is left is a truncated message.
        let expected = match src.get(..HEADER_LEN) {
            Some(header) => HEADER_LEN + parse_length(header)?,
            None => HEADER_LEN,
        };
        Err(Error::IncompleteMessage {
            expected,
            actual: src.len(),
        })
    }
}

impl Encoder<&str> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Error> {
        let len = item.len();
        if len > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong {
                len,
                max: MAX_MESSAGE_LEN,
            });
        }

        dst.reserve(HEADER_LEN + len);
        dst.put_slice(format!("{len:04x}").as_bytes());
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}

fn parse_length(header: &[u8]) -> Result<usize, Error> {
    let invalid = || Error::InvalidLength {
        header: String::from_utf8_lossy(header).into_owned(),
    };

    if !header.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let text = std::str::from_utf8(header).map_err(|_| invalid())?;
    usize::from_str_radix(text, 16).map_err(|_| invalid())
}

// ── Status handling ──────────────────────────────────────────────────

/// Read the status that answers `command`, turning `FAIL` into an error.
///
/// Must be called before anything has been decoded from `framed`: the
/// status is read straight off the underlying stream, bypassing the
/// codec's read buffer.
pub async fn read_status_failure_as_error<T>(
    framed: &mut Framed<T, MessageCodec>,
    command: &str,
) -> Result<(), Error>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    debug_assert!(framed.read_buffer().is_empty());

    let mut status = [0u8; HEADER_LEN];
    framed.get_mut().read_exact(&mut status).await?;

    match &status {
        STATUS_OKAY => Ok(()),
        STATUS_FAIL => {
            let message = framed.next().await.ok_or(Error::ConnectionClosed)??;
            Err(Error::CommandFailed {
                command: command.to_owned(),
                message: String::from_utf8_lossy(&message).into_owned(),
            })
        }
        other => Err(Error::UnexpectedStatus {
            command: command.to_owned(),
            status: String::from_utf8_lossy(other).into_owned(),
        }),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
