// adbwatch-wire: Async transport for the adb server's smart-socket protocol

pub mod codec;
pub mod dialer;
pub mod error;

pub use codec::{MAX_MESSAGE_LEN, MessageCodec, read_status_failure_as_error};
pub use dialer::{DEFAULT_HOST, DEFAULT_PORT, Dialer, TcpDialer};
pub use error::Error;
