// adbwatch-core: Device-state tracking on top of adbwatch-wire.

pub mod config;
pub mod diff;
pub mod error;
pub mod restart;
pub mod session;
pub mod states;
pub mod stream;
pub mod watcher;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ReconnectConfig, WatcherConfig};
pub use diff::{ChangeKind, DeviceStateChange, diff};
pub use error::WatchError;
pub use restart::{AdbServerLauncher, HostRestarter, RestartError};
pub use session::{TRACK_DEVICES, TrackingSession, open_tracking_session};
pub use states::DeviceStates;
pub use stream::DeviceEventStream;
pub use watcher::{DeviceWatcher, WatcherState};

pub use adbwatch_wire::{Dialer, Error as WireError, TcpDialer};
