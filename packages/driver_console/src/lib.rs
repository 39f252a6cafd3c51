// Library interface for driver_console
// Streams the server's state log and registers the driver identity

pub mod config;
pub mod console;
pub mod error;
pub mod feed;
pub mod models;
pub mod registration;
pub mod sse;
pub mod state_log;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use console::{LogView, Notice, OperatorConsole, TerminalConsole};
pub use error::TransportError;
pub use feed::{ChannelStatus, StateStreamConsumer};
pub use registration::{RegistrationClient, RegistrationOutcome};
pub use state_log::{FrameOutcome, LogState};
pub use transport::{Endpoints, HttpTransport, Transport};
