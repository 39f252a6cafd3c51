//! Consumer for the server's state push channel.
//!
//! Frames are filtered through a [`LogState`] and accepted entries are
//! forwarded to a [`LogView`]. Any channel failure is terminal: the consumer
//! moves to [`ChannelStatus::Closed`] and ignores every later frame. There is
//! no reconnection.

use futures::StreamExt;
use tracing::{debug, error, info};

use crate::console::LogView;
use crate::error::TransportError;
use crate::state_log::{FrameOutcome, LogState};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Open,
    Closed,
}

pub struct StateStreamConsumer {
    log: LogState,
    status: ChannelStatus,
}

impl StateStreamConsumer {
    pub fn new(log: LogState) -> Self {
        Self {
            log,
            status: ChannelStatus::Open,
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn log(&self) -> &LogState {
        &self.log
    }

    pub fn into_log(self) -> LogState {
        self.log
    }

    /// Handle one raw frame from the channel.
    pub fn on_frame(&mut self, raw: &str) -> FrameOutcome {
        if self.status == ChannelStatus::Closed {
            return FrameOutcome::Closed;
        }
        let outcome = self.log.accept(raw);
        debug!(?outcome, "state frame");
        outcome
    }

    /// Close the channel for good.
    pub fn on_error(&mut self, err: &TransportError) {
        if self.status == ChannelStatus::Closed {
            return;
        }
        error!(error = %err, "state feed failed, closing");
        self.status = ChannelStatus::Closed;
    }

    /// Subscribe and pump frames into `view` until the channel fails or ends.
    pub async fn run<T, V>(&mut self, transport: &T, view: &mut V) -> ChannelStatus
    where
        T: Transport,
        V: LogView + ?Sized,
    {
        if self.status == ChannelStatus::Closed {
            return self.status;
        }

        let mut frames = match transport.open_state_feed().await {
            Ok(frames) => frames,
            Err(e) => {
                self.on_error(&e);
                return self.status;
            }
        };

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(raw) => {
                    if let FrameOutcome::Appended(entry) = self.on_frame(&raw) {
                        view.append_line(&entry);
                        view.scroll_to_end();
                    }
                }
                Err(e) => {
                    self.on_error(&e);
                    return self.status;
                }
            }
        }

        info!(entries = self.log.len(), "state feed ended");
        self.status = ChannelStatus::Closed;
        self.status
    }
}

impl Default for StateStreamConsumer {
    fn default() -> Self {
        Self::new(LogState::new())
    }
}
