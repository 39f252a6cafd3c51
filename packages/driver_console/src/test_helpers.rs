//! In-memory fakes for the transport and operator surfaces.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use futures::stream;

use crate::console::{LogView, Notice, OperatorConsole};
use crate::error::TransportError;
use crate::models::{RegistrationRequest, RegistrationResult};
use crate::transport::{FeedStream, Transport};

#[derive(Debug, Clone)]
pub enum RegisterBehavior {
    /// Store the name and answer `success: true`.
    Accept,
    /// Answer `success: false` with the given reason.
    Refuse(String),
    /// Fail in transit.
    Error,
}

#[derive(Debug, Clone)]
enum FeedItem {
    Frame(String),
    Error,
}

/// Server stand-in that records every call.
pub struct FakeTransport {
    identity: Mutex<Option<String>>,
    register: RegisterBehavior,
    fetch_fails: bool,
    feed_open_fails: bool,
    feed: Vec<FeedItem>,
    fetches: AtomicUsize,
    feed_opens: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            identity: Mutex::new(None),
            register: RegisterBehavior::Accept,
            fetch_fails: false,
            feed_open_fails: false,
            feed: Vec::new(),
            fetches: AtomicUsize::new(0),
            feed_opens: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identity(self, name: &str) -> Self {
        *self.identity.lock().unwrap() = Some(name.to_string());
        self
    }

    pub fn with_register(mut self, behavior: RegisterBehavior) -> Self {
        self.register = behavior;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    pub fn failing_feed_open(mut self) -> Self {
        self.feed_open_fails = true;
        self
    }

    pub fn with_frames<const N: usize>(mut self, frames: [&str; N]) -> Self {
        self.feed
            .extend(frames.iter().map(|f| FeedItem::Frame(f.to_string())));
        self
    }

    pub fn with_feed_error(mut self) -> Self {
        self.feed.push(FeedItem::Error);
        self
    }

    pub fn identity(&self) -> Option<String> {
        self.identity.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn feed_opens(&self) -> usize {
        self.feed_opens.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    async fn fetch_driver_name(&self) -> Result<Option<String>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // suspend like a real request would
        tokio::task::yield_now().await;
        if self.fetch_fails {
            return Err(TransportError::Unavailable);
        }
        Ok(self.identity())
    }

    async fn register_driver(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResult, TransportError> {
        self.writes.lock().unwrap().push(request.name.clone());
        tokio::task::yield_now().await;
        match &self.register {
            RegisterBehavior::Accept => {
                *self.identity.lock().unwrap() = Some(request.name.clone());
                Ok(RegistrationResult::ok())
            }
            RegisterBehavior::Refuse(reason) => Ok(RegistrationResult::failed(reason.clone())),
            RegisterBehavior::Error => Err(anyhow::anyhow!("connection reset").into()),
        }
    }

    async fn open_state_feed(&self) -> Result<FeedStream, TransportError> {
        self.feed_opens.fetch_add(1, Ordering::SeqCst);
        if self.feed_open_fails {
            return Err(TransportError::Unavailable);
        }
        let items: Vec<Result<String, TransportError>> = self
            .feed
            .iter()
            .map(|item| match item {
                FeedItem::Frame(f) => Ok(f.clone()),
                FeedItem::Error => Err(anyhow::anyhow!("feed dropped").into()),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

#[derive(Debug, Default)]
pub struct RecordingView {
    pub lines: Vec<String>,
    pub scrolls: usize,
}

impl LogView for RecordingView {
    fn append_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn scroll_to_end(&mut self) {
        self.scrolls += 1;
    }
}

#[derive(Debug, Default)]
pub struct RecordingConsole {
    displayed: Mutex<Vec<Option<String>>>,
    alerts: Mutex<Vec<Notice>>,
    diagnostics: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub fn displayed(&self) -> Vec<Option<String>> {
        self.displayed.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Notice> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().unwrap().clone()
    }
}

impl OperatorConsole for RecordingConsole {
    fn show_driver_name(&self, name: Option<&str>) {
        self.displayed
            .lock()
            .unwrap()
            .push(name.map(str::to_string));
    }

    fn alert(&self, notice: Notice) {
        self.alerts.lock().unwrap().push(notice);
    }

    fn diagnostic(&self, message: &str) {
        self.diagnostics.lock().unwrap().push(message.to_string());
    }
}
