//! Idempotent driver registration.
//!
//! A registration attempt is a single linear sequence: fetch the current
//! identity, compare, and write only when nobody is registered or the name
//! differs. Registering the name that is already held never issues a write.
//!
//! At most one attempt runs at a time; a second attempt made while the first
//! is in flight returns [`RegistrationOutcome::Busy`] without touching the
//! network. The fetched identity is still only a snapshot: another client may
//! change it before our write lands.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::console::{Notice, OperatorConsole};
use crate::error::TransportError;
use crate::models::RegistrationRequest;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Empty or cancelled input; nothing was sent.
    Rejected,
    /// Another attempt was still in flight; nothing was sent.
    Busy,
    /// The server already holds this name; no write was issued.
    AlreadyRegistered,
    /// The write succeeded.
    Registered,
    /// The write was refused or failed in transit.
    Failed,
    /// The identity check failed; no write was issued.
    FetchFailed,
}

pub struct RegistrationClient<T, C> {
    transport: T,
    console: C,
    in_flight: Mutex<()>,
}

impl<T, C> RegistrationClient<T, C>
where
    T: Transport,
    C: OperatorConsole,
{
    pub fn new(transport: T, console: C) -> Self {
        Self {
            transport,
            console,
            in_flight: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub async fn fetch_identity(&self) -> Result<Option<String>, TransportError> {
        self.transport.fetch_driver_name().await
    }

    /// Re-read the identity and show it. On failure the display is left as is.
    pub async fn refresh_display(&self) -> Option<String> {
        match self.fetch_identity().await {
            Ok(name) => {
                self.console.show_driver_name(name.as_deref());
                name
            }
            Err(e) => {
                self.report("fetching driver name", &e);
                None
            }
        }
    }

    /// Register `input` unless the server already holds it.
    ///
    /// `None` stands for a cancelled prompt.
    pub async fn register(&self, input: Option<&str>) -> RegistrationOutcome {
        let Some(name) = input.map(str::trim).filter(|n| !n.is_empty()) else {
            debug!("registration input empty or cancelled");
            return RegistrationOutcome::Rejected;
        };

        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!(name, "registration already in flight, ignoring");
            return RegistrationOutcome::Busy;
        };

        let current = match self.fetch_identity().await {
            Ok(current) => current,
            Err(e) => {
                self.report("fetching driver name", &e);
                return RegistrationOutcome::FetchFailed;
            }
        };

        if current.as_deref().map(str::trim) == Some(name) {
            info!(name, "driver already registered");
            self.console.alert(Notice::AlreadyRegistered);
            return RegistrationOutcome::AlreadyRegistered;
        }

        info!(name, previous = ?current, "registering driver");
        match self
            .transport
            .register_driver(&RegistrationRequest::new(name))
            .await
        {
            Ok(result) if result.success => {
                self.console.alert(Notice::Registered);
                self.refresh_display().await;
                RegistrationOutcome::Registered
            }
            Ok(result) => {
                warn!(name, reason = ?result.error, "server refused registration");
                self.console.alert(Notice::RegistrationFailed);
                RegistrationOutcome::Failed
            }
            Err(e) => {
                self.report("registering driver", &e);
                self.console.alert(Notice::RegistrationFailed);
                RegistrationOutcome::Failed
            }
        }
    }

    fn report(&self, action: &str, err: &TransportError) {
        self.console.diagnostic(&format!("Error {action}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeTransport, RecordingConsole, RegisterBehavior};

    fn client(transport: FakeTransport) -> RegistrationClient<FakeTransport, RecordingConsole> {
        RegistrationClient::new(transport, RecordingConsole::default())
    }

    #[tokio::test]
    async fn registers_when_absent() {
        let c = client(FakeTransport::new());

        assert_eq!(
            c.register(Some("X")).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(c.transport().writes(), vec!["X"]);
        assert_eq!(c.transport().identity().as_deref(), Some("X"));
        assert_eq!(c.console().alerts(), vec![Notice::Registered]);
        // success triggers a display refresh
        assert_eq!(c.console().displayed(), vec![Some("X".to_string())]);
    }

    #[tokio::test]
    async fn same_name_twice_writes_once() {
        let c = client(FakeTransport::new());

        c.register(Some("X")).await;
        assert_eq!(
            c.register(Some("X")).await,
            RegistrationOutcome::AlreadyRegistered
        );
        assert_eq!(c.transport().writes().len(), 1);
        assert_eq!(
            c.console().alerts(),
            vec![Notice::Registered, Notice::AlreadyRegistered]
        );
    }

    #[tokio::test]
    async fn different_name_overwrites() {
        let c = client(FakeTransport::new().with_identity("X"));

        assert_eq!(
            c.register(Some("Y")).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(c.transport().writes(), vec!["Y"]);
        assert_eq!(c.transport().identity().as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn empty_or_cancelled_input_makes_no_calls() {
        let c = client(FakeTransport::new().with_identity("X"));

        for input in [None, Some(""), Some("   ")] {
            assert_eq!(c.register(input).await, RegistrationOutcome::Rejected);
        }
        assert_eq!(c.transport().fetches(), 0);
        assert!(c.transport().writes().is_empty());
        assert_eq!(c.transport().identity().as_deref(), Some("X"));
        assert!(c.console().alerts().is_empty());
    }

    #[tokio::test]
    async fn name_is_trimmed_before_compare() {
        let c = client(FakeTransport::new().with_identity("Alice"));
        assert_eq!(
            c.register(Some("  Alice ")).await,
            RegistrationOutcome::AlreadyRegistered
        );
        assert!(c.transport().writes().is_empty());
    }

    #[tokio::test]
    async fn stored_name_is_trimmed_before_compare() {
        let c = client(FakeTransport::new().with_identity("Alice \n"));
        assert_eq!(
            c.register(Some("Alice")).await,
            RegistrationOutcome::AlreadyRegistered
        );
        assert!(c.transport().writes().is_empty());
        assert_eq!(c.console().alerts(), vec![Notice::AlreadyRegistered]);
    }

    #[tokio::test]
    async fn server_refusal_reports_failure() {
        let c = client(
            FakeTransport::new().with_register(RegisterBehavior::Refuse("no face".into())),
        );

        assert_eq!(c.register(Some("X")).await, RegistrationOutcome::Failed);
        assert_eq!(c.console().alerts(), vec![Notice::RegistrationFailed]);
        assert_eq!(c.transport().identity(), None);
        // no refresh after a failure
        assert!(c.console().displayed().is_empty());
    }

    #[tokio::test]
    async fn transport_error_on_write_reports_failure_without_retry() {
        let c = client(FakeTransport::new().with_register(RegisterBehavior::Error));

        assert_eq!(c.register(Some("X")).await, RegistrationOutcome::Failed);
        assert_eq!(c.transport().writes().len(), 1);
        assert_eq!(c.console().alerts(), vec![Notice::RegistrationFailed]);
        assert_eq!(c.console().diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_write() {
        let c = client(FakeTransport::new().failing_fetch());

        assert_eq!(c.register(Some("X")).await, RegistrationOutcome::FetchFailed);
        assert!(c.transport().writes().is_empty());
        assert!(c.console().alerts().is_empty());
        assert!(c.console().diagnostics()[0].starts_with("Error fetching driver name"));
    }

    #[tokio::test]
    async fn concurrent_attempts_are_serialized() {
        let c = client(FakeTransport::new());

        let (first, second) = tokio::join!(c.register(Some("X")), c.register(Some("X")));

        assert_eq!(first, RegistrationOutcome::Registered);
        assert_eq!(second, RegistrationOutcome::Busy);
        assert_eq!(c.transport().writes().len(), 1);
    }

    #[tokio::test]
    async fn guard_is_released_after_attempt() {
        let c = client(FakeTransport::new().with_register(RegisterBehavior::Error));
        c.register(Some("X")).await;
        assert_ne!(c.register(Some("X")).await, RegistrationOutcome::Busy);
    }

    #[tokio::test]
    async fn refresh_shows_placeholder_for_absent() {
        let c = client(FakeTransport::new());
        assert_eq!(c.refresh_display().await, None);
        assert_eq!(c.console().displayed(), vec![None]);
    }

    #[tokio::test]
    async fn refresh_failure_leaves_display_alone() {
        let c = client(FakeTransport::new().failing_fetch());
        c.refresh_display().await;
        assert!(c.console().displayed().is_empty());
        assert_eq!(c.console().diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn alice_scenario() {
        let c = client(FakeTransport::new());
        c.refresh_display().await;

        assert_eq!(
            c.register(Some("Alice")).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(
            c.register(Some("Alice")).await,
            RegistrationOutcome::AlreadyRegistered
        );

        assert_eq!(c.transport().writes(), vec!["Alice"]);
        assert_eq!(
            c.console().displayed(),
            vec![None, Some("Alice".to_string())]
        );
        assert_eq!(
            c.console().alerts(),
            vec![Notice::Registered, Notice::AlreadyRegistered]
        );
    }
}
