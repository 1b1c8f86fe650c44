//! Request/response channel for user-supplied input.
//!
//! # Responsibility
//! - Issue one outstanding password or free-text request per kind.
//! - Deliver the answer, or a distinct cancellation, to the waiting flow.
//!
//! # Invariants
//! - At most one open request per [`PromptKind`].
//! - Empty submissions never resolve a request.
//! - A request whose waiting side was dropped no longer counts as open.
//! - Cancellation never mutates document, security or codec state.

use log::debug;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};

/// Kind of input being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Password,
    Text,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Text => "text",
        }
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptTicket {
    kind: PromptKind,
    serial: u64,
}

impl PromptTicket {
    pub fn kind(&self) -> PromptKind {
        self.kind
    }
}

/// Terminal answer delivered to the waiting side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Value(String),
    Cancelled,
}

/// Returned when the request cannot be opened or was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptError {
    /// A request of this kind is already outstanding.
    Busy(PromptKind),
    /// The user dismissed the request, or the broker dropped it.
    Cancelled,
}

/// Waiting half of an open request.
#[derive(Debug)]
pub struct PendingInput {
    ticket: PromptTicket,
    title: String,
    receiver: Receiver<PromptAnswer>,
    _alive: Arc<()>,
}

impl PendingInput {
    pub fn ticket(&self) -> PromptTicket {
        self.ticket
    }

    /// Title shown by the presenting dialog.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Blocks until the request is resolved or rejected.
    ///
    /// A broker dropped with the request still open counts as cancellation.
    pub fn wait(self) -> Result<String, PromptError> {
        match self.receiver.recv() {
            Ok(PromptAnswer::Value(value)) => Ok(value),
            Ok(PromptAnswer::Cancelled) | Err(_) => Err(PromptError::Cancelled),
        }
    }

    /// Non-blocking variant of [`PendingInput::wait`]. `None` while open.
    pub fn try_take(&self) -> Option<Result<String, PromptError>> {
        match self.receiver.try_recv() {
            Ok(PromptAnswer::Value(value)) => Some(Ok(value)),
            Ok(PromptAnswer::Cancelled) => Some(Err(PromptError::Cancelled)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(PromptError::Cancelled)),
        }
    }
}

/// Issues and resolves input requests.
#[derive(Debug, Default)]
pub struct PromptBroker {
    next_serial: u64,
    open: HashMap<PromptKind, OpenRequest>,
}

#[derive(Debug)]
struct OpenRequest {
    ticket: PromptTicket,
    sender: Sender<PromptAnswer>,
    waiter: Weak<()>,
}

impl OpenRequest {
    fn is_abandoned(&self) -> bool {
        self.waiter.strong_count() == 0
    }
}

impl PromptBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a request of `kind`.
    ///
    /// # Errors
    /// - [`PromptError::Busy`] when one of the same kind is still open.
    pub fn open(&mut self, kind: PromptKind, title: impl Into<String>) -> Result<PendingInput, PromptError> {
        self.prune_abandoned(kind);
        if self.open.contains_key(&kind) {
            return Err(PromptError::Busy(kind));
        }

        self.next_serial += 1;
        let ticket = PromptTicket {
            kind,
            serial: self.next_serial,
        };
        let (sender, receiver) = mpsc::channel();
        let alive = Arc::new(());
        self.open.insert(
            kind,
            OpenRequest {
                ticket,
                sender,
                waiter: Arc::downgrade(&alive),
            },
        );
        debug!(
            "event=prompt_open module=prompt status=ok kind={} serial={}",
            kind.as_str(),
            ticket.serial
        );

        Ok(PendingInput {
            ticket,
            title: title.into(),
            receiver,
            _alive: alive,
        })
    }

    /// Returns whether a request of `kind` is outstanding.
    pub fn is_open(&self, kind: PromptKind) -> bool {
        self.open
            .get(&kind)
            .is_some_and(|request| !request.is_abandoned())
    }

    /// Resolves the request with `value`.
    ///
    /// Returns `false` when the ticket is stale or `value` is empty; an empty
    /// submission leaves the request open.
    pub fn submit(&mut self, ticket: PromptTicket, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        self.finish(ticket, PromptAnswer::Value(value))
    }

    /// Rejects the request. Returns `false` for a stale ticket.
    pub fn cancel(&mut self, ticket: PromptTicket) -> bool {
        self.finish(ticket, PromptAnswer::Cancelled)
    }

    fn finish(&mut self, ticket: PromptTicket, answer: PromptAnswer) -> bool {
        match self.open.get(&ticket.kind) {
            Some(request) if request.ticket == ticket => {}
            _ => return false,
        }

        let Some(OpenRequest { sender, .. }) = self.open.remove(&ticket.kind) else {
            return false;
        };
        let cancelled = answer == PromptAnswer::Cancelled;
        // The waiting side may already be gone; the request is closed either way.
        let _ = sender.send(answer);
        debug!(
            "event=prompt_close module=prompt status=ok kind={} serial={} cancelled={}",
            ticket.kind.as_str(),
            ticket.serial,
            cancelled
        );
        true
    }

    fn prune_abandoned(&mut self, kind: PromptKind) {
        let Some(request) = self.open.get(&kind) else {
            return;
        };
        if !request.is_abandoned() {
            return;
        }
        debug!(
            "event=prompt_close module=prompt status=abandoned kind={} serial={}",
            kind.as_str(),
            request.ticket.serial
        );
        self.open.remove(&kind);
    }
}

#[cfg(test)]
mod tests {
    use super::{PromptBroker, PromptError, PromptKind};

    #[test]
    fn submitted_value_reaches_waiter() {
        let mut broker = PromptBroker::new();
        let pending = broker.open(PromptKind::Password, "Enter password").unwrap();
        assert_eq!(pending.title(), "Enter password");
        assert!(broker.submit(pending.ticket(), "secret"));
        assert!(!broker.is_open(PromptKind::Password));
        assert_eq!(pending.wait(), Ok("secret".to_string()));
    }

    #[test]
    fn second_request_of_same_kind_is_busy() {
        let mut broker = PromptBroker::new();
        let _first = broker.open(PromptKind::Password, "a").unwrap();
        let err = broker.open(PromptKind::Password, "b").unwrap_err();
        assert_eq!(err, PromptError::Busy(PromptKind::Password));
        assert!(broker.open(PromptKind::Text, "c").is_ok());
    }

    #[test]
    fn empty_submission_keeps_request_open() {
        let mut broker = PromptBroker::new();
        let pending = broker.open(PromptKind::Text, "URL").unwrap();
        assert!(!broker.submit(pending.ticket(), ""));
        assert!(pending.try_take().is_none());
        assert!(broker.submit(pending.ticket(), "https://example.com"));
        assert_eq!(
            pending.try_take(),
            Some(Ok("https://example.com".to_string()))
        );
    }

    #[test]
    fn cancel_rejects_waiter() {
        let mut broker = PromptBroker::new();
        let pending = broker.open(PromptKind::Password, "pw").unwrap();
        assert!(broker.cancel(pending.ticket()));
        assert_eq!(pending.wait(), Err(PromptError::Cancelled));
        assert!(broker.open(PromptKind::Password, "again").is_ok());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut broker = PromptBroker::new();
        let first = broker.open(PromptKind::Password, "one").unwrap();
        broker.cancel(first.ticket());
        let second = broker.open(PromptKind::Password, "two").unwrap();
        assert!(!broker.submit(first.ticket(), "late"));
        assert!(broker.submit(second.ticket(), "fresh"));
        assert_eq!(second.wait(), Ok("fresh".to_string()));
    }

    #[test]
    fn dropped_request_frees_its_kind() {
        let mut broker = PromptBroker::new();
        let pending = broker.open(PromptKind::Password, "pw").unwrap();
        let stale = pending.ticket();
        drop(pending);

        assert!(!broker.is_open(PromptKind::Password));
        let reopened = broker.open(PromptKind::Password, "pw again").unwrap();
        assert!(!broker.submit(stale, "late"));
        assert!(broker.submit(reopened.ticket(), "fresh"));
        assert_eq!(reopened.wait(), Ok("fresh".to_string()));
    }

    #[test]
    fn dropped_broker_counts_as_cancellation() {
        let mut broker = PromptBroker::new();
        let pending = broker.open(PromptKind::Text, "title").unwrap();
        drop(broker);
        assert_eq!(pending.wait(), Err(PromptError::Cancelled));
    }
}
