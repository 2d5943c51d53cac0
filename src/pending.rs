//! Single-slot request/callback correlation.
//!
//! Every operation kind that expects a callback owns one [`PendingSlot`]. A
//! new request of the same kind replaces the current completion instead of
//! queueing behind it; the replaced completion is abandoned and only its own
//! timer can still settle it.

use crate::error::{OperationKind, SessionError};
use log::{debug, warn};
use sfcore::types::callbacks::{AccountInfo, Connected, Disconnected, FriendAdded, LoggedOn, PersonaUpdate};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// Compensating action run when a completion times out.
pub type Rollback = Box<dyn FnOnce() + Send + 'static>;

type Outcome<T> = Result<T, SessionError>;

struct Completion<T> {
    id: u64,
    sender: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
    timer: Mutex<Option<AbortHandle>>,
}

impl<T> Completion<T> {
    /// Whoever takes the sender settles the completion; everyone else is late.
    fn take(&self) -> Option<oneshot::Sender<Outcome<T>>> {
        self.sender
            .lock()
            .expect("Mutex should not be poisoned")
            .take()
    }

    fn is_pending(&self) -> bool {
        self.sender
            .lock()
            .expect("Mutex should not be poisoned")
            .is_some()
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self
            .timer
            .lock()
            .expect("Mutex should not be poisoned")
            .take()
        {
            timer.abort();
        }
    }
}

pub(crate) struct PendingSlot<T> {
    kind: OperationKind,
    current: Mutex<Option<Arc<Completion<T>>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> PendingSlot<T> {
    pub(crate) fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            current: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Installs a fresh completion as the current one and arms its timer.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn begin(&self, timeout: Duration, rollback: Option<Rollback>) -> PendingOperation<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let completion = Arc::new(Completion {
            id,
            sender: Mutex::new(Some(tx)),
            timer: Mutex::new(None),
        });

        let previous = self
            .current
            .lock()
            .expect("Mutex should not be poisoned")
            .replace(completion.clone());
        if let Some(previous) = previous
            && previous.is_pending()
        {
            debug!(
                target: "Session/Pending",
                "{} #{} superseded by #{id}; it will only time out",
                self.kind, previous.id
            );
        }

        let kind = self.kind;
        let timed = completion.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(sender) = timed.take() {
                warn!(
                    target: "Session/Pending",
                    "{kind} #{} timed out after {timeout:?}", timed.id
                );
                if let Some(rollback) = rollback {
                    rollback();
                }
                let _ = sender.send(Err(SessionError::Timeout(kind)));
            }
        });
        *completion
            .timer
            .lock()
            .expect("Mutex should not be poisoned") = Some(timer.abort_handle());

        PendingOperation { kind, rx }
    }

    /// Settles the current completion with a callback payload.
    ///
    /// Returns false when nothing was waiting (no request yet, already
    /// settled, or timed out); the payload is dropped in that case.
    pub(crate) fn resolve(&self, value: T) -> bool {
        let current = self
            .current
            .lock()
            .expect("Mutex should not be poisoned")
            .clone();
        let Some(completion) = current else {
            return false;
        };
        let Some(sender) = completion.take() else {
            debug!(target: "Session/Pending", "Late {} callback ignored", self.kind);
            return false;
        };
        completion.cancel_timer();
        if sender.send(Ok(value)).is_err() {
            debug!(
                target: "Session/Pending",
                "{} #{} resolved but its caller is gone", self.kind, completion.id
            );
        }
        true
    }
}

/// Future handed to the caller of a facade operation.
///
/// Dropping it does not cancel anything: the completion still times out and
/// runs its rollback on its own.
#[must_use = "the operation still runs, but its outcome is lost if not awaited"]
pub struct PendingOperation<T> {
    kind: OperationKind,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> PendingOperation<T> {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl<T> Future for PendingOperation<T> {
    type Output = Result<T, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let kind = self.kind;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SessionError::Stopped(kind))))
    }
}

/// Spawns a protocol call that has no matching callback and bounds it by
/// `timeout`, counted from now rather than from the first poll.
pub(crate) fn run_bounded<F>(
    kind: OperationKind,
    timeout: Duration,
    call: F,
) -> impl Future<Output = Result<(), SessionError>> + Send + 'static
where
    F: Future<Output = ()> + Send + 'static,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let handle = tokio::spawn(call);
    async move {
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_error)) => {
                warn!(target: "Session/Pending", "{kind} task failed: {join_error}");
                Err(SessionError::Stopped(kind))
            }
            Err(_) => {
                warn!(target: "Session/Pending", "{kind} timed out after {timeout:?}");
                Err(SessionError::Timeout(kind))
            }
        }
    }
}

/// One slot per operation kind that is answered by a callback.
pub(crate) struct PendingRegistry {
    pub(crate) connect: PendingSlot<Connected>,
    pub(crate) disconnect: PendingSlot<Disconnected>,
    pub(crate) login: PendingSlot<LoggedOn>,
    pub(crate) set_persona_name: PendingSlot<AccountInfo>,
    pub(crate) set_persona_state: PendingSlot<PersonaUpdate>,
    pub(crate) add_friend: PendingSlot<FriendAdded>,
}

impl PendingRegistry {
    pub(crate) fn new() -> Self {
        Self {
            connect: PendingSlot::new(OperationKind::Connect),
            disconnect: PendingSlot::new(OperationKind::Disconnect),
            login: PendingSlot::new(OperationKind::Login),
            set_persona_name: PendingSlot::new(OperationKind::SetPersonaName),
            set_persona_state: PendingSlot::new(OperationKind::SetPersonaState),
            add_friend: PendingSlot::new(OperationKind::AddFriend),
        }
    }
}
