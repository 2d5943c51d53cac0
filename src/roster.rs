//! Friend roster cache.
//!
//! The roster is an observable sequence: every mutation is handed to a
//! [`RosterExecutor`] so that a single designated context (a UI thread, a
//! dedicated task, or the caller itself) performs all writes. Reads are
//! allowed from anywhere.

use log::{debug, trace};
use sfcore::types::callbacks::{FriendsList, PersonaUpdate};
use sfcore::types::events::{Event, EventBus};
use sfcore::types::friend::{Friend, FriendField};
use sfcore::AccountId;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

pub type RosterJob = Box<dyn FnOnce() + Send + 'static>;

/// The single writer of a [`FriendRoster`].
pub trait RosterExecutor: Send + Sync {
    fn execute(&self, job: RosterJob);
}

/// Applies roster mutations immediately on the calling task.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl RosterExecutor for InlineExecutor {
    fn execute(&self, job: RosterJob) {
        job();
    }
}

/// Queues roster mutations until the owning context drains them.
#[derive(Clone)]
pub struct QueueExecutor {
    tx: mpsc::UnboundedSender<RosterJob>,
}

/// Receiving half of a [`QueueExecutor`], held by the context that owns the roster.
pub struct RosterQueue {
    rx: mpsc::UnboundedReceiver<RosterJob>,
}

impl QueueExecutor {
    pub fn new() -> (Self, RosterQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, RosterQueue { rx })
    }
}

impl RosterExecutor for QueueExecutor {
    fn execute(&self, job: RosterJob) {
        if self.tx.send(job).is_err() {
            debug!(target: "Session/Roster", "Roster queue closed, dropping update");
        }
    }
}

impl RosterQueue {
    /// Applies every queued mutation and returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            applied += 1;
        }
        applied
    }

    /// Applies mutations as they arrive until every executor is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }
}

struct RosterInner {
    friends: RwLock<Vec<Arc<Friend>>>,
    events: EventBus,
}

#[derive(Clone)]
pub struct FriendRoster {
    inner: Arc<RosterInner>,
    executor: Arc<dyn RosterExecutor>,
}

impl FriendRoster {
    pub fn new(events: EventBus, executor: Arc<dyn RosterExecutor>) -> Self {
        Self {
            inner: Arc::new(RosterInner {
                friends: RwLock::new(Vec::new()),
                events,
            }),
            executor,
        }
    }

    /// Merges a roster push. A full list replaces the roster; a delta adds
    /// unseen identities and drops the ones whose relationship became `None`.
    pub fn apply_snapshot(&self, list: FriendsList) {
        let inner = self.inner.clone();
        self.executor
            .execute(Box::new(move || inner.apply_snapshot(list)));
    }

    pub fn on_presence_changed(&self, update: PersonaUpdate) {
        let inner = self.inner.clone();
        self.executor
            .execute(Box::new(move || inner.on_presence_changed(update)));
    }

    /// Shows only friends whose persona name contains `query`, ignoring case.
    /// An empty query shows everyone.
    pub fn set_filter(&self, query: impl Into<String>) {
        let inner = self.inner.clone();
        let query = query.into();
        self.executor
            .execute(Box::new(move || inner.set_filter(&query)));
    }

    pub fn friends(&self) -> Vec<Arc<Friend>> {
        self.inner.read().clone()
    }

    pub fn get(&self, id: AccountId) -> Option<Arc<Friend>> {
        self.inner.read().iter().find(|f| f.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl RosterInner {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Friend>>> {
        self.friends.read().expect("RwLock should not be poisoned")
    }

    fn apply_snapshot(&self, list: FriendsList) {
        let mut events = Vec::new();
        {
            let mut friends = self.friends.write().expect("RwLock should not be poisoned");
            if !list.incremental {
                friends.clear();
                events.push(Event::RosterReset);
            }

            for entry in list.entries.iter().filter(|e| e.account_type.is_individual()) {
                let existing = friends.iter().position(|f| f.id() == entry.account_id);
                match existing {
                    Some(index) if list.incremental && entry.relationship.is_none() => {
                        friends.remove(index);
                        events.push(Event::FriendRemoved(entry.account_id));
                    }
                    Some(index) => {
                        let friend = &friends[index];
                        if friend.relationship() != entry.relationship {
                            friend.set_relationship(entry.relationship);
                            events.push(Event::FriendChanged {
                                id: entry.account_id,
                                fields: vec![FriendField::Relationship],
                            });
                        }
                    }
                    None => {
                        friends.push(Arc::new(Friend::from_entry(entry)));
                        events.push(Event::FriendAdded(entry.account_id));
                    }
                }
            }

            debug!(
                target: "Session/Roster",
                "Applied {} roster list with {} entries, {} friends now",
                if list.incremental { "incremental" } else { "full" },
                list.entries.len(),
                friends.len()
            );
        }

        for event in &events {
            self.events.dispatch(event);
        }
    }

    fn on_presence_changed(&self, update: PersonaUpdate) {
        let Some(friend) = self
            .read()
            .iter()
            .find(|f| f.id() == update.account_id)
            .cloned()
        else {
            trace!(target: "Session/Roster", "Presence for unknown account {}", update.account_id);
            return;
        };

        friend.apply_persona(&update);
        self.events.dispatch(&Event::FriendChanged {
            id: friend.id(),
            fields: FriendField::ALL.to_vec(),
        });
    }

    fn set_filter(&self, query: &str) {
        let needle = query.to_lowercase();
        let flipped: Vec<AccountId> = self
            .read()
            .iter()
            .filter(|friend| {
                let visible =
                    needle.is_empty() || friend.persona_name().to_lowercase().contains(&needle);
                friend.set_visible(visible)
            })
            .map(|friend| friend.id())
            .collect();

        for id in flipped {
            self.events.dispatch(&Event::FriendChanged {
                id,
                fields: vec![FriendField::Visible],
            });
        }
    }
}
