//! The indexed collection of data-store contexts (§4.A).

use crate::context::{Binding, DataStoreContext};
use crate::error::Error;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    Success,
    Conflict,
    AlreadyAliased,
}

/// The resolver stored in `pending_aliases`. Unlike a `oneshot` channel,
/// this can be observed by both the original submitter and any concurrent
/// `wait_if_pending_alias` caller, since either may need the same result.
pub struct PendingAlias {
    result: Mutex<Option<AliasOutcome>>,
    notify: Notify,
}

impl PendingAlias {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(None),
            notify: Notify::new(),
        })
    }

    pub fn resolve(&self, outcome: AliasOutcome) {
        *self.result.lock().unwrap() = Some(outcome);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) -> AliasOutcome {
        loop {
            let notified = self.notify.notified();
            if let Some(outcome) = *self.result.lock().unwrap() {
                return outcome;
            }
            notified.await;
        }
    }
}

pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
    NotFound,
}

#[derive(Default)]
pub struct ContextTable {
    unbound: HashMap<String, DataStoreContext>,
    bound: HashMap<String, DataStoreContext>,
    remoted: HashMap<String, DataStoreContext>,
    deleted: HashSet<String>,

    pub(crate) aliases: HashMap<String, String>,
    pub(crate) pending_attach: HashSet<String>,
    pub(crate) pending_aliases: HashMap<String, Arc<PendingAlias>>,
    pub(crate) new_since_last_gc: Vec<String>,

    notify: Notify,
    disposed: bool,
}

impl ContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unbound(&mut self, ctx: DataStoreContext) {
        self.unbound.insert(ctx.id.clone(), ctx);
    }

    pub fn add_bound_or_remoted(&mut self, mut ctx: DataStoreContext, remoted: bool) {
        ctx.set_binding(Binding::Bound);
        if remoted {
            self.remoted.insert(ctx.id.clone(), ctx);
        } else {
            self.bound.insert(ctx.id.clone(), ctx);
        }
        self.notify.notify_waiters();
    }

    /// Moves a context from `unbound` into `bound`.
    pub fn bind(&mut self, id: &str) -> Result<(), Error> {
        let mut ctx = self
            .unbound
            .remove(id)
            .ok_or_else(|| Error::NoContext(id.to_string()))?;
        ctx.set_binding(Binding::Bound);
        self.bound.insert(id.to_string(), ctx);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Reverts a context from `bound` back to `unbound` (attach rollback).
    pub fn unbind(&mut self, id: &str) -> Result<(), Error> {
        let mut ctx = self
            .bound
            .remove(id)
            .ok_or_else(|| Error::NoContext(id.to_string()))?;
        ctx.set_binding(Binding::Unbound);
        self.unbound.insert(id.to_string(), ctx);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.unbound.contains_key(id) || self.bound.contains_key(id) || self.remoted.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&DataStoreContext> {
        self.unbound
            .get(id)
            .or_else(|| self.bound.get(id))
            .or_else(|| self.remoted.get(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DataStoreContext> {
        if self.unbound.contains_key(id) {
            return self.unbound.get_mut(id);
        }
        if self.bound.contains_key(id) {
            return self.bound.get_mut(id);
        }
        self.remoted.get_mut(id)
    }

    pub fn get_unbound(&self, id: &str) -> Option<&DataStoreContext> {
        self.unbound.get(id)
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains(id)
    }

    /// Returns once `id` is addressable (bound or remoted). If `wait` is
    /// false, returns immediately with whatever is currently known. This is
    /// the only table-level suspension point (§5).
    pub async fn get_bound_or_remoted(&self, id: &str, wait: bool) -> bool {
        loop {
            let notified = self.notify.notified();
            if self.bound.contains_key(id) || self.remoted.contains_key(id) {
                return true;
            }
            if self.deleted.contains(id) || self.disposed || !wait {
                return false;
            }
            notified.await;
        }
    }

    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        if self.deleted.contains(id) {
            return DeleteOutcome::AlreadyDeleted;
        }
        let removed = self
            .unbound
            .remove(id)
            .or_else(|| self.bound.remove(id))
            .or_else(|| self.remoted.remove(id));

        match removed {
            Some(mut ctx) => {
                ctx.mark_deleted();
                self.deleted.insert(id.to_string());
                self.notify.notify_waiters();
                DeleteOutcome::Deleted
            }
            None => DeleteOutcome::NotFound,
        }
    }

    pub fn iter_addressable(&self) -> impl Iterator<Item = &DataStoreContext> {
        self.bound.values().chain(self.remoted.values())
    }

    pub fn iter_addressable_mut(&mut self) -> impl Iterator<Item = &mut DataStoreContext> {
        self.bound.values_mut().chain(self.remoted.values_mut())
    }

    pub fn iter_bound(&self) -> impl Iterator<Item = &DataStoreContext> {
        self.bound.values()
    }

    pub fn size(&self) -> usize {
        self.unbound.len() + self.bound.len() + self.remoted.len()
    }

    pub fn not_bound_length(&self) -> usize {
        self.unbound.len()
    }

    /// Resolves every still-pending alias with `Success` (the historical
    /// `wait_if_pending_alias`-on-no-entry contract, preserved per §5/§9),
    /// and marks the table disposed so further waits return immediately.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, pending) in self.pending_aliases.drain() {
            pending.resolve(AliasOutcome::Success);
        }
        self.notify.notify_waiters();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
