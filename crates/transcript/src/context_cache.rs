use context_protocol::ContextMessage;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;

pub type ContextFuture = Pin<Box<dyn Future<Output = Vec<ContextMessage>> + Send>>;

/// Observable resolution state of an interaction's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Pending,
    Resolved,
}

enum Slot {
    Unresolved(ContextFuture),
    Resolved(Vec<ContextMessage>),
}

/// Memoizing cell over a context future.
///
/// The future is awaited at most once; after that the cell holds a list that
/// readers may replace (with its filtered form) under the same lock.
pub(crate) struct ContextCache {
    slot: Mutex<Slot>,
}

impl ContextCache {
    pub(crate) fn pending(future: ContextFuture) -> Self {
        Self {
            slot: Mutex::new(Slot::Unresolved(future)),
        }
    }

    pub(crate) fn resolved(messages: Vec<ContextMessage>) -> Self {
        Self {
            slot: Mutex::new(Slot::Resolved(messages)),
        }
    }

    /// Resolve, replace the cached list with `update(list)`, return a copy.
    pub(crate) async fn update<F>(&self, update: F) -> Vec<ContextMessage>
    where
        F: FnOnce(Vec<ContextMessage>) -> Vec<ContextMessage>,
    {
        let mut slot = self.slot.lock().await;
        let current = Self::take_resolved(&mut slot).await;
        let next = update(current);
        *slot = Slot::Resolved(next.clone());
        next
    }

    /// Resolve and return a copy of the cached list as it stands.
    pub(crate) async fn snapshot(&self) -> Vec<ContextMessage> {
        let mut slot = self.slot.lock().await;
        let current = Self::take_resolved(&mut slot).await;
        *slot = Slot::Resolved(current.clone());
        current
    }

    pub(crate) fn state(&self) -> ContextState {
        match self.slot.try_lock() {
            Ok(slot) if matches!(*slot, Slot::Resolved(_)) => ContextState::Resolved,
            _ => ContextState::Pending,
        }
    }

    async fn take_resolved(slot: &mut Slot) -> Vec<ContextMessage> {
        if let Slot::Unresolved(future) = slot {
            let messages = future.await;
            *slot = Slot::Resolved(messages);
        }
        match std::mem::replace(slot, Slot::Resolved(Vec::new())) {
            Slot::Resolved(messages) => messages,
            Slot::Unresolved(_) => Vec::new(),
        }
    }
}
