use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{domain::MessageRef, Result};

/// Reply lifecycle of an interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing sent yet.
    Fresh,
    /// Acknowledged; final content still pending.
    Deferred,
    /// A reply was sent.
    Replied,
}

impl Lifecycle {
    /// Fresh -> Deferred -> Replied, or Fresh -> Replied. Never backwards.
    pub fn can_advance_to(self, next: Lifecycle) -> bool {
        matches!(
            (self, next),
            (Lifecycle::Fresh, Lifecycle::Deferred)
                | (Lifecycle::Fresh, Lifecycle::Replied)
                | (Lifecycle::Deferred, Lifecycle::Replied)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Only the requester should see it, where the transport can scope visibility.
    Private,
}

/// The originator of an interaction and its reply channel.
///
/// Implementations own the lifecycle state; callers only observe it.
#[async_trait]
pub trait Requester: Send + Sync {
    /// False once no reply channel is left.
    fn is_repliable(&self) -> bool;

    fn lifecycle(&self) -> Lifecycle;

    /// Initial reply. Only valid while `Fresh`.
    async fn reply(&self, content: &str, visibility: Visibility) -> Result<()>;

    /// Replace the content of the deferred or sent reply.
    async fn edit_reply(&self, content: &str) -> Result<()>;
}

/// Boundary kind of an unhandled failure.
#[derive(Clone)]
pub enum ExecutionContext {
    /// Gateway work. `requester` is `None` for events nobody can be answered for.
    Interactive {
        requester: Option<Arc<dyn Requester>>,
    },
    /// A plain API call.
    Api,
}

impl ExecutionContext {
    pub fn interactive(requester: Arc<dyn Requester>) -> Self {
        Self::Interactive {
            requester: Some(requester),
        }
    }

    /// Gateway work without an originator (event listeners, timers).
    pub fn detached() -> Self {
        Self::Interactive { requester: None }
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive { requester } => f
                .debug_struct("Interactive")
                .field("has_requester", &requester.is_some())
                .finish(),
            Self::Api => f.write_str("Api"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TrackerState {
    lifecycle: Lifecycle,
    reply: Option<MessageRef>,
}

/// Lifecycle bookkeeping shared by requester implementations.
#[derive(Debug)]
pub struct ReplyTracker {
    state: Mutex<TrackerState>,
}

impl Default for ReplyTracker {
    fn default() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                lifecycle: Lifecycle::Fresh,
                reply: None,
            }),
        }
    }
}

impl ReplyTracker {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    /// Message holding the current reply (placeholder or final), if any.
    pub fn reply_ref(&self) -> Option<MessageRef> {
        self.lock().reply
    }

    /// Move forward; regressions and repeats are ignored. Returns whether the state moved.
    pub fn advance(&self, next: Lifecycle, reply: Option<MessageRef>) -> bool {
        let mut state = self.lock();
        if !state.lifecycle.can_advance_to(next) {
            return false;
        }
        state.lifecycle = next;
        if reply.is_some() {
            state.reply = reply;
        }
        true
    }

    /// Remember the message a later edit should target without touching the lifecycle.
    pub fn set_reply_ref(&self, reply: MessageRef) {
        self.lock().reply = Some(reply);
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        // State is plain data; a poisoned lock still holds a consistent value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
