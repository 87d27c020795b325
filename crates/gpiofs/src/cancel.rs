//! Cancellation tokens for the background value streams.
//!
//! Each stream registers exactly one token with its port. `reset()`
//! drains the registry and triggers every outstanding token before the
//! release write, and a stream that terminates naturally deregisters
//! its own token. Tokens are one-shot and idempotent to trigger.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot cancellation signal held by a background stream.
#[derive(Debug, Clone)]
pub(crate) struct CancelToken {
    id: u64,
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    fn new(id: u64) -> Self {
        Self {
            id,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Registry identity used for self-deregistration.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Triggers the token. Triggering twice is a no-op.
    pub(crate) fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Reports whether the token has been triggered.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-port registry of outstanding stream tokens.
///
/// Lives inside the port's operation mutex, so bulk cancellation is
/// atomic with respect to every other operation on the same line.
#[derive(Debug, Default)]
pub(crate) struct CancelRegistry {
    next_id: u64,
    tokens: Vec<CancelToken>,
}

impl CancelRegistry {
    /// Creates and records a fresh token.
    pub(crate) fn register(&mut self) -> CancelToken {
        let token = CancelToken::new(self.next_id);
        self.next_id += 1;
        self.tokens.push(token.clone());
        token
    }

    /// Removes a token by id; unknown ids are ignored, which covers a
    /// stream deregistering after a reset already drained the registry.
    pub(crate) fn deregister(&mut self, id: u64) {
        self.tokens.retain(|token| token.id() != id);
    }

    /// Triggers every outstanding token and clears the registry.
    pub(crate) fn cancel_all(&mut self) {
        for token in self.tokens.drain(..) {
            token.cancel();
        }
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.tokens.len()
    }
}
