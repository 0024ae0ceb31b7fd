use std::mem::take;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::Duration;

/// Cooperative cancellation flag shared between the threads of one scope.
///
/// Tokens form a hierarchy: [`CancelToken::child`] derives a token that trips
/// when either itself or its parent is cancelled, while cancelling the child
/// leaves the parent untouched. The supervisor uses this to tear down a
/// single run (child) without terminating the whole group (parent).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<Inner>);

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    trip: Condvar,
}

#[derive(Default)]
struct State {
    cancelled: bool,
    children: Vec<Weak<Inner>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a token linked to this one. If this token is already
    /// cancelled the child is born cancelled.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        let mut state = self.0.state.lock().unwrap();
        if state.cancelled {
            child.cancel();
        } else {
            state.children.push(Arc::downgrade(&child.0));
        }
        child
    }

    /// Trips the token and every linked child. Idempotent.
    pub fn cancel(&self) {
        let children = {
            let mut state = self.0.state.lock().unwrap();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            self.0.trip.notify_all();
            take(&mut state.children)
        };
        for child in children.into_iter().filter_map(|weak| weak.upgrade()) {
            CancelToken(child).cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.state.lock().unwrap().cancelled
    }

    /// Blocks until the token trips or the timeout elapses, whichever comes
    /// first. Returns whether the token is cancelled, so callers can use it
    /// as an interruptible sleep.
    pub fn wait(&self, timeout: Duration) -> bool {
        let state = self.0.state.lock().unwrap();
        let (state, _) = self
            .0
            .trip
            .wait_timeout_while(state, timeout, |state| !state.cancelled)
            .unwrap();
        state.cancelled
    }
}
