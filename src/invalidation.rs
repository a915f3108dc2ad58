// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tracks the query a paging session currently depends on and turns the first
//! data change into a one-shot session invalidation.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::Weak;

use log::debug;
use log::info;

use crate::query::ChangeListener;
use crate::query::Query;
use crate::query::Subscription;

type Callback = Box<dyn FnOnce() + Send>;

/// Returned by [`InvalidationTracker::track`] when the session is already invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("paging session is invalidated")]
pub struct Invalidated;

enum State {
    Active {
        /// The listener registration on the current query, if any.
        subscription: Option<Box<dyn Subscription>>,
        callbacks: Vec<Callback>,
    },
    Invalidated,
}

struct Inner {
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = mem::replace(
            self.state.get_mut().unwrap_or_else(|e| e.into_inner()),
            State::Invalidated,
        );
        if let State::Active {
            subscription: Some(sub),
            ..
        } = state
        {
            debug!("InvalidationTracker dropped: detach listener");
            sub.unsubscribe();
        }
    }
}

/// Holds the single change-listener registration of a paging session.
///
/// The session state `Active(current query) | Invalidated` lives behind one
/// mutex, so swapping the current query and firing invalidation never
/// interleave. `Invalidated` is terminal.
///
/// Cloning is cheap and every clone refers to the same session. The listener
/// handed to a query only keeps a weak reference, so the registration is
/// removed once the last clone is dropped.
#[derive(Clone)]
pub struct InvalidationTracker {
    inner: Arc<Inner>,
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InvalidationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state() {
            State::Active { subscription, .. } => {
                if subscription.is_some() {
                    "Active(tracking)"
                } else {
                    "Active"
                }
            }
            State::Invalidated => "Invalidated",
        };
        f.debug_struct("InvalidationTracker")
            .field("state", &state)
            .finish()
    }
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Active {
                    subscription: None,
                    callbacks: vec![],
                }),
            }),
        }
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(&*self.inner.state(), State::Invalidated)
    }

    /// Make `query` the current query of the session.
    ///
    /// The listener on the previous query is removed before the new one is
    /// registered, within the same critical section, so at most one
    /// registration exists at any time. Nothing is registered if the session
    /// is already invalidated.
    pub fn track<T>(&self, query: &dyn Query<T>) -> Result<(), Invalidated> {
        let mut state = self.inner.state();

        let State::Active { subscription, .. } = &mut *state else {
            return Err(Invalidated);
        };

        if let Some(prev) = subscription.take() {
            prev.unsubscribe();
        }
        *subscription = Some(query.subscribe(self.listener()));
        Ok(())
    }

    /// Invalidate the session.
    ///
    /// Detaches the current listener and runs every registered callback.
    /// Returns `true` only for the call that performed the transition; later
    /// calls are no-ops.
    pub fn invalidate(&self) -> bool {
        let prev = mem::replace(&mut *self.inner.state(), State::Invalidated);

        let State::Active {
            subscription,
            callbacks,
        } = prev
        else {
            return false;
        };

        info!(
            "paging session invalidated; run {} callbacks",
            callbacks.len()
        );

        if let Some(sub) = subscription {
            sub.unsubscribe();
        }
        for cb in callbacks {
            cb();
        }
        true
    }

    /// Detach the current listener and end the session without running the
    /// callbacks, for a session its consumer discarded.
    pub fn discard(&self) {
        let prev = mem::replace(&mut *self.inner.state(), State::Invalidated);

        if let State::Active {
            subscription: Some(sub),
            ..
        } = prev
        {
            debug!("paging session discarded: detach listener");
            sub.unsubscribe();
        }
    }

    /// Register `callback` to run when the session is invalidated.
    ///
    /// If it already is, `callback` runs immediately on the calling thread.
    pub fn on_invalidated(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.inner.state();
            if let State::Active { callbacks, .. } = &mut *state {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    fn listener(&self) -> ChangeListener {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                debug!("data change observed by paging session");
                InvalidationTracker { inner }.invalidate();
            }
        })
    }
}
