//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Drain protocol primitives.
//!
//! Draining stops new traffic from flowing through a connection while the
//! work already in flight finishes. A channel may exempt some requests from
//! draining through a predicate over [`RequestView`]; exempt requests flow as
//! if nothing happened.

use crate::connection::{Direction, Headers};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// What a drain-exemption predicate gets to see about a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    /// Target service name.
    pub service: &'a str,
    /// Operation name (arg1).
    pub operation: &'a str,
    /// Transport headers.
    pub headers: &'a Headers,
    /// Whether the request is ours (`Outgoing`) or the remote's (`Incoming`).
    pub direction: Direction,
}

/// Signature of a drain-exemption predicate.
pub type DrainExemptFn = dyn Fn(&RequestView<'_>) -> bool + Send + Sync;

/// Shared, replaceable drain-exemption predicate.
///
/// Without a predicate nothing is exempt.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::{Direction, ExemptPolicy, Headers, RequestView};
///
/// let policy = ExemptPolicy::new();
/// let headers = Headers::new();
/// let view = RequestView {
///     service: "b",
///     operation: "echo",
///     headers: &headers,
///     direction: Direction::Incoming,
/// };
/// assert!(!policy.is_exempt(&view));
///
/// policy.set(|request| request.service == "b");
/// assert!(policy.is_exempt(&view));
/// ```
#[derive(Clone, Default)]
pub struct ExemptPolicy {
    predicate: Arc<RwLock<Option<Arc<DrainExemptFn>>>>,
}

impl ExemptPolicy {
    /// Creates a policy that exempts nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `predicate`, replacing any previous one.
    ///
    /// The predicate runs while connection state is locked and must not call
    /// back into the channel.
    pub fn set<F>(&self, predicate: F)
    where
        F: Fn(&RequestView<'_>) -> bool + Send + Sync + 'static,
    {
        *self.predicate.write() = Some(Arc::new(predicate));
    }

    /// Removes the predicate.
    pub fn clear(&self) {
        *self.predicate.write() = None;
    }

    /// Returns `true` if a predicate is installed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.predicate.read().is_some()
    }

    /// Evaluates the predicate for `request`.
    #[must_use]
    pub fn is_exempt(&self, request: &RequestView<'_>) -> bool {
        let predicate = self.predicate.read().clone();
        predicate.is_some_and(|predicate| predicate(request))
    }
}

impl fmt::Debug for ExemptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExemptPolicy")
            .field("is_set", &self.is_set())
            .finish()
    }
}

/// Options for a drain call.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::DrainOptions;
///
/// let options = DrainOptions::new("testdown");
/// assert_eq!(options.reason(), "testdown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainOptions {
    reason: String,
}

impl DrainOptions {
    /// Creates drain options with a human readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the drain was requested.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self::new("draining")
    }
}

/// Aggregate drain status of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrainStatus {
    /// Never told to drain.
    NotDraining,
    /// Told to drain; some of its connections are still open.
    Draining,
    /// Told to drain; all of its connections have closed.
    Drained,
}

/// Resolves once a draining connection has no counted work left.
///
/// Resolves immediately when there was nothing to wait for, and also when the
/// connection is reset before its work finishes.
#[derive(Debug)]
#[must_use = "a drain waiter does nothing unless awaited"]
pub struct DrainWaiter {
    receiver: Option<oneshot::Receiver<()>>,
}

impl DrainWaiter {
    pub(crate) fn ready() -> Self {
        Self { receiver: None }
    }

    pub(crate) fn pending(receiver: oneshot::Receiver<()>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Returns `true` if awaiting would complete immediately.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.receiver.is_none()
    }
}

impl Future for DrainWaiter {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.receiver.as_mut() {
            None => Poll::Ready(()),
            Some(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(_) => {
                    self.receiver = None;
                    Poll::Ready(())
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// Drain sub-state of one connection.
#[derive(Debug)]
pub(crate) struct DrainState {
    reason: String,
    waiters: Vec<oneshot::Sender<()>>,
}

impl DrainState {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            waiters: Vec::new(),
        }
    }

    pub(crate) fn reason(&self) -> &str {
        &self.reason
    }

    pub(crate) fn add_waiter(&mut self) -> DrainWaiter {
        let (sender, receiver) = oneshot::channel();
        self.waiters.push(sender);
        DrainWaiter::pending(receiver)
    }

    /// Wakes every waiter. Returns how many were still listening.
    pub(crate) fn release(&mut self) -> usize {
        self.waiters
            .drain(..)
            .filter_map(|waiter| waiter.send(()).ok())
            .count()
    }
}
