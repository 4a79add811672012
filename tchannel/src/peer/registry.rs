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

//! The channel-wide set of peers.

use crate::channel::ChannelContext;
use crate::peer::Peer;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Peers of a channel keyed by `host:port`.
///
/// Peers added explicitly are pinned: they stay registered until deleted or
/// until the channel closes. Peers created for accepted connections leave
/// the registry when their last connection closes.
pub struct PeerRegistry {
    context: Weak<ChannelContext>,
    event_capacity: usize,
    peers: Mutex<BTreeMap<String, Arc<Peer>>>,
    cursor: AtomicUsize,
}

impl PeerRegistry {
    pub(crate) fn new(context: Weak<ChannelContext>, event_capacity: usize) -> Self {
        Self {
            context,
            event_capacity,
            peers: Mutex::new(BTreeMap::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the peer for `host_port`, creating it if needed, and pins it.
    pub fn add(&self, host_port: &str) -> Arc<Peer> {
        let peer = self.get_or_create(host_port);
        peer.pin();
        peer
    }

    /// Looks a peer up without creating it.
    #[must_use]
    pub fn get(&self, host_port: &str) -> Option<Arc<Peer>> {
        self.peers.lock().get(host_port).cloned()
    }

    /// Removes a peer. Its connections stay open.
    pub fn delete(&self, host_port: &str) -> Option<Arc<Peer>> {
        self.peers.lock().remove(host_port)
    }

    /// All peers, ordered by address.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<Peer>> {
        self.peers.lock().values().cloned().collect()
    }

    /// All peer addresses, ordered.
    #[must_use]
    pub fn host_ports(&self) -> Vec<String> {
        self.peers.lock().keys().cloned().collect()
    }

    /// Number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    /// Returns `true` if there are no peers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    /// Removes every peer and returns them.
    pub fn clear(&self) -> Vec<Arc<Peer>> {
        std::mem::take(&mut *self.peers.lock())
            .into_values()
            .collect()
    }

    pub(crate) fn get_or_create(&self, host_port: &str) -> Arc<Peer> {
        let mut peers = self.peers.lock();
        let peer = peers.entry(host_port.to_string()).or_insert_with(|| {
            Arc::new(Peer::new(
                host_port,
                self.context.clone(),
                self.event_capacity,
            ))
        });
        Arc::clone(peer)
    }

    /// Drops `peer` if it is still registered, unpinned and idle.
    pub(crate) fn remove_idle(&self, peer: &Peer) {
        let mut peers = self.peers.lock();
        let registered = peers
            .get(peer.host_port())
            .is_some_and(|existing| std::ptr::eq(existing.as_ref(), peer));
        if registered && peer.is_idle_and_unpinned() {
            peers.remove(peer.host_port());
        }
    }

    /// Picks a peer among `candidates` for the next attempt.
    ///
    /// Prefers peers not yet tried, then peers with a usable connection, then
    /// the fewest in-flight exchanges; ties rotate.
    pub(crate) fn choose(
        &self,
        candidates: &[String],
        tried: &HashSet<String>,
    ) -> Option<Arc<Peer>> {
        let peers = self.peers.lock();
        let available: Vec<&Arc<Peer>> = candidates
            .iter()
            .filter_map(|host_port| peers.get(host_port))
            .collect();
        if available.is_empty() {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % available.len();
        let mut best: Option<(&Arc<Peer>, (bool, bool, usize))> = None;
        for offset in 0..available.len() {
            let peer = available[(start + offset) % available.len()];
            let score = (
                tried.contains(peer.host_port()),
                !peer.has_usable_connection(),
                peer.pending_count(),
            );
            if best.as_ref().map_or(true, |(_, current)| score < *current) {
                best = Some((peer, score));
            }
        }
        best.map(|(peer, _)| Arc::clone(peer))
    }
}

impl fmt::Debug for PeerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerRegistry")
            .field("peers", &self.host_ports())
            .finish()
    }
}
