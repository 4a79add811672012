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

//! Per-connection bookkeeping of in-flight exchanges.
//!
//! Every request a connection carries, in either direction, holds one entry
//! in the connection's [`ExchangeTable`] until it reaches a terminal state.
//! Outgoing entries own the completion of the local caller; incoming entries
//! record that a handler is producing a response.
//!
//! The table is not synchronized by itself: the owning connection keeps it
//! behind the same lock as its drain state, so the drain check, registration
//! and completion of an exchange are atomic with respect to each other.

use crate::connection::{Direction, Headers, RequestView};
use crate::request::{CallResponse, RequestError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;

/// Completion handed to the local caller of an outgoing exchange.
pub(crate) type ResponseSender = oneshot::Sender<Result<CallResponse, RequestError>>;

/// Generates exchange ids for one connection.
///
/// Ids start at 1 (0 belongs to identification) and wrap around without ever
/// producing 0. The connection skips ids that are still in use, so an id is
/// reused only after its prior exchange completed or was abandoned.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::ExchangeIdGenerator;
///
/// let ids = ExchangeIdGenerator::new();
/// assert_eq!(ids.next(), 1);
/// assert_eq!(ids.next(), 2);
/// ```
#[derive(Debug)]
pub struct ExchangeIdGenerator {
    next_id: AtomicU32,
}

impl ExchangeIdGenerator {
    /// Creates a generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a generator whose first id is `first` (0 is bumped to 1).
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        Self {
            next_id: AtomicU32::new(first.max(1)),
        }
    }

    /// Returns the next id, skipping 0 on wrap-around.
    pub fn next(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for ExchangeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// What is known about an exchange for drain-exemption purposes.
#[derive(Debug, Clone)]
pub(crate) struct ExchangeMeta {
    pub(crate) service: String,
    pub(crate) operation: String,
    pub(crate) headers: Headers,
}

impl ExchangeMeta {
    pub(crate) fn view(&self, direction: Direction) -> RequestView<'_> {
        RequestView {
            service: &self.service,
            operation: &self.operation,
            headers: &self.headers,
            direction,
        }
    }
}

#[derive(Debug)]
pub(crate) struct OutboundExchange {
    meta: ExchangeMeta,
    sender: ResponseSender,
    counted: bool,
}

#[derive(Debug)]
pub(crate) struct InboundExchange {
    meta: ExchangeMeta,
    counted: bool,
}

/// In-flight exchanges of one connection.
#[derive(Debug, Default)]
pub(crate) struct ExchangeTable {
    outbound: HashMap<u32, OutboundExchange>,
    inbound: HashMap<u32, InboundExchange>,
    counted: usize,
}

impl ExchangeTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains_outbound(&self, id: u32) -> bool {
        self.outbound.contains_key(&id)
    }

    /// Registers an outgoing exchange. Returns `false` if `id` is in use.
    pub(crate) fn register_outbound(
        &mut self,
        id: u32,
        meta: ExchangeMeta,
        sender: ResponseSender,
    ) -> bool {
        if self.outbound.contains_key(&id) {
            return false;
        }
        self.outbound.insert(
            id,
            OutboundExchange {
                meta,
                sender,
                counted: false,
            },
        );
        true
    }

    /// Completes an outgoing exchange with its terminal outcome.
    ///
    /// Returns `false` when no entry exists: the exchange already completed,
    /// timed out or was reset, and `result` is discarded.
    pub(crate) fn complete_outbound(
        &mut self,
        id: u32,
        result: Result<CallResponse, RequestError>,
    ) -> bool {
        match self.outbound.remove(&id) {
            Some(exchange) => {
                self.uncount(exchange.counted);
                // The caller may have stopped waiting; the entry is gone either way.
                let _ = exchange.sender.send(result);
                true
            }
            None => false,
        }
    }

    /// Removes an outgoing exchange without completing it.
    pub(crate) fn abandon_outbound(&mut self, id: u32) -> bool {
        match self.outbound.remove(&id) {
            Some(exchange) => {
                self.uncount(exchange.counted);
                true
            }
            None => false,
        }
    }

    /// Registers an incoming exchange. Returns `false` if `id` is in use.
    pub(crate) fn register_inbound(&mut self, id: u32, meta: ExchangeMeta) -> bool {
        if self.inbound.contains_key(&id) {
            return false;
        }
        self.inbound.insert(
            id,
            InboundExchange {
                meta,
                counted: false,
            },
        );
        true
    }

    /// Removes an incoming exchange once its response is ready.
    pub(crate) fn finish_inbound(&mut self, id: u32) -> bool {
        match self.inbound.remove(&id) {
            Some(exchange) => {
                self.uncount(exchange.counted);
                true
            }
            None => false,
        }
    }

    /// Marks every current entry that `is_exempt` rejects as counted toward
    /// a drain. Returns the number of counted entries.
    pub(crate) fn count_for_drain<F>(&mut self, is_exempt: F) -> usize
    where
        F: Fn(&RequestView<'_>) -> bool,
    {
        for exchange in self.outbound.values_mut() {
            if !exchange.counted && !is_exempt(&exchange.meta.view(Direction::Outgoing)) {
                exchange.counted = true;
                self.counted += 1;
            }
        }
        for exchange in self.inbound.values_mut() {
            if !exchange.counted && !is_exempt(&exchange.meta.view(Direction::Incoming)) {
                exchange.counted = true;
                self.counted += 1;
            }
        }
        self.counted
    }

    /// Number of entries a drain is still waiting for.
    pub(crate) fn counted(&self) -> usize {
        self.counted
    }

    /// Fails every outgoing exchange with `error`. Returns how many failed.
    pub(crate) fn fail_outbound(&mut self, error: &RequestError) -> usize {
        let failed = self.outbound.len();
        for (_, exchange) in self.outbound.drain() {
            let _ = exchange.sender.send(Err(error.clone()));
        }
        failed
    }

    /// Forgets every incoming exchange. Returns how many were dropped.
    pub(crate) fn clear_inbound(&mut self) -> usize {
        let dropped = self.inbound.len();
        self.inbound.clear();
        dropped
    }

    /// Resets the drain count after the table was emptied.
    pub(crate) fn reset_count(&mut self) {
        self.counted = 0;
    }

    pub(crate) fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    pub(crate) fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.outbound.len() + self.inbound.len()
    }

    fn uncount(&mut self, counted: bool) {
        if counted {
            self.counted -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(service: &str) -> ExchangeMeta {
        ExchangeMeta {
            service: service.to_string(),
            operation: "echo".to_string(),
            headers: Headers::new(),
        }
    }

    fn response(arg3: &str) -> CallResponse {
        CallResponse {
            ok: true,
            headers: Headers::new(),
            arg2: Vec::new(),
            arg3: arg3.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_id_generator_skips_zero_on_wrap() {
        let ids = ExchangeIdGenerator::starting_at(u32::MAX);
        assert_eq!(ids.next(), u32::MAX);
        assert_eq!(ids.next(), 1);
        assert_eq!(ExchangeIdGenerator::starting_at(0).next(), 1);
    }

    #[tokio::test]
    async fn test_complete_exactly_once() {
        let mut table = ExchangeTable::new();
        let (tx, rx) = oneshot::channel();
        assert!(table.register_outbound(1, meta("a"), tx));

        assert!(table.complete_outbound(1, Ok(response("first"))));
        assert!(!table.complete_outbound(1, Ok(response("second"))));
        assert!(!table.abandon_outbound(1));

        let result = rx.await.unwrap().unwrap();
        assert_eq!(result.arg3, b"first");
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut table = ExchangeTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert!(table.register_outbound(5, meta("a"), tx1));
        assert!(!table.register_outbound(5, meta("a"), tx2));
        assert!(table.register_inbound(5, meta("a")));
        assert!(!table.register_inbound(5, meta("a")));
    }

    #[test]
    fn test_drain_counts_only_non_exempt_entries() {
        let mut table = ExchangeTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        table.register_outbound(1, meta("a"), tx1);
        table.register_outbound(2, meta("b"), tx2);
        table.register_inbound(1, meta("a"));

        let counted = table.count_for_drain(|request| request.service == "b");
        assert_eq!(counted, 2);

        // Counting again does not double count.
        assert_eq!(table.count_for_drain(|_| false), 3);

        assert!(table.abandon_outbound(1));
        assert!(table.finish_inbound(1));
        assert!(table.abandon_outbound(2));
        assert_eq!(table.counted(), 0);
    }

    #[test]
    fn test_entries_registered_after_drain_are_not_counted() {
        let mut table = ExchangeTable::new();
        assert_eq!(table.count_for_drain(|_| false), 0);
        table.register_inbound(9, meta("a"));
        assert_eq!(table.counted(), 0);
        assert!(table.finish_inbound(9));
        assert_eq!(table.counted(), 0);
    }

    #[tokio::test]
    async fn test_fail_outbound_delivers_error() {
        let mut table = ExchangeTable::new();
        let (tx, rx) = oneshot::channel();
        table.register_outbound(1, meta("a"), tx);
        table.register_inbound(2, meta("a"));
        table.count_for_drain(|_| false);

        let error = RequestError::ConnectionReset {
            reason: "remote closed".to_string(),
        };
        assert_eq!(table.fail_outbound(&error), 1);
        assert_eq!(table.clear_inbound(), 1);
        table.reset_count();

        assert_eq!(rx.await.unwrap().unwrap_err(), error);
        assert_eq!(table.counted(), 0);
        assert_eq!(table.outbound_len() + table.inbound_len(), 0);
    }
}
