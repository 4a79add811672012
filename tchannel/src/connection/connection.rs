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

//! A single multiplexed link to a remote channel.

use crate::channel::{ChannelContext, IncomingRequest, dispatch};
use crate::connection::exchange::{ExchangeIdGenerator, ExchangeMeta, ExchangeTable};
use crate::connection::handshake::{HandshakeError, Identity, accept_init};
use crate::connection::{
    CallRequestFrame, CallResponseFrame, Direction, DrainState, DrainWaiter, ErrorCode, Frame,
    Headers, INIT_EXCHANGE_ID, InitFrame,
};
use crate::observability::ChannelEvent;
use crate::request::{CallResponse, RequestError};
use crate::transport::{ConnectionId, FrameLink};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

#[cfg(feature = "observability")]
use tracing::{debug, warn};

/// Identification state of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the identification handshake.
    Initializing,
    /// Identified; carries calls in both directions.
    Identified,
    /// Closed. Never leaves this state.
    Destroyed {
        /// What closed the connection.
        reason: String,
    },
}

impl ConnectionState {
    /// Returns `true` for [`Identified`](Self::Identified).
    #[must_use]
    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Identified)
    }

    /// Returns `true` for [`Destroyed`](Self::Destroyed).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed { .. })
    }
}

/// Who tore a connection down.
///
/// Pending outgoing requests fail with [`RequestError::LocalReset`] when the
/// close was initiated locally and with [`RequestError::ConnectionReset`]
/// when the remote or the transport closed the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetCause {
    /// Closed by this process (peer or channel close, failed handshake).
    Local(String),
    /// Closed by the remote side or the transport.
    Remote(String),
}

impl ResetCause {
    /// A locally initiated close.
    #[must_use]
    pub fn local(reason: impl Into<String>) -> Self {
        Self::Local(reason.into())
    }

    /// A remote or transport initiated close.
    #[must_use]
    pub fn remote(reason: impl Into<String>) -> Self {
        Self::Remote(reason.into())
    }

    /// The reason given for the close.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Local(reason) | Self::Remote(reason) => reason,
        }
    }

    /// Returns `true` for [`Local`](Self::Local).
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The error pending outgoing requests fail with.
    #[must_use]
    pub fn to_request_error(&self) -> RequestError {
        match self {
            Self::Local(reason) => RequestError::LocalReset {
                reason: reason.clone(),
            },
            Self::Remote(reason) => RequestError::ConnectionReset {
                reason: reason.clone(),
            },
        }
    }
}

/// One outgoing call attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallParams<'a> {
    pub(crate) service: &'a str,
    pub(crate) operation: &'a str,
    pub(crate) headers: &'a Headers,
    pub(crate) arg2: &'a [u8],
    pub(crate) arg3: &'a [u8],
    pub(crate) ttl: Duration,
}

impl CallParams<'_> {
    /// Time to live in whole milliseconds, rounded up. Zero means unbounded
    /// on the wire, so a bounded attempt sends at least 1.
    fn ttl_millis(&self) -> u64 {
        u64::try_from(self.ttl.as_nanos().div_ceil(1_000_000))
            .unwrap_or(u64::MAX)
            .max(1)
    }
}

/// A registered outgoing exchange awaiting its terminal outcome.
#[derive(Debug)]
pub(crate) struct PendingCall {
    id: u32,
    receiver: oneshot::Receiver<Result<CallResponse, RequestError>>,
}

impl PendingCall {
    /// Waits for the outcome until `deadline`.
    ///
    /// On expiry the exchange is abandoned under the connection lock. If a
    /// response or reset got there first, that outcome is returned instead.
    pub(crate) async fn wait_until(
        self,
        connection: &Connection,
        deadline: tokio::time::Instant,
        timeout: Duration,
    ) -> Result<CallResponse, RequestError> {
        let Self { id, mut receiver } = self;
        tokio::select! {
            biased;
            outcome = &mut receiver => outcome.unwrap_or_else(|_| Err(dropped_exchange())),
            _ = tokio::time::sleep_until(deadline) => {
                if connection.abandon(id) {
                    Err(RequestError::Timeout { timeout })
                } else {
                    receiver.await.unwrap_or_else(|_| Err(dropped_exchange()))
                }
            }
        }
    }
}

fn dropped_exchange() -> RequestError {
    RequestError::LocalReset {
        reason: "exchange dropped without completion".to_string(),
    }
}

#[derive(Debug)]
struct ConnectionOps {
    /// `None` once the connection is destroyed.
    writer: Option<mpsc::UnboundedSender<Frame>>,
    exchanges: ExchangeTable,
    drain: Option<DrainState>,
}

impl ConnectionOps {
    fn release_if_drained(&mut self) {
        if self.exchanges.counted() == 0 {
            if let Some(drain) = self.drain.as_mut() {
                drain.release();
            }
        }
    }
}

/// A single link to a remote channel multiplexing many exchanges.
///
/// Connections are created by peers (outgoing) and by the channel's accept
/// loop (incoming). Both directions carry calls once identified. A single
/// reader task processes the frames of a connection in arrival order.
pub struct Connection {
    id: ConnectionId,
    direction: Direction,
    local_addr: String,
    transport_remote_addr: String,
    remote: RwLock<Option<Identity>>,
    context: Weak<ChannelContext>,
    ids: ExchangeIdGenerator,
    ops: Mutex<ConnectionOps>,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    /// Wraps `link` and starts identification.
    pub(crate) fn open(
        link: FrameLink,
        direction: Direction,
        context: &Arc<ChannelContext>,
    ) -> Arc<Self> {
        let (local_addr, transport_remote_addr, writer, reader) = link.into_parts();
        let (state, _) = watch::channel(ConnectionState::Initializing);
        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            direction,
            local_addr,
            transport_remote_addr,
            remote: RwLock::new(None),
            context: Arc::downgrade(context),
            ids: ExchangeIdGenerator::new(),
            ops: Mutex::new(ConnectionOps {
                writer: Some(writer),
                exchanges: ExchangeTable::new(),
                drain: None,
            }),
            state,
        });

        #[cfg(feature = "observability")]
        debug!(
            connection_id = %connection.id,
            direction = %direction,
            remote = %connection.transport_remote_addr,
            "opening connection"
        );

        if direction.is_outgoing() {
            connection.write(context.identity().init_request());
        }
        tokio::spawn(Arc::clone(&connection).read_frames(reader));
        connection.spawn_handshake_timer(context.config().handshake_timeout);
        connection
    }

    fn spawn_handshake_timer(self: &Arc<Self>, timeout: Duration) {
        let weak = Arc::downgrade(self);
        let mut state = self.state.subscribe();
        tokio::spawn(async move {
            let settled = tokio::time::timeout(timeout, async {
                loop {
                    if !matches!(*state.borrow_and_update(), ConnectionState::Initializing) {
                        return;
                    }
                    if state.changed().await.is_err() {
                        return;
                    }
                }
            })
            .await;
            if settled.is_err() {
                if let Some(connection) = weak.upgrade() {
                    connection.fail_identification(HandshakeError::Timeout { after: timeout }, true);
                }
            }
        });
    }

    async fn read_frames(self: Arc<Self>, mut reader: mpsc::UnboundedReceiver<Frame>) {
        let mut state = self.state.subscribe();
        loop {
            tokio::select! {
                frame = reader.recv() => match frame {
                    Some(frame) => self.handle_frame(frame),
                    None => {
                        self.reset(ResetCause::remote("connection closed by remote"));
                        break;
                    }
                },
                changed = state.changed() => {
                    if changed.is_err() || self.is_destroyed() {
                        break;
                    }
                }
            }
        }
    }

    fn handle_frame(self: &Arc<Self>, frame: Frame) {
        let initializing = matches!(self.state(), ConnectionState::Initializing);
        match frame {
            Frame::InitRequest(init) if initializing && self.direction.is_incoming() => {
                self.on_init_request(&init);
            }
            Frame::InitResponse(init) if initializing && self.direction.is_outgoing() => {
                self.on_init_response(&init);
            }
            Frame::Error {
                id: INIT_EXCHANGE_ID,
                message,
                ..
            } if initializing => {
                self.fail_identification(HandshakeError::Rejected { message }, false);
            }
            frame if initializing => {
                self.fail_identification(
                    HandshakeError::UnexpectedFrame { kind: frame.kind() },
                    true,
                );
            }
            Frame::CallRequest(call) => self.on_call_request(call),
            Frame::CallResponse(response) => self.on_call_response(response),
            Frame::Error { id, code, message } => self.on_error_frame(id, code, message),
            Frame::InitRequest(_) | Frame::InitResponse(_) => {
                #[cfg(feature = "observability")]
                warn!(connection_id = %self.id, "duplicate identification frame");
                self.write(Frame::error(
                    INIT_EXCHANGE_ID,
                    ErrorCode::ProtocolError,
                    "duplicate identification",
                ));
                self.reset(ResetCause::local("protocol violation: duplicate identification"));
            }
        }
    }

    fn on_init_request(self: &Arc<Self>, init: &InitFrame) {
        let identity = match accept_init(init) {
            Ok(identity) => identity,
            Err(error) => return self.fail_identification(error, true),
        };
        let Some(context) = self.context.upgrade() else {
            self.reset(ResetCause::local("channel dropped"));
            return;
        };
        *self.remote.write() = Some(identity);
        self.write(context.identity().init_response());
        if self.mark_identified(&context) {
            context.attach_incoming(self);
        }
    }

    fn on_init_response(&self, init: &InitFrame) {
        let identity = match accept_init(init) {
            Ok(identity) => identity,
            Err(error) => return self.fail_identification(error, true),
        };
        *self.remote.write() = Some(identity);
        if let Some(context) = self.context.upgrade() {
            self.mark_identified(&context);
        }
    }

    fn mark_identified(&self, context: &ChannelContext) -> bool {
        let promoted = self.state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Initializing) {
                *state = ConnectionState::Identified;
                true
            } else {
                false
            }
        });
        if promoted {
            context.events.emit(ChannelEvent::ConnectionIdentified {
                connection_id: self.id,
                direction: self.direction,
                remote: self.remote_host_port(),
            });
        }
        promoted
    }

    fn fail_identification(&self, error: HandshakeError, notify_remote: bool) {
        #[cfg(feature = "observability")]
        warn!(connection_id = %self.id, error = %error, "identification failed");
        if notify_remote {
            self.write(Frame::error(
                INIT_EXCHANGE_ID,
                ErrorCode::ProtocolError,
                error.to_string(),
            ));
        }
        self.reset(ResetCause::local(format!("identification failed: {error}")));
    }

    fn on_call_request(self: &Arc<Self>, call: CallRequestFrame) {
        let Some(context) = self.context.upgrade() else {
            self.write(Frame::error(call.id, ErrorCode::Declined, "channel closed"));
            return;
        };
        let meta = ExchangeMeta {
            service: call.service.clone(),
            operation: call.operation.clone(),
            headers: call.headers.clone(),
        };
        let exempt = context.exempt.is_exempt(&meta.view(Direction::Incoming));

        let declined = {
            let mut guard = self.ops.lock();
            let ops = &mut *guard;
            let Some(writer) = ops.writer.clone() else {
                return;
            };
            let drain_reason = match ops.drain.as_ref() {
                Some(drain) if !exempt => Some(drain.reason().to_string()),
                _ => None,
            };
            if let Some(reason) = drain_reason {
                let _ = writer.send(Frame::error(
                    call.id,
                    ErrorCode::Declined,
                    format!("connection draining: {reason}"),
                ));
                Some(reason)
            } else if ops.exchanges.register_inbound(call.id, meta) {
                None
            } else {
                let _ = writer.send(Frame::error(
                    call.id,
                    ErrorCode::ProtocolError,
                    "duplicate exchange id",
                ));
                return;
            }
        };

        if let Some(reason) = declined {
            context.events.emit(ChannelEvent::RequestDeclined {
                connection_id: self.id,
                service: call.service,
                reason,
            });
            return;
        }

        let Some(handler) = context.handlers.lookup(&call.service, &call.operation) else {
            let message = format!(
                "no handler for service '{}' and operation '{}'",
                call.service, call.operation
            );
            self.send_response(call.id, Frame::error(call.id, ErrorCode::BadRequest, message));
            return;
        };

        let request = IncomingRequest {
            id: call.id,
            service: call.service,
            operation: call.operation,
            headers: call.headers,
            arg2: call.arg2,
            arg3: call.arg3,
            remote_addr: self.remote_host_port(),
            ttl: Duration::from_millis(call.ttl_ms),
        };
        let connection = Arc::clone(self);
        tokio::spawn(async move {
            let id = request.id;
            // A panicking handler still answers its exchange.
            let frame = match tokio::spawn(dispatch(handler, request)).await {
                Ok(frame) => frame,
                Err(error) => {
                    #[cfg(feature = "observability")]
                    warn!(connection_id = %connection.id, exchange_id = id, %error, "handler failed");
                    Frame::error(id, ErrorCode::UnexpectedError, format!("handler failed: {error}"))
                }
            };
            connection.send_response(id, frame);
        });
    }

    /// Sends the response of an incoming exchange if it is still tracked.
    fn send_response(&self, id: u32, frame: Frame) {
        let delivered = {
            let mut guard = self.ops.lock();
            let ops = &mut *guard;
            if ops.exchanges.finish_inbound(id) {
                if let Some(writer) = ops.writer.as_ref() {
                    let _ = writer.send(frame);
                }
                ops.release_if_drained();
                true
            } else {
                false
            }
        };
        if !delivered {
            self.emit(ChannelEvent::ResponseDropped {
                connection_id: self.id,
                exchange_id: id,
            });
        }
    }

    fn on_call_response(&self, response: CallResponseFrame) {
        let id = response.id;
        self.complete(id, Ok(CallResponse::from(response)));
    }

    fn on_error_frame(&self, id: u32, code: ErrorCode, message: String) {
        self.complete(id, Err(RequestError::from_error_frame(code, message)));
    }

    fn complete(&self, id: u32, outcome: Result<CallResponse, RequestError>) {
        let completed = {
            let mut ops = self.ops.lock();
            let completed = ops.exchanges.complete_outbound(id, outcome);
            ops.release_if_drained();
            completed
        };
        if !completed {
            #[cfg(feature = "observability")]
            debug!(connection_id = %self.id, exchange_id = id, "discarding late response");
        }
    }

    /// Registers and sends an outgoing call.
    ///
    /// Fails synchronously with [`RequestError::Drained`] when the connection
    /// is draining and the request is not exempt, and with
    /// [`RequestError::LocalReset`] when the connection is already destroyed.
    pub(crate) fn send_request(&self, params: CallParams<'_>) -> Result<PendingCall, RequestError> {
        let context = self.context.upgrade();
        let meta = ExchangeMeta {
            service: params.service.to_string(),
            operation: params.operation.to_string(),
            headers: params.headers.clone(),
        };
        let exempt = context
            .as_ref()
            .is_some_and(|context| context.exempt.is_exempt(&meta.view(Direction::Outgoing)));

        let outcome = {
            let mut guard = self.ops.lock();
            let ops = &mut *guard;
            match (ops.writer.clone(), ops.drain.as_ref()) {
                (None, _) => Err(RequestError::LocalReset {
                    reason: format!("{} is already destroyed", self.id),
                }),
                (Some(_), Some(drain)) if !exempt => Err(RequestError::Drained {
                    reason: drain.reason().to_string(),
                }),
                (Some(writer), _) => {
                    let id = loop {
                        let id = self.ids.next();
                        if !ops.exchanges.contains_outbound(id) {
                            break id;
                        }
                    };
                    let (sender, receiver) = oneshot::channel();
                    ops.exchanges.register_outbound(id, meta, sender);
                    let frame = Frame::CallRequest(CallRequestFrame {
                        id,
                        ttl_ms: params.ttl_millis(),
                        service: params.service.to_string(),
                        headers: params.headers.clone(),
                        operation: params.operation.to_string(),
                        arg2: params.arg2.to_vec(),
                        arg3: params.arg3.to_vec(),
                    });
                    if writer.send(frame).is_ok() {
                        Ok(PendingCall { id, receiver })
                    } else {
                        ops.exchanges.abandon_outbound(id);
                        Err(RequestError::LocalReset {
                            reason: "transport closed before the request was sent".to_string(),
                        })
                    }
                }
            }
        };

        if let (Err(RequestError::Drained { reason }), Some(context)) = (&outcome, &context) {
            context.events.emit(ChannelEvent::RequestDrained {
                connection_id: self.id,
                service: params.service.to_string(),
                reason: reason.clone(),
            });
        }
        outcome
    }

    /// Removes an outgoing exchange without completing it.
    ///
    /// Returns `false` if the exchange already reached a terminal state.
    pub(crate) fn abandon(&self, id: u32) -> bool {
        let mut ops = self.ops.lock();
        let abandoned = ops.exchanges.abandon_outbound(id);
        ops.release_if_drained();
        abandoned
    }

    /// Starts draining this connection.
    ///
    /// The transport stays open. Exchanges in flight right now that the
    /// channel's exemption predicate rejects are counted; the returned waiter
    /// resolves once all of them completed or the connection was reset.
    /// Later non-exempt requests are refused in both directions. Draining an
    /// already draining connection keeps the first reason.
    pub fn drain(&self, reason: &str) -> DrainWaiter {
        let context = self.context.upgrade();
        let (waiter, started) = {
            let mut guard = self.ops.lock();
            let ops = &mut *guard;
            if ops.writer.is_none() {
                return DrainWaiter::ready();
            }
            let mut started = None;
            if ops.drain.is_none() {
                let pending = match context.as_ref() {
                    Some(context) => ops
                        .exchanges
                        .count_for_drain(|request| context.exempt.is_exempt(request)),
                    None => ops.exchanges.count_for_drain(|_| false),
                };
                ops.drain = Some(DrainState::new(reason));
                started = Some(pending);
            }
            let waiter = match ops.drain.as_mut() {
                Some(drain) if ops.exchanges.counted() > 0 => drain.add_waiter(),
                _ => DrainWaiter::ready(),
            };
            (waiter, started)
        };

        if let (Some(pending), Some(context)) = (started, context) {
            context.events.emit(ChannelEvent::ConnectionDraining {
                connection_id: self.id,
                reason: reason.to_string(),
                pending,
            });
        }
        waiter
    }

    /// Destroys the connection.
    ///
    /// Pending outgoing requests fail according to `cause`, in-flight handler
    /// responses will be dropped and drain waiters are released. Returns
    /// `false` if the connection was already destroyed.
    pub fn reset(&self, cause: ResetCause) -> bool {
        let (failed, abandoned) = {
            let mut guard = self.ops.lock();
            let ops = &mut *guard;
            if ops.writer.take().is_none() {
                return false;
            }
            let failed = ops.exchanges.fail_outbound(&cause.to_request_error());
            let abandoned = ops.exchanges.clear_inbound();
            ops.exchanges.reset_count();
            if let Some(drain) = ops.drain.as_mut() {
                drain.release();
            }
            (failed, abandoned)
        };

        self.state.send_replace(ConnectionState::Destroyed {
            reason: cause.reason().to_string(),
        });
        self.emit(ChannelEvent::ConnectionReset {
            connection_id: self.id,
            direction: self.direction,
            local: cause.is_local(),
            reason: cause.reason().to_string(),
            failed_requests: failed,
            abandoned_responses: abandoned,
        });
        true
    }

    /// Waits until identification settles.
    pub async fn wait_identified(&self) -> Result<(), RequestError> {
        let mut watcher = self.state.subscribe();
        loop {
            let current = watcher.borrow_and_update().clone();
            match current {
                ConnectionState::Initializing => {}
                ConnectionState::Identified => return Ok(()),
                ConnectionState::Destroyed { reason } => {
                    return Err(RequestError::NoConnectionAvailable {
                        host_port: self.remote_host_port(),
                        reason,
                    });
                }
            }
            if watcher.changed().await.is_err() {
                return Err(RequestError::NoConnectionAvailable {
                    host_port: self.remote_host_port(),
                    reason: "connection dropped".to_string(),
                });
            }
        }
    }

    /// Resolves once the connection is destroyed.
    pub async fn closed(&self) {
        let mut watcher = self.state.subscribe();
        loop {
            if watcher.borrow_and_update().is_destroyed() {
                return;
            }
            if watcher.changed().await.is_err() {
                return;
            }
        }
    }

    fn write(&self, frame: Frame) -> bool {
        self.ops
            .lock()
            .writer
            .as_ref()
            .is_some_and(|writer| writer.send(frame).is_ok())
    }

    fn emit(&self, event: ChannelEvent) {
        if let Some(context) = self.context.upgrade() {
            context.events.emit(event);
        }
    }

    /// Process-unique id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Which side opened the connection.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Local address of the link.
    #[must_use]
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    /// Address the remote channel is known by.
    ///
    /// That is the `host:port` it announced, or the transport address when
    /// it is not identified yet or announced itself as ephemeral.
    #[must_use]
    pub fn remote_host_port(&self) -> String {
        match self.remote.read().as_ref() {
            Some(identity) if !identity.is_ephemeral() => identity.host_port().to_string(),
            _ => self.transport_remote_addr.clone(),
        }
    }

    /// Identity announced by the remote, once identified.
    #[must_use]
    pub fn remote_identity(&self) -> Option<Identity> {
        self.remote.read().clone()
    }

    /// Current identification state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Returns `true` once identified and not destroyed.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.state.borrow().is_identified()
    }

    /// Returns `true` once destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().is_destroyed()
    }

    /// Returns `true` if told to drain and not destroyed.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        let ops = self.ops.lock();
        ops.writer.is_some() && ops.drain.is_some()
    }

    /// Reason of the drain, if draining.
    #[must_use]
    pub fn drain_reason(&self) -> Option<String> {
        self.ops
            .lock()
            .drain
            .as_ref()
            .map(|drain| drain.reason().to_string())
    }

    /// In-flight exchanges in both directions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.ops.lock().exchanges.len()
    }

    /// In-flight exchanges a drain is still waiting for.
    #[must_use]
    pub fn drain_pending_count(&self) -> usize {
        self.ops.lock().exchanges.counted()
    }

    /// In-flight outgoing exchanges.
    #[must_use]
    pub fn outgoing_pending_count(&self) -> usize {
        self.ops.lock().exchanges.outbound_len()
    }

    /// In-flight incoming exchanges.
    #[must_use]
    pub fn incoming_pending_count(&self) -> usize {
        self.ops.lock().exchanges.inbound_len()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("remote", &self.remote_host_port())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, ChannelContext};
    use crate::connection::{EPHEMERAL_HOST_PORT, PROTOCOL_VERSION};
    use crate::transport::MemoryNetwork;

    struct RemoteEnd {
        sender: mpsc::UnboundedSender<Frame>,
        receiver: mpsc::UnboundedReceiver<Frame>,
    }

    impl RemoteEnd {
        async fn next(&mut self) -> Frame {
            tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
                .await
                .expect("frame within two seconds")
                .expect("link open")
        }

        fn send(&self, frame: Frame) {
            self.sender.send(frame).unwrap();
        }
    }

    fn context(config: ChannelConfig) -> Arc<ChannelContext> {
        ChannelContext::new(config, Arc::new(MemoryNetwork::new()))
    }

    fn remote_init() -> InitFrame {
        InitFrame {
            version: PROTOCOL_VERSION,
            host_port: "127.0.0.1:9000".to_string(),
            process_name: "remote".to_string(),
        }
    }

    async fn identified_outgoing(context: &Arc<ChannelContext>) -> (Arc<Connection>, RemoteEnd) {
        let (local, remote) = FrameLink::pair("127.0.0.1:1", "127.0.0.1:9000");
        let (_, _, sender, receiver) = remote.into_parts();
        let mut remote = RemoteEnd { sender, receiver };
        let connection = Connection::open(local, Direction::Outgoing, context);

        match remote.next().await {
            Frame::InitRequest(init) => assert_eq!(init.host_port, EPHEMERAL_HOST_PORT),
            other => panic!("expected init request, got {other:?}"),
        }
        remote.send(Frame::InitResponse(remote_init()));
        connection.wait_identified().await.unwrap();
        (connection, remote)
    }

    fn params<'a>(service: &'a str, headers: &'a Headers) -> CallParams<'a> {
        CallParams {
            service,
            operation: "echo",
            headers,
            arg2: b"",
            arg3: b"mess1",
            ttl: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_identification_uses_announced_host_port() {
        let context = context(ChannelConfig::default());
        let (connection, _remote) = identified_outgoing(&context).await;
        assert!(connection.is_identified());
        assert_eq!(connection.remote_host_port(), "127.0.0.1:9000");
        assert_eq!(
            connection.remote_identity().map(|i| i.process_name().to_string()),
            Some("remote".to_string())
        );
    }

    #[tokio::test]
    async fn test_handshake_timeout_destroys_connection() {
        let config = ChannelConfig::default().with_handshake_timeout(Duration::from_millis(20));
        let context = context(config);
        let (local, _remote) = FrameLink::pair("127.0.0.1:1", "127.0.0.1:9000");
        let connection = Connection::open(local, Direction::Outgoing, &context);

        let error = connection.wait_identified().await.unwrap_err();
        assert_eq!(error.error_type(), "tchannel.no-connection-available");
        assert!(connection.is_destroyed());
    }

    #[tokio::test]
    async fn test_response_completes_exchange_once() {
        let context = context(ChannelConfig::default());
        let (connection, mut remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        let pending = connection.send_request(params("server", &headers)).unwrap();
        let id = match remote.next().await {
            Frame::CallRequest(call) => {
                assert_eq!(call.arg3, b"mess1");
                assert_eq!(call.ttl_ms, 100);
                call.id
            }
            other => panic!("expected call request, got {other:?}"),
        };
        for body in ["first", "second"] {
            remote.send(Frame::CallResponse(CallResponseFrame {
                id,
                ok: true,
                headers: Headers::new(),
                arg2: Vec::new(),
                arg3: body.as_bytes().to_vec(),
            }));
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        let response = pending
            .wait_until(&connection, deadline, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.arg3, b"first");
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_sub_millisecond_ttl_stays_bounded() {
        let context = context(ChannelConfig::default());
        let (connection, mut remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        for (ttl, expected) in [
            (Duration::from_micros(300), 1),
            (Duration::ZERO, 1),
            (Duration::from_micros(1_500), 2),
        ] {
            let call = CallParams {
                ttl,
                ..params("server", &headers)
            };
            let _pending = connection.send_request(call).unwrap();
            match remote.next().await {
                Frame::CallRequest(call) => assert_eq!(call.ttl_ms, expected),
                other => panic!("expected call request, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_abandons_exchange() {
        let context = context(ChannelConfig::default());
        let (connection, _remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        let pending = connection.send_request(params("server", &headers)).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(10);
        let error = pending
            .wait_until(&connection, deadline, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(error.error_type(), "tchannel.request.timeout");
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_draining_refuses_outgoing_and_declines_incoming() {
        let context = context(ChannelConfig::default());
        let (connection, mut remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        connection.drain("testdown").await;
        assert!(connection.is_draining());

        let error = connection.send_request(params("server", &headers)).unwrap_err();
        assert_eq!(error.error_type(), "tchannel.request.drained");

        remote.send(Frame::CallRequest(CallRequestFrame {
            id: 77,
            ttl_ms: 100,
            service: "server".to_string(),
            headers: Headers::new(),
            operation: "echo".to_string(),
            arg2: Vec::new(),
            arg3: b"mess2".to_vec(),
        }));
        match remote.next().await {
            Frame::Error { id, code, message } => {
                assert_eq!(id, 77);
                assert_eq!(code, ErrorCode::Declined);
                assert!(message.contains("testdown"));
            }
            other => panic!("expected declined error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_drain_waits_for_pending_then_resolves() {
        let context = context(ChannelConfig::default());
        let (connection, mut remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        let pending = connection.send_request(params("server", &headers)).unwrap();
        let Frame::CallRequest(call) = remote.next().await else {
            panic!("expected call request");
        };

        let waiter = connection.drain("testdown");
        assert!(!waiter.is_ready());
        assert_eq!(connection.drain_pending_count(), 1);

        remote.send(Frame::CallResponse(CallResponseFrame {
            id: call.id,
            ok: true,
            headers: Headers::new(),
            arg2: Vec::new(),
            arg3: call.arg3,
        }));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        let response = pending
            .wait_until(&connection, deadline, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.arg3, b"mess1");
        waiter.await;
    }

    #[tokio::test]
    async fn test_remote_close_fails_pending_with_connection_reset() {
        let context = context(ChannelConfig::default());
        let (connection, remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        let pending = connection.send_request(params("server", &headers)).unwrap();
        drop(remote);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        let error = pending
            .wait_until(&connection, deadline, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(error.error_type(), "tchannel.connection.reset");
        connection.closed().await;
    }

    #[tokio::test]
    async fn test_local_reset_fails_pending_and_later_sends() {
        let context = context(ChannelConfig::default());
        let (connection, _remote) = identified_outgoing(&context).await;
        let headers = Headers::new();

        let pending = connection.send_request(params("server", &headers)).unwrap();
        assert!(connection.reset(ResetCause::local("peer closed")));
        assert!(!connection.reset(ResetCause::remote("again")));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        let error = pending
            .wait_until(&connection, deadline, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(error.error_type(), "tchannel.local.reset");

        let error = connection.send_request(params("server", &headers)).unwrap_err();
        assert_eq!(error.error_type(), "tchannel.local.reset");
        assert!(connection.drain("late").is_ready());
    }
}
