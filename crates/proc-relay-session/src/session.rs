//! One connection's protocol state machine.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use proc_relay_core::{Message, MessageCodec, ProcessSource, SnapshotStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::admission::AdmissionPolicy;
use crate::publisher::Publisher;
use crate::takeover::{SenderSlot, SessionCommand};

/// Which side established the connection. Roles differ only in the initial
/// transition: the outbound side opens the handshake; the inbound side runs
/// the admission policy and then waits for the peer's hello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted by our listener.
    Inbound,
    /// Dialed out by us.
    Outbound,
}

/// Session lifecycle state. Only `Open` dispatches messages; `Closed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Shared configuration and collaborators handed to every session.
pub struct SessionContext<P, S> {
    /// Whether this process transmits snapshots once negotiated.
    pub send_role: bool,
    /// Publisher tick period.
    pub period: Duration,
    /// Admission policy for inbound peers.
    pub policy: AdmissionPolicy,
    /// Process enumeration collaborator.
    pub source: Arc<P>,
    /// Snapshot persistence collaborator.
    pub store: Arc<S>,
    /// Process-wide sending-role slot.
    pub slot: SenderSlot,
}

impl<P, S> Clone for SessionContext<P, S> {
    fn clone(&self) -> Self {
        Self {
            send_role: self.send_role,
            period: self.period,
            policy: self.policy.clone(),
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            slot: self.slot.clone(),
        }
    }
}

/// One active connection endpoint.
///
/// Owns the connection's protocol state, interprets each parsed message, and
/// owns the snapshot publisher while this side is the sending one. The
/// publisher handle lives here, not in any process-wide slot; a session that
/// loses the sending role is told so over its control channel.
pub struct Session<P, S> {
    ctx: SessionContext<P, S>,
    role: Role,
    peer: SocketAddr,
    state: SessionState,
    outbound_tx: mpsc::UnboundedSender<Message>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Message>>,
    control_tx: mpsc::UnboundedSender<SessionCommand>,
    control_rx: Option<mpsc::UnboundedReceiver<SessionCommand>>,
    publisher: Option<Publisher>,
}

impl<P, S> Session<P, S>
where
    P: ProcessSource + 'static,
    S: SnapshotStore + 'static,
{
    /// Create a session for an established connection.
    #[must_use]
    pub fn new(ctx: SessionContext<P, S>, role: Role, peer: SocketAddr) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            ctx,
            role,
            peer,
            state: SessionState::Connecting,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            control_tx,
            control_rx: Some(control_rx),
            publisher: None,
        }
    }

    /// Drive the session over `io` until the connection closes.
    ///
    /// Inbound sessions are checked against the admission policy before any
    /// byte is read; a rejected peer is dropped without a reply. All protocol
    /// failures surface as log lines; a malformed JSON record closes this
    /// connection but never the process.
    pub async fn run<IO>(mut self, io: IO)
    where
        IO: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.role == Role::Inbound && !self.ctx.policy.allows(self.peer.ip()) {
            tracing::warn!(peer = %self.peer, "peer not whitelisted, dropping connection");
            self.state = SessionState::Closed;
            return;
        }

        let (read, write) = tokio::io::split(io);
        let mut frames = FramedRead::new(read, MessageCodec::new());
        let mut sink = FramedWrite::new(write, MessageCodec::new());

        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };
        let Some(mut control_rx) = self.control_rx.take() else {
            return;
        };

        // Writes happen on a dedicated task so a slow peer never stalls
        // message dispatch.
        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    tracing::error!("failed to write message: {e}");
                    break;
                }
            }
        });

        self.state = SessionState::Open;
        tracing::info!(peer = %self.peer, role = ?self.role, "connection open");

        if self.role == Role::Outbound {
            self.send(Message::hello(self.ctx.send_role));
        }

        loop {
            tokio::select! {
                incoming = frames.next() => match incoming {
                    Some(Ok(msg)) => self.handle_message(msg).await,
                    Some(Err(e)) => {
                        tracing::error!(peer = %self.peer, "closing connection: {e}");
                        break;
                    }
                    None => break,
                },
                cmd = control_rx.recv() => {
                    if let Some(SessionCommand::StopPublishing) = cmd {
                        tracing::info!(peer = %self.peer, "sending role taken over, ceasing task sending");
                        self.stop_publisher();
                    }
                },
            }
        }

        // A closed session must never keep producing snapshot traffic.
        self.stop_publisher();
        self.state = SessionState::Closed;
        writer_task.abort();
        tracing::info!(peer = %self.peer, "connection closed");
    }

    /// Dispatch one received message.
    async fn handle_message(&mut self, msg: Message) {
        if self.state != SessionState::Open {
            return;
        }
        match msg {
            // A hello that does not announce a send role tells us nothing.
            Message::Hello { send: None } => {}
            Message::Hello {
                send: Some(peer_sends),
            } => self.handle_hello(peer_sends),
            Message::Ack => {
                if self.ctx.send_role {
                    self.start_publisher();
                }
            }
            Message::Error { msg } => {
                tracing::warn!(peer = %self.peer, "error from the other side: {msg}");
            }
            Message::Tasks { tasks } => {
                tracing::info!(peer = %self.peer, count = tasks.len(), "received tasks");
                if let Err(e) = self.ctx.store.store(&tasks).await {
                    tracing::warn!("failed to persist snapshot: {e}");
                }
            }
            Message::Unknown => {}
        }
    }

    fn handle_hello(&mut self, peer_sends: bool) {
        match (self.ctx.send_role, peer_sends) {
            (true, true) => {
                let msg = "both sides are configured to send, enable the send flag on one side only";
                tracing::warn!(peer = %self.peer, "{msg}");
                self.send(Message::error(msg));
            }
            (false, false) => {
                let msg = "neither side is configured to send, enable the send flag on one side";
                tracing::warn!(peer = %self.peer, "{msg}");
                self.send(Message::error(msg));
            }
            (true, false) => {
                self.send(Message::Ack);
                self.start_publisher();
            }
            (false, true) => {
                self.send(Message::Ack);
            }
        }
    }

    fn send(&self, msg: Message) {
        if self.outbound_tx.send(msg).is_err() {
            tracing::debug!(peer = %self.peer, "connection closing, dropped outbound message");
        }
    }

    /// Start the snapshot publisher. No-op while one is already running, so
    /// a duplicate hello or ok cannot double-start it.
    fn start_publisher(&mut self) {
        if self.publisher.is_some() {
            tracing::debug!(peer = %self.peer, "publisher already running");
            return;
        }
        self.ctx.slot.claim(self.control_tx.clone());
        tracing::info!(peer = %self.peer, period = ?self.ctx.period, "starting task transmission");
        self.publisher = Some(Publisher::start(
            Arc::clone(&self.ctx.source),
            self.outbound_tx.clone(),
            self.ctx.period,
        ));
    }

    fn stop_publisher(&mut self) {
        if let Some(mut publisher) = self.publisher.take() {
            publisher.stop();
            tracing::info!(peer = %self.peer, "ceased task sending");
        }
    }
}
