//! TCP portals.
//!
//! [`TcpPortal`] is the client end: one connection, messages framed with
//! [`wire`](crate::wire). [`TcpListenerPortal`] is the publishing end: it
//! accepts any number of connections, keeps only interests under its
//! prefix, and routes each content object back to the connections that
//! expressed an interest in exactly that name.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use chunkfetch_protocol::{Message, ResourceName};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PortalError;
use crate::wire::{read_message, write_message};
use crate::{Portal, PortalFuture, TCP_BUFFER_SIZE, TCP_CONNECT_TIMEOUT};

/// Queue depth between connection readers and the portal owner.
const INBOUND_QUEUE: usize = 256;

/// Queue depth of each connection's writer. Content for a consumer whose
/// queue is full is dropped.
const OUTBOUND_QUEUE: usize = 64;

// ---------------------------------------------------------------------------
// TcpPortal
// ---------------------------------------------------------------------------

/// Client end over a single TCP connection.
pub struct TcpPortal {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    peer: SocketAddr,
}

impl TcpPortal {
    /// Connects to a listening portal.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, PortalError> {
        let stream = match tokio::time::timeout(TCP_CONNECT_TIMEOUT, TcpStream::connect(addr)).await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(PortalError::Timeout),
        };
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        info!(%peer, "portal connected");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::with_capacity(TCP_BUFFER_SIZE, reader),
            writer: BufWriter::with_capacity(TCP_BUFFER_SIZE, writer),
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Portal for TcpPortal {
    fn send(&mut self, message: Message) -> PortalFuture<'_, ()> {
        Box::pin(async move {
            write_message(&mut self.writer, &message).await?;
            self.writer.flush().await?;
            Ok(())
        })
    }

    fn receive(&mut self) -> PortalFuture<'_, Option<Message>> {
        Box::pin(async move { read_message(&mut self.reader).await })
    }
}

// ---------------------------------------------------------------------------
// TcpListenerPortal
// ---------------------------------------------------------------------------

type ConnId = u64;

type Connections = Arc<Mutex<HashMap<ConnId, mpsc::Sender<Message>>>>;

enum Inbound {
    Message(ConnId, Message),
    Closed(ConnId),
}

/// Publishing end: accepts connections and serves interests under `prefix`.
///
/// Interests are delivered through [`Portal::receive`] one at a time. A
/// content object passed to [`Portal::send`] is queued for every
/// connection with a pending interest for its name; content with no
/// pending interest is dropped. [`Portal::decline`] forgets the pending
/// interest for a name that will not be answered. Dropping the portal stops the accept loop
/// and closes all connections.
pub struct TcpListenerPortal {
    local_addr: SocketAddr,
    prefix: ResourceName,
    inbound: mpsc::Receiver<Inbound>,
    connections: Connections,
    pending: HashMap<ResourceName, Vec<ConnId>>,
    cancel: CancellationToken,
}

impl TcpListenerPortal {
    /// Binds `addr` and starts accepting connections in the background.
    pub async fn bind<A: ToSocketAddrs>(addr: A, prefix: ResourceName) -> Result<Self, PortalError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, %prefix, "portal listening");

        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let connections: Connections = Arc::default();
        let cancel = CancellationToken::new();

        tokio::spawn(accept_loop(
            listener,
            inbound_tx,
            Arc::clone(&connections),
            cancel.clone(),
        ));

        Ok(Self {
            local_addr,
            prefix,
            inbound,
            connections,
            pending: HashMap::new(),
            cancel,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn prefix(&self) -> &ResourceName {
        &self.prefix
    }

    /// Number of interests awaiting a response.
    pub fn pending_interests(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    async fn next_interest(&mut self) -> Result<Option<Message>, PortalError> {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                event = self.inbound.recv() => event,
            };

            match event {
                None => return Ok(None),
                Some(Inbound::Closed(conn)) => {
                    self.pending.retain(|_, conns| {
                        conns.retain(|c| *c != conn);
                        !conns.is_empty()
                    });
                }
                Some(Inbound::Message(conn, Message::Interest(interest))) => {
                    if !interest.name.starts_with(&self.prefix) {
                        debug!(conn, name = %interest.name, "interest outside published prefix");
                        continue;
                    }
                    let waiting = self.pending.entry(interest.name.clone()).or_default();
                    if !waiting.contains(&conn) {
                        waiting.push(conn);
                    }
                    return Ok(Some(Message::Interest(interest)));
                }
                Some(Inbound::Message(conn, Message::Content(content))) => {
                    debug!(conn, name = %content.name, "ignoring content from a consumer");
                }
            }
        }
    }

    fn route_content(&mut self, message: Message) -> Result<(), PortalError> {
        let Message::Content(content) = &message else {
            return Err(PortalError::Protocol(
                "a listener portal only sends content objects".into(),
            ));
        };

        let Some(waiting) = self.pending.remove(&content.name) else {
            debug!(name = %content.name, "no pending interest, content dropped");
            return Ok(());
        };

        let senders: Vec<_> = {
            let connections = self
                .connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            waiting
                .iter()
                .filter_map(|conn| connections.get(conn).map(|tx| (*conn, tx.clone())))
                .collect()
        };

        // Never wait on a slow consumer: the serve loop is shared.
        for (conn, tx) in senders {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(conn, name = %content.name, "consumer not reading, content dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn, "connection closed before content was delivered");
                }
            }
        }
        Ok(())
    }
}

impl Portal for TcpListenerPortal {
    fn send(&mut self, message: Message) -> PortalFuture<'_, ()> {
        Box::pin(async move { self.route_content(message) })
    }

    fn receive(&mut self) -> PortalFuture<'_, Option<Message>> {
        Box::pin(self.next_interest())
    }

    fn decline(&mut self, name: &ResourceName) {
        if let Some(waiting) = self.pending.remove(name) {
            debug!(%name, consumers = waiting.len(), "interest declined");
        }
    }
}

impl Drop for TcpListenerPortal {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    inbound: mpsc::Sender<Inbound>,
    connections: Connections,
    cancel: CancellationToken,
) {
    let mut next_id: ConnId = 0;

    loop {
        let (stream, addr) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("portal accept loop stopped");
                return;
            }
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        let conn = next_id;
        next_id += 1;
        info!(conn, %addr, "consumer connected");

        if let Err(e) = stream.set_nodelay(true) {
            debug!(conn, error = %e, "set_nodelay failed");
        }

        let (reader, writer) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conn, outbound_tx);

        tokio::spawn(write_loop(conn, writer, outbound_rx, cancel.clone()));
        tokio::spawn(read_loop(
            conn,
            reader,
            inbound.clone(),
            Arc::clone(&connections),
            cancel.clone(),
        ));
    }
}

async fn read_loop(
    conn: ConnId,
    reader: OwnedReadHalf,
    inbound: mpsc::Sender<Inbound>,
    connections: Connections,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::with_capacity(TCP_BUFFER_SIZE, reader);

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = read_message(&mut reader) => result,
        };

        match result {
            Ok(Some(message)) => {
                if inbound.send(Inbound::Message(conn, message)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!(conn, "consumer disconnected");
                break;
            }
            Err(e) => {
                warn!(conn, error = %e, "dropping connection");
                break;
            }
        }
    }

    // Dropping the sender ends the write loop.
    connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&conn);
    let _ = inbound.send(Inbound::Closed(conn)).await;
}

async fn write_loop(
    conn: ConnId,
    writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) {
    let mut writer = BufWriter::with_capacity(TCP_BUFFER_SIZE, writer);

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = outbound.recv() => match message {
                Some(m) => m,
                None => break,
            },
        };

        let result = async {
            write_message(&mut writer, &message).await?;
            writer.flush().await?;
            Ok::<_, PortalError>(())
        }
        .await;

        if let Err(e) = result {
            warn!(conn, error = %e, "write failed");
            break;
        }
    }

    let _ = writer.shutdown().await;
}
