//! Portals: the send/receive endpoints of the naming transport.
//!
//! A [`Portal`] moves [`Message`]s: the client sends interests and reads
//! content objects, the server reads interests and sends content objects
//! back under the same name. Two implementations are provided:
//!
//! - [`MemoryPortal`]: an in-process pair, used by tests and embedding.
//! - [`TcpPortal`] / [`TcpListenerPortal`]: a length-prefixed binary
//!   framing over TCP, see [`wire`].
//!
//! Delivery on a single portal is reliable and in order.

pub mod error;
pub mod memory;
pub mod tcp;
pub mod wire;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chunkfetch_protocol::{Message, ResourceName};

pub use error::PortalError;
pub use memory::MemoryPortal;
pub use tcp::{TcpListenerPortal, TcpPortal};

/// TCP read/write buffer size (64 KB).
pub const TCP_BUFFER_SIZE: usize = 64 * 1024;

/// Timeout for the TCP connection attempt.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Boxed future returned by [`Portal`] methods.
pub type PortalFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortalError>> + Send + 'a>>;

/// A message endpoint.
///
/// `receive` resolves to `Ok(None)` once the portal is closed and no more
/// messages will arrive. It waits indefinitely otherwise; callers that need
/// a deadline wrap it in `tokio::time::timeout`.
pub trait Portal: Send {
    fn send(&mut self, message: Message) -> PortalFuture<'_, ()>;

    fn receive(&mut self) -> PortalFuture<'_, Option<Message>>;

    /// Tells the portal that no content will be sent for `name`, so it can
    /// forget the requester.
    fn decline(&mut self, _name: &ResourceName) {}
}

impl<P: Portal + ?Sized> Portal for Box<P> {
    fn send(&mut self, message: Message) -> PortalFuture<'_, ()> {
        (**self).send(message)
    }

    fn receive(&mut self) -> PortalFuture<'_, Option<Message>> {
        (**self).receive()
    }

    fn decline(&mut self, name: &ResourceName) {
        (**self).decline(name)
    }
}
