//! In-process portal pair over tokio channels.

use chunkfetch_protocol::Message;
use tokio::sync::mpsc;

use crate::{Portal, PortalError, PortalFuture};

/// One end of an in-memory duplex link.
///
/// Whatever one end sends, the other receives, in order. Dropping one end
/// closes the other's receive side.
#[derive(Debug)]
pub struct MemoryPortal {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl MemoryPortal {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

impl Portal for MemoryPortal {
    fn send(&mut self, message: Message) -> PortalFuture<'_, ()> {
        let result = self.tx.send(message).map_err(|_| PortalError::Closed);
        Box::pin(async move { result })
    }

    fn receive(&mut self) -> PortalFuture<'_, Option<Message>> {
        Box::pin(async move { Ok(self.rx.recv().await) })
    }
}

#[cfg(test)]
mod tests {
    use chunkfetch_protocol::{ContentObject, Interest, ResourceName};

    use super::*;

    fn name(s: &str) -> ResourceName {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn pair_is_duplex_and_ordered() {
        let (mut client, mut server) = MemoryPortal::pair();

        for i in 0..3 {
            client
                .send(Interest::new(name("lci:/a").with_chunk(i)).into())
                .await
                .unwrap();
        }
        for i in 0..3 {
            let msg = server.receive().await.unwrap().unwrap();
            assert_eq!(msg.name(), &name("lci:/a").with_chunk(i));
        }

        let content = ContentObject::new(name("lci:/a/chunk=0"), b"x".to_vec(), 0);
        server.send(content.clone().into()).await.unwrap();
        assert_eq!(
            client.receive().await.unwrap(),
            Some(Message::Content(content))
        );
    }

    #[tokio::test]
    async fn dropping_peer_closes() {
        let (mut client, server) = MemoryPortal::pair();
        drop(server);
        assert!(client.receive().await.unwrap().is_none());
        assert!(matches!(
            client.send(Interest::new(name("lci:/a")).into()).await,
            Err(PortalError::Closed)
        ));
    }
}
