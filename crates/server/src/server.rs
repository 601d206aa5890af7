//! The serve loop.
//!
//! One interest is pulled from the portal and answered to completion
//! before the next is read.

use chunkfetch_portal::{Portal, TcpListenerPortal};
use chunkfetch_protocol::{Interest, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{ResponseBuilder, ServerConfig, ServerError};

/// Serves a [`ResponseBuilder`] over a portal.
pub struct FileServer<P: Portal> {
    portal: P,
    responder: ResponseBuilder,
    verbose: bool,
}

impl<P: Portal> FileServer<P> {
    pub fn new(portal: P, responder: ResponseBuilder) -> Self {
        Self {
            portal,
            responder,
            verbose: false,
        }
    }

    /// Logs every request and response at info level instead of debug.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn responder(&self) -> &ResponseBuilder {
        &self.responder
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    /// Runs until cancelled or the portal closes.
    ///
    /// Returns the number of interests answered.
    pub async fn serve(&mut self, cancel: CancellationToken) -> Result<u64, ServerError> {
        info!(
            prefix = %self.responder.prefix(),
            dir = %self.responder.source_dir().display(),
            "now serving files"
        );

        let mut answered = 0u64;
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("server shutting down");
                    break;
                }
                result = self.portal.receive() => result?,
            };

            let interest = match message {
                Some(Message::Interest(interest)) => interest,
                Some(Message::Content(content)) => {
                    debug!(name = %content.name, "ignoring inbound content object");
                    continue;
                }
                None => {
                    info!("portal closed");
                    break;
                }
            };

            if self.answer(interest).await? {
                answered += 1;
            }
        }

        info!(answered, "server stopped");
        Ok(answered)
    }

    async fn answer(&mut self, interest: Interest) -> Result<bool, ServerError> {
        if self.verbose {
            info!(name = %interest.name, "<- received interest");
        } else {
            debug!(name = %interest.name, "<- received interest");
        }

        let Some(content) = self.responder.respond(&interest) else {
            self.portal.decline(&interest.name);
            return Ok(false);
        };

        let bytes = content.payload.len();
        if self.verbose {
            info!(bytes, final_chunk = content.final_chunk, "-> responding");
        } else {
            debug!(bytes, final_chunk = content.final_chunk, "-> responding");
        }

        self.portal.send(content.into()).await?;
        Ok(true)
    }
}

/// Validates `config`, binds a TCP portal and serves until cancelled.
pub async fn run(config: &ServerConfig, cancel: CancellationToken) -> Result<u64, ServerError> {
    let responder = ResponseBuilder::from_config(config)?;
    let portal = TcpListenerPortal::bind(config.bind, responder.prefix().clone()).await?;

    FileServer::new(portal, responder)
        .with_verbose(config.verbose)
        .serve(cancel)
        .await
}
