//! The TCP front end: newline-delimited JSON frames, one task per connection

use std::{io, sync::Arc};

use futures::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, error::TrySendError},
};
use tokio_util::{
    codec::{Framed, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};
use tracing::{debug, info, warn, Instrument};

use crate::{
    config::ServerConfig,
    error::{CommandError, TransportError},
    handler::{Handler, Peer},
    session::Transport,
};

/// Queues frames for a connection's writer task without ever waiting
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: &str) -> Result<(), TransportError> {
        self.tx.try_send(frame.to_owned()).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

pub struct Server {
    handler: Arc<Handler>,
    outbound_capacity: usize,
    max_frame_len: usize,
}

impl Server {
    pub fn new(handler: Arc<Handler>, config: &ServerConfig) -> Self {
        Self {
            handler,
            outbound_capacity: config.outbound_capacity,
            max_frame_len: config.max_frame_len,
        }
    }

    /// Accept connections until `shutdown` is cancelled
    pub async fn run(&self, listener: TcpListener, shutdown: CancellationToken) -> io::Result<()> {
        info!(addr = %listener.local_addr()?, "listening");
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            let (socket, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    continue;
                }
            };
            let connection = serve_connection(
                socket,
                self.handler.clone(),
                self.outbound_capacity,
                self.max_frame_len,
                shutdown.child_token(),
            );
            tokio::spawn(connection.instrument(tracing::info_span!("connection", %addr)));
        }
        info!("stopped accepting connections");
        Ok(())
    }
}

async fn serve_connection(
    socket: TcpStream,
    handler: Arc<Handler>,
    outbound_capacity: usize,
    max_frame_len: usize,
    shutdown: CancellationToken,
) {
    let (mut sink, mut stream) =
        Framed::new(socket, LinesCodec::new_with_max_length(max_frame_len)).split();
    let (tx, mut rx) = mpsc::channel::<String>(outbound_capacity);
    let writer = tokio::spawn(
        async move {
            while let Some(frame) = rx.recv().await {
                if let Err(err) = sink.send(frame).await {
                    debug!(error = %err, "write failed");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut peer = Peer::new(Arc::new(ChannelTransport::new(tx)));
    debug!(peer = %peer.id(), "connection opened");
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(line)) if line.trim().is_empty() => {}
            Some(Ok(line)) => handler.handle(&mut peer, &line).await,
            // The stream ends after a decode error, so this closes the connection
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                handler.reject(&peer, CommandError::FrameTooLong { max: max_frame_len });
                break;
            }
            Some(Err(LinesCodecError::Io(err))) => {
                debug!(error = %err, "read failed");
                break;
            }
            None => break,
        }
    }
    handler.on_close(&peer);
    // Dropping the last sender lets the writer flush what is queued and finish
    drop(peer);
    if writer.await.is_err() {
        warn!("writer task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport_reports_full_and_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let transport = ChannelTransport::new(tx);
        assert!(transport.is_open());
        assert_eq!(transport.send("first"), Ok(()));
        // Never waits for room
        assert_eq!(transport.send("second"), Err(TransportError::Full));
        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(transport.send("third"), Ok(()));

        drop(rx);
        assert!(!transport.is_open());
        assert_eq!(transport.send("fourth"), Err(TransportError::Closed));
    }
}
