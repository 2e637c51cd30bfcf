//! WebSocket connection handling
//!
//! Upgrades an accepted TCP stream, then drives one [`Session`] with the
//! frames it receives until the client closes, the transport fails, or the
//! server shuts down.

use crate::core::ledger::Ledger;
use crate::core::session::Session;
use crate::io::protocol::ResponseStyle;
use crate::server::registry::{RegistrationGuard, SessionRegistry};
use crate::types::TerminalError;
use chrono::Local;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long to wait for the client's close reply on shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client may take to send its upgrade request
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a connection task needs from the server
#[derive(Clone)]
pub struct ConnectionContext {
    pub ledger: Arc<Ledger>,
    pub registry: Arc<SessionRegistry>,
    pub style: ResponseStyle,
    pub shutdown: CancellationToken,
}

/// Upgrade a TCP stream and serve it until it closes
///
/// Handshake failures (plain HTTP requests, garbage) are logged and the
/// stream is dropped. So are clients that stay silent past
/// [`HANDSHAKE_TIMEOUT`] or are still handshaking when shutdown starts.
pub async fn serve_connection(stream: TcpStream, peer: SocketAddr, ctx: ConnectionContext) {
    let handshake = tokio::select! {
        biased;
        _ = ctx.shutdown.cancelled() => {
            debug!(peer = %peer, "Dropping connection mid-handshake on shutdown");
            return;
        }
        handshake = timeout(HANDSHAKE_TIMEOUT, accept_async(stream)) => handshake,
    };
    let ws = match handshake {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!(peer = %peer, error = %e, "Rejected non-WebSocket connection");
            return;
        }
        Err(_) => {
            warn!(
                peer = %peer,
                timeout_secs = HANDSHAKE_TIMEOUT.as_secs(),
                "WebSocket handshake timed out"
            );
            return;
        }
    };

    let guard = RegistrationGuard::new(Arc::clone(&ctx.registry), peer);
    info!(
        peer = %peer,
        connection = guard.id(),
        active = ctx.registry.active(),
        "Client connected"
    );

    let session = Session::with_peer(Arc::clone(&ctx.ledger), peer.to_string());
    let result = run_session(ws, session, ctx.style, ctx.shutdown.clone()).await;
    let connection = guard.id();
    let duration_secs = ctx
        .registry
        .get(connection)
        .map(|info| (Local::now() - info.connected_at).num_seconds())
        .unwrap_or_default();
    drop(guard);

    match result {
        Ok(()) => info!(
            peer = %peer,
            connection,
            duration_secs,
            active = ctx.registry.active(),
            "Client disconnected"
        ),
        Err(e) => warn!(
            peer = %peer,
            connection,
            duration_secs,
            error = %e,
            active = ctx.registry.active(),
            "Connection ended with error"
        ),
    }
}

/// Drive a session over a duplex message stream
///
/// Text and binary frames are both handed to the session; replies go back
/// as text frames. Returns when the peer closes the stream or `shutdown`
/// is cancelled.
pub async fn run_session<S>(
    mut ws: S,
    mut session: Session,
    style: ResponseStyle,
    shutdown: CancellationToken,
) -> Result<(), TerminalError>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return close_gracefully(&mut ws).await,
            next = ws.next() => next,
        };

        // None once the close handshake is done
        let Some(message) = next else {
            return Ok(());
        };

        let payload = match message {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Close frame received");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Some(response) = session.handle_message(&payload) {
            ws.send(Message::Text(response.render(style))).await?;
        }
    }
}

/// Send a close frame and wait briefly for the peer's reply
async fn close_gracefully<S>(ws: &mut S) -> Result<(), TerminalError>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    ws.send(Message::Close(None)).await?;

    let drain = async {
        while let Some(message) = ws.next().await {
            if message.is_err() {
                break;
            }
        }
    };
    if timeout(CLOSE_TIMEOUT, drain).await.is_err() {
        debug!("Peer did not acknowledge close");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream;
    use rust_decimal::Decimal;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// In-memory duplex: frames come from a fixed list, replies go to a channel
    struct ScriptedTransport {
        inbound: stream::Iter<std::vec::IntoIter<Result<Message, WsError>>>,
        outbound: mpsc::UnboundedSender<Message>,
    }

    impl Stream for ScriptedTransport {
        type Item = Result<Message, WsError>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.inbound).poll_next(cx)
        }
    }

    impl Sink<Message> for ScriptedTransport {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), WsError> {
            self.outbound
                .unbounded_send(item)
                .map_err(|_| WsError::ConnectionClosed)
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    fn scripted(
        frames: Vec<Result<Message, WsError>>,
    ) -> (ScriptedTransport, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded();
        (
            ScriptedTransport {
                inbound: stream::iter(frames),
                outbound: tx,
            },
            rx,
        )
    }

    fn drain_texts(mut rx: mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut texts = vec![];
        while let Ok(Some(message)) = rx.try_next() {
            if let Message::Text(text) = message {
                texts.push(text);
            }
        }
        texts
    }

    #[tokio::test]
    async fn test_session_replies_in_order() {
        let ledger = Arc::new(Ledger::new());
        let (transport, rx) = scripted(vec![
            Ok(Message::Text("Recarga:50.0".to_string())),
            Ok(Message::Text("Recarga:abc".to_string())),
            Ok(Message::Ping(vec![1])),
            Ok(Message::Binary(b"Consumo:20.0".to_vec())),
            Ok(Message::Text("Consumo:100".to_string())),
            Ok(Message::Close(None)),
        ]);

        run_session(
            transport,
            Session::new(Arc::clone(&ledger)),
            ResponseStyle::Plain,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            drain_texts(rx),
            vec![
                "Saldo actual: 50. Destino: Estación 1.",
                "Saldo actual: 30. Destino: Estación 2.",
                "Saldo insuficiente para el viaje.",
            ]
        );
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.snapshot_all()[1].balance_after, Decimal::from(30));
    }

    #[tokio::test]
    async fn test_transport_error_ends_session_only() {
        let ledger = Arc::new(Ledger::new());
        let (transport, _rx) = scripted(vec![
            Ok(Message::Text("Recarga:5".to_string())),
            Err(WsError::Utf8),
            Ok(Message::Text("Recarga:5".to_string())),
        ]);

        let result = run_session(
            transport,
            Session::new(Arc::clone(&ledger)),
            ResponseStyle::Plain,
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(TerminalError::WebSocketError { .. })));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_session_sends_close_frame() {
        let ledger = Arc::new(Ledger::new());
        let (transport, mut rx) = scripted(vec![]);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        run_session(transport, Session::new(ledger), ResponseStyle::Plain, shutdown)
            .await
            .unwrap();

        assert!(matches!(rx.try_next(), Ok(Some(Message::Close(None)))));
    }

    #[tokio::test]
    async fn test_silent_client_released_on_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        let ctx = ConnectionContext {
            ledger: Arc::new(Ledger::new()),
            registry: Arc::new(SessionRegistry::new()),
            style: ResponseStyle::Plain,
            shutdown: CancellationToken::new(),
        };
        let registry = Arc::clone(&ctx.registry);
        let shutdown = ctx.shutdown.clone();
        let task = tokio::spawn(serve_connection(stream, peer, ctx));

        shutdown.cancel();

        timeout(Duration::from_secs(5), task)
            .await
            .expect("connection task outlived shutdown")
            .unwrap();
        assert_eq!(registry.active(), 0);
    }
}
