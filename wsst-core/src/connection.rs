use crate::error::ConnectionError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, Instrument};
use url::Url;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Instant the transport reported the disconnect, `None` while the connection is up.
pub(crate) type Disconnect = watch::Receiver<Option<Instant>>;

/// A live WebSocket session handed to a scenario.
///
/// Every connection of a run owns its own socket; nothing is shared or reused between connections.
/// The socket is read by a background task so a disconnect is noticed as soon as it happens, even
/// while the scenario is busy with something else.
pub struct Connection {
    index: usize,
    url: Url,
    sink: SplitSink<WsStream, Message>,
    inbox: UnboundedReceiver<Message>,
    disconnect: Disconnect,
    reader: JoinHandle<()>,
}

impl Connection {
    pub(crate) async fn open(index: usize, url: Url) -> Result<Self, ConnectionError> {
        let (stream, _) = connect_async(url.as_str()).await?;
        let (sink, stream) = stream.split();

        let (inbox_tx, inbox) = unbounded_channel();
        let (disconnect_tx, disconnect) = watch::channel(None);
        let reader = tokio::spawn(
            read_loop(index, stream, inbox_tx, disconnect_tx).in_current_span(),
        );

        Ok(Self {
            index,
            url,
            sink,
            inbox,
            disconnect,
            reader,
        })
    }

    /// Position of this connection within its run.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Full URL this connection was opened with, query parameters included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the transport has reported the disconnect.
    pub fn is_closed(&self) -> bool {
        self.disconnect.borrow().is_some()
    }

    pub async fn send(&mut self, message: impl Into<Message>) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        self.sink.send(message.into()).await?;
        Ok(())
    }

    /// Next text or binary message. Control frames are handled internally; `None` once the peer
    /// has closed the connection and every message received before has been consumed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbox.recv().await
    }

    pub async fn recv_text(&mut self) -> Result<String, ConnectionError> {
        match self.recv().await {
            Some(Message::Text(text)) => Ok(text),
            Some(_) => Err(ConnectionError::UnexpectedMessage { expected: "text" }),
            None => Err(ConnectionError::Closed),
        }
    }

    /// Start the closing handshake. The disconnect is observed once the peer acknowledges it.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Ok(());
        }
        self.sink.close().await?;
        Ok(())
    }

    pub(crate) fn disconnect(&self) -> Disconnect {
        self.disconnect.clone()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Wait for the disconnect and return the instant it was reported at.
pub(crate) async fn disconnected(mut disconnect: Disconnect) -> Instant {
    match disconnect.wait_for(Option::is_some).await {
        Ok(at) => (*at).unwrap_or_else(Instant::now),
        // Reader gone without reporting, e.g. aborted with its run.
        Err(_) => Instant::now(),
    }
}

fn mark_disconnect(disconnect: &watch::Sender<Option<Instant>>) {
    disconnect.send_if_modified(|at| {
        if at.is_some() {
            return false;
        }
        *at = Some(Instant::now());
        true
    });
}

async fn read_loop(
    index: usize,
    mut stream: SplitStream<WsStream>,
    inbox: UnboundedSender<Message>,
    disconnect: watch::Sender<Option<Instant>>,
) {
    while let Some(res) = stream.next().await {
        match res {
            // Keep reading after the close frame so the reply gets flushed.
            Ok(Message::Close(frame)) => {
                debug!("Connection #{index} closed by peer: {frame:?}");
                mark_disconnect(&disconnect);
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
            Ok(message) => {
                if inbox.send(message).is_err() {
                    trace!("Connection #{index} dropping message, nobody is receiving");
                }
            }
            Err(err) => {
                debug!("Connection #{index} ended with error: {err}");
                break;
            }
        }
    }
    mark_disconnect(&disconnect);
}
