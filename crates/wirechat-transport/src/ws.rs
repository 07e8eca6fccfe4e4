use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Generation, Transport, TransportEvent};

/// Events from every connection opened by a [`WsConnector`], in arrival order.
pub type EventSender = mpsc::Sender<(Generation, TransportEvent)>;

/// Opens WebSocket connections on the current tokio runtime.
///
/// Each connection runs as one spawned task that owns the socket. Inbound
/// binary messages and lifecycle changes are pushed to the shared event
/// channel tagged with the connection's generation.
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: EventSender,
}

impl WsConnector {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    type Handle = WsHandle;

    fn open(&mut self, url: &Url, generation: Generation) -> Result<WsHandle> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_connection(
            url.to_string(),
            generation,
            outbound_rx,
            self.events.clone(),
        ));
        tracing::debug!(%url, generation, "websocket connection spawned");
        Ok(WsHandle {
            generation,
            outbound: outbound_tx,
        })
    }
}

#[derive(Debug)]
enum Outbound {
    Binary(Bytes),
    Close,
}

/// Sending half of a WebSocket connection.
///
/// Sends are queued to the connection task and never block.
#[derive(Debug)]
pub struct WsHandle {
    generation: Generation,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl WsHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Transport for WsHandle {
    fn send(&mut self, payload: Bytes) -> Result<()> {
        self.outbound
            .send(Outbound::Binary(payload))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) -> Result<()> {
        self.outbound
            .send(Outbound::Close)
            .map_err(|_| TransportError::Closed)
    }
}

async fn run_connection(
    url: String,
    generation: Generation,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSender,
) {
    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            tracing::warn!(%url, generation, error = %err, "websocket connect failed");
            let _ = events
                .send((generation, TransportEvent::Error(err.to_string())))
                .await;
            let _ = events.send((generation, TransportEvent::Closed)).await;
            return;
        }
    };

    if events
        .send((generation, TransportEvent::Opened))
        .await
        .is_err()
    {
        return;
    }
    tracing::info!(%url, generation, "websocket open");

    let (mut sink, mut stream) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Binary(payload)) => {
                    if let Err(err) = sink.send(Message::Binary(payload)).await {
                        tracing::warn!(generation, error = %err, "websocket send failed");
                        let _ = events.send((generation, TransportEvent::Error(err.to_string()))).await;
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    tracing::debug!(generation, "websocket closed locally");
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    if events.send((generation, TransportEvent::Message(data))).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Text(_))) => {
                    tracing::debug!(generation, "ignoring text message");
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(generation, "websocket closed by peer");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(generation, error = %err, "websocket receive failed");
                    let _ = events.send((generation, TransportEvent::Error(err.to_string()))).await;
                    break;
                }
            },
        }
    }

    let _ = events.send((generation, TransportEvent::Closed)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    async fn next_event(
        rx: &mut mpsc::Receiver<(Generation, TransportEvent)>,
    ) -> (Generation, TransportEvent) {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("event should arrive")
            .expect("channel should be open")
    }

    #[tokio::test]
    async fn binary_roundtrip_with_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let msg = ws.next().await.unwrap().unwrap();
            assert_eq!(msg, Message::Binary(Bytes::from_static(&[1])));
            ws.send(Message::Binary(Bytes::from_static(&[53, 1, b'z'])))
                .await
                .unwrap();
            // Wait for the client's close.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let (tx, mut rx) = mpsc::channel(16);
        let mut connector = WsConnector::new(tx);
        let url = Url::parse(&format!("ws://{addr}/?name=t")).unwrap();
        let mut handle = connector.open(&url, 7).unwrap();

        assert_eq!(next_event(&mut rx).await, (7, TransportEvent::Opened));
        handle.send(Bytes::from_static(&[1])).unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            (7, TransportEvent::Message(Bytes::from_static(&[53, 1, b'z'])))
        );

        handle.close().unwrap();
        assert_eq!(next_event(&mut rx).await, (7, TransportEvent::Closed));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_reports_error_then_closed() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let (tx, mut rx) = mpsc::channel(16);
        let mut connector = WsConnector::new(tx);
        let url = Url::parse(&format!("ws://{addr}/?name=t")).unwrap();
        let _handle = connector.open(&url, 2).unwrap();

        assert!(matches!(next_event(&mut rx).await, (2, TransportEvent::Error(_))));
        assert_eq!(next_event(&mut rx).await, (2, TransportEvent::Closed));
    }

    #[test]
    fn open_outside_runtime_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let mut connector = WsConnector::new(tx);
        let url = Url::parse("ws://127.0.0.1:1/").unwrap();
        assert!(matches!(
            connector.open(&url, 0),
            Err(TransportError::NoRuntime)
        ));
    }
}
