use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{stream::SplitSink, Sink, SinkExt};
use relay_core::ConnId;
use relay_hub::{Connection, SendError};
use relay_protocol::frames::ServerFrame;
use tokio::sync::Mutex;
use tracing::debug;

pub type WsSink = SplitSink<WebSocket, Message>;

/// Send a final frame and close a sink nobody else writes to yet (before the
/// connection is registered). Gives up once `limit` elapses.
pub async fn reject<S>(tx: &mut S, frame: &ServerFrame, limit: Duration)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, "rejection frame not serializable");
            return;
        }
    };
    let write = async {
        let _ = tx.send(Message::Text(json.into())).await;
        let _ = tx.close().await;
    };
    if tokio::time::timeout(limit, write).await.is_err() {
        debug!(timeout_ms = limit.as_millis() as u64, "rejection write timed out");
    }
}

/// A joined WebSocket client, shared between its own read loop and every
/// broadcast that targets it.
///
/// The write half sits behind an async mutex so concurrent broadcasts queue
/// up instead of interleaving frames. Writes issued from the read loop (pong,
/// close) are bounded by `send_timeout` like broadcast sends.
pub struct WsConnection<S = WsSink> {
    id: ConnId,
    username: String,
    sink: Mutex<S>,
    open: AtomicBool,
    send_timeout: Duration,
}

impl<S> WsConnection<S>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    pub fn new(id: ConnId, username: String, sink: S, send_timeout: Duration) -> Self {
        Self {
            id,
            username,
            sink: Mutex::new(sink),
            open: AtomicBool::new(true),
            send_timeout,
        }
    }

    /// Stop accepting sends; in-flight broadcasts will skip this connection.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Send a control frame (pong) through the same send lock.
    pub async fn send_control(&self, msg: Message) -> Result<(), SendError> {
        match tokio::time::timeout(self.send_timeout, self.write(msg)).await {
            Ok(result) => result,
            Err(_) => {
                self.mark_closed();
                Err(SendError::Timeout {
                    ms: self.send_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Best-effort close: optional final frame, then a close frame. Abandoned
    /// if the peer does not drain it within the send timeout.
    pub async fn close(&self, last: Option<&ServerFrame>) {
        self.mark_closed();
        let shutdown = async {
            let mut sink = self.sink.lock().await;
            if let Some(json) = last.and_then(|f| f.to_json().ok()) {
                let _ = sink.send(Message::Text(json.into())).await;
            }
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        };
        if tokio::time::timeout(self.send_timeout, shutdown).await.is_err() {
            debug!(conn_id = %self.id, "close handshake abandoned");
        }
    }

    async fn write(&self, msg: Message) -> Result<(), SendError> {
        let mut sink = self.sink.lock().await;
        sink.send(msg).await.map_err(|e| {
            self.mark_closed();
            SendError::Io(e.to_string())
        })
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
{
    fn id(&self) -> &ConnId {
        &self.id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send(&self, payload: &str) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        self.write(Message::Text(payload.to_owned().into())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A peer that stopped reading: the sink never accepts another frame.
    struct Stalled;

    impl Sink<Message> for Stalled {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    /// Collects every frame; always ready.
    #[derive(Default)]
    struct Recorder {
        frames: Vec<Message>,
        closed: bool,
    }

    impl Sink<Message> for Recorder {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            self.frames.push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.closed = true;
            Poll::Ready(Ok(()))
        }
    }

    const LIMIT: Duration = Duration::from_millis(50);

    fn stalled() -> WsConnection<Stalled> {
        WsConnection::new(ConnId::from("stalled"), "stalled".to_string(), Stalled, LIMIT)
    }

    #[tokio::test]
    async fn pong_to_a_stalled_peer_times_out_and_closes() {
        let conn = stalled();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            conn.send_control(Message::Pong(axum::body::Bytes::new())),
        )
        .await
        .expect("pong write was not bounded");

        assert_eq!(result, Err(SendError::Timeout { ms: 50 }));
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn close_on_a_stalled_peer_gives_up() {
        let conn = stalled();
        let last = ServerFrame::error("PAYLOAD_TOO_LARGE", "too big");

        tokio::time::timeout(Duration::from_secs(2), conn.close(Some(&last)))
            .await
            .expect("close was not bounded");

        assert!(!conn.is_open());
        assert_eq!(conn.send("late").await, Err(SendError::Closed));
    }

    #[tokio::test]
    async fn reject_on_a_stalled_peer_gives_up() {
        let mut tx = Stalled;
        let frame = ServerFrame::error("JOIN_TIMEOUT", "no join");

        tokio::time::timeout(Duration::from_secs(2), reject(&mut tx, &frame, LIMIT))
            .await
            .expect("rejection write was not bounded");
    }

    #[tokio::test]
    async fn reject_writes_error_frame_then_closes() {
        let mut tx = Recorder::default();
        let frame = ServerFrame::error("INVALID_USERNAME", "reserved");

        reject(&mut tx, &frame, LIMIT).await;

        assert_eq!(tx.frames.len(), 1);
        match &tx.frames[0] {
            Message::Text(text) => assert!(text.as_str().contains("INVALID_USERNAME")),
            other => panic!("expected text frame, got {other:?}"),
        }
        assert!(tx.closed);
    }

    #[tokio::test]
    async fn close_sends_final_frame_before_close_frame() {
        let conn = WsConnection::new(
            ConnId::from("rec"),
            "rec".to_string(),
            Recorder::default(),
            LIMIT,
        );

        conn.close(Some(&ServerFrame::error("PAYLOAD_TOO_LARGE", "too big")))
            .await;

        let sink = conn.sink.lock().await;
        assert!(matches!(sink.frames[0], Message::Text(_)));
        assert!(matches!(sink.frames[1], Message::Close(None)));
        assert!(sink.closed);
    }
}
