//! `WebSocket` session: one game-data client from upgrade through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::admission::AdmissionTicket;
use super::connection::ClientConnection;
use super::lifecycle::LifecycleCoordinator;
use crate::config::ServerConfig;
use crate::errors::TransportError;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_ERRORS_TOTAL, WS_MESSAGES_TOTAL,
};

/// How long the writer gets to flush a Close frame once the session ends.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// `tokio::time::interval` panics on a zero period.
const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-session transport settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Interval between server Ping frames.
    pub heartbeat_interval: Duration,
    /// Silence after which the client is dropped with an error.
    pub heartbeat_timeout: Duration,
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity.max(1),
            heartbeat_interval: config.heartbeat_interval().max(MIN_HEARTBEAT_INTERVAL),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

/// Run a game-data session for the identity `admitted` was issued to.
///
/// 1. Registers the connection, broadcasts the join notice and releases
///    the admission slot
/// 2. Fans every inbound text frame out to all clients
/// 3. Forwards queued broadcasts and pings on a dedicated writer task
/// 4. On close or shutdown, unregisters silently; on a transport error,
///    unregisters and broadcasts the cause
#[instrument(skip_all, fields(identity = %admitted.identity()))]
pub async fn run_ws_session(
    ws: WebSocket,
    admitted: AdmissionTicket,
    coordinator: Arc<LifecycleCoordinator>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let identity = admitted.identity().to_owned();
    let (ws_tx, mut ws_rx) = ws.split();
    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(identity.clone(), send_tx));
    let started = Instant::now();

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let stop_writer = CancellationToken::new();
    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        send_rx,
        Arc::clone(&connection),
        config,
        stop_writer.clone(),
    ));
    let mut writer_done = false;

    let _ = coordinator.connect(Arc::clone(&connection));
    // Registered now, so the registry counts it.
    drop(admitted);

    let outcome: Result<(), TransportError> = loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("server shutting down, ending session");
                break Ok(());
            }
            result = &mut writer => {
                writer_done = true;
                break match result {
                    Ok(outcome) => outcome,
                    Err(e) => Err(TransportError::Writer(e.to_string())),
                };
            }
            frame = ws_rx.next() => {
                let msg = match frame {
                    None => break Ok(()),
                    Some(Err(e)) => break Err(TransportError::Socket(e)),
                    Some(Ok(msg)) => msg,
                };
                connection.mark_alive();
                match msg {
                    Message::Text(text) => {
                        counter!(WS_MESSAGES_TOTAL).increment(1);
                        let _ = coordinator.message(&identity, text.as_str());
                    }
                    Message::Binary(data) => {
                        if let Ok(text) = std::str::from_utf8(&data) {
                            counter!(WS_MESSAGES_TOTAL).increment(1);
                            let _ = coordinator.message(&identity, text);
                        } else {
                            info!(len = data.len(), "ignoring non-UTF8 binary frame");
                        }
                    }
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Close(_) => {
                        info!("client sent close frame");
                        break Ok(());
                    }
                }
            }
        }
    };

    if !writer_done {
        stop_writer.cancel();
        if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
            writer.abort();
        }
    }

    match &outcome {
        Ok(()) => {
            let _ = coordinator.connection_closed(&connection);
        }
        Err(e) => {
            counter!(WS_ERRORS_TOTAL).increment(1);
            let _ = coordinator.connection_failed(&connection, e);
        }
    }

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(
        conn_id = connection.id(),
        dropped = connection.drop_count(),
        clean = outcome.is_ok(),
        "session ended"
    );
}

/// Drain the outbound queue into the socket and keep the client honest.
///
/// Returns an error when a write fails or the client has been silent for
/// longer than the heartbeat timeout. Sends a Close frame and returns `Ok`
/// once `stop` is cancelled.
async fn write_loop<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Arc<String>>,
    connection: Arc<ClientConnection>,
    config: SessionConfig,
    stop: CancellationToken,
) -> Result<(), TransportError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let period = if config.heartbeat_interval.is_zero() {
        MIN_HEARTBEAT_INTERVAL
    } else {
        config.heartbeat_interval
    };
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = stop.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(());
            }
            queued = queue.recv() => {
                let Some(text) = queued else {
                    return Ok(());
                };
                sink.send(Message::Text(text.as_str().into())).await?;
            }
            _ = ping.tick() => {
                if connection.idle_for() > config.heartbeat_timeout {
                    warn!(
                        idle_ms = u64::try_from(connection.idle_for().as_millis()).unwrap_or(u64::MAX),
                        "client unresponsive, disconnecting"
                    );
                    let _ = sink.send(Message::Close(None)).await;
                    return Err(TransportError::HeartbeatTimeout(config.heartbeat_timeout));
                }
                sink.send(Message::Ping(Bytes::new())).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;

    type TestSink = futures::sink::SinkMapErr<
        fmpsc::UnboundedSender<Message>,
        fn(fmpsc::SendError) -> axum::Error,
    >;

    fn test_sink() -> (TestSink, fmpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = fmpsc::unbounded();
        let map: fn(fmpsc::SendError) -> axum::Error = axum::Error::new;
        (tx.sink_map_err(map), rx)
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            send_queue_capacity: 8,
            heartbeat_interval: Duration::from_millis(20),
            heartbeat_timeout: Duration::from_millis(60),
        }
    }

    #[test]
    fn session_config_from_server_config() {
        let config = SessionConfig::from(&ServerConfig::default());
        assert_eq!(config.send_queue_capacity, 256);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(90));
    }

    #[test]
    fn session_config_never_has_zero_capacity() {
        let server = ServerConfig {
            send_queue_capacity: 0,
            ..ServerConfig::default()
        };
        assert_eq!(SessionConfig::from(&server).send_queue_capacity, 1);
    }

    #[test]
    fn session_config_never_has_zero_heartbeat_interval() {
        let server = ServerConfig {
            heartbeat_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(
            SessionConfig::from(&server).heartbeat_interval,
            MIN_HEARTBEAT_INTERVAL
        );
    }

    #[tokio::test]
    async fn writer_survives_zero_heartbeat_interval() {
        let (sink, mut frames) = test_sink();
        let (tx, rx) = mpsc::channel(8);
        let connection = Arc::new(ClientConnection::new("dave", tx));
        let stop = CancellationToken::new();
        let handle = tokio::spawn(write_loop(
            sink,
            rx,
            Arc::clone(&connection),
            SessionConfig {
                heartbeat_interval: Duration::ZERO,
                heartbeat_timeout: Duration::from_secs(120),
                ..fast_config()
            },
            stop.clone(),
        ));

        connection.send(Arc::new("still running".into())).unwrap();
        match frames.next().await.unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "still running"),
            other => panic!("expected text frame, got {other:?}"),
        }

        stop.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn writer_forwards_queued_text() {
        let (sink, mut frames) = test_sink();
        let (tx, rx) = mpsc::channel(8);
        let connection = Arc::new(ClientConnection::new("alice", tx));
        let stop = CancellationToken::new();
        let handle = tokio::spawn(write_loop(
            sink,
            rx,
            Arc::clone(&connection),
            SessionConfig {
                heartbeat_interval: Duration::from_secs(60),
                heartbeat_timeout: Duration::from_secs(120),
                ..fast_config()
            },
            stop.clone(),
        ));

        connection.send(Arc::new("hello world".into())).unwrap();
        match frames.next().await.unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "hello world"),
            other => panic!("expected text frame, got {other:?}"),
        }

        stop.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert!(matches!(frames.next().await, Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn writer_times_out_silent_client() {
        let (sink, mut frames) = test_sink();
        let (tx, rx) = mpsc::channel(8);
        let connection = Arc::new(ClientConnection::new("bob", tx));
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            write_loop(sink, rx, connection, fast_config(), CancellationToken::new()),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(TransportError::HeartbeatTimeout(_))));
        // The sink was dropped with the writer, so the stream is finite.
        let sent: Vec<Message> = frames.by_ref().collect().await;
        assert!(sent.iter().any(|frame| matches!(frame, Message::Ping(_))));
        assert!(matches!(sent.last(), Some(Message::Close(None))));
    }

    #[tokio::test]
    async fn writer_reports_failed_write() {
        let (sink, frames) = test_sink();
        drop(frames);
        let (tx, rx) = mpsc::channel(8);
        let connection = Arc::new(ClientConnection::new("carol", tx));
        connection.send(Arc::new("lost".into())).unwrap();

        let result = write_loop(sink, rx, connection, fast_config(), CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::Socket(_))));
    }
}
