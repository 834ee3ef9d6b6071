// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unix-socket host for Ripple apps.
//!
//! Every accepted connection runs in its own task and owns its session, so
//! interactions from one client are dispatched in arrival order while other
//! clients proceed concurrently. The hub only hands out connection ids and
//! message timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use ripple_app_core::{RequestArgs, Session, SessionFactory};
use ripple_demos::DemoApp;
use ripple_proto::{
    default_socket_path,
    wire::{declared_len, decode_message, encode_message, packet_len, HEADER_LEN},
    AckStatus, ErrorPayload, HandshakeAckPayload, HandshakePayload, InteractionPayload, Message,
    PageFlushPayload, RedirectPayload,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Config key of the host prefs.
pub const HOST_PREFS_KEY: &str = "ripple_host";
/// Protocol version spoken by this host.
pub const SERVER_VERSION: u32 = 1;

/// Persisted host preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPrefs {
    /// Socket to listen on.
    pub socket_path: String,
    /// App to serve.
    pub app: DemoApp,
}

impl Default for HostPrefs {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path().display().to_string(),
            app: DemoApp::default(),
        }
    }
}

/// State shared by every connection.
pub struct Hub {
    factory: Arc<dyn SessionFactory>,
    next_conn_id: AtomicU64,
    next_ts: AtomicU64,
}

impl Hub {
    /// Hub opening sessions from `factory`.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            next_conn_id: AtomicU64::new(0),
            next_ts: AtomicU64::new(0),
        }
    }

    /// Name of the served app.
    pub fn app_name(&self) -> &str {
        self.factory.app_name()
    }

    fn alloc_ts(&self) -> u64 {
        self.next_ts.fetch_add(1, Ordering::SeqCst)
    }

    fn alloc_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::SeqCst)
    }
}

/// One client connection: its outbox and, after the handshake, its session.
pub struct Connection {
    id: u64,
    session: Option<Box<dyn Session>>,
    tx: mpsc::Sender<Vec<u8>>,
}

impl Connection {
    /// Connection `id` writing packets to `tx`.
    pub fn new(id: u64, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            id,
            session: None,
            tx,
        }
    }

    /// Connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the handshake has completed.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn send(
        &self,
        hub: &Hub,
        msg: &Message,
    ) -> impl std::future::Future<Output = Result<()>> + Send + 'static {
        let encoded = encode_message(msg, hub.alloc_ts());
        let tx = self.tx.clone();
        let id = self.id;
        async move {
            let pkt = encoded?;
            tx.send(pkt)
                .await
                .map_err(|_| anyhow!("outbox closed for conn {id}"))
        }
    }
}

/// Accept connections forever, one task each.
pub async fn serve(listener: UnixListener, hub: Arc<Hub>) -> Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, hub).await {
                warn!(?err, "client handler error");
            }
        });
    }
}

/// Read packets from `stream` and answer them until the peer hangs up.
pub async fn handle_client(stream: UnixStream, hub: Arc<Hub>) -> Result<()> {
    let (mut reader, writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(256);
    let mut conn = Connection::new(hub.alloc_conn_id(), tx);
    debug!(conn = conn.id, "connection opened");

    let writer_task = tokio::spawn(async move {
        let mut ws = writer;
        while let Some(buf) = rx.recv().await {
            if ws.write_all(&buf).await.is_err() {
                break;
            }
        }
    });

    let mut read_buf = vec![0u8; 16 * 1024];
    let mut acc: Vec<u8> = Vec::with_capacity(32 * 1024);
    'read: loop {
        let n = reader.read(&mut read_buf).await?;
        if n == 0 {
            break;
        }
        acc.extend_from_slice(&read_buf[..n]);

        // process as many frames as available
        while acc.len() >= HEADER_LEN {
            let len = match declared_len(&acc) {
                Ok(len) => len,
                Err(err) => {
                    warn!(?err, conn = conn.id, "rejecting frame");
                    break 'read;
                }
            };
            let frame_len = packet_len(len);
            if acc.len() < frame_len {
                break;
            }
            let packet: Vec<u8> = acc.drain(..frame_len).collect();
            let msg = match decode_message(&packet) {
                Ok((msg, _ts, _used)) => msg,
                Err(err) => {
                    warn!(?err, conn = conn.id, "failed to decode packet");
                    break 'read;
                }
            };
            if let Err(err) = handle_message(msg, &mut conn, &hub).await {
                warn!(?err, "dropping connection {}", conn.id);
                break 'read;
            }
        }
    }

    debug!(conn = conn.id, "connection closed");
    drop(conn);
    let _ = writer_task.await;
    Ok(())
}

/// Handle a single inbound message from a connection.
pub async fn handle_message(msg: Message, conn: &mut Connection, hub: &Hub) -> Result<()> {
    match msg {
        Message::Handshake(handshake) => handshake_reply(handshake, conn, hub).await,
        Message::Interaction(interaction) => interact(interaction, conn, hub).await,
        other => {
            let op = other.op_name();
            conn.send(hub, &protocol_error(2, "unexpected_op", format!("hosts do not accept {op}")))
                .await?;
            bail!("unexpected {op} from conn {}", conn.id)
        }
    }
}

fn protocol_error(code: u32, name: &str, message: impl Into<String>) -> Message {
    Message::Error(ErrorPayload {
        code,
        name: name.into(),
        message: message.into(),
    })
}

async fn handshake_reply(handshake: HandshakePayload, conn: &mut Connection, hub: &Hub) -> Result<()> {
    let session_id = format!("conn-{}", conn.id);
    if handshake.client_version != SERVER_VERSION {
        let ack = Message::HandshakeAck(HandshakeAckPayload {
            status: AckStatus::Error,
            server_version: SERVER_VERSION,
            app: hub.app_name().to_string(),
            session_id,
            error: Some(ErrorPayload {
                code: 1,
                name: "version_mismatch".into(),
                message: format!(
                    "client speaks v{}, host speaks v{SERVER_VERSION}",
                    handshake.client_version
                ),
            }),
        });
        conn.send(hub, &ack).await?;
        bail!("version mismatch on conn {}", conn.id);
    }

    if conn.session.is_none() {
        conn.session = Some(hub.factory.open());
        info!(
            conn = conn.id,
            agent = handshake.agent_id.as_deref().unwrap_or("anonymous"),
            "client connected"
        );
    }
    let ack = Message::HandshakeAck(HandshakeAckPayload {
        status: AckStatus::Ok,
        server_version: SERVER_VERSION,
        app: hub.app_name().to_string(),
        session_id,
        error: None,
    });
    conn.send(hub, &ack).await
}

async fn interact(interaction: InteractionPayload, conn: &mut Connection, hub: &Hub) -> Result<()> {
    let Some(session) = conn.session.as_mut() else {
        conn.send(hub, &protocol_error(3, "no_session", "handshake required before interaction"))
            .await?;
        bail!("interaction before handshake on conn {}", conn.id);
    };
    let outcome = session.interact(RequestArgs::from_parts(interaction.args, interaction.events));
    debug!(conn = conn.id, route = ?outcome.route, flushes = outcome.flushes.len(), "dispatched");

    for delta in outcome.flushes {
        conn.send(hub, &Message::PageFlush(PageFlushPayload { delta }))
            .await?;
    }
    if let Some(target) = outcome.redirect {
        conn.send(hub, &Message::Redirect(RedirectPayload { target }))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_page::{Page, PageOp, Value};
    use ripple_proto::wire::decode_message;
    use tokio::time::{timeout, Duration};

    fn hub(app: DemoApp) -> Hub {
        Hub::new(app.factory())
    }

    fn add_conn(hub: &Hub) -> (Connection, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
        (Connection::new(hub.alloc_conn_id(), tx), rx)
    }

    async fn next(rx: &mut mpsc::Receiver<Vec<u8>>) -> (Message, u64) {
        let pkt = timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
            .expect("packet");
        let (msg, ts, _) = decode_message(&pkt).expect("decode");
        (msg, ts)
    }

    fn handshake() -> Message {
        Message::Handshake(HandshakePayload {
            client_version: SERVER_VERSION,
            agent_id: Some("test".into()),
        })
    }

    fn interaction(args: &[(&str, Value)]) -> Message {
        Message::Interaction(InteractionPayload {
            args: args
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            events: Default::default(),
        })
    }

    #[tokio::test]
    async fn handshake_ack_names_app_and_ts_is_monotonic() {
        let hub = hub(DemoApp::ImageAugmentation);
        let (mut conn, mut rx) = add_conn(&hub);

        handle_message(handshake(), &mut conn, &hub).await.unwrap();
        let (ack, ts1) = next(&mut rx).await;
        match ack {
            Message::HandshakeAck(ack) => {
                assert_eq!(ack.status, AckStatus::Ok);
                assert_eq!(ack.app, "Image Augmentation");
                assert_eq!(ack.session_id, "conn-0");
            }
            other => panic!("expected ack, got {other:?}"),
        }

        handle_message(interaction(&[]), &mut conn, &hub).await.unwrap();
        handle_message(interaction(&[]), &mut conn, &hub).await.unwrap();
        let (flush, ts2) = next(&mut rx).await;
        assert!(matches!(flush, Message::PageFlush(_)));
        assert_eq!(ts1, 0);
        assert_eq!(ts2, ts1 + 1);
    }

    #[tokio::test]
    async fn version_mismatch_is_refused() {
        let hub = hub(DemoApp::ThemeSwitch);
        let (mut conn, mut rx) = add_conn(&hub);
        let res = handle_message(
            Message::Handshake(HandshakePayload {
                client_version: 99,
                agent_id: None,
            }),
            &mut conn,
            &hub,
        )
        .await;
        assert!(res.is_err());
        assert!(!conn.has_session());
        match next(&mut rx).await.0 {
            Message::HandshakeAck(ack) => {
                assert_eq!(ack.status, AckStatus::Error);
                assert_eq!(ack.error.map(|e| e.name).as_deref(), Some("version_mismatch"));
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn interaction_before_handshake_is_an_error() {
        let hub = hub(DemoApp::ThemeSwitch);
        let (mut conn, mut rx) = add_conn(&hub);
        assert!(handle_message(interaction(&[]), &mut conn, &hub).await.is_err());
        assert!(matches!(
            next(&mut rx).await.0,
            Message::Error(ErrorPayload { code: 3, .. })
        ));
    }

    #[tokio::test]
    async fn flushes_rebuild_the_page_and_restart_redirects() {
        let hub = hub(DemoApp::ThemeSwitch);
        let (mut conn, mut rx) = add_conn(&hub);
        handle_message(handshake(), &mut conn, &hub).await.unwrap();
        next(&mut rx).await;

        // app-init flushes nothing; client-init sends the default page
        handle_message(interaction(&[]), &mut conn, &hub).await.unwrap();
        assert!(rx.try_recv().is_err());
        handle_message(interaction(&[]), &mut conn, &hub).await.unwrap();

        let mut mirror = Page::new();
        let Message::PageFlush(PageFlushPayload { delta }) = next(&mut rx).await.0 else {
            panic!("expected page flush");
        };
        assert!(delta
            .ops
            .iter()
            .any(|op| matches!(op, PageOp::Put { name, .. } if name == "home")));
        mirror.apply_delta(delta).unwrap();
        assert!(mirror.contains("header"));

        // a bad toggle value crashes the handler; the crash card arrives as a flush
        handle_message(
            interaction(&[("theme_dark", Value::from("maybe"))]),
            &mut conn,
            &hub,
        )
        .await
        .unwrap();
        let Message::PageFlush(PageFlushPayload { delta }) = next(&mut rx).await.0 else {
            panic!("expected page flush");
        };
        mirror.apply_delta(delta).unwrap();
        assert!(mirror.contains("error"));
        assert!(!mirror.contains("home"));

        handle_message(interaction(&[("restart", Value::Bool(true))]), &mut conn, &hub)
            .await
            .unwrap();
        assert!(matches!(next(&mut rx).await.0, Message::PageFlush(_)));
        match next(&mut rx).await.0 {
            Message::Redirect(RedirectPayload { target }) => assert_eq!(target, "#home"),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_ops_are_rejected() {
        let hub = hub(DemoApp::ThemeSwitch);
        let (mut conn, mut rx) = add_conn(&hub);
        let res = handle_message(
            Message::Redirect(RedirectPayload {
                target: "#home".into(),
            }),
            &mut conn,
            &hub,
        )
        .await;
        assert!(res.is_err());
        assert!(matches!(
            next(&mut rx).await.0,
            Message::Error(ErrorPayload { code: 2, .. })
        ));
    }

    #[tokio::test]
    async fn handle_client_reassembles_split_frames() {
        let hub = Arc::new(hub(DemoApp::ThemeSwitch));
        let (client, server) = UnixStream::pair().unwrap();
        let task = tokio::spawn(handle_client(server, Arc::clone(&hub)));

        let pkt = encode_message(&handshake(), 0).unwrap();
        let (mut rd, mut wr) = tokio::io::split(client);
        let (head, tail) = pkt.split_at(5);
        wr.write_all(head).await.unwrap();
        wr.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        wr.write_all(tail).await.unwrap();

        let mut buf = vec![0u8; 4096];
        let n = timeout(Duration::from_secs(1), rd.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let (msg, _, used) = decode_message(&buf[..n]).unwrap();
        assert_eq!(used, n);
        assert!(matches!(msg, Message::HandshakeAck(_)));

        drop(wr);
        drop(rd);
        timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
