//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket listener and a `tokio-tungstenite`
//! client to check that text and binary messages keep their kind in both
//! directions and that a client close is reported as a clean end.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use corkboard_transport::{
        Connection, FrameKind, Pending, Transport, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port and returns the transport plus address.
    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("handshake should succeed")
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends text, client receives text ---
        server_conn
            .send(FrameKind::Text, b"{\"type\":\"list_card_ids\"}")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), b"{\"type\":\"list_card_ids\"}");

        // --- Client sends binary, server receives a binary fragment ---
        client_ws
            .send(Message::Binary(b"\x89PNG".to_vec().into()))
            .await
            .unwrap();
        let frag = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(frag.kind, FrameKind::Binary);
        assert_eq!(frag.payload, b"\x89PNG");
        assert!(frag.end_of_message);

        // --- Client sends text, server receives a text fragment ---
        client_ws
            .send(Message::Text("hello".into()))
            .await
            .unwrap();
        let frag = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(frag.kind, FrameKind::Text);
        assert_eq!(frag.payload, b"hello");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("handshake should succeed")
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake() {
        let (mut transport, addr) = bind().await;

        // A peer that connects but never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let silent = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept must not wait for the handshake")
            .expect("should accept");
        assert!(silent.peer_addr().is_some());

        let client = tokio::spawn({
            let addr = addr.clone();
            async move { connect_client(&addr).await }
        });
        let pending = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("second peer should be accepted")
            .expect("should accept");
        let conn = pending.upgrade().await.expect("handshake should succeed");
        let _client_ws = client.await.unwrap();

        assert!(conn.id().into_inner() > 0);
        drop(silent);
    }

    #[tokio::test]
    async fn test_upgrade_fails_for_non_websocket_peer() {
        use tokio::io::AsyncWriteExt;

        let (mut transport, addr) = bind().await;
        let mut peer = tokio::net::TcpStream::connect(&addr).await.unwrap();
        peer.write_all(b"hello, not http\r\n\r\n").await.unwrap();

        let pending = transport.accept().await.expect("should accept");
        assert!(pending.upgrade().await.is_err());
    }
}
