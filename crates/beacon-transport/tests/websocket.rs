//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a tokio-tungstenite client to
//! verify that frames actually flow over the network, that clean close
//! surfaces as `Ok(None)`, and that the origin filter rejects upgrades.

#[cfg(feature = "websocket")]
mod websocket {
    use beacon_transport::{Connection, Transport, WebSocketTransport};

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on a random port and returns it with its address.
    async fn bind_transport() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind_transport().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends, client receives ---
        server_conn
            .send(b"hello from server")
            .await
            .expect("send should succeed");

        use futures_util::StreamExt;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from server");

        // --- Client sends, server receives ---
        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_received_as_bytes() {
        // Browser clients send JSON as text frames; the transport must
        // hand them up as bytes just like binary frames.
        let (mut transport, addr) = bind_transport().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws
            .send(Message::Text(r#"{"event":"join_room","room":"lobby"}"#.into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, br#"{"event":"join_room","room":"lobby"}"#);
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_transport().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_rejects_disallowed_origin() {
        let transport = WebSocketTransport::bind_with_origin(
            "127.0.0.1:0",
            Some("https://app.example.com".into()),
        )
        .await
        .expect("should bind");
        let addr = transport.local_addr().unwrap().to_string();

        let mut transport = transport;
        let server_handle =
            tokio::spawn(async move { transport.accept().await });

        // Handshake with a different Origin header.
        use tokio_tungstenite::tungstenite::client::IntoClientRequest;
        let mut request = format!("ws://{addr}")
            .into_client_request()
            .expect("valid request");
        request
            .headers_mut()
            .insert("origin", "https://evil.example.com".parse().unwrap());

        let client_result =
            tokio_tungstenite::connect_async(request).await;
        assert!(client_result.is_err(), "upgrade should be rejected");

        let server_result = server_handle.await.unwrap();
        assert!(server_result.is_err(), "accept should report the rejection");
    }

    #[tokio::test]
    async fn test_websocket_allows_matching_origin() {
        let transport = WebSocketTransport::bind_with_origin(
            "127.0.0.1:0",
            Some("https://app.example.com".into()),
        )
        .await
        .expect("should bind");
        let addr = transport.local_addr().unwrap().to_string();

        let mut transport = transport;
        let server_handle =
            tokio::spawn(async move { transport.accept().await });

        use tokio_tungstenite::tungstenite::client::IntoClientRequest;
        let mut request = format!("ws://{addr}")
            .into_client_request()
            .expect("valid request");
        request
            .headers_mut()
            .insert("origin", "https://app.example.com".parse().unwrap());

        let client_result = tokio_tungstenite::connect_async(request).await;
        assert!(client_result.is_ok(), "matching origin should connect");

        let server_result = server_handle.await.unwrap();
        assert!(server_result.is_ok());
    }
}
