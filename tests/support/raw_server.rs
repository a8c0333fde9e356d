//! Hand-written HTTP responders for failures wiremock cannot express.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one connection: headers announcing `declared_len` bytes, then only
/// `sent` bytes of body, then closes the socket.
///
/// Returns the base URL, or `None` when localhost sockets are unavailable.
pub async fn truncated_body_server(declared_len: usize, sent: usize) -> Option<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&vec![0x5a; sent]).await;
        let _ = socket.flush().await;
        drop(socket);
    });

    Some(format!("http://{addr}"))
}
