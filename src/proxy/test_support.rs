//! Local fake proxies and targets for network tests

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

async fn read_request_head(stream: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    head
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Answers every request with the given status and body. Serves as a
/// forward proxy that "reaches" the target, or as the target itself.
pub async fn spawn_http_server(status: u16, body: &str) -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                write_response(&mut stream, status, &body).await;
            });
        }
    });
    addr
}

async fn socks5_handshake(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[0x05, 0x00]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let addr_len = match request[3] {
        0x01 => 4,
        0x04 => 16,
        _ => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
    };
    let mut dest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut dest).await?;
    stream
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await
}

/// A no-auth SOCKS5 server whose tunnel always ends at a fake HTTP target
pub async fn spawn_socks5_server(status: u16, body: &str) -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                if socks5_handshake(&mut stream).await.is_ok() {
                    read_request_head(&mut stream).await;
                    write_response(&mut stream, status, &body).await;
                }
            });
        }
    });
    addr
}

/// A SOCKS5 server accepting none of the offered auth methods
pub async fn spawn_rejecting_socks5_server() -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut greeting = [0u8; 2];
                if stream.read_exact(&mut greeting).await.is_ok() {
                    let mut methods = vec![0u8; greeting[1] as usize];
                    let _ = stream.read_exact(&mut methods).await;
                    let _ = stream.write_all(&[0x05, 0xFF]).await;
                }
            });
        }
    });
    addr
}

/// Accepts connections and never answers
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = bind().await;
    listener.local_addr().unwrap()
}
