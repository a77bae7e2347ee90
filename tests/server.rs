//! Drives a real listener over TCP with hand-written HTTP/1.1 requests.

use garage::{Envelope, PathArgs, Request, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn greet(_: (), _: Request, args: PathArgs) -> Envelope<String> {
    Envelope::success("hello", args.get(0).unwrap_or("world").to_owned())
}

async fn boom(_: (), _: Request, _: PathArgs) -> &'static str {
    panic!("handler blew up")
}

async fn send(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new()
        .get("/hello/{name}", greet)
        .get("/boom", boom);

    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::from_listener(listener)
            .cors(true)
            .serve_with_shutdown(router, async { rx.await.unwrap_or(()) }),
    );

    let resp = send(addr, "GET /hello/ada HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    assert!(resp.to_ascii_lowercase().contains("access-control-allow-origin: *"), "{resp}");
    assert!(resp.contains(r#""data":"ada""#), "{resp}");

    let resp = send(addr, "OPTIONS /hello/ada HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 204"), "{resp}");
    assert!(resp.to_ascii_lowercase().contains("access-control-allow-methods"), "{resp}");

    let resp = send(addr, "BREW /hello/ada HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 405"), "{resp}");

    let resp = send(addr, "GET /nowhere HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 404"), "{resp}");
    assert!(resp.contains("URL Not Found"), "{resp}");

    let resp = send(addr, "GET /boom HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 500"), "{resp}");
    assert!(resp.contains(r#""status":"error""#), "{resp}");

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn cors_headers_are_opt_in() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new().get("/hello/{name}", greet);

    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::from_listener(listener)
            .serve_with_shutdown(router, async { rx.await.unwrap_or(()) }),
    );

    let resp = send(addr, "GET /hello/ada HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 200"), "{resp}");
    assert!(!resp.to_ascii_lowercase().contains("access-control-allow-origin"), "{resp}");

    // Without CORS there is no preflight shortcut, and no OPTIONS routes.
    let resp = send(addr, "OPTIONS /hello/ada HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 405"), "{resp}");

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
