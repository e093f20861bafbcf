use std::net::SocketAddr;
use std::time::Duration;

use ctxchain::middleware::legacy;
use ctxchain::{
    handler_fn, host_fn, BoxHandler, BoxHostHandler, Chain, Context, Error, HostHandler, Request,
    ResponseWriter, Server,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

async fn start(handler: impl HostHandler) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server::from_listener(listener);
    let addr = server.local_addr().unwrap();
    let (stop, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve_with_shutdown(handler, async move {
        let _ = rx.await;
    }));
    Running { addr, stop, task }
}

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut buf = String::new();
    stream.read_to_string(&mut buf).await.unwrap();
    buf
}

fn body(raw: &str) -> &str {
    raw.split_once("\r\n\r\n").map_or("", |(_, b)| b)
}

fn set_value(n: u32) -> impl Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static {
    move |next: BoxHandler| -> BoxHandler {
        std::sync::Arc::new(handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
            next.serve(ctx.with_value("value", n), w, req)
        }))
    }
}

fn line(text: &'static str) -> impl Fn(BoxHandler) -> BoxHandler + Send + Sync + 'static {
    move |next: BoxHandler| -> BoxHandler {
        std::sync::Arc::new(handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
            w.write(text.as_bytes());
            next.serve(ctx, w, req)
        }))
    }
}

fn print_value(ctx: Context, w: &mut ResponseWriter, _req: &Request) -> Context {
    let value = ctx.value::<u32>("value").copied().unwrap_or_default();
    w.write(format!("{value}\n").as_bytes());
    ctx
}

#[tokio::test]
async fn serves_composed_chain() {
    let app = Chain::new()
        .append(set_value(10))
        .append(line("m1\n"))
        .append(line("m2\n"))
        .then_host_fn(print_value);
    let server = start(app).await;

    let raw = get(server.addr, "/").await;

    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert_eq!(body(&raw), "m1\nm2\n10\n");

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn serves_chain_with_legacy_layer() {
    let m0 = legacy::wrap(|next: BoxHostHandler| {
        host_fn(move |w: &mut ResponseWriter, req: &Request| {
            w.write(b"m0\n");
            next.serve(w, req);
        })
    });
    let app = Chain::new()
        .append(set_value(10))
        .append(line("m1\n"))
        .append(m0)
        .append(line("m2\n"))
        .then_host_fn(print_value);
    let server = start(app).await;

    let raw = get(server.addr, "/").await;

    assert_eq!(body(&raw), "m1\nm0\nm2\n10\n");

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn default_terminal_is_not_found() {
    let server = start(Chain::new().then_host_default()).await;

    let raw = get(server.addr, "/anything").await;

    assert!(raw.starts_with("HTTP/1.1 404 Not Found"), "{raw}");
    assert_eq!(body(&raw), "404 page not found\n");

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn panicking_handler_answers_500_and_server_survives() {
    let app = Chain::new().then_host_fn(|ctx: Context, w: &mut ResponseWriter, req: &Request| {
        if req.path() == "/boom" {
            panic!("boom");
        }
        w.write(b"fine");
        ctx
    });
    let server = start(app).await;

    let raw = get(server.addr, "/boom").await;
    assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error"), "{raw}");

    let raw = get(server.addr, "/ok").await;
    assert_eq!(body(&raw), "fine");

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_closes_idle_keep_alive_connections() {
    let app = Chain::new().then_host_fn(|ctx: Context, w: &mut ResponseWriter, _req: &Request| {
        w.write(b"ok");
        ctx
    });
    let server = start(app).await;

    // No `connection: close`: the socket stays open once the response is in.
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !buf.ends_with(b"ok") {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the response arrived");
        buf.extend_from_slice(&chunk[..n]);
    }
    assert!(buf.starts_with(b"HTTP/1.1 200 OK"));

    server.stop.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), server.task).await;
    stopped.expect("server kept waiting on an idle connection").unwrap().unwrap();

    let closed = stream.read(&mut chunk).await;
    assert!(matches!(closed, Ok(0) | Err(_)), "{closed:?}");
}

#[tokio::test]
async fn bind_reports_configured_addr() {
    let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
    assert_eq!(Server::bind(addr).local_addr().unwrap(), addr);
}
