//! Bare HTTP/1.1 server on a loopback port for fetch and scrape tests.
//!
//! Every response closes its connection, so requests in flight equal open
//! connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub(crate) struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    /// Send `Content-Length`; otherwise the body ends when the connection
    /// closes.
    pub declare_length: bool,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into(), delay: Duration::ZERO, declare_length: true }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// `None` from the route leaves the request unanswered.
type Route = dyn Fn(&str) -> Option<Reply> + Send + Sync;

pub(crate) struct TestServer {
    addr: SocketAddr,
    peak: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn start(route: impl Fn(&str) -> Option<Reply> + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let route: Arc<Route> = Arc::new(route);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let counters = (in_flight, peak.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let route = route.clone();
                let (in_flight, peak) = (counters.0.clone(), counters.1.clone());
                tokio::spawn(serve(stream, route, in_flight, peak));
            }
        });

        Self { addr, peak }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Most requests the server was handling at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

async fn serve(mut stream: TcpStream, route: Arc<Route>, in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) {
    let Some(path) = read_path(&mut stream).await else {
        return;
    };

    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    peak.fetch_max(now, Ordering::SeqCst);

    let Some(reply) = route(&path) else {
        std::future::pending::<()>().await;
        return;
    };
    tokio::time::sleep(reply.delay).await;
    // Counted out before the response leaves.
    in_flight.fetch_sub(1, Ordering::SeqCst);

    let length = if reply.declare_length { format!("Content-Length: {}\r\n", reply.body.len()) } else { String::new() };
    let head = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: text/html\r\nConnection: close\r\n{length}\r\n",
        reply.status
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(reply.body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_path(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&head);
    head.split_whitespace().nth(1).map(str::to_string)
}
