use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, RawQuery,
    },
    response::Response,
    routing::get,
    Router,
};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub fn router() -> Router {
    Router::new()
        .route("/echo", get(echo))
        .route("/greet", get(greet))
        .route("/query", get(query))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/close/ms/:delay_ms", get(close_after))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) {
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Mock service listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, router()).await.unwrap();
}

/// Serve on a random local port in the background.
pub async fn spawn() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    addr
}

/// Echo every text and binary message back until the client closes.
async fn echo(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|socket| echo_loop(socket, Duration::ZERO))
}

/// Send `hello` right after the upgrade, then echo.
async fn greet(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket| async move {
        if socket.send(Message::Text("hello".to_string())).await.is_ok() {
            echo_loop(socket, Duration::ZERO).await;
        }
    })
}

/// Send the raw query string of the upgrade request, then echo.
async fn query(RawQuery(query): RawQuery, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket| async move {
        let query = query.unwrap_or_default();
        if socket.send(Message::Text(query)).await.is_ok() {
            echo_loop(socket, Duration::ZERO).await;
        }
    })
}

/// Echo with a fixed delay before every reply.
async fn delay(Path(delay_ms): Path<u64>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| echo_loop(socket, Duration::from_millis(delay_ms)))
}

/// Close the connection from the server side after a delay.
async fn close_after(Path(delay_ms): Path<u64>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |mut socket| async move {
        accepted();
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        debug!("Closing connection after {delay_ms}ms");
        let _ = socket.send(Message::Close(None)).await;
        // Wait for the client to acknowledge.
        while let Some(Ok(msg)) = socket.recv().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
}

async fn echo_loop(mut socket: WebSocket, delay: Duration) {
    accepted();
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if socket.send(msg).await.is_err() {
                    break;
                }
            }
            // The close reply is flushed by the next read, which then ends the loop.
            Message::Close(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/** Connection Counter **/

static CONNECTIONS: AtomicU64 = AtomicU64::new(0);

fn accepted() {
    counter!("mock-service.connections").increment(1);
    CONNECTIONS.fetch_add(1, Ordering::Relaxed);
}

pub async fn connections_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let connections = CONNECTIONS.swap(0, Ordering::Relaxed);
        println!("{connections} connections/s");
    }
}
