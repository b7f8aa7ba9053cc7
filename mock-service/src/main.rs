use std::net::SocketAddr;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug,tower_http=info")
        .init();

    tokio::spawn(mock_service::connections_measure_task());

    let addr: SocketAddr = "0.0.0.0:3002".parse().unwrap();
    mock_service::run(addr).await;
}
