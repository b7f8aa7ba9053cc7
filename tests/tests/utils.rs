use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::OnceLock;
use tracing_subscriber::FmtSubscriber;

/// Install logging once and start a fresh mock service for the calling test.
#[allow(unused)]
pub async fn init() -> SocketAddr {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("wsst_core=debug,wsst_runtime=debug,mock_service=debug")
            .try_init();
    });

    mock_service::spawn().await
}

#[allow(unused)]
pub fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{addr}")
}

#[allow(unused)]
pub fn n(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}
