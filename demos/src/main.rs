use anyhow::anyhow;
use std::time::Duration;
#[allow(unused)]
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wsst::prelude::*;

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wsst_core=info,wsst_runtime=info")),
        )
        .init();

    if let Err(err) = WsstRuntime::new().with_args().run().await {
        error!("{err}");
        std::process::exit(1);
    }
}

#[scenario(description = "Send one message, wait for the echo and close", path = "/echo")]
async fn echo(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    connection.send("ping").await?;
    let reply = connection.recv_text().await?;
    if reply != "ping" {
        return Err(anyhow!("Unexpected echo `{reply}`").into());
    }
    checkpoints.checkpoint("Echo received");
    connection.close().await?;
    Ok(())
}

#[scenario(
    description = "Wait for the server greeting, then send ten messages",
    path = "/greet"
)]
async fn chatter(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    connection.recv_text().await?;
    checkpoints.checkpoint("Greeted");

    for i in 0..10 {
        connection.send(format!("message {i}")).await?;
        connection.recv_text().await?;
    }
    checkpoints.checkpoint("Ten round trips");

    tokio::time::sleep(Duration::from_millis(100)).await;
    connection.close().await?;
    Ok(())
}

#[scenario(
    description = "Stay connected until the server hangs up",
    path = "/close/ms/1000"
)]
async fn idle(_connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    checkpoints.checkpoint("Waiting for server");
    Ok(())
}
