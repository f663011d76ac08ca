//! Drive a live session against a scripted device and print what a UI would see.
//!
//! Run with: `cargo run --example scripted_session --features test-utils`
//! Set `RUST_LOG=scopestream=debug` for controller internals.

use scopestream::test_utils::{ScriptedFetch, ScriptedSource};
use scopestream::{ChannelObserver, SessionController, StreamConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = StreamConfig::from_yaml_str("tick_interval_ms: 100\nrate_window_ms: 1000\n")?;

    // A slightly flaky camera: one busy frame and one dropped response early on
    let source = Arc::new(ScriptedSource::new().with_fetch_latency(Duration::from_millis(30)));
    source.push_fetches([
        ScriptedFetch::Frame(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        ScriptedFetch::Soft("Camera busy".into()),
        ScriptedFetch::Empty,
    ]);

    let (observer, channels) = ChannelObserver::new();
    let mut log_rx = observer.subscribe_logs();
    let controller = SessionController::new(source.clone(), Arc::new(observer), config)?;

    let logs = tokio::spawn(async move {
        while let Ok(event) = log_rx.recv().await {
            println!("{event}");
        }
    });

    let device = controller.connect().await;
    println!("device: {device:?}");

    controller.toggle().await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let snapshot = controller.snapshot();
    println!(
        "streaming={} rate={} frames={} skipped_ticks={}",
        snapshot.is_streaming(),
        snapshot.current_rate,
        snapshot.frames_received,
        snapshot.skipped_ticks
    );

    let still = controller.capture().await?;
    println!("captured still: {} bytes", still.len());

    controller.toggle().await;
    println!("stats: {:?}", channels.stats());
    println!("fetches issued: {}", source.fetches());

    controller.shutdown().await;
    logs.abort();
    Ok(())
}
