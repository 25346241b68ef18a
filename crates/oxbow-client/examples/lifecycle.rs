//! Full stream lifecycle walkthrough against the in-memory service:
//! discover-or-create, publish a keyed batch, drain it through a paced
//! group-cursor loop, then tear the stream down and wait for removal.
//!
//! Run with: `cargo run --example lifecycle`

use oxbow_client::{
    AdminController, ClientConfig, ConsumeLoop, ConsumeOptions, CursorManager,
    InMemoryStreamService, LifecycleState, MessageEntry, Publisher, StartFrom, StreamService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let compartment_id =
        std::env::args().nth(1).unwrap_or_else(|| "ocid.compartment.demo".to_string());

    let service: Arc<dyn StreamService> = Arc::new(InMemoryStreamService::new());
    let config = ClientConfig::new(compartment_id).pacing(Duration::from_millis(100));
    let cancel = CancellationToken::new();

    // Reuse an active stream if one exists, otherwise provision and wait.
    let admin = AdminController::new(service.clone(), config.clone());
    let stream = admin.get_or_create("stream-sdk-test", 1, &cancel).await?;
    info!(stream_id = %stream.id, "stream is active");

    // Publish a batch of keyed messages and inspect per-entry outcomes.
    let publisher = Publisher::new(service.clone(), config.clone());
    let entries: Vec<_> = (0..100)
        .map(|i| MessageEntry::keyed(format!("messageKey-{i}"), format!("messageValue-{i}")))
        .collect();
    let result = publisher.publish(&stream.id, &entries).await?;
    info!(
        committed = result.len() - result.failure_count(),
        failed = result.failure_count(),
        "publish finished"
    );
    for (index, code, message) in result.failures() {
        eprintln!("entry {index} failed: {code}: {message}");
    }

    // Consume through a committing group cursor until the stream runs dry.
    let cursor = CursorManager::new(service.clone(), config.clone())
        .group_cursor(&stream.id, "exampleGroup", "exampleInstance-1", StartFrom::TrimHorizon, true)
        .await?;

    let mut consume = ConsumeLoop::new(
        service.clone(),
        config.clone(),
        &stream.id,
        cursor,
        ConsumeOptions {
            fetch_limit: 10,
            idle_limit: Some(2),
            ..ConsumeOptions::default()
        },
    );
    let summary = consume
        .run(&cancel, |record| {
            let key = record.key.as_deref().unwrap_or(b"");
            println!(
                "{}: {}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(&record.value)
            );
        })
        .await?;
    info!(batches = summary.batches, records = summary.records, "consume loop done");

    // Teardown: deletion is asynchronous too, so wait for it to finalize.
    admin.delete(&stream.id).await?;
    admin
        .await_state(&stream.id, LifecycleState::Deleted, &cancel)
        .await?;
    info!("stream deleted");

    Ok(())
}
