//! # Bridge Pipeline Tests
//!
//! End-to-end runs of the coordinator over an in-memory log stream:
//! - no frame lost between K partitions and the decode step
//! - shutdown waits for every partition's completion signal
//! - per-message failures are counted and skipped

use bridge::{Coordinator, CoordinatorReport, CoordinatorSettings, MemoryLogStream};
use codec::WokMessageBuilder;
use message_sink::test_utils::{CollectorSink, FailingSink};
use message_sink::MessageSink;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const TOPIC: &str = "bots_events";

fn frame(partition: i32, seq: usize) -> Vec<u8> {
    WokMessageBuilder::new()
        .recipient("ops")
        .sender("pipeline-test")
        .id(format!("{}-{}", partition, seq))
        .header("seq", seq as u64)
        .body(format!("message {} on {}", seq, partition))
        .build()
}

/// `total` frames spread round-robin over `partitions` partitions
fn spread(partitions: i32, total: usize) -> MemoryLogStream {
    let mut stream = MemoryLogStream::new();
    for partition in 0..partitions {
        stream = stream.with_partition(TOPIC, partition);
    }
    for seq in 0..total {
        let partition = (seq % partitions as usize) as i32;
        stream.push_frame(TOPIC, partition, frame(partition, seq));
    }
    stream
}

async fn run(
    stream: MemoryLogStream,
    sink: Arc<dyn MessageSink>,
    cancel: CancellationToken,
) -> CoordinatorReport {
    let coordinator = Coordinator::new(Arc::new(stream), sink, CoordinatorSettings::new(TOPIC));
    timeout(Duration::from_secs(10), coordinator.run(cancel))
        .await
        .expect("coordinator should terminate")
        .expect("coordinator should succeed")
}

#[tokio::test]
async fn test_no_frame_lost_across_partitions() {
    let stream = spread(4, 250);
    let sink = Arc::new(CollectorSink::connected());

    let report = run(stream, sink.clone(), CancellationToken::new()).await;

    assert_eq!(report.partitions, 4);
    assert_eq!(report.received, 250);
    assert_eq!(report.processed, 250);
    assert_eq!(report.delivered, 250);
    assert_eq!(sink.message_count(), 250);
}

#[tokio::test]
async fn test_partition_order_preserved() {
    let stream = spread(3, 90);
    let sink = Arc::new(CollectorSink::connected());

    run(stream, sink.clone(), CancellationToken::new()).await;

    let mut last_offset: HashMap<i32, i64> = HashMap::new();
    for message in sink.received_messages() {
        if let Some(previous) = last_offset.insert(message.partition, message.offset) {
            assert!(
                message.offset > previous,
                "partition {} went from {} to {}",
                message.partition,
                previous,
                message.offset
            );
        }
        assert_eq!(message.id, format!("{}-{}", message.partition, message.headers["seq"]));
    }
    assert_eq!(last_offset.len(), 3);
}

#[tokio::test]
async fn test_shutdown_waits_for_every_partition() {
    let feeds_open = CancellationToken::new();
    let stream = spread(5, 40).hold_open(feeds_open.clone());
    let sink = Arc::new(CollectorSink::connected());
    let cancel = CancellationToken::new();

    let coordinator = Coordinator::new(
        Arc::new(stream),
        sink.clone(),
        CoordinatorSettings::new(TOPIC),
    );
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { coordinator.run(cancel).await }
    });

    // Feeds stay open: the coordinator must still be running once all frames are through
    timeout(Duration::from_secs(5), async {
        while sink.message_count() < 40 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all frames delivered");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    cancel.cancel();
    let report = timeout(Duration::from_secs(5), task)
        .await
        .expect("coordinator stops after cancel")
        .unwrap()
        .unwrap();

    assert_eq!(report.partitions, 5);
    assert_eq!(report.processed, sink.message_count() as u64);
    assert_eq!(report.processed, 40);
    feeds_open.cancel();
}

#[tokio::test]
async fn test_cancel_before_start_still_terminates() {
    let stream = spread(3, 30).hold_open(CancellationToken::new());
    let sink = Arc::new(CollectorSink::connected());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run(stream, sink.clone(), cancel).await;

    assert_eq!(report.partitions, 3);
    assert_eq!(report.processed, sink.message_count() as u64);
}

#[tokio::test]
async fn test_bad_frames_are_skipped() {
    let mut truncated = frame(0, 1);
    truncated.pop();

    let stream = MemoryLogStream::new()
        .with_frame(TOPIC, 0, frame(0, 0))
        .with_frame(TOPIC, 0, vec![2, 30, 11, 8, 0])
        .with_frame(TOPIC, 0, vec![1, 99])
        .with_frame(TOPIC, 0, truncated)
        .with_frame(TOPIC, 0, Vec::new())
        .with_frame(TOPIC, 0, frame(0, 5));
    let sink = Arc::new(CollectorSink::connected());

    let report = run(stream, sink.clone(), CancellationToken::new()).await;

    assert_eq!(report.received, 6);
    assert_eq!(report.decode_failures, 4);
    assert_eq!(report.processed, 2);
    let ids: Vec<String> = sink.received_messages().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["0-0", "0-5"]);
}

#[tokio::test]
async fn test_compressed_bodies() {
    let good = WokMessageBuilder::new()
        .id("zipped")
        .compressed_body(b"hello world")
        .unwrap()
        .build();
    let broken = WokMessageBuilder::new()
        .id("broken")
        .header("compress", true)
        .body(b"definitely not zlib".to_vec())
        .build();

    let stream = MemoryLogStream::new()
        .with_frame(TOPIC, 0, good)
        .with_frame(TOPIC, 1, broken);
    let sink = Arc::new(CollectorSink::connected());

    let report = run(stream, sink.clone(), CancellationToken::new()).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.decompression_failures, 1);

    let by_id: HashMap<String, Vec<u8>> = sink
        .received_messages()
        .into_iter()
        .map(|m| (m.id, m.body))
        .collect();
    assert_eq!(by_id["zipped"], b"hello world");
    assert!(by_id["broken"].is_empty());
}

#[tokio::test]
async fn test_sink_failures_do_not_stop_the_run() {
    let stream = spread(2, 10);
    let report = run(stream, Arc::new(FailingSink::default()), CancellationToken::new()).await;

    assert_eq!(report.processed, 10);
    assert_eq!(report.sink_failures, 10);
    assert_eq!(report.delivered, 0);
}

#[tokio::test]
async fn test_source_errors_counted() {
    let stream = MemoryLogStream::new()
        .with_error(TOPIC, 0, "not leader for partition")
        .with_frame(TOPIC, 0, frame(0, 0))
        .with_error(TOPIC, 1, "offset out of range");
    let sink = Arc::new(CollectorSink::connected());

    let report = run(stream, sink.clone(), CancellationToken::new()).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.source_errors, 2);
}

#[tokio::test]
async fn test_wider_aggregation_channel() {
    let coordinator = Coordinator::new(
        Arc::new(spread(6, 300)),
        Arc::new(CollectorSink::connected()),
        CoordinatorSettings::new(TOPIC).with_channel_capacity(32),
    );
    let report = coordinator.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.received, 300);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_frame_reaches_decode(partitions in 1i32..6, total in 0usize..80) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sink = Arc::new(CollectorSink::connected());
        let report = runtime.block_on(run(spread(partitions, total), sink.clone(), CancellationToken::new()));

        prop_assert_eq!(report.partitions, partitions as usize);
        prop_assert_eq!(report.received, total as u64);
        prop_assert_eq!(sink.message_count(), total);
    }
}
