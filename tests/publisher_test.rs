//! Publisher integration tests over real state files in a temp dir

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::*;
use repocast::models::Category;
use repocast::notifications::NotificationKind;
use repocast::pipeline::PublishOutcome;

const ITEM: &str = "https://github.com/octo/telescope";

#[tokio::test]
async fn test_publish_moves_entry_from_queue_to_history() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General)));
    let twitter = Arc::new(RecordingChannel::ok("twitter"));
    let bluesky = Arc::new(RecordingChannel::ok("bluesky"));
    let notifier = Arc::new(RecordingNotifier::default());

    let publisher = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_channel(twitter.clone())
        .with_channel(bluesky.clone())
        .with_notifier(notifier.clone());

    let outcome = publisher.process_one().await.unwrap();
    assert_eq!(outcome.exit_code(), 0);

    let PublishOutcome::Published(report) = outcome else {
        panic!("expected a published outcome");
    };
    assert_eq!(report.succeeded_channels(), 2);
    assert!(!report.used_fallback_content);
    assert!(report.notified);
    assert!(report.archive.url.starts_with("https://site.example/"));

    assert!(lines(&dir, "queue.txt").is_empty());
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
    assert_eq!(posts(&dir).len(), 1);

    let drafts = twitter.drafts.lock().unwrap();
    assert_eq!(drafts[0].archive_url, report.archive.url);
    assert_eq!(drafts[0].item_url, ITEM);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Published);
    assert_eq!(sent[0].succeeded_channels(), vec!["twitter", "bluesky"]);
}

#[tokio::test]
async fn test_notification_failure_does_not_change_outcome() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General)));
    let notifier = Arc::new(RecordingNotifier::failing());
    let publisher = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_channel(Arc::new(RecordingChannel::ok("twitter")))
        .with_notifier(notifier.clone());

    let outcome = publisher.process_one().await.unwrap();
    assert_eq!(outcome.exit_code(), 0);

    let PublishOutcome::Published(report) = outcome else {
        panic!("expected a published outcome");
    };
    assert!(!report.notified);
    assert_eq!(report.succeeded_channels(), 1);
    assert_eq!(notifier.sent.lock().unwrap().len(), 1);

    assert!(lines(&dir, "queue.txt").is_empty());
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
}

#[tokio::test]
async fn test_below_threshold_is_dropped_without_history() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 10, Category::General)));
    let channel = Arc::new(RecordingChannel::ok("twitter"));
    let publisher = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_channel(channel.clone());

    let outcome = publisher.process_one().await.unwrap();
    assert!(matches!(
        outcome,
        PublishOutcome::RejectedLowPopularity {
            popularity: 10,
            minimum: 50,
            ..
        }
    ));
    assert_eq!(outcome.exit_code(), 1);

    assert!(lines(&dir, "queue.txt").is_empty());
    assert!(lines(&dir, "history.txt").is_empty());
    assert!(posts(&dir).is_empty());
    assert_eq!(channel.attempts(), 0);
}

#[tokio::test]
async fn test_reject_notification_is_opt_in() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.telegram.notify_on_reject = true;
    write_file(&dir, "queue.txt", &format!("{ITEM}|astronomy\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 1, Category::Astronomy)));
    let notifier = Arc::new(RecordingNotifier::default());
    let publisher = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_notifier(notifier.clone());

    publisher.process_one().await.unwrap();

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Rejected);
    assert!(sent[0].summary.contains("minimum 3"));
}

#[tokio::test]
async fn test_duplicate_entry_is_consumed_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n{ITEM}|general\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General)));

    let first = publisher(&config, fetcher.clone(), StaticGenerator(Some(content())));
    let outcome = first.process_one().await.unwrap();
    assert!(matches!(outcome, PublishOutcome::Published(_)));
    assert_eq!(lines(&dir, "queue.txt"), vec![format!("{ITEM}|general")]);

    let second = publisher(&config, fetcher.clone(), StaticGenerator(Some(content())));
    let outcome = second.process_one().await.unwrap();
    assert!(matches!(outcome, PublishOutcome::SkippedDuplicate { .. }));
    assert_eq!(outcome.exit_code(), 1);

    assert!(lines(&dir, "queue.txt").is_empty());
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
    assert_eq!(posts(&dir).len(), 1);
    assert_eq!(fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_duplicate_guard_normalizes_trailing_slash() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}/|general\n"));
    write_file(&dir, "history.txt", &format!("{ITEM}\n"));

    let fetcher = Arc::new(StaticFetcher::default());
    let outcome = publisher(&config, fetcher, StaticGenerator(None))
        .process_one()
        .await
        .unwrap();

    assert!(matches!(outcome, PublishOutcome::SkippedDuplicate { .. }));
    assert!(lines(&dir, "queue.txt").is_empty());
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
}

#[tokio::test]
async fn test_empty_queue() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let outcome = publisher(&config, Arc::new(StaticFetcher::default()), StaticGenerator(None))
        .process_one()
        .await
        .unwrap();

    assert!(matches!(outcome, PublishOutcome::Empty));
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_metadata_failure_leaves_state_untouched() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let result = publisher(&config, Arc::new(StaticFetcher::default()), StaticGenerator(Some(content())))
        .process_one()
        .await;

    assert!(result.is_err());
    assert_eq!(lines(&dir, "queue.txt"), vec![format!("{ITEM}|general")]);
    assert!(lines(&dir, "history.txt").is_empty());
}

#[tokio::test]
async fn test_archive_failure_leaves_state_untouched() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let files = repocast::storage::StateFiles::from_config(&config);
    let channel = Arc::new(RecordingChannel::ok("twitter"));
    let publisher = repocast::pipeline::Publisher::new(
        files.queue,
        files.history,
        Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General))),
        Arc::new(NoAsset),
        Arc::new(StaticGenerator(Some(content()))),
        Arc::new(FailingArchiver),
        &config,
    )
    .with_channel(channel.clone());

    assert!(publisher.process_one().await.is_err());
    assert_eq!(channel.attempts(), 0);
    assert_eq!(lines(&dir, "queue.txt"), vec![format!("{ITEM}|general")]);
    assert!(lines(&dir, "history.txt").is_empty());
}

#[tokio::test]
async fn test_channel_failure_does_not_stop_other_channels() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let broken = Arc::new(RecordingChannel::failing("twitter"));
    let working = Arc::new(RecordingChannel::ok("bluesky"));
    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General)));

    let outcome = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_channel(broken.clone())
        .with_channel(working.clone())
        .process_one()
        .await
        .unwrap();

    let PublishOutcome::Published(report) = outcome else {
        panic!("expected a published outcome");
    };
    assert_eq!(broken.attempts(), 1);
    assert_eq!(working.attempts(), 1);
    assert_eq!(report.succeeded_channels(), 1);
    assert!(report.channels[0].error.as_deref().unwrap().contains("down"));

    assert!(lines(&dir, "queue.txt").is_empty());
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
}

#[tokio::test]
async fn test_all_channels_failing_still_commits() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 500, Category::General)));
    let outcome = publisher(&config, fetcher, StaticGenerator(Some(content())))
        .with_channel(Arc::new(RecordingChannel::failing("twitter")))
        .with_channel(Arc::new(RecordingChannel::failing("bluesky")))
        .process_one()
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
    assert_eq!(posts(&dir).len(), 1);
}

#[tokio::test]
async fn test_generator_failure_uses_fallback_content() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    write_file(&dir, "queue.txt", &format!("{ITEM}|astronomy\n"));

    let fetcher = Arc::new(StaticFetcher::default().with(record(ITEM, 40, Category::Astronomy)));
    let channel = Arc::new(RecordingChannel::ok("bluesky"));
    let outcome = publisher(&config, fetcher, StaticGenerator(None))
        .with_channel(channel.clone())
        .process_one()
        .await
        .unwrap();

    let PublishOutcome::Published(report) = outcome else {
        panic!("expected a published outcome");
    };
    assert!(report.used_fallback_content);

    let drafts = channel.drafts.lock().unwrap();
    assert_eq!(drafts[0].content.hashtags, vec!["Astronomy", "OpenSource", "Science"]);
    assert!(drafts[0].content.summary.starts_with("octo/telescope - "));
}

#[tokio::test]
async fn test_head_is_processed_first() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let second = "https://huggingface.co/org/model";
    write_file(&dir, "queue.txt", &format!("{ITEM}|general\n{second}|model-hub\n"));

    let fetcher = Arc::new(
        StaticFetcher::default()
            .with(record(ITEM, 500, Category::General))
            .with(record(second, 500, Category::ModelHub)),
    );
    publisher(&config, fetcher, StaticGenerator(Some(content())))
        .process_one()
        .await
        .unwrap();

    assert_eq!(lines(&dir, "queue.txt"), vec![format!("{second}|model-hub")]);
    assert_eq!(lines(&dir, "history.txt"), vec![ITEM]);
}
