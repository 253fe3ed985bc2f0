//! Log output of the refresh path, checked through a capture layer.

use std::sync::Arc;

use modelmeter::core::{Provider, UsageStore};
use modelmeter::test_utils::MockConnector;

mod common;
use common::log_capture::TestLogCapture;

#[tokio::test]
async fn failed_refresh_logs_a_warning_with_provider() {
    let capture = TestLogCapture::start();
    let mock = Arc::new(MockConnector::new());
    mock.fail_with(Provider::Codex, "exit status 3");
    let store = UsageStore::with_defaults(mock);

    store.refresh(Provider::Codex).await;

    capture.assert_logged_at_level(tracing::Level::WARN, "Usage refresh failed");
    capture.assert_field_logged("provider", "codex");
    capture.assert_field_logged("error", "exit status 3");
}

#[tokio::test]
async fn successful_refresh_does_not_warn() {
    let capture = TestLogCapture::start();
    let store = UsageStore::with_defaults(Arc::new(MockConnector::new()));

    store.refresh(Provider::Claude).await;

    capture.assert_not_logged("Usage refresh failed");
    assert!(
        capture
            .logs()
            .iter()
            .all(|l| l.level != tracing::Level::WARN)
    );
}

#[tokio::test]
async fn stop_is_logged_only_when_running() {
    let capture = TestLogCapture::start();
    let store = UsageStore::with_defaults(Arc::new(MockConnector::new()));

    store.stop();
    capture.assert_not_logged("Stopped usage polling");

    store.start();
    store.stop();
    capture.assert_logged("Starting usage polling");
    capture.assert_logged_at_level(tracing::Level::INFO, "Stopped usage polling");
}
