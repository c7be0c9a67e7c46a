mod support;

use std::collections::HashSet;
use std::time::Duration;

use axum::http::StatusCode;
use blogroll::cache::{METRIC_EXPIRED, METRIC_HIT, METRIC_INVALIDATED, METRIC_MISS};
use metrics_util::debugging::DebuggingRecorder;
use support::{TestApp, post_empty};

#[tokio::test]
async fn home_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = TestApp::new().await;

    // miss, then hit
    for _ in 0..2 {
        let (status, _) = app.get_page("/", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    // expired entry counts as both expired and miss
    app.clock.advance(Duration::from_secs(21));
    app.get_page("/", None).await;

    let response = app.send_admin(post_empty("/cache/invalidate", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [METRIC_HIT, METRIC_MISS, METRIC_EXPIRED, METRIC_INVALIDATED] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
