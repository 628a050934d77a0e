use std::collections::HashSet;

use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use time::OffsetDateTime;

use quaderno::application::analytics::{
    AnalyticsLimits, AnalyticsService, METRIC_VISIT_STORE_LEN, METRIC_VISITS_EVICTED,
    METRIC_VISITS_TRACKED,
};

#[test]
fn tracking_emits_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let service = AnalyticsService::new(AnalyticsLimits {
        capacity: 2,
        ..AnalyticsLimits::default()
    });
    for path in ["/a", "/b", "/c"] {
        let fields = json!({ "path": path })
            .as_object()
            .cloned()
            .expect("object body");
        service
            .track(fields, "203.0.113.5", OffsetDateTime::now_utc())
            .expect("track visit");
    }

    let stats = service.stats().expect("stats");
    assert_eq!(stats.total_views, 2);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        METRIC_VISITS_TRACKED,
        METRIC_VISITS_EVICTED,
        METRIC_VISIT_STORE_LEN,
    ] {
        assert!(names.contains(expected), "missing metric {expected}: {names:?}");
    }
}
