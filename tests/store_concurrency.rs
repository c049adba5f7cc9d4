use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cable_detect::{CableType, DetectionResult, ResultStore};

fn result(confidence: f32) -> DetectionResult {
    DetectionResult::new(
        CableType::MicroUsb,
        confidence,
        None,
        Vec::new(),
        Duration::ZERO,
    )
    .unwrap()
}

#[test]
fn readers_never_observe_more_than_capacity() {
    let store = ResultStore::new(8, 5, 0.85);
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let mut writers = Vec::new();
        for writer in 0..4 {
            let store = &store;
            writers.push(scope.spawn(move || {
                for i in 0..500 {
                    store.add(result(if i % 3 == 0 { 0.9 } else { 0.7 }));
                    if writer == 0 && i % 97 == 0 {
                        store.clear();
                    }
                }
            }));
        }

        for _ in 0..3 {
            let store = &store;
            let done = &done;
            scope.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    assert!(store.len() <= store.capacity());
                    assert!(store.all().len() <= store.capacity());

                    let recent = store.recent(5);
                    assert!(recent.len() <= 5);
                    for pair in recent.windows(2) {
                        assert!(pair[0].detected_at() >= pair[1].detected_at());
                    }

                    if let Some(featured) = store.featured() {
                        assert!(featured.confidence() >= store.featured_threshold());
                    }
                    let summary = store.summary();
                    assert_eq!(summary.total, summary.high + summary.medium + summary.low);
                }
            });
        }

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert!(store.len() <= 8);
}
