//! Concurrent counter updates from multiple pool connections.
//!
//! The counters are single-statement arithmetic UPDATEs, and every pool
//! connection runs with WAL and a busy timeout, so parallel recorders
//! must queue rather than lose increments.

use std::sync::Arc;
use std::thread;

use vetka::core::access::AccessTier;
use vetka::storage::menu::{create_menu_item, get_menu_item, ItemKind, NewMenuItem};
use vetka::storage::{create_pool, stats};

#[test]
fn parallel_ratings_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.sqlite");
    let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());

    let item_id = {
        let conn = pool.get().unwrap();
        create_menu_item(
            &conn,
            &NewMenuItem {
                title: "Contended".to_string(),
                description: None,
                bot_message: None,
                parent_id: None,
                kind: ItemKind::Content,
                is_active: true,
                access_tier: AccessTier::Free,
            },
        )
        .unwrap()
        .id
    };

    const THREADS: i64 = 8;
    const PER_THREAD: i64 = 5;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = pool.clone();
            thread::spawn(move || {
                // Each thread rates (t % 5) + 1, five times.
                let rating = (t % 5) + 1;
                for _ in 0..PER_THREAD {
                    let conn = pool.get().unwrap();
                    stats::record_rating(&conn, item_id, rating).unwrap();
                    stats::record_view(&conn, item_id).unwrap();
                    stats::record_download(&conn, item_id).unwrap();
                }
                rating * PER_THREAD
            })
        })
        .collect();

    let expected_sum: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let conn = pool.get().unwrap();
    let item = get_menu_item(&conn, item_id).unwrap().unwrap();
    assert_eq!(item.rating_count, THREADS * PER_THREAD);
    assert_eq!(item.rating_sum, expected_sum);
    assert_eq!(item.view_count, THREADS * PER_THREAD);
    assert_eq!(item.download_count, THREADS * PER_THREAD);

    // Stored average is rounded to two decimals; compare with tolerance.
    let expected_avg = expected_sum as f64 / (THREADS * PER_THREAD) as f64;
    let stored = item.average_rating.unwrap();
    assert!(
        (stored - expected_avg).abs() < 0.01,
        "average {stored} too far from {expected_avg}"
    );
}
