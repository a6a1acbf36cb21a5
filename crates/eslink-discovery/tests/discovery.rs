//! Integration tests: waiters woken by advertisements arriving from
//! another task.

use std::sync::Arc;
use std::time::Duration;

use eslink_discovery::{DiscoveryCache, DiscoveryConfig};
use eslink_transport::{Advertisement, DeviceAddress, SERVICE_UUID};

fn label(n: u64) -> Advertisement {
    Advertisement::new(DeviceAddress::new(n), -55)
        .with_service(SERVICE_UUID)
        .with_manufacturer_data(b"53500b1c810141".to_vec())
}

#[tokio::test]
async fn test_wait_for_count_woken_by_ingest() {
    let cache = Arc::new(DiscoveryCache::new(DiscoveryConfig::default()));

    let scanner = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            for n in 1..=3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                // Repeats must not count twice.
                cache.ingest(&label(n));
                cache.ingest(&label(n));
            }
        })
    };

    let seen = cache.wait_for_count(3, Duration::from_secs(5)).await;
    assert_eq!(seen, 3);
    scanner.await.unwrap();
}

#[tokio::test]
async fn test_wait_for_address_ignores_other_labels() {
    let cache = Arc::new(DiscoveryCache::default());
    let wanted = DeviceAddress::new(42);

    let scanner = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache.ingest(&label(1));
            tokio::time::sleep(Duration::from_millis(20)).await;
            cache.ingest(&label(42));
        })
    };

    assert!(cache.wait_for_address(wanted, Duration::from_secs(5)).await);
    assert_eq!(cache.len(), 2);
    scanner.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_count_reports_partial_on_timeout() {
    let cache = Arc::new(DiscoveryCache::default());
    cache.ingest(&label(1));

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.wait_for_count(2, Duration::from_secs(1)).await })
    };

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(waiter.await.unwrap(), 1);
}
