//! Process-wide mutexes keyed by StoreFront site ID

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::OwnedMutexGuard;

static SITE_LOCKS: LazyLock<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn site_mutex(site_id: &str) -> Arc<tokio::sync::Mutex<()>> {
    // A poisoned map still holds valid entries
    let mut locks = SITE_LOCKS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks
        .entry(site_id.to_string())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// Serialises callers that share `site_id`; the lock is released when the guard drops
pub async fn lock_site(site_id: &str) -> OwnedMutexGuard<()> {
    tracing::debug!("Waiting for site lock {}", site_id);
    let guard = site_mutex(site_id).lock_owned().await;
    tracing::debug!("Acquired site lock {}", site_id);
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_site_is_serialised() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let active = active.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    let _guard = lock_site("serialised-site").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_sites_do_not_block() {
        let _a = lock_site("site-a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), lock_site("site-b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_lock_is_released_on_drop() {
        {
            let _guard = lock_site("site-release").await;
        }
        let again = tokio::time::timeout(Duration::from_millis(100), lock_site("site-release")).await;
        assert!(again.is_ok());
    }
}
