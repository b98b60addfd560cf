use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use bliss_core::{CatalogCache, CatalogError, RefreshOutcome};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub(crate) fn shutdown_requested(shutdown_rx: &watch::Receiver<bool>) -> bool {
    *shutdown_rx.borrow()
}

/// Refreshes the catalog now and then every `every` until shutdown is signalled.
pub(crate) fn spawn_catalog_refresh(
    cache: Arc<CatalogCache>,
    every: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_refresh_loop(every, shutdown_rx, move || {
        let cache = Arc::clone(&cache);
        async move { cache.refresh().await }
    }))
}

pub(crate) async fn run_refresh_loop<F, Fut>(
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut refresh: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RefreshOutcome, CatalogError>>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Catalog refresh scheduled every {}s", every.as_secs());

    loop {
        if shutdown_requested(&shutdown_rx) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                let started = Instant::now();
                match refresh().await {
                    Ok(RefreshOutcome::Replaced) => info!(
                        "Scheduled refresh replaced the catalog in {} ms",
                        started.elapsed().as_millis()
                    ),
                    Ok(RefreshOutcome::Unchanged) => debug!("Scheduled refresh: catalog unchanged"),
                    Err(err) => warn!("Scheduled refresh failed; retrying next tick: {}", err),
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!("Catalog refresh loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bliss_core::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn refreshes_immediately_then_on_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counter = Arc::clone(&calls);
        let handle = tokio::spawn(run_refresh_loop(
            Duration::from_secs(10),
            shutdown_rx,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(RefreshOutcome::Unchanged)
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counter = Arc::clone(&calls);
        let handle = tokio::spawn(run_refresh_loop(
            Duration::from_secs(60),
            shutdown_rx,
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(CatalogError::Fetch(FetchError::Status(503)))
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(150)).await;
        drop(shutdown_tx);
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
