use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Runs `job` over `items` with at most `max_concurrent` jobs in flight.
///
/// Each job returns its own output and only this function collects them, so no shared
/// container is needed. `on_done` is called from the collecting task as outputs arrive.
/// The result is in input order; a job that panicked is logged and has no entry.
pub async fn run_bounded<I, O, F, Fut, D>(
    items: Vec<I>,
    max_concurrent: usize,
    job: F,
    mut on_done: D,
) -> Vec<(usize, O)>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    D: FnMut(&O),
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let job = Arc::new(job);
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = Arc::clone(&job);
        set.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            (index, job(item).await)
        });
    }

    let mut outputs = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, output)) => {
                on_done(&output);
                outputs.push((index, output));
            }
            Err(e) => error!("worker task failed: {}", e),
        }
    }

    outputs.sort_by_key(|(index, _)| *index);
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            run_bounded(
                (0..20).collect(),
                3,
                move |n: u64| {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10 * (20 - n))).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        n * 2
                    }
                },
                |_| {},
            )
            .await
        };

        assert_eq!(outputs.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        // input order regardless of completion order
        assert_eq!(outputs[5], (5, 10));
    }

    #[tokio::test]
    async fn test_panicking_job_is_dropped() {
        let mut done = 0;
        let outputs = run_bounded(
            vec![1, 2, 3],
            2,
            |n: i32| async move {
                if n == 2 {
                    panic!("boom");
                }
                n
            },
            |_| done += 1,
        )
        .await;

        assert_eq!(outputs, vec![(0, 1), (2, 3)]);
        assert_eq!(done, 2);
    }
}
