// src/pipeline/fan_out.rs

//! Bounded, order-preserving fan-out of independent tasks.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, StreamExt};
use tokio::task::{JoinError, JoinHandle};

use crate::error::{AppError, Result};

/// Run `task_fn` over every task with at most `concurrency` tasks in flight.
///
/// Each task runs on its own Tokio task, so a panic only fails its own slot.
/// Outcomes are returned in the order of `tasks`, not in completion order.
/// Dropping the returned future aborts every task still in flight.
pub async fn fan_out<T, R, F, Fut>(tasks: Vec<T>, concurrency: usize, task_fn: F) -> Vec<Result<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    if tasks.is_empty() {
        return Vec::new();
    }
    let workers = concurrency.clamp(1, tasks.len());

    stream::iter(tasks)
        .map(|task| {
            let handle = AbortOnDrop(tokio::spawn(task_fn(task)));
            async move { handle.await.map_err(AppError::from).and_then(|outcome| outcome) }
        })
        .buffered(workers)
        .collect()
        .await
}

/// Join handle that aborts its task when dropped unfinished.
struct AbortOnDrop<R>(JoinHandle<R>);

impl<R> Future for AbortOnDrop<R> {
    type Output = std::result::Result<R, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<R> Drop for AbortOnDrop<R> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Concatenate successful per-task lists in order.
///
/// Failed tasks contribute nothing; each failure is logged and counted.
pub fn flatten_outcomes<T>(stage: &str, outcomes: Vec<Result<Vec<T>>>) -> (Vec<T>, usize) {
    let mut items = Vec::new();
    let mut failures = 0;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(batch) => items.extend(batch),
            Err(error) => {
                failures += 1;
                if error.is_task_level() {
                    log::warn!("{} task #{} skipped: {}", stage, index + 1, error);
                } else {
                    log::error!("{} task #{} failed: {}", stage, index + 1, error);
                }
            }
        }
    }

    (items, failures)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_order_matches_input_under_scrambled_delays() {
        let delays_ms: Vec<u64> = (0..24u64).map(|i| (i * 37 + 11) % 29).collect();
        let tasks: Vec<(usize, u64)> = delays_ms.iter().copied().enumerate().collect();

        let outcomes = fan_out(tasks, 6, |(index, delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, AppError>(index)
        })
        .await;

        let indices: Vec<usize> = outcomes.into_iter().map(|o| o.unwrap()).collect();
        assert_eq!(indices, (0..24).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_order_matches_input_when_last_finishes_first() {
        let tasks: Vec<u64> = (0..8).collect();

        let outcomes = fan_out(tasks, 8, |n| async move {
            tokio::time::sleep(Duration::from_millis((8 - n) * 10)).await;
            Ok::<_, AppError>(vec![format!("task-{n}")])
        })
        .await;

        let (items, failures) = flatten_outcomes("test", outcomes);
        assert_eq!(failures, 0);
        assert_eq!(
            items,
            (0..8).map(|n| format!("task-{n}")).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_in_flight_bounded_by_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcomes = fan_out((0..20).collect::<Vec<u32>>(), 3, |n| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, AppError>(n)
            }
        })
        .await;

        assert_eq!(outcomes.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_empty_task_list_dispatches_nothing() {
        let calls = AtomicUsize::new(0);
        let outcomes = fan_out(Vec::<u32>::new(), 4, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, AppError>(n) }
        })
        .await;

        assert!(outcomes.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_task() {
        let outcomes = fan_out(vec![1u32, 2, 3, 4], 2, |n| async move {
            match n {
                2 => Err(AppError::fetch(format!("https://example.com/{n}"), "refused")),
                3 => panic!("extractor blew up"),
                _ => Ok(vec![n * 10, n * 10 + 1]),
            }
        })
        .await;

        assert!(matches!(outcomes[1], Err(AppError::Fetch { .. })));
        assert!(matches!(outcomes[2], Err(AppError::Task(_))));

        let (items, failures) = flatten_outcomes("test", outcomes);
        assert_eq!(items, vec![10, 11, 40, 41]);
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn test_dropping_stage_aborts_in_flight_tasks() {
        let finished = Arc::new(AtomicBool::new(false));

        let stage = fan_out(vec![0u32, 1, 2], 3, |n| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.store(true, Ordering::SeqCst);
                Ok::<_, AppError>(n)
            }
        });
        let cancelled = tokio::time::timeout(Duration::from_millis(20), stage).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
