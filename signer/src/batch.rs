//! Concurrent batch execution.
//!
//! Downloads and uploads run one scoped thread per member. Every member runs
//! to completion before outcomes are inspected, so a failing member never
//! leaves a sibling half-finished.

use crate::error::{Result, SignerError};
use log::{debug, warn};
use std::thread;

/// Run `op` on every item concurrently and collect the results in item order.
///
/// # Errors
///
/// Returns the member's own error if exactly one member fails, and
/// [`SignerError::BatchFailed`] listing every failure if several do. A
/// worker that panics is reported as [`SignerError::WorkerPanicked`].
pub fn run_batch<T, R, F>(stage: &'static str, items: &[T], op: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    debug!("starting {stage} batch of {}", items.len());
    let outcomes = thread::scope(|scope| {
        let op = &op;
        let handles: Vec<_> = items
            .iter()
            .map(|item| scope.spawn(move || op(item)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(SignerError::WorkerPanicked { stage }))
            })
            .collect::<Vec<_>>()
    });
    collect_outcomes(stage, outcomes)
}

/// Fold per-member outcomes into a single result.
///
/// # Errors
///
/// See [`run_batch`].
pub fn collect_outcomes<R>(stage: &'static str, outcomes: Vec<Result<R>>) -> Result<Vec<R>> {
    let total = outcomes.len();
    let mut successes = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => successes.push(value),
            Err(err) => {
                warn!("{stage} member failed: {err}");
                failures.push(err);
            }
        }
    }

    let mut failures = failures.into_iter();
    match (failures.next(), failures.next()) {
        (None, _) => Ok(successes),
        (Some(only), None) => Err(only),
        (Some(first), Some(second)) => Err(SignerError::BatchFailed {
            stage,
            total,
            failures: [first, second].into_iter().chain(failures).collect(),
        }),
    }
}
