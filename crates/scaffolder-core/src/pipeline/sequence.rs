//! Async iteration combinators used by the pipeline stages
//!
//! - [`sequence`] runs steps strictly one after another, threading a state value
//!   through them; a step that never completes stalls the whole sequence.
//! - [`fan_out`] starts every step at once and interleaves them on the current
//!   task; the first failure cancels the rest.
//!
//! Both accept a [`CancellationToken`] so a hosting process can abort a run that
//! is stuck waiting on a step.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SequenceError<E> {
    #[error("step {index} failed: {error}")]
    Step { index: usize, error: E },

    #[error("cancelled before step {index} finished")]
    Cancelled { index: usize },
}

#[derive(Debug, Error)]
pub enum FanOutError<E> {
    /// Item `index` failed. `completed` holds the items that had already
    /// succeeded when the failure was observed.
    #[error("item {index} failed: {error}")]
    Failed {
        index: usize,
        error: E,
        completed: Vec<usize>,
    },

    #[error("cancelled with {} item(s) completed", completed.len())]
    Cancelled { completed: Vec<usize> },
}

/// Run `step` over `items` in order, passing the state returned by each step
/// into the next one. Item `i + 1` never starts before item `i` has finished.
pub async fn sequence<I, S, F, Fut, E>(
    items: I,
    init: S,
    cancel: &CancellationToken,
    mut step: F,
) -> Result<S, SequenceError<E>>
where
    I: IntoIterator,
    F: FnMut(S, I::Item) -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    let mut state = init;

    for (index, item) in items.into_iter().enumerate() {
        state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SequenceError::Cancelled { index }),
            outcome = step(state, item) => {
                outcome.map_err(|error| SequenceError::Step { index, error })?
            }
        };
    }

    Ok(state)
}

/// Run `handler` for every item concurrently and collect the outputs in item
/// order once all of them have succeeded.
///
/// The first error wins: outstanding futures are dropped and the error reports
/// which items had already completed.
pub async fn fan_out<I, F, Fut, T, E>(
    items: I,
    cancel: &CancellationToken,
    mut handler: F,
) -> Result<Vec<T>, FanOutError<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let future = handler(item);
            async move { (index, future.await) }
        })
        .collect();

    let mut outputs: Vec<Option<T>> = (0..pending.len()).map(|_| None).collect();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FanOutError::Cancelled {
                    completed: completed_indices(&outputs),
                });
            }
            next = pending.next() => next,
        };

        match next {
            Some((index, Ok(value))) => outputs[index] = Some(value),
            Some((index, Err(error))) => {
                return Err(FanOutError::Failed {
                    index,
                    error,
                    completed: completed_indices(&outputs),
                });
            }
            None => break,
        }
    }

    Ok(outputs.into_iter().flatten().collect())
}

fn completed_indices<T>(outputs: &[Option<T>]) -> Vec<usize> {
    outputs
        .iter()
        .enumerate()
        .filter_map(|(index, output)| output.as_ref().map(|_| index))
        .collect()
}
