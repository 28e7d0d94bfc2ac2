//! Running several tasks at once.
//!
//! Every task in a batch is submitted to the background runtime before any
//! result is awaited, so they run concurrently. Results are always returned
//! in the order the tasks were given, whatever order they finish in.

use futures_util::StreamExt;
use futures_util::future::join_all;
use futures_util::stream::FuturesUnordered;
use netask_core::AsyncRuntime;
use netask_core::logging::targets;

use super::Task;
use crate::error::{BatchError, Result, TaskError};

/// Run every task and collect their outputs, failing on the first error.
///
/// Returns as soon as any task fails, without waiting for the rest. The
/// remaining tasks keep running in the background.
pub async fn await_all<T: Task>(tasks: &[T]) -> std::result::Result<Vec<T::Output>, BatchError> {
    let mut pending: FuturesUnordered<_> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let handle = task.spawn();
            async move { (index, handle.wait().await.unwrap_or(Err(TaskError::Unknown))) }
        })
        .collect();

    let mut outputs: Vec<Option<T::Output>> = std::iter::repeat_with(|| None).take(tasks.len()).collect();
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(output) => outputs[index] = Some(output),
            Err(source) => {
                tracing::debug!(target: targets::BATCH, index, size = tasks.len(), error = %source, "batch aborted");
                return Err(BatchError { index, source });
            }
        }
    }

    tracing::debug!(target: targets::BATCH, size = tasks.len(), "batch completed");
    Ok(outputs.into_iter().flatten().collect())
}

/// Run every task and collect each outcome, in task order.
pub async fn await_all_results<T: Task>(tasks: &[T]) -> Vec<Result<T::Output>> {
    let handles: Vec<_> = tasks.iter().map(|task| task.spawn()).collect();
    let results: Vec<_> = join_all(
        handles
            .into_iter()
            .map(|handle| async move { handle.wait().await.unwrap_or(Err(TaskError::Unknown)) }),
    )
    .await;

    let failed = results.iter().filter(|result| result.is_err()).count();
    tracing::debug!(target: targets::BATCH, size = tasks.len(), failed, "batch completed");
    results
}

/// Blocking form of [`await_all`].
///
/// # Panics
///
/// Panics when called from within an async context.
pub fn wait_all<T: Task>(tasks: &[T]) -> std::result::Result<Vec<T::Output>, BatchError> {
    AsyncRuntime::global().block_on(await_all(tasks))
}

/// Blocking form of [`await_all_results`].
///
/// # Panics
///
/// Panics when called from within an async context.
pub fn wait_all_results<T: Task>(tasks: &[T]) -> Vec<Result<T::Output>> {
    AsyncRuntime::global().block_on(await_all_results(tasks))
}
