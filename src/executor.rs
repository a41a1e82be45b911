//! Bounded-concurrency batch execution with per-task outcome capture.
//!
//! [`TaskExecutor::run`] drives one worker future per input, at most
//! `min(max_parallelism, inputs.len())` at a time, and returns an
//! [`OutcomeSet`] whose records line up index-for-index with the inputs.
//!
//! A failing or panicking worker only affects its own record. Results are
//! written into pre-sized slots by input index as they complete, so
//! completion order never leaks into the output.

use crate::error::{Error, Result};
use crate::query::RequestDescriptor;
use crate::records::{OutcomeRecord, OutcomeSet};
use crate::utils::panic_message;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// What a worker hands back for one input
#[derive(Debug)]
pub struct TaskOutcome<T> {
    /// Request the worker issued, if it got that far
    pub query: Option<RequestDescriptor>,
    /// Payload or failure
    pub result: Result<T>,
}

impl<T> TaskOutcome<T> {
    /// Outcome with an associated request
    pub fn new(query: RequestDescriptor, result: Result<T>) -> Self {
        Self {
            query: Some(query),
            result,
        }
    }

    /// Outcome of a task that never built a request
    pub fn without_query(result: Result<T>) -> Self {
        Self {
            query: None,
            result,
        }
    }
}

/// Runs a batch of independent tasks with bounded parallelism
#[derive(Clone, Debug)]
pub struct TaskExecutor {
    max_parallelism: usize,
}

impl TaskExecutor {
    /// Create an executor
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] if `max_parallelism` is zero.
    pub fn new(max_parallelism: usize) -> Result<Self> {
        if max_parallelism == 0 {
            return Err(Error::InvalidQuery(
                "max_parallelism must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_parallelism })
    }

    /// Upper bound on in-flight tasks
    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Run `worker` once per input and collect the outcomes in input order
    ///
    /// Never fails as a whole: every failure, including a worker panic, is
    /// recorded in the slot of the input that caused it.
    pub async fn run<I, T, F, Fut>(&self, inputs: Vec<I>, worker: F) -> OutcomeSet<I, T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = TaskOutcome<T>>,
    {
        let total = inputs.len();
        if total == 0 {
            return OutcomeSet::empty();
        }

        if total == 1 {
            let mut records = Vec::with_capacity(1);
            for input in inputs {
                records.push(run_one(&worker, input).await);
            }
            return OutcomeSet::from_records(records);
        }

        let workers = self.max_parallelism.min(total);
        tracing::debug!(tasks = total, workers, "Dispatching batch");

        let mut slots: Vec<Option<OutcomeRecord<I, T>>> = (0..total).map(|_| None).collect();
        let worker = &worker;
        let mut completed = stream::iter(inputs.into_iter().enumerate())
            .map(|(index, input)| async move { (index, run_one(worker, input).await) })
            .buffer_unordered(workers);

        while let Some((index, record)) = completed.next().await {
            slots[index] = Some(record);
        }

        let records: Vec<_> = slots.into_iter().flatten().collect();
        debug_assert_eq!(records.len(), total, "every input must have a record");

        let failed = records.iter().filter(|r| !r.ok()).count();
        if failed > 0 {
            tracing::warn!(tasks = total, failed, "Batch finished with failures");
        } else {
            tracing::debug!(tasks = total, "Batch finished");
        }

        OutcomeSet::from_records(records)
    }
}

async fn run_one<I, T, F, Fut>(worker: &F, input: I) -> OutcomeRecord<I, T>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = TaskOutcome<T>>,
{
    let task_input = input.clone();
    // The call itself sits inside the guarded future so a panic while building
    // the worker future is contained too
    let guarded = AssertUnwindSafe(async move { worker(task_input).await }).catch_unwind();

    match guarded.await {
        Ok(TaskOutcome { query, result }) => {
            if let Err(e) = &result {
                tracing::warn!(
                    error = %e,
                    query = ?query.as_ref().map(RequestDescriptor::url),
                    "Task failed"
                );
            }
            OutcomeRecord::new(input, query, result)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(panic = %message, "Task panicked");
            OutcomeRecord::new(input, None, Err(Error::TaskPanicked(message)))
        }
    }
}
