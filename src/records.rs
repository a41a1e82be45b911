//! Per-task outcome records and the ordered set the executor returns.
//!
//! An [`OutcomeSet`] holds exactly one [`OutcomeRecord`] per submitted input,
//! at the same position the input was submitted at. Failures are data here,
//! not control flow. Callers partition with [`OutcomeSet::succeeded`] and
//! [`OutcomeSet::failed`], or project a field across every record with
//! [`OutcomeSet::column`].

use crate::error::{Error, Result};
use crate::query::RequestDescriptor;

/// Outcome of one task
#[derive(Debug)]
pub struct OutcomeRecord<I, T> {
    input: I,
    query: Option<RequestDescriptor>,
    outcome: Result<T>,
}

impl<I, T> OutcomeRecord<I, T> {
    /// Build a record from a finished task
    pub fn new(input: I, query: Option<RequestDescriptor>, outcome: Result<T>) -> Self {
        Self {
            input,
            query,
            outcome,
        }
    }

    /// The input this record answers
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Request the task issued, when one was built
    pub fn query(&self) -> Option<&RequestDescriptor> {
        self.query.as_ref()
    }

    /// Payload on success
    pub fn content(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// Error on failure
    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// True if the task succeeded
    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Borrow the outcome
    pub fn outcome(&self) -> &Result<T> {
        &self.outcome
    }

    /// Take the outcome, dropping input and query
    pub fn into_result(self) -> Result<T> {
        self.outcome
    }

    /// Split into input, query, and outcome
    pub fn into_parts(self) -> (I, Option<RequestDescriptor>, Result<T>) {
        (self.input, self.query, self.outcome)
    }

    /// Human-readable status line, used in logs
    pub fn message(&self) -> String {
        match (&self.outcome, &self.query) {
            (Ok(_), Some(q)) => format!("OK {q}"),
            (Ok(_), None) => "OK".to_string(),
            (Err(e), Some(q)) => format!("FAILED {q}: {e}"),
            (Err(e), None) => format!("FAILED: {e}"),
        }
    }
}

/// Ordered outcomes of a batch, one per input
#[derive(Debug)]
pub struct OutcomeSet<I, T> {
    records: Vec<OutcomeRecord<I, T>>,
}

impl<I, T> OutcomeSet<I, T> {
    /// Wrap records that are already in input order
    pub fn from_records(records: Vec<OutcomeRecord<I, T>>) -> Self {
        Self { records }
    }

    /// An empty set
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Number of records (equals the number of inputs)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the batch had no inputs
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at input position `index`
    pub fn get(&self, index: usize) -> Option<&OutcomeRecord<I, T>> {
        self.records.get(index)
    }

    /// Records in input order
    pub fn iter(&self) -> std::slice::Iter<'_, OutcomeRecord<I, T>> {
        self.records.iter()
    }

    /// Successful records, in input order
    pub fn succeeded(&self) -> Vec<&OutcomeRecord<I, T>> {
        self.records.iter().filter(|r| r.ok()).collect()
    }

    /// Failed records, in input order
    pub fn failed(&self) -> Vec<&OutcomeRecord<I, T>> {
        self.records.iter().filter(|r| !r.ok()).collect()
    }

    /// Number of failed records
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| !r.ok()).count()
    }

    /// True if every task succeeded
    pub fn all_ok(&self) -> bool {
        self.records.iter().all(OutcomeRecord::ok)
    }

    /// Successful payloads only, in input order
    pub fn results(&self) -> Vec<&T> {
        self.records.iter().filter_map(OutcomeRecord::content).collect()
    }

    /// Project one field across every record, in input order
    ///
    /// ```
    /// use helios_client::records::{OutcomeRecord, OutcomeSet};
    ///
    /// let set = OutcomeSet::from_records(vec![
    ///     OutcomeRecord::new("a", None, Ok(1)),
    ///     OutcomeRecord::new("b", None, Ok(2)),
    /// ]);
    /// assert_eq!(set.column(|r| *r.input()), vec!["a", "b"]);
    /// ```
    pub fn column<'a, U, F>(&'a self, f: F) -> Vec<U>
    where
        F: FnMut(&'a OutcomeRecord<I, T>) -> U,
    {
        self.records.iter().map(f).collect()
    }

    /// Every input, in order
    pub fn inputs(&self) -> Vec<&I> {
        self.column(OutcomeRecord::input)
    }

    /// Every issued request, in order
    pub fn queries(&self) -> Vec<Option<&RequestDescriptor>> {
        self.column(OutcomeRecord::query)
    }

    /// Every payload, `None` where the task failed
    pub fn contents(&self) -> Vec<Option<&T>> {
        self.column(OutcomeRecord::content)
    }

    /// Every error, `None` where the task succeeded
    pub fn errors(&self) -> Vec<Option<&Error>> {
        self.column(OutcomeRecord::error)
    }

    /// Consume the set into its records
    pub fn into_records(self) -> Vec<OutcomeRecord<I, T>> {
        self.records
    }
}

impl<I, T> Default for OutcomeSet<I, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<I, T> IntoIterator for OutcomeSet<I, T> {
    type Item = OutcomeRecord<I, T>;
    type IntoIter = std::vec::IntoIter<OutcomeRecord<I, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, I, T> IntoIterator for &'a OutcomeSet<I, T> {
    type Item = &'a OutcomeRecord<I, T>;
    type IntoIter = std::slice::Iter<'a, OutcomeRecord<I, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
