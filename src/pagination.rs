//! Page windowing for index queries.
//!
//! The total size of a result set is only known after the first page comes
//! back, so windowing happens in two steps:
//!
//! 1. [`PageWindower::first_window`] hands out `[skip0, limit)`, which the
//!    caller fetches on its own.
//! 2. [`PageWindower::size`] takes the declared total and the number of items
//!    the first page actually held, and returns the remaining windows.
//!
//! Windows are contiguous, strictly increasing in `skip`, and never reach past
//! `min(total, max_skip)`. A declared total above `max_skip` yields a
//! [`Truncation`] signal rather than an error.

use crate::aggregate::Truncation;
use crate::error::{Error, Result};
use crate::query::Window;

/// Lifecycle of one paginated query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationState {
    /// Parameters accepted, nothing requested yet
    Init,
    /// First window handed out, waiting for its total
    FirstPagePending,
    /// Total known, remaining windows computed
    SizingKnown,
    /// Remaining windows dispatched
    FetchingRest,
    /// All pages merged
    Done,
}

/// Outcome of sizing a query from its first page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationPlan {
    /// Total declared by the server on the first page
    pub total: u64,
    /// Set when `total` exceeds the skip ceiling
    pub truncation: Option<Truncation>,
    /// Windows still to fetch, in ascending `skip` order
    pub windows: Vec<Window>,
}

impl PaginationPlan {
    /// True when the first page was the whole result
    pub fn is_single_page(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Enumerates the windows a paginated query needs
#[derive(Debug)]
pub struct PageWindower {
    skip: u64,
    limit: u64,
    max_skip: u64,
    state: PaginationState,
}

impl PageWindower {
    /// Validate the starting offset, page size, and ceiling
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] if `limit` is zero or `skip` is not below `max_skip`.
    pub fn new(skip: u64, limit: u64, max_skip: u64) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidQuery("limit must be at least 1".to_string()));
        }
        if skip >= max_skip {
            return Err(Error::InvalidQuery(format!(
                "skip must be less than the maximum skip value of {max_skip}; {skip} was tried"
            )));
        }
        Ok(Self {
            skip,
            limit,
            max_skip,
            state: PaginationState::Init,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Page size in use
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The window that must be fetched before anything else can be sized
    pub fn first_window(&mut self) -> Window {
        self.advance(PaginationState::FirstPagePending);
        self.clipped(self.skip, self.max_skip)
    }

    /// Compute the remaining windows from the first page's declared total
    ///
    /// `first_page_len` is how many items the first page actually held. A
    /// short first page means there is nothing more to fetch, whatever the
    /// declared total says.
    pub fn size(&mut self, total: u64, first_page_len: usize) -> PaginationPlan {
        self.advance(PaginationState::SizingKnown);

        let truncation = (total > self.max_skip).then(|| Truncation {
            declared_total: total,
            max_skip: self.max_skip,
        });

        let first = self.clipped(self.skip, self.max_skip);
        if (first_page_len as u64) < first.limit() {
            return PaginationPlan {
                total,
                truncation,
                windows: Vec::new(),
            };
        }

        // ceil((total - skip0) / limit) - 1 more pages, clipped to what exists
        // and to what the service lets us reach
        let pages_needed = total.saturating_sub(self.skip).div_ceil(self.limit);
        let ceiling = total.min(self.max_skip);
        let windows = (1..pages_needed)
            .map(|i| self.skip + i * self.limit)
            .take_while(|&start| start < ceiling)
            .map(|start| self.clipped(start, ceiling))
            .collect();

        PaginationPlan {
            total,
            truncation,
            windows,
        }
    }

    /// Mark the remaining windows as dispatched
    pub fn begin_fetch(&mut self) {
        self.advance(PaginationState::FetchingRest);
    }

    /// Mark the query as complete
    pub fn finish(&mut self) {
        self.advance(PaginationState::Done);
    }

    fn clipped(&self, start: u64, ceiling: u64) -> Window {
        Window::bounded(start, self.limit.min(ceiling.saturating_sub(start)))
    }

    fn advance(&mut self, next: PaginationState) {
        tracing::debug!(from = ?self.state, to = ?next, skip = self.skip, "Pagination state change");
        self.state = next;
    }
}
