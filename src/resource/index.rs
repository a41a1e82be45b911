//! Paginated index queries.

use super::Resource;
use crate::aggregate::{Collection, PageView, ResultAggregator, Truncation};
use crate::error::{Error, Result};
use crate::executor::TaskOutcome;
use crate::pagination::{PageWindower, PaginationPlan};
use crate::query::{Filter, Window};
use crate::records::OutcomeSet;

/// Per-call pagination options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Offset of the first item (default 0)
    pub skip: u64,
    /// Page size; `None` uses the configured default
    pub limit: Option<u64>,
}

impl IndexOptions {
    /// Start at `skip`
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Use pages of `limit` items
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Pages of an index query, before merging
///
/// The first page is always present; a query that cannot fetch it fails as a
/// whole. Later pages carry their own outcome.
#[derive(Debug)]
pub struct IndexPages {
    /// First page, used for sizing
    pub first: PageView,
    /// Remaining pages, in window order
    pub rest: OutcomeSet<Window, PageView>,
    /// Total declared by the first page
    pub total: u64,
    /// Set when the declared total exceeds the skip ceiling
    pub truncation: Option<Truncation>,
}

impl IndexPages {
    /// Requests issued, first page included
    pub fn request_count(&self) -> usize {
        1 + self.rest.len()
    }

    /// Windows whose fetch failed
    pub fn failed_windows(&self) -> Vec<Window> {
        self.rest.failed().into_iter().map(|r| *r.input()).collect()
    }

    /// Merge every page, failing on the first failed window
    ///
    /// # Errors
    /// [`Error::PageFailed`] naming the lowest failed offset.
    pub fn merge(self) -> Result<Collection> {
        let aggregator = ResultAggregator::new(self.total, self.truncation);
        let mut pages = Vec::with_capacity(self.request_count());
        pages.push(self.first);

        for record in self.rest {
            let (window, _, outcome) = record.into_parts();
            match outcome {
                Ok(page) => pages.push(page),
                Err(e) => {
                    return Err(Error::PageFailed {
                        skip: window.skip(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(aggregator.merge(pages))
    }

    /// Merge whatever pages succeeded and hand back the failures
    ///
    /// The merged collection has gaps where pages failed.
    pub fn merge_partial(self) -> (Collection, Vec<(Window, Error)>) {
        let aggregator = ResultAggregator::new(self.total, self.truncation);
        let mut pages = vec![self.first];
        let mut failures = Vec::new();

        for record in self.rest {
            let (window, _, outcome) = record.into_parts();
            match outcome {
                Ok(page) => pages.push(page),
                Err(e) => failures.push((window, e)),
            }
        }

        if !failures.is_empty() {
            tracing::warn!(failed_pages = failures.len(), "Merging index with missing pages");
        }
        (aggregator.merge(pages), failures)
    }
}

impl Resource {
    /// Fetch and merge every page matching `filter`
    ///
    /// Any page failure fails the whole call, since a collection with a hole
    /// in it is indistinguishable from a smaller result set. Use
    /// [`Resource::index_pages`] to accept partial results instead.
    ///
    /// # Errors
    /// - [`Error::InvalidQuery`] for bad pagination options
    /// - [`Error::Sizing`] if the first page cannot be fetched or decoded
    /// - [`Error::PageFailed`] if any later page fails
    pub async fn index(&self, filter: &Filter, options: IndexOptions) -> Result<Collection> {
        self.index_pages(filter, options).await?.merge()
    }

    /// Fetch every page matching `filter`, keeping per-page outcomes
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] or [`Error::Sizing`], as for [`Resource::index`].
    pub async fn index_pages(&self, filter: &Filter, options: IndexOptions) -> Result<IndexPages> {
        let limit = self.page_limit(options)?;
        let max_skip = self.session.config().pagination.max_skip;
        let mut windower = PageWindower::new(options.skip, limit, max_skip)?;

        let (first, plan) = self.size_query(&mut windower, filter).await?;

        let rest = if plan.is_single_page() {
            OutcomeSet::empty()
        } else {
            windower.begin_fetch();
            self.executor
                .run(plan.windows, |window| {
                    let request = self.builder.index(filter, window);
                    async move {
                        let result = self.fetch_page(&request.url()).await;
                        TaskOutcome::new(request, result)
                    }
                })
                .await
        };
        windower.finish();

        Ok(IndexPages {
            first,
            rest,
            total: plan.total,
            truncation: plan.truncation,
        })
    }

    fn page_limit(&self, options: IndexOptions) -> Result<u64> {
        let pagination = &self.session.config().pagination;
        let limit = options.limit.unwrap_or(pagination.default_limit);
        if limit == 0 || limit > pagination.max_limit {
            return Err(Error::InvalidQuery(format!(
                "limit must be between 1 and {}; {limit} was tried",
                pagination.max_limit
            )));
        }
        Ok(limit)
    }

    async fn size_query(
        &self,
        windower: &mut PageWindower,
        filter: &Filter,
    ) -> Result<(PageView, PaginationPlan)> {
        let url = self.builder.index(filter, windower.first_window()).url();
        let sizing = |source: Error| Error::Sizing {
            query: url.clone(),
            source: Box::new(source),
        };

        let first = self.fetch_page(&url).await.map_err(sizing)?;
        let total = first.total.ok_or_else(|| {
            sizing(Error::MalformedPage {
                url: url.clone(),
                reason: "first page declares no total".to_string(),
            })
        })?;

        let plan = windower.size(total, first.len());
        if let Some(t) = &plan.truncation {
            tracing::warn!(
                resource = %self.kind,
                declared_total = t.declared_total,
                max_skip = t.max_skip,
                "Query matches more results than can be retrieved"
            );
        }
        tracing::info!(
            resource = %self.kind,
            total,
            requests = plan.windows.len() + 1,
            "Sized index query"
        );

        Ok((first, plan))
    }

    async fn fetch_page(&self, url: &str) -> Result<PageView> {
        let body = self.session.get_json(url).await?;
        self.kind.page_shape().parse(body, url)
    }
}
