//! Resource-level operations.
//!
//! A [`Resource`] binds a [`Session`] to one [`ResourceKind`] and exposes the
//! operations callers actually use:
//! - [`Resource::index`] and [`Resource::index_pages`] for paginated queries
//! - [`Resource::show`] for batches of single-item lookups
//! - [`Resource::preview`] and [`Resource::show_image`] for media batches
//! - [`Resource::image_times`] for a camera's media cache listing
//! - collection listings and writes, from [`Resource::collection_images`] to
//!   [`Resource::copy_collection`]
//!
//! All of them are thin: they build requests with [`QueryBuilder`] and hand
//! the work to [`TaskExecutor`].

mod collections;
mod images;
mod index;
mod media;

pub use collections::{
    CollectionFields, CopiedCollection, ImageAsset, ImageNameFilter, MAX_COLLECTION_PAGE,
};
pub use images::{ImageTimesOptions, MAX_IMAGE_TIMES};
pub use index::{IndexOptions, IndexPages};
pub use media::{MediaContent, MediaOptions};

use crate::error::{Error, Result};
use crate::executor::{TaskExecutor, TaskOutcome};
use crate::query::{Filter, QueryBuilder};
use crate::records::OutcomeSet;
use crate::session::Session;
use crate::types::ResourceKind;
use serde_json::Value;

/// One API resource family, bound to a session
#[derive(Clone, Debug)]
pub struct Resource {
    session: Session,
    kind: ResourceKind,
    builder: QueryBuilder,
    executor: TaskExecutor,
}

impl Resource {
    /// Bind `kind` to `session`; the session's connection pool is shared
    ///
    /// # Errors
    /// Only if the session's `max_concurrency` is zero, which
    /// [`Session::new`] already rejects.
    pub fn new(session: &Session, kind: ResourceKind) -> Result<Self> {
        Ok(Self {
            builder: QueryBuilder::new(session.api_url(), kind.path_segment()),
            executor: session.executor()?,
            session: session.clone(),
            kind,
        })
    }

    /// Override the per-batch parallelism ceiling for this resource
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Result<Self> {
        self.executor = TaskExecutor::new(max_parallelism)?;
        Ok(self)
    }

    fn require_kind(&self, kind: ResourceKind, operation: &str) -> Result<()> {
        if self.kind != kind {
            return Err(Error::InvalidQuery(format!(
                "{operation} is only available on {kind}, not {}",
                self.kind
            )));
        }
        Ok(())
    }

    /// Which resource this is
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Executor used for this resource's batches
    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Fetch one item per ID, in ID order
    ///
    /// Each lookup succeeds or fails on its own; the call itself never fails.
    pub async fn show<S>(&self, ids: Vec<S>, filter: &Filter) -> OutcomeSet<String, Value>
    where
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        tracing::debug!(resource = %self.kind, count = ids.len(), "Fetching items");

        self.executor
            .run(ids, |id| {
                let request = self.builder.show(&id, filter);
                async move {
                    let result = self.session.get_json(&request.url()).await;
                    TaskOutcome::new(request, result)
                }
            })
            .await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
