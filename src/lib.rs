//! # helios-client
//!
//! Client library for the Helios geospatial data API.
//!
//! ## Design Philosophy
//!
//! helios-client is designed to be:
//! - **Partial-failure tolerant** - One failed request never aborts its siblings
//! - **Order preserving** - Batch results line up with their inputs, whatever order they finish in
//! - **Bounded** - Concurrency per batch is capped and configurable
//! - **Library-first** - No CLI or UI, and no logging subscriber is installed
//!
//! ## Quick Start
//!
//! ```no_run
//! use helios_client::{AuthHeader, Config, Filter, IndexOptions, Resource, ResourceKind, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(Config::from_env()?, Some(AuthHeader::bearer("token")))?;
//!     let alerts = Resource::new(&session, ResourceKind::Alerts)?;
//!
//!     let filter = Filter::new().with("state", "Maryland")?;
//!     let collection = alerts.index(&filter, IndexOptions::default()).await?;
//!     if let Some(t) = collection.truncation {
//!         eprintln!("only {} of {} alerts are reachable", t.max_skip, t.declared_total);
//!     }
//!
//!     let observations = Resource::new(&session, ResourceKind::Observations)?;
//!     let previews = observations
//!         .preview(vec!["obs-1", "obs-2"], &Default::default())
//!         .await?;
//!     for failed in previews.failed() {
//!         eprintln!("{}", failed.message());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Page decoding and merging
pub mod aggregate;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Bounded-concurrency batch execution
pub mod executor;
/// Page windowing for index queries
pub mod pagination;
/// Request construction
pub mod query;
/// Per-task outcome records
pub mod records;
/// Resource-level operations
pub mod resource;
/// Retry logic with exponential backoff
pub mod retry;
/// Shared HTTP session
pub mod session;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use aggregate::{Collection, PageShape, PageView, ResultAggregator, Truncation};
pub use config::{Config, PaginationConfig, RetryConfig};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{TaskExecutor, TaskOutcome};
pub use pagination::{PageWindower, PaginationPlan, PaginationState};
pub use query::{Filter, FilterValue, QueryBuilder, RequestDescriptor, Scalar, Window};
pub use records::{OutcomeRecord, OutcomeSet};
pub use resource::{
    CollectionFields, CopiedCollection, ImageAsset, ImageNameFilter, ImageTimesOptions,
    IndexOptions, IndexPages, MediaContent, MediaOptions, Resource,
};
pub use session::{AuthHeader, Session};
pub use types::{MediaRoute, ResourceKind};
