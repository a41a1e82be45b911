//! Page decoding and merging.
//!
//! The service answers index queries in one of two shapes: GeoJSON
//! (`features`) or a generic collection (`results`). The declared `total`
//! sits either at the top level or under `properties`. [`PageShape`] hides
//! both differences behind a uniform [`PageView`].

use crate::error::{Error, Result};
use serde_json::{Map, Value, json};

/// Which list key a resource normally answers with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageShape {
    /// GeoJSON `{"type": "FeatureCollection", "features": [...]}`
    Features,
    /// Generic `{"total": n, "results": [...]}`
    Results,
}

impl PageShape {
    /// Preferred list key
    pub fn key(self) -> &'static str {
        match self {
            PageShape::Features => "features",
            PageShape::Results => "results",
        }
    }

    fn alternate(self) -> PageShape {
        match self {
            PageShape::Features => PageShape::Results,
            PageShape::Results => PageShape::Features,
        }
    }

    /// Decode one page
    ///
    /// The list is looked up under the preferred key first, then under the
    /// other shape's key. A missing `total` is not an error here; only the
    /// first page of a query needs one.
    pub fn parse(self, body: Value, url: &str) -> Result<PageView> {
        let Value::Object(mut object) = body else {
            return Err(malformed(url, "response body is not a JSON object"));
        };

        let total = declared_total(&object);
        let items = match take_list(&mut object, self.key())
            .or_else(|| take_list(&mut object, self.alternate().key()))
        {
            Some(items) => items,
            None => {
                return Err(malformed(
                    url,
                    &format!("neither '{}' nor '{}' is a list", self.key(), self.alternate().key()),
                ));
            }
        };

        Ok(PageView { total, items })
    }
}

fn malformed(url: &str, reason: &str) -> Error {
    Error::MalformedPage {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn declared_total(object: &Map<String, Value>) -> Option<u64> {
    object
        .get("properties")
        .and_then(|p| p.get("total"))
        .and_then(Value::as_u64)
        .or_else(|| object.get("total").and_then(Value::as_u64))
}

fn take_list(object: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match object.remove(key) {
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            object.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Uniform view of one decoded page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageView {
    /// Total declared by the server, if the page carried one
    pub total: Option<u64>,
    /// Items on this page, in server order
    pub items: Vec<Value>,
}

impl PageView {
    /// Number of items on the page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the page held no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The server declared more results than `max_skip` lets anyone retrieve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncation {
    /// Total the server declared
    pub declared_total: u64,
    /// Skip ceiling that capped retrieval
    pub max_skip: u64,
}

impl Truncation {
    /// Items the server has but no query window can reach
    pub fn unreachable(&self) -> u64 {
        self.declared_total.saturating_sub(self.max_skip)
    }
}

/// Merged result of a paginated query
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    /// Items from every page, in ascending-skip order
    pub items: Vec<Value>,
    /// Total declared by the first page
    pub total: u64,
    /// Present when the result is incomplete because of the skip ceiling
    pub truncation: Option<Truncation>,
    /// Number of pages merged
    pub pages: usize,
}

impl Collection {
    /// Number of merged items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no items were retrieved
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True if the server-side cap kept some results out of reach
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Concatenate several collections of the same resource, in argument order
    ///
    /// Totals and page counts add up. The first truncation signal, if any, is kept.
    pub fn concat<C>(collections: C) -> Collection
    where
        C: IntoIterator<Item = Collection>,
    {
        collections.into_iter().fold(
            Collection {
                items: Vec::new(),
                total: 0,
                truncation: None,
                pages: 0,
            },
            |mut acc, next| {
                acc.items.extend(next.items);
                acc.total += next.total;
                acc.pages += next.pages;
                acc.truncation = acc.truncation.or(next.truncation);
                acc
            },
        )
    }

    /// Render back into the response shape the service would have used
    pub fn to_json(&self, shape: PageShape) -> Value {
        match shape {
            PageShape::Features => json!({
                "type": "FeatureCollection",
                "features": self.items,
                "properties": { "total": self.total },
            }),
            PageShape::Results => json!({
                "total": self.total,
                "results": self.items,
            }),
        }
    }
}

/// Concatenates ordered pages into one [`Collection`]
#[derive(Debug)]
pub struct ResultAggregator {
    total: u64,
    truncation: Option<Truncation>,
}

impl ResultAggregator {
    /// Aggregator for a query sized at `total`
    pub fn new(total: u64, truncation: Option<Truncation>) -> Self {
        Self { total, truncation }
    }

    /// Concatenate page payloads in the order given
    ///
    /// Pages must already be in window order. Nothing is deduplicated; pages
    /// that overlap because the dataset changed between fetches are kept as-is.
    pub fn merge<P>(&self, pages: P) -> Collection
    where
        P: IntoIterator<Item = PageView>,
    {
        let mut items = Vec::new();
        let mut count = 0;
        for page in pages {
            if let Some(declared) = page.total
                && declared != self.total
            {
                tracing::debug!(
                    sized_at = self.total,
                    declared,
                    page = count,
                    "Declared total changed during pagination"
                );
            }
            items.extend(page.items);
            count += 1;
        }

        if let Some(t) = &self.truncation {
            tracing::warn!(
                declared_total = t.declared_total,
                max_skip = t.max_skip,
                retrieved = items.len(),
                "Result set truncated by skip ceiling"
            );
        }

        Collection {
            items,
            total: self.total,
            truncation: self.truncation,
            pages: count,
        }
    }
}
