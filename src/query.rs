//! Request construction: filters, windows, and request descriptors.
//!
//! Filters are opaque to the engine. Keys are whatever the caller passes and
//! values are serialized without interpretation:
//! - scalars as `key=value` (booleans lowercase)
//! - sequences as `key=v1,v2,v3`
//! - raw fragments verbatim (for pre-encoded expressions such as
//!   `sensors[visibility][min]=0&sensors[visibility][max]=1`)
//!
//! Entries are joined with `&` in insertion order. Duplicate keys are rejected
//! up front, as are `skip` and `limit`, which belong to [`Window`].

use crate::error::{Error, Result};
use crate::types::MediaRoute;
use reqwest::Method;
use std::fmt;

/// Query parameter names owned by the pagination windows
const RESERVED_KEYS: [&str; 2] = ["skip", "limit"];

/// A single filter value
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Text value
    Str(String),
    /// Integer value
    Int(i64),
    /// Floating point value (coordinates, thresholds)
    Float(f64),
    /// Boolean value, serialized as `true`/`false`
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Value side of a filter entry
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    /// `key=value`
    Scalar(Scalar),
    /// `key=v1,v2,...`
    List(Vec<Scalar>),
}

macro_rules! filter_value_from {
    ($($t:ty),*) => {$(
        impl From<$t> for FilterValue {
            fn from(value: $t) -> Self {
                FilterValue::Scalar(value.into())
            }
        }

        impl From<Vec<$t>> for FilterValue {
            fn from(values: Vec<$t>) -> Self {
                FilterValue::List(values.into_iter().map(Into::into).collect())
            }
        }

        impl<const N: usize> From<[$t; N]> for FilterValue {
            fn from(values: [$t; N]) -> Self {
                FilterValue::List(values.into_iter().map(Into::into).collect())
            }
        }
    )*};
}

filter_value_from!(&str, String, i64, i32, u32, f64, bool);

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

/// Ordered mapping of filter keys to values
///
/// ```
/// use helios_client::query::Filter;
///
/// # fn main() -> helios_client::Result<()> {
/// let filter = Filter::new()
///     .with("state", "Maryland")?
///     .with("bbox", [-169.352, 1.137, -1.690, 64.008])?;
/// assert_eq!(filter.serialize(), "state=Maryland&bbox=-169.352,1.137,-1.69,64.008");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, FilterValue)>,
    raw: Vec<String>,
}

impl Filter {
    /// Empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, rejecting duplicate and reserved keys
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidQuery("filter key must not be empty".to_string()));
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(Error::InvalidQuery(format!(
                "'{key}' is controlled by pagination options, not the filter"
            )));
        }
        if self.contains_key(&key) {
            return Err(Error::InvalidQuery(format!("duplicate filter key '{key}'")));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Builder form of [`Filter::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Append a pre-encoded query fragment, passed through verbatim
    pub fn raw(mut self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        let fragment = fragment.trim_matches('&');
        if !fragment.is_empty() {
            self.raw.push(fragment.to_string());
        }
        self
    }

    /// Whether `key` is already present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// True if there are neither entries nor raw fragments
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.raw.is_empty()
    }

    /// Serialize to a query string (no leading `?`)
    ///
    /// Raw fragments come first, followed by entries in insertion order.
    pub fn serialize(&self) -> String {
        let mut parts: Vec<String> = self.raw.clone();
        for (key, value) in &self.entries {
            let rendered = match value {
                FilterValue::Scalar(s) => encode_scalar(s),
                FilterValue::List(items) => items
                    .iter()
                    .map(encode_scalar)
                    .collect::<Vec<_>>()
                    .join(","),
            };
            parts.push(format!("{}={}", urlencoding::encode(key), rendered));
        }
        parts.join("&")
    }
}

fn encode_scalar(value: &Scalar) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}

/// One `(skip, limit)` slice of a paginated result set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    skip: u64,
    limit: u64,
}

impl Window {
    /// Create a window; `limit` must be positive
    pub fn new(skip: u64, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidQuery("window limit must be at least 1".to_string()));
        }
        Ok(Self { skip, limit })
    }

    /// Construct a window the caller has already bounded; `limit` is floored at 1
    pub(crate) fn bounded(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit: limit.max(1),
        }
    }

    /// Offset of the first item
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Number of items requested
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Offset one past the last item
    pub fn end(&self) -> u64 {
        self.skip + self.limit
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, +{})", self.skip, self.limit)
    }
}

/// A fully built request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// URL without query string
    pub path: String,
    /// Serialized query string, without leading `?`
    pub params: String,
}

impl RequestDescriptor {
    /// A request of `method` on `path` with an already-serialized query string
    pub fn new(method: Method, path: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: params.into(),
        }
    }

    /// A `GET` of `path` with an already-serialized query string
    pub fn get(path: impl Into<String>, params: impl Into<String>) -> Self {
        Self::new(Method::GET, path, params)
    }

    /// Full URL including the query string
    pub fn url(&self) -> String {
        if self.params.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.params)
        }
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url())
    }
}

/// Builds request descriptors for one resource under one API root
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    base: String,
}

impl QueryBuilder {
    /// `api_url` without trailing slash, `resource` is the path segment (e.g. `alerts`)
    pub fn new(api_url: &str, resource: &str) -> Self {
        Self {
            base: format!("{}/{}", api_url.trim_end_matches('/'), resource),
        }
    }

    /// `GET <base>/<resource>?<filter>&limit=<n>&skip=<m>`
    pub fn index(&self, filter: &Filter, window: Window) -> RequestDescriptor {
        let mut params = filter.serialize();
        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("limit={}&skip={}", window.limit(), window.skip()));
        RequestDescriptor::get(self.base.clone(), params)
    }

    /// `GET <base>/<resource>/<id>?<filter>`
    pub fn show(&self, id: &str, filter: &Filter) -> RequestDescriptor {
        RequestDescriptor::get(
            format!("{}/{}", self.base, urlencoding::encode(id)),
            filter.serialize(),
        )
    }

    /// `GET <base>/<resource>/<id>/preview` or `.../images/<time>`
    pub fn media(&self, id: &str, route: &MediaRoute) -> RequestDescriptor {
        let id = urlencoding::encode(id);
        let path = match route {
            MediaRoute::Preview => format!("{}/{}/preview", self.base, id),
            MediaRoute::Image(time) => {
                format!("{}/{}/images/{}", self.base, id, urlencoding::encode(time))
            }
        };
        RequestDescriptor::get(path, String::new())
    }

    /// `GET <base>/<id>/images?time=<start>&limit=<n>`, the media cache listing
    pub fn image_times(&self, id: &str, start_time: &str, limit: u64) -> RequestDescriptor {
        RequestDescriptor::get(
            format!("{}/{}/images", self.base, urlencoding::encode(id)),
            format!("time={}&limit={limit}", urlencoding::encode(start_time)),
        )
    }

    /// `GET <base>/<id>?limit=<n>[&marker=<name>]`, one page of a collection
    pub fn collection_page(&self, id: &str, limit: u64, marker: Option<&str>) -> RequestDescriptor {
        let mut params = format!("limit={limit}");
        if let Some(marker) = marker.filter(|m| !m.is_empty()) {
            params.push_str(&format!("&marker={}", urlencoding::encode(marker)));
        }
        RequestDescriptor::get(format!("{}/{}", self.base, urlencoding::encode(id)), params)
    }

    /// `POST <base>`
    pub fn create(&self) -> RequestDescriptor {
        RequestDescriptor::new(Method::POST, self.base.clone(), String::new())
    }

    /// `PATCH <base>/<id>`
    pub fn update(&self, id: &str) -> RequestDescriptor {
        RequestDescriptor::new(
            Method::PATCH,
            format!("{}/{}", self.base, urlencoding::encode(id)),
            String::new(),
        )
    }

    /// `POST <base>/<id>/images`
    pub fn add_image(&self, id: &str) -> RequestDescriptor {
        RequestDescriptor::new(
            Method::POST,
            format!("{}/{}/images", self.base, urlencoding::encode(id)),
            String::new(),
        )
    }

    /// `DELETE <base>/<id>/images/<name>`
    pub fn remove_image(&self, id: &str, name: &str) -> RequestDescriptor {
        RequestDescriptor::new(
            Method::DELETE,
            format!(
                "{}/{}/images/{}",
                self.base,
                urlencoding::encode(id),
                urlencoding::encode(name)
            ),
            String::new(),
        )
    }
}
