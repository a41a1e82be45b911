//! Camera media cache listings.

use super::Resource;
use crate::error::{Error, Result};
use crate::types::ResourceKind;
use crate::utils::parse_timestamp;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Most image times the media cache returns per request
pub const MAX_IMAGE_TIMES: u64 = 500;

/// Range and page size for [`Resource::image_times`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageTimesOptions {
    /// Last timestamp to include; `None` returns one page from the start time
    pub end_time: Option<String>,
    /// Times per request; `None` uses [`MAX_IMAGE_TIMES`]
    pub limit: Option<u64>,
}

impl ImageTimesOptions {
    /// Keep walking the cache until `end_time`, inclusive
    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Request `limit` times per page
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl Resource {
    /// Image times available in the media cache for one camera
    ///
    /// Without an end time this is a single request starting at `start_time`.
    /// With one, pages are requested forward from the last time of the
    /// previous page until a page reaches past the end; times after the end
    /// are dropped. The returned times feed [`Resource::show_image`].
    ///
    /// # Errors
    /// - [`Error::InvalidQuery`] on a resource other than cameras, for an
    ///   unparsable end time, or a limit outside `1..=500`
    /// - [`Error::MalformedPage`] if a reply has no `times` list or a time
    ///   cannot be parsed
    /// - any transport error of a page request
    pub async fn image_times(
        &self,
        camera_id: &str,
        start_time: &str,
        options: ImageTimesOptions,
    ) -> Result<Vec<String>> {
        self.require_kind(ResourceKind::Cameras, "image_times")?;

        let limit = options.limit.unwrap_or(MAX_IMAGE_TIMES);
        if limit == 0 || limit > MAX_IMAGE_TIMES {
            return Err(Error::InvalidQuery(format!(
                "image time limit must be between 1 and {MAX_IMAGE_TIMES}; {limit} was tried"
            )));
        }
        let end = match &options.end_time {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                Error::InvalidQuery(format!("end_time {raw:?} is not a timestamp"))
            })?),
            None => None,
        };

        let mut start = start_time.to_string();
        let mut found = Vec::new();
        let mut requests = 0_usize;
        loop {
            let url = self.builder.image_times(camera_id, &start, limit).url();
            let mut times = times_of(self.session.get_json(&url).await?, &url)?;
            requests += 1;

            let Some(end) = end else {
                found.append(&mut times);
                break;
            };
            let Some(last) = times.last() else {
                break;
            };

            if timestamp_of(last, &url)? < end {
                // The next page starts at this page's last time, so that time
                // is taken from the next page instead; a page that cannot
                // advance the cursor ends the walk
                if times.len() > 1 && *last != start {
                    if let Some(next) = times.pop() {
                        start = next;
                    }
                    found.append(&mut times);
                    continue;
                }
                found.append(&mut times);
                break;
            }

            for time in times {
                if timestamp_of(&time, &url)? <= end {
                    found.push(time);
                }
            }
            break;
        }

        if found.is_empty() {
            tracing::warn!(
                camera = camera_id,
                start_time,
                end_time = options.end_time.as_deref(),
                "No images found in range"
            );
        } else {
            tracing::debug!(camera = camera_id, times = found.len(), requests, "Listed image times");
        }
        Ok(found)
    }
}

fn times_of(body: Value, url: &str) -> Result<Vec<String>> {
    let malformed = || Error::MalformedPage {
        url: url.to_string(),
        reason: "reply has no `times` list of strings".to_string(),
    };
    let Value::Array(items) = body.get("times").cloned().ok_or_else(malformed)? else {
        return Err(malformed());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(malformed()),
        })
        .collect()
}

fn timestamp_of(time: &str, url: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(time).ok_or_else(|| Error::MalformedPage {
        url: url.to_string(),
        reason: format!("unparsable image time {time:?}"),
    })
}
