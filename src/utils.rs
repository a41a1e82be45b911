//! Helpers for naming and persisting media payloads

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::Any;
use std::path::Path;
use url::Url;

/// Name used when a media URL has no usable final path segment
const FALLBACK_MEDIA_NAME: &str = "media";

/// Derive a file name for a media payload from the URL it was served from
///
/// Takes the last path segment of the final (post-redirect) URL, percent-decoded.
/// Segments that could escape the output directory (`.`, `..`, or anything
/// containing a path separator after decoding) fall back to `"media"`.
///
/// # Examples
///
/// ```
/// use helios_client::utils::media_file_name;
/// use url::Url;
///
/// let url = Url::parse("https://cdn.example.com/obs/2017/abc%20123.jpg?sig=x").unwrap();
/// assert_eq!(media_file_name(&url), "abc 123.jpg");
/// ```
pub fn media_file_name(url: &Url) -> String {
    if let Some(mut segments) = url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
        && let Ok(decoded) = urlencoding::decode(last_segment)
        && !matches!(decoded.as_ref(), "." | "..")
        && !decoded.contains(['/', '\\'])
    {
        return decoded.into_owned();
    }

    FALLBACK_MEDIA_NAME.to_string()
}

/// Create `dir` (and parents) if it does not exist yet
///
/// # Errors
/// [`Error::Io`] if the directory cannot be created, or if `dir` exists but
/// is not a directory.
pub async fn ensure_output_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("output path {} exists and is not a directory", dir.display()),
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(e)),
    }

    tokio::fs::create_dir_all(dir).await?;
    tracing::debug!(dir = %dir.display(), "Created media output directory");
    Ok(())
}

/// Parse an API timestamp: RFC 3339 (`2014-08-01T12:34:56.000Z`), a naive
/// date-time taken as UTC, or a bare date taken as midnight UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Image name prefix the collections service gives frames from `camera`:
/// the first four hex digits of the camera ID's MD5, a dash, then the ID
pub fn camera_image_prefix(camera: &str) -> String {
    let digest = format!("{:x}", md5::compute(camera.as_bytes()));
    format!("{}-{camera}", &digest[..4])
}

/// Run CPU-bound work on the blocking pool so runtime threads stay free to
/// drive sibling requests
///
/// # Errors
/// Whatever `work` returns, or [`Error::TaskPanicked`] if it panics.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(Error::TaskPanicked(panic_message(e.into_panic().as_ref()))),
        Err(e) => Err(Error::Other(format!("blocking task did not complete: {e}"))),
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
