//! Mock API responders and payload generators

use rand::Rng;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::{Request, Respond, ResponseTemplate};

/// Serves `[skip, skip + limit)` of a dataset with `total` items
///
/// Reads `skip` and `limit` from the query string the way the real service
/// does. Each response is delayed by a random amount up to `max_delay`, so
/// pages complete in an unpredictable order.
pub struct PagedDataset {
    /// Items the server holds and declares
    pub total: u64,
    /// `"features"` or `"results"`
    pub list_key: &'static str,
    /// Upper bound for the random response delay
    pub max_delay: Duration,
}

impl PagedDataset {
    /// GeoJSON dataset of `total` features
    pub fn features(total: u64) -> Self {
        Self {
            total,
            list_key: "features",
            max_delay: Duration::from_millis(15),
        }
    }

    /// Generic collection-style dataset of `total` results
    pub fn results(total: u64) -> Self {
        Self {
            list_key: "results",
            ..Self::features(total)
        }
    }
}

impl Respond for PagedDataset {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<u64>().ok())
        };
        let (Some(skip), Some(limit)) = (param("skip"), param("limit")) else {
            return ResponseTemplate::new(400);
        };

        let end = (skip + limit).min(self.total);
        let items: Vec<Value> = (skip.min(end)..end).map(item).collect();
        let body = if self.list_key == "features" {
            json!({"type": "FeatureCollection", "properties": {"total": self.total}, "features": items})
        } else {
            json!({"total": self.total, "results": items})
        };

        ResponseTemplate::new(200)
            .set_body_json(body)
            .set_delay(random_delay(self.max_delay))
    }
}

/// Item `n` of a generated dataset
pub fn item(n: u64) -> Value {
    json!({"type": "Feature", "id": format!("item-{n:05}"), "properties": {"n": n}})
}

/// Random delay in `[0, max]`
pub fn random_delay(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// A tiny PNG image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}
