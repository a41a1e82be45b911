//! Collections: image listings and writes.
//!
//! Collections are user-owned groups of image frames. Reads page through a
//! collection's image names with a `marker` cursor instead of `skip`. Writes
//! are form-encoded and carry the session token as `access_token`.
//!
//! Adding and removing images are batches: each asset or name is its own
//! task and lands in its own [`OutcomeRecord`](crate::records::OutcomeRecord).

use super::Resource;
use crate::error::{Error, Result};
use crate::executor::TaskOutcome;
use crate::records::OutcomeSet;
use crate::types::ResourceKind;
use crate::utils::camera_image_prefix;
use serde_json::Value;

/// Most image names the service returns with one collection page
pub const MAX_COLLECTION_PAGE: u64 = 200;

/// Which images [`Resource::collection_images`] returns
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageNameFilter {
    /// Only frames from this camera
    pub camera: Option<String>,
    /// Match names from before the service prefixed them with a camera hash
    pub legacy_names: bool,
}

impl ImageNameFilter {
    /// Only frames from `camera`
    pub fn camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Match unprefixed, pre-hash image names
    pub fn legacy_names(mut self, legacy: bool) -> Self {
        self.legacy_names = legacy;
        self
    }

    /// Leading `_`-separated token shared by every matching name
    fn prefix(&self) -> Option<String> {
        self.camera.as_deref().map(|camera| {
            if self.legacy_names {
                camera.to_string()
            } else {
                camera_image_prefix(camera)
            }
        })
    }
}

/// Fields of a collection write; unset fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionFields {
    /// Display name
    pub name: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Keyword tags, sent comma-joined
    pub tags: Option<Vec<String>>,
}

impl CollectionFields {
    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tags
    pub fn tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.tags.is_none()
    }

    fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(("name".to_string(), name.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description".to_string(), description.clone()));
        }
        if let Some(tags) = &self.tags {
            fields.push(("tags".to_string(), tags.join(",")));
        }
        fields
    }
}

/// Source of an image added to a collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageAsset {
    /// Latest frame of a camera
    Camera {
        /// Camera ID
        camera_id: String,
    },
    /// Frame of a camera at a media cache time
    CameraTime {
        /// Camera ID
        camera_id: String,
        /// Image time, as listed by [`Resource::image_times`]
        time: String,
    },
    /// Frame behind an observation
    Observation {
        /// Observation ID
        observation_id: String,
    },
    /// Image already stored in another collection
    CollectionImage {
        /// Source collection ID
        collection_id: String,
        /// Image name within the source collection
        image: String,
    },
}

impl ImageAsset {
    fn form_fields(&self) -> Vec<(String, String)> {
        let pairs: Vec<(&str, &str)> = match self {
            ImageAsset::Camera { camera_id } => vec![("camera_id", camera_id.as_str())],
            ImageAsset::CameraTime { camera_id, time } => {
                vec![("camera_id", camera_id.as_str()), ("time", time.as_str())]
            }
            ImageAsset::Observation { observation_id } => {
                vec![("observation_id", observation_id.as_str())]
            }
            ImageAsset::CollectionImage {
                collection_id,
                image,
            } => vec![
                ("collection_id", collection_id.as_str()),
                ("image", image.as_str()),
            ],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Result of [`Resource::copy_collection`]
#[derive(Debug)]
pub struct CopiedCollection {
    /// ID of the new collection
    pub id: String,
    /// One record per image copied from the source
    pub images: OutcomeSet<ImageAsset, ()>,
}

impl Resource {
    /// Attributes of one collection with one page of its image names
    ///
    /// `marker` resumes after the image of that exact name, or at the first
    /// name it is a prefix of.
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] on a resource other than collections or for a
    /// limit outside `1..=200`; otherwise any transport or decode error.
    pub async fn show_collection(
        &self,
        collection_id: &str,
        limit: u64,
        marker: Option<&str>,
    ) -> Result<Value> {
        self.require_kind(ResourceKind::Collections, "show_collection")?;
        if limit == 0 || limit > MAX_COLLECTION_PAGE {
            return Err(Error::InvalidQuery(format!(
                "collection page limit must be between 1 and {MAX_COLLECTION_PAGE}; {limit} was tried"
            )));
        }
        let request = self.builder.collection_page(collection_id, limit, marker);
        self.session.get_json(&request.url()).await
    }

    /// Every image name in a collection, optionally only one camera's
    ///
    /// Pages are chained by passing the last name of one page as the marker
    /// of the next. With a camera filter the walk starts at the camera's name
    /// prefix and stops at the first page that runs past it.
    ///
    /// # Errors
    /// As for [`Resource::show_collection`], plus [`Error::MalformedPage`] if
    /// a page has no `images` list.
    pub async fn collection_images(
        &self,
        collection_id: &str,
        filter: &ImageNameFilter,
    ) -> Result<Vec<String>> {
        let prefix = filter.prefix();
        let mut marker = prefix.clone();
        let mut names: Vec<String> = Vec::new();
        let mut pages = 0_usize;

        loop {
            let page = self
                .show_collection(collection_id, MAX_COLLECTION_PAGE, marker.as_deref())
                .await?;
            pages += 1;
            let images = image_names(&page, collection_id)?;
            let returned = images.len();

            let matched: Vec<String> = match &prefix {
                Some(prefix) => images
                    .into_iter()
                    .filter(|name| name.split('_').next() == Some(prefix.as_str()))
                    .collect(),
                None => images,
            };
            if matched.is_empty() {
                break;
            }

            let ran_past = matched.len() < returned;
            let short_page = (returned as u64) < MAX_COLLECTION_PAGE;
            names.extend(matched);
            if ran_past || short_page {
                break;
            }

            let next = names.last().cloned();
            if next == marker {
                break;
            }
            marker = next;
        }

        tracing::debug!(collection = collection_id, images = names.len(), pages, "Listed collection images");
        Ok(names)
    }

    /// Create a collection and return its ID
    ///
    /// # Errors
    /// [`Error::MalformedPage`] if the reply carries no `collection_id`;
    /// otherwise any transport error. Creation is never retried.
    pub async fn create_collection(
        &self,
        name: &str,
        description: &str,
        tags: &[String],
    ) -> Result<String> {
        self.require_kind(ResourceKind::Collections, "create_collection")?;
        let mut fields = CollectionFields::default()
            .name(name)
            .description(description);
        if !tags.is_empty() {
            fields = fields.tags(tags.iter().cloned());
        }

        let request = self.builder.create();
        let reply = self
            .session
            .submit(&request, &self.write_form(fields.form_fields()))
            .await?;
        let id = reply
            .get("collection_id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedPage {
                url: request.url(),
                reason: "reply has no `collection_id`".to_string(),
            })?
            .to_string();

        tracing::info!(collection = %id, name, "Created collection");
        Ok(id)
    }

    /// Change some fields of a collection
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] if `fields` sets nothing; otherwise any
    /// transport error.
    pub async fn update_collection(&self, collection_id: &str, fields: &CollectionFields) -> Result<()> {
        self.require_kind(ResourceKind::Collections, "update_collection")?;
        if fields.is_empty() {
            return Err(Error::InvalidQuery(
                "update needs at least one of name, description, tags".to_string(),
            ));
        }

        let request = self.builder.update(collection_id);
        self.session
            .submit(&request, &self.write_form(fields.form_fields()))
            .await?;
        Ok(())
    }

    /// Add images to a collection, one task per asset
    ///
    /// # Errors
    /// [`Error::InvalidQuery`] on a resource other than collections. Per-asset
    /// failures land in the returned set.
    pub async fn add_images(
        &self,
        collection_id: &str,
        assets: Vec<ImageAsset>,
    ) -> Result<OutcomeSet<ImageAsset, ()>> {
        self.require_kind(ResourceKind::Collections, "add_images")?;
        let set = self
            .executor
            .run(assets, |asset| {
                let request = self.builder.add_image(collection_id);
                let form = self.write_form(asset.form_fields());
                async move {
                    let result = self.session.submit(&request, &form).await.map(drop);
                    TaskOutcome::new(request, result)
                }
            })
            .await;
        log_write_batch("add_images", collection_id, &set);
        Ok(set)
    }

    /// Remove images from a collection by name, one task per name
    ///
    /// # Errors
    /// As for [`Resource::add_images`].
    pub async fn remove_images<S>(
        &self,
        collection_id: &str,
        names: Vec<S>,
    ) -> Result<OutcomeSet<String, ()>>
    where
        S: Into<String>,
    {
        self.require_kind(ResourceKind::Collections, "remove_images")?;
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let set = self
            .executor
            .run(names, |name| {
                let request = self.builder.remove_image(collection_id, &name);
                async move {
                    let result = self.session.submit(&request, &[]).await.map(drop);
                    TaskOutcome::new(request, result)
                }
            })
            .await;
        log_write_batch("remove_images", collection_id, &set);
        Ok(set)
    }

    /// Copy a collection's attributes and images into a new collection
    ///
    /// The new collection is created before any image is copied, so a
    /// failure of individual images still leaves it in place; those failures
    /// are in [`CopiedCollection::images`].
    ///
    /// # Errors
    /// Any failure reading the source or creating the copy.
    pub async fn copy_collection(&self, collection_id: &str, new_name: &str) -> Result<CopiedCollection> {
        let metadata = self
            .show_collection(collection_id, MAX_COLLECTION_PAGE, None)
            .await?;
        let description = metadata
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tags = tags_of(&metadata);
        let names = self
            .collection_images(collection_id, &ImageNameFilter::default())
            .await?;

        let id = self.create_collection(new_name, &description, &tags).await?;
        let assets = names
            .into_iter()
            .map(|image| ImageAsset::CollectionImage {
                collection_id: collection_id.to_string(),
                image,
            })
            .collect();
        let images = self.add_images(&id, assets).await?;

        Ok(CopiedCollection { id, images })
    }

    fn write_form(&self, mut fields: Vec<(String, String)>) -> Vec<(String, String)> {
        fields.extend(self.session.access_token_field());
        fields
    }
}

fn image_names(page: &Value, collection_id: &str) -> Result<Vec<String>> {
    let malformed = || Error::MalformedPage {
        url: format!("collections/{collection_id}"),
        reason: "page has no `images` list of strings".to_string(),
    };
    page.get("images")
        .and_then(Value::as_array)
        .ok_or_else(malformed)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(malformed))
        .collect()
}

/// Tags as a list, whether the service sent a list or a comma-joined string
fn tags_of(metadata: &Value) -> Vec<String> {
    match metadata.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn log_write_batch<I, T>(operation: &str, collection_id: &str, set: &OutcomeSet<I, T>) {
    let total = set.len();
    let failed = set.failure_count();
    if total > 0 && failed == total {
        tracing::error!(operation, collection = collection_id, total, "Every collection write failed");
    } else if failed > 0 {
        tracing::warn!(operation, collection = collection_id, total, failed, "Some collection writes failed");
    } else {
        tracing::info!(operation, collection = collection_id, total, "Collection writes succeeded");
    }
}
