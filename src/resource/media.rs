//! Media batches: previews and timestamped images.

use super::Resource;
use crate::error::Result;
use crate::executor::TaskOutcome;
use crate::records::OutcomeSet;
use crate::types::MediaRoute;
use crate::utils::{ensure_output_dir, media_file_name, run_blocking};
use image::DynamicImage;
use std::path::PathBuf;
use url::Url;

/// What to do with each fetched media payload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaOptions {
    /// Write each payload here, named after its source URL
    pub output_dir: Option<PathBuf>,
    /// Decode each payload into an in-memory image
    pub decode_image: bool,
}

impl MediaOptions {
    /// Persist payloads under `dir`
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Decode payloads into images
    pub fn decode_image(mut self, decode: bool) -> Self {
        self.decode_image = decode;
        self
    }
}

/// One fetched media payload
#[derive(Debug)]
pub struct MediaContent {
    /// File name taken from the final URL
    pub name: String,
    /// URL the payload was served from, after redirects
    pub url: Url,
    /// Where the payload was written, if an output directory was given
    pub output_file: Option<PathBuf>,
    /// Payload size
    pub bytes_len: usize,
    /// Decoded image, if requested
    pub image: Option<DynamicImage>,
}

impl Resource {
    /// Fetch the preview image of each ID, in ID order
    ///
    /// # Errors
    /// [`Error::Io`](crate::Error::Io) if the output directory cannot be
    /// created. Per-ID failures land in the returned set.
    pub async fn preview<S>(
        &self,
        ids: Vec<S>,
        options: &MediaOptions,
    ) -> Result<OutcomeSet<String, MediaContent>>
    where
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.prepare_output(options).await?;

        Ok(self
            .executor
            .run(ids, |id| async move {
                self.fetch_media(&id, &MediaRoute::Preview, options).await
            })
            .await)
    }

    /// Fetch the images of one asset at each timestamp, in timestamp order
    ///
    /// # Errors
    /// As for [`Resource::preview`].
    pub async fn show_image<S>(
        &self,
        id: &str,
        times: Vec<S>,
        options: &MediaOptions,
    ) -> Result<OutcomeSet<String, MediaContent>>
    where
        S: Into<String>,
    {
        let times: Vec<String> = times.into_iter().map(Into::into).collect();
        self.prepare_output(options).await?;

        Ok(self
            .executor
            .run(times, |time| async move {
                self.fetch_media(id, &MediaRoute::Image(time), options).await
            })
            .await)
    }

    async fn prepare_output(&self, options: &MediaOptions) -> Result<()> {
        if let Some(dir) = &options.output_dir {
            ensure_output_dir(dir).await?;
        }
        Ok(())
    }

    async fn fetch_media(
        &self,
        id: &str,
        route: &MediaRoute,
        options: &MediaOptions,
    ) -> TaskOutcome<MediaContent> {
        let request = self.builder.media(id, route);
        let result = self.download_media(&request.url(), options).await;
        TaskOutcome::new(request, result)
    }

    async fn download_media(&self, url: &str, options: &MediaOptions) -> Result<MediaContent> {
        let (final_url, bytes) = self.session.get_media(url).await?;
        let name = media_file_name(&final_url);

        let output_file = match &options.output_dir {
            Some(dir) => {
                let path = dir.join(&name);
                tokio::fs::write(&path, &bytes).await?;
                Some(path)
            }
            None => None,
        };

        let bytes_len = bytes.len();
        let image = if options.decode_image {
            Some(run_blocking(move || Ok(image::load_from_memory(&bytes)?)).await?)
        } else {
            None
        };

        Ok(MediaContent {
            name,
            url: final_url,
            output_file,
            bytes_len,
            image,
        })
    }
}
