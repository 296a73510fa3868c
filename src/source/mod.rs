//! Music catalog sources

pub(crate) mod spotify;

use reqwest::Url;

use crate::error::ResolveError;

/// Best catalog match for a track query
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct SearchResult {
    /// Track name
    pub track: String,
    /// Main artist name
    pub artist: String,
    /// Album name
    pub album: String,
    /// URL of the highest resolution album cover
    pub cover_url: String,
    /// Track duration in milliseconds
    pub duration_ms: u64,
}

/// Music catalog
#[async_trait::async_trait]
pub(crate) trait Catalog: Sync + Send {
    /// Search for a track and return its best match
    async fn find_cover(&self, title: &str, artist: &str) -> Result<SearchResult, ResolveError>;

    /// Download a cover image
    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, ResolveError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io::Cursor,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// Canned search outcome
    pub(crate) enum FakeSearch {
        /// Return this result
        Found(SearchResult),
        /// Empty result list
        Empty,
        /// Search call fails with status
        Failing(u16),
    }

    /// In memory catalog
    pub(crate) struct FakeCatalog {
        pub search: FakeSearch,
        pub image: Vec<u8>,
        pub image_fetches: AtomicUsize,
    }

    impl FakeCatalog {
        pub(crate) fn new(search: FakeSearch, image: Vec<u8>) -> Self {
            Self {
                search,
                image,
                image_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Catalog for FakeCatalog {
        async fn find_cover(
            &self,
            title: &str,
            artist: &str,
        ) -> Result<SearchResult, ResolveError> {
            match &self.search {
                FakeSearch::Found(result) => Ok(result.clone()),
                FakeSearch::Empty => Err(ResolveError::NotFound(format!(
                    "No track found for {title:?} by {artist:?}"
                ))),
                FakeSearch::Failing(status) => Err(ResolveError::Upstream {
                    status: Some(*status),
                    detail: "Catalog search failed".to_owned(),
                }),
            }
        }

        async fn fetch_image(&self, _url: &Url) -> Result<Vec<u8>, ResolveError> {
            self.image_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.image.clone())
        }
    }

    pub(crate) fn thriller() -> SearchResult {
        SearchResult {
            track: "Thriller".to_owned(),
            artist: "Michael Jackson".to_owned(),
            album: "Thriller 25 Super Deluxe Edition".to_owned(),
            cover_url: "https://i.scdn.co/image/ab67616d0000b2734121faee8df82c526cbab2be"
                .to_owned(),
            duration_ms: 357_266,
        }
    }

    /// Encode a gradient test image as PNG
    pub(crate) fn png_image(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                u8::try_from(x % 256).unwrap(),
                u8::try_from(y % 256).unwrap(),
                128,
            ])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }
}
