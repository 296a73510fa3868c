//! Spotify Web API catalog

// See https://developer.spotify.com/documentation/web-api/reference/search

use std::sync::Arc;

use anyhow::Context as _;
use reqwest::Url;

use crate::{
    cl::QueryStyle,
    error::ResolveError,
    http::CatalogHttpClient,
    source::{Catalog, SearchResult},
    token::{ClientCredentials, SystemClock, TokenCache},
};

/// Spotify catalog
pub(crate) struct Spotify {
    /// HTTP client
    http: Arc<CatalogHttpClient>,
    /// API base URL
    api_url: Url,
    /// Search query phrasing
    query_style: QueryStyle,
    /// Bearer token cache
    tokens: TokenCache<ClientCredentials, SystemClock>,
}

#[derive(Debug, serde::Deserialize)]
struct Response {
    tracks: ResponseTracks,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseTracks {
    items: Vec<ResponseTrack>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseTrack {
    name: String,
    duration_ms: u64,
    artists: Vec<ResponseArtist>,
    album: ResponseAlbum,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseArtist {
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseAlbum {
    name: String,
    images: Vec<ResponseImage>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseImage {
    url: String,
    width: Option<u32>,
}

impl Spotify {
    pub(crate) fn new(
        http: Arc<CatalogHttpClient>,
        api_url: Url,
        query_style: QueryStyle,
        tokens: TokenCache<ClientCredentials, SystemClock>,
    ) -> Self {
        Self {
            http,
            api_url,
            query_style,
            tokens,
        }
    }

    /// Build track search URL
    fn search_url(&self, title: &str, artist: &str) -> anyhow::Result<Url> {
        let query = self.query_style.query(title, artist);
        let url_params = [("q", query.as_str()), ("type", "track"), ("limit", "1")];
        let base = format!("{}/search", self.api_url.as_str().trim_end_matches('/'));
        Url::parse_with_params(&base, url_params)
            .with_context(|| format!("Invalid search URL {base:?}"))
    }
}

/// Extract best match from search response
fn first_match(resp: Response, title: &str, artist: &str) -> Result<SearchResult, ResolveError> {
    let Some(track) = resp.tracks.items.into_iter().next() else {
        log::info!("No track found for {title:?} by {artist:?}");
        return Err(ResolveError::NotFound("No track found".to_owned()));
    };

    // Images are usually sorted largest first, but widths are not always reported
    let cover_url = track
        .album
        .images
        .iter()
        .enumerate()
        .max_by_key(|(i, img)| (img.width.unwrap_or_default(), std::cmp::Reverse(*i)))
        .map(|(_, img)| img.url.clone())
        .ok_or_else(|| {
            log::info!("No cover image for album {:?}", track.album.name);
            ResolveError::NotFound("No cover image for track".to_owned())
        })?;

    Ok(SearchResult {
        track: track.name,
        artist: track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default(),
        album: track.album.name,
        cover_url,
        duration_ms: track.duration_ms,
    })
}

#[async_trait::async_trait]
impl Catalog for Spotify {
    async fn find_cover(&self, title: &str, artist: &str) -> Result<SearchResult, ResolveError> {
        let token = self.tokens.get_token().await?;

        let search_url = self
            .search_url(title, artist)
            .map_err(|err| ResolveError::Upstream {
                status: None,
                detail: format!("{err:#}"),
            })?;
        let resp: Response = self
            .http
            .get_json(search_url, Some(&token))
            .await
            .map_err(|err| {
                log::warn!("Search failed: {err}");
                ResolveError::Upstream {
                    status: err.status(),
                    detail: "Catalog search failed".to_owned(),
                }
            })?;

        let result = first_match(resp, title, artist)?;
        log::debug!("Best match for {title:?} by {artist:?}: {result:?}");
        Ok(result)
    }

    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, ResolveError> {
        self.http.download(url.clone()).await.map_err(|err| {
            ResolveError::Transcode(anyhow::Error::new(err).context("Failed to fetch cover"))
        })
    }
}
