//! Internal API exposed for `coverd`/`coverd_fetch` binaries

use std::{
    fs,
    path::Path,
    process::{ExitCode, Termination},
    time::Duration,
};

use anyhow::Context as _;
use reqwest::Url;

use crate::{cover::Encoding, http::CatalogHttpClient, source::SearchResult};

pub mod cl;
mod cover;
mod error;
mod http;
pub mod server;
mod source;
mod token;

/// Status of successful fetch operation
pub enum SearchStatus {
    /// A result was found and saved
    Found,
    /// No valid result was found for given query
    NotFound,
}

impl Termination for SearchStatus {
    fn report(self) -> ExitCode {
        match self {
            SearchStatus::Found => ExitCode::SUCCESS,
            SearchStatus::NotFound => ExitCode::FAILURE,
        }
    }
}

/// Write cover thumbnail to file, encoding selected from file extension
fn save(buf: &[u8], output: &Path) -> anyhow::Result<()> {
    let img = cover::thumbnail(buf)?;
    let encoding = output
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.to_lowercase().parse::<Encoding>().ok());
    match encoding {
        Some(encoding) => {
            let data = encoding.encode(&img)?;
            fs::write(output, data).with_context(|| format!("Failed to write {output:?}"))?;
        }
        None => {
            img.save(output)
                .with_context(|| format!("Failed to write {output:?}"))?;
        }
    }
    log::info!("Cover thumbnail written to {output:?}");
    Ok(())
}

/// Query a running service for a track cover, download it and save a thumbnail
pub async fn fetch_and_save(
    api_url: &Url,
    timeout: Duration,
    track: &str,
    artist: &str,
    output: &Path,
) -> anyhow::Result<SearchStatus> {
    let http = CatalogHttpClient::new(timeout)?;

    // Lookup
    let mut url = api_url.clone();
    url.query_pairs_mut()
        .append_pair("track", track)
        .append_pair("artist", artist);
    let result: SearchResult = match http.get_json(url, None).await {
        Ok(result) => result,
        Err(err) if err.status() == Some(404) => {
            log::warn!("No cover found for track {track:?} and artist {artist:?}");
            return Ok(SearchStatus::NotFound);
        }
        Err(err) => return Err(err).context("Cover lookup failed"),
    };
    log::info!(
        "Found {:?} by {:?} from album {:?}",
        result.track,
        result.artist,
        result.album
    );

    // Download
    let cover_url: Url = result
        .cover_url
        .parse()
        .with_context(|| format!("Invalid cover URL {:?}", result.cover_url))?;
    let buf = http
        .download(cover_url)
        .await
        .context("Failed to download cover")?;

    // Convert
    let output = output.to_owned();
    tokio::task::spawn_blocking(move || save(&buf, &output)).await??;

    Ok(SearchStatus::Found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cover::{RGB565_LEN, THUMBNAIL_SIZE},
        http::tests::{MockServer, json_response, response},
        source::tests::png_image,
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn save_rgb565() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.RGB565");
        save(&png_image(640, 640), &path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), RGB565_LEN);
    }

    #[test]
    fn save_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.bmp");
        save(&png_image(640, 640), &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), THUMBNAIL_SIZE);
        assert_eq!(img.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        save(&png_image(300, 300), &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), THUMBNAIL_SIZE);
        assert_eq!(img.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn save_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.xyz");
        assert!(save(&png_image(300, 300), &path).is_err());
    }

    #[tokio::test]
    async fn fetch_found() {
        let images = MockServer::start(vec![response(
            "200 OK",
            "image/png",
            &png_image(300, 300),
        )])
        .await;
        let cover_url = images.url.join("cover.png").unwrap();
        let service = MockServer::start(vec![json_response(
            "200 OK",
            &serde_json::json!({
                "track": "Billie Jean",
                "artist": "Michael Jackson",
                "album": "Thriller",
                "cover_url": cover_url.as_str(),
                "duration_ms": 294_226,
            })
            .to_string(),
        )])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.rgb565");

        let status = fetch_and_save(
            &service.url.join("cover").unwrap(),
            TIMEOUT,
            "Billie Jean",
            "Michael Jackson",
            &path,
        )
        .await
        .unwrap();

        assert!(matches!(status, SearchStatus::Found));
        assert_eq!(fs::read(&path).unwrap().len(), RGB565_LEN);
        assert!(
            service.requests()[0]
                .starts_with("GET /cover?track=Billie+Jean&artist=Michael+Jackson HTTP/1.1")
        );
        assert_eq!(images.requests().len(), 1);
    }

    #[tokio::test]
    async fn fetch_not_found() {
        let service = MockServer::start(vec![json_response(
            "404 Not Found",
            r#"{"detail": "No track found"}"#,
        )])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.bmp");

        let status = fetch_and_save(
            &service.url.join("cover").unwrap(),
            TIMEOUT,
            "mlkjjkhjklhlkjhlk",
            "mlkjjkhjklhlkjhlk",
            &path,
        )
        .await
        .unwrap();

        assert!(matches!(status, SearchStatus::NotFound));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn fetch_service_error() {
        let service = MockServer::start(vec![json_response(
            "500 Internal Server Error",
            r#"{"detail": "Failed to authenticate with catalog API"}"#,
        )])
        .await;
        let dir = tempfile::tempdir().unwrap();

        assert!(
            fetch_and_save(
                &service.url.join("cover").unwrap(),
                TIMEOUT,
                "Thriller",
                "Michael Jackson",
                &dir.path().join("cover.bmp"),
            )
            .await
            .is_err()
        );
    }
}
