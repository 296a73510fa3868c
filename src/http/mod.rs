//! Common HTTP code

use std::time::Duration;

use anyhow::Context as _;
use const_format::formatcp;
use futures_util::StreamExt as _;
use reqwest::{
    RequestBuilder, Response, StatusCode, Url,
    header::{self, HeaderValue},
};

/// User agent for all upstream requests
pub(crate) const USER_AGENT: &str = formatcp!(
    "{}/{} (https://github.com/desbma/coverd)",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_VERSION")
);

/// Upper bound of download buffer preallocation, the announced length is not trusted
const MAX_DOWNLOAD_PREALLOC: usize = 4 * 1024 * 1024;

/// Upstream HTTP failure
#[derive(thiserror::Error, Debug)]
pub(crate) enum HttpError {
    /// No response received
    #[error("Internal HTTP error for URL {url:?}: {err}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying error
        #[source]
        err: reqwest::Error,
    },
    /// Response received with a non success status
    #[error("Request to {url:?} failed with status: {status}")]
    Status {
        /// Request URL
        url: String,
        /// Response status
        status: StatusCode,
    },
    /// Response body could not be parsed
    #[error("Failed to parse response from {url:?}: {err}")]
    Decode {
        /// Request URL
        url: String,
        /// Underlying error
        #[source]
        err: serde_json::Error,
    },
}

impl HttpError {
    /// Response status, if a response was received
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(status.as_u16()),
            HttpError::Transport { err, .. } => err.status().map(|s| s.as_u16()),
            HttpError::Decode { .. } => None,
        }
    }
}

/// HTTP interface to the catalog and image hosts
pub(crate) struct CatalogHttpClient {
    /// Client
    client: reqwest::Client,
}

impl CatalogHttpClient {
    /// Create a new HTTP client
    pub(crate) fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Send request, and fail if response status is not a success
    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, HttpError> {
        let response = request.send().await.map_err(|err| HttpError::Transport {
            url: url.as_str().to_owned(),
            err,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.as_str().to_owned(),
                status,
            });
        }
        Ok(response)
    }

    /// Read full response body and parse it as JSON
    async fn read_json<R>(response: Response, url: &Url) -> Result<R, HttpError>
    where
        R: serde::de::DeserializeOwned,
    {
        let data = response.bytes().await.map_err(|err| HttpError::Transport {
            url: url.as_str().to_owned(),
            err,
        })?;
        log::trace!("{}", String::from_utf8_lossy(&data));
        serde_json::from_slice(&data).map_err(|err| HttpError::Decode {
            url: url.as_str().to_owned(),
            err,
        })
    }

    /// Send a GET request to URL, parse response as JSON
    pub(crate) async fn get_json<R>(&self, url: Url, bearer: Option<&str>) -> Result<R, HttpError>
    where
        R: serde::de::DeserializeOwned,
    {
        log::trace!("GET {url}");
        let mut request = self.client.get(url.clone());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = self.send(request, &url).await?;
        Self::read_json(response, &url).await
    }

    /// Send an url encoded form POST request with basic authentication, parse response as JSON
    pub(crate) async fn post_form_json<R>(
        &self,
        url: Url,
        (username, password): (&str, &str),
        form: &str,
    ) -> Result<R, HttpError>
    where
        R: serde::de::DeserializeOwned,
    {
        log::trace!("POST {url}");
        let request = self
            .client
            .post(url.clone())
            .basic_auth(username, Some(password))
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(form.to_owned());
        let response = self.send(request, &url).await?;
        Self::read_json(response, &url).await
    }

    /// Download an image in memory
    pub(crate) async fn download(&self, url: Url) -> Result<Vec<u8>, HttpError> {
        log::debug!("Downloading {url}...");
        let response = self.send(self.client.get(url.clone()), &url).await?;

        let mut data = Vec::with_capacity(
            response
                .content_length()
                .and_then(|l| usize::try_from(l).ok())
                .unwrap_or_default()
                .min(MAX_DOWNLOAD_PREALLOC),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| HttpError::Transport {
                url: url.as_str().to_owned(),
                err,
            })?;
            data.extend_from_slice(&chunk);
        }
        log::trace!("Downloaded {} bytes from {url}", data.len());

        Ok(data)
    }
}
