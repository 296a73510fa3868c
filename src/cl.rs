//! Command line interface

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use reqwest::Url;

use crate::token::Credentials;

/// Command line arguments for `coverd` binary
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct ServeArgs {
    /// Address to listen on
    #[clap(long, env = "COVERD_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Port to listen on
    #[clap(short, long, env = "COVERD_PORT", default_value_t = 8000)]
    pub port: u16,
    /// Catalog API options
    #[clap(flatten)]
    pub catalog: CatalogOptions,
    /// Level of logging output
    #[clap(short, long, default_value_t = log::Level::Info)]
    pub verbosity: log::Level,
}

/// Command line arguments for `coverd_fetch` binary
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct FetchArgs {
    /// Track title to search for
    pub track: String,
    /// Artist to search for
    pub artist: String,
    /// Output image file path.
    /// Extension selects encoding: bmp, rgb565, or any image format like png or jpg.
    pub output_filepath: PathBuf,
    /// URL of the cover endpoint of a running coverd service
    #[clap(long, env = "COVERD_API", default_value = "http://127.0.0.1:8000/cover")]
    pub api_url: Url,
    /// Total timeout for each request, in seconds
    #[clap(long, env = "COVERD_TIMEOUT", default_value_t = 30)]
    pub timeout_secs: u64,
    /// Level of logging output
    #[clap(short, long, default_value_t = log::Level::Info)]
    pub verbosity: log::Level,
}

impl FetchArgs {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Command line arguments related to the catalog API
#[derive(Parser, Debug, Clone)]
pub struct CatalogOptions {
    /// Catalog API application client id
    #[clap(long, env = "CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,
    /// Catalog API application client secret
    #[clap(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
    /// OAuth2 token endpoint
    #[clap(
        long,
        env = "COVERD_AUTH_URL",
        default_value = "https://accounts.spotify.com/api/token"
    )]
    pub auth_url: Url,
    /// Catalog API base URL
    #[clap(long, env = "COVERD_API_URL", default_value = "https://api.spotify.com/v1")]
    pub api_url: Url,
    /// Search query phrasing.
    /// Structured queries filter on track and artist fields, free text queries match more loosely.
    #[clap(long, env = "COVERD_QUERY_STYLE", default_value_t = QueryStyle::Structured)]
    pub query_style: QueryStyle,
    /// Stop using a token this many seconds before it expires
    #[clap(long, env = "COVERD_TOKEN_MARGIN", default_value_t = 60)]
    pub token_margin_secs: u64,
    /// Total timeout for each upstream request, in seconds
    #[clap(long, env = "COVERD_TIMEOUT", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl CatalogOptions {
    /// Get credentials if both parts are set
    pub(crate) fn credentials(&self) -> Option<Credentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(client_id), Some(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(Credentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                })
            }
            _ => None,
        }
    }

    /// Token safety margin
    pub(crate) fn token_margin(&self) -> Duration {
        Duration::from_secs(self.token_margin_secs)
    }

    /// Upstream request timeout
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How to phrase the catalog search query
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum QueryStyle {
    /// Field filters, ie. `track:... artist:...`, fewer but more precise results
    #[default]
    Structured,
    /// Plain words, matches more loosely
    FreeText,
}

impl QueryStyle {
    /// Build search query string
    pub(crate) fn query(self, title: &str, artist: &str) -> String {
        match self {
            QueryStyle::Structured => format!("track:{title} artist:{artist}"),
            QueryStyle::FreeText => format!("{title} {artist}"),
        }
    }
}
