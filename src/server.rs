//! HTTP service

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    App, HttpResponse, HttpServer,
    http::header,
    middleware::Logger,
    web::{self, Data, Query},
};
use anyhow::Context as _;

use crate::{
    cl::{CatalogOptions, ServeArgs},
    cover::{self, Encoding},
    error::ResolveError,
    http::CatalogHttpClient,
    source::{Catalog, spotify::Spotify},
    token::{ClientCredentials, SystemClock, TokenCache},
};

/// Shared state of all workers
pub struct AppState {
    /// Music catalog
    catalog: Arc<dyn Catalog>,
}

impl AppState {
    /// Build state from catalog options
    pub fn new(opts: &CatalogOptions) -> anyhow::Result<Self> {
        let http = Arc::new(CatalogHttpClient::new(opts.timeout())?);
        let credentials = opts.credentials();
        if credentials.is_none() {
            log::warn!("Catalog API credentials are not set, cover requests will fail");
        }
        let tokens = TokenCache::new(
            ClientCredentials::new(Arc::clone(&http), opts.auth_url.clone(), credentials),
            SystemClock,
            opts.token_margin(),
        );
        let catalog = Spotify::new(http, opts.api_url.clone(), opts.query_style, tokens);
        Ok(Self::with_catalog(Arc::new(catalog)))
    }

    fn with_catalog(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

/// Cover request query parameters
#[derive(Debug, serde::Deserialize)]
struct CoverQuery {
    track: String,
    artist: String,
}

/// Requested response format
#[derive(Debug, Copy, Clone)]
enum Format {
    /// Match metadata as JSON
    Json,
    /// Encoded thumbnail
    Image(Encoding),
}

/// Lookup track, then transcode cover if needed
async fn resolve(
    state: &AppState,
    query: &CoverQuery,
    format: Format,
) -> Result<HttpResponse, ResolveError> {
    let result = state
        .catalog
        .find_cover(&query.track, &query.artist)
        .await?;

    match format {
        Format::Json => Ok(HttpResponse::Ok().json(result)),
        Format::Image(encoding) => {
            let data = cover::render(state.catalog.as_ref(), &result.cover_url, encoding).await?;
            Ok(HttpResponse::Ok()
                .insert_header((header::CONTENT_TYPE, encoding.content_type()))
                .body(data))
        }
    }
}

/// Run pipeline and log failures
async fn respond(
    state: &AppState,
    query: &CoverQuery,
    format: Format,
) -> Result<HttpResponse, ResolveError> {
    resolve(state, query, format).await.inspect_err(|err| {
        if !matches!(err, ResolveError::NotFound(_)) {
            log::warn!(
                "Cover request for {:?} by {:?} failed: {err}",
                query.track,
                query.artist
            );
        }
    })
}

/// `GET /cover`
async fn get_cover(
    state: Data<AppState>,
    query: Query<CoverQuery>,
) -> Result<HttpResponse, ResolveError> {
    respond(&state, &query, Format::Json).await
}

/// `GET /cover.bmp`
async fn get_cover_bmp(
    state: Data<AppState>,
    query: Query<CoverQuery>,
) -> Result<HttpResponse, ResolveError> {
    respond(&state, &query, Format::Image(Encoding::Bmp)).await
}

/// `GET /cover.rgb565`
async fn get_cover_rgb565(
    state: Data<AppState>,
    query: Query<CoverQuery>,
) -> Result<HttpResponse, ResolveError> {
    respond(&state, &query, Format::Image(Encoding::Rgb565)).await
}

/// Register cover routes
pub fn configure_service(cfg: &mut web::ServiceConfig) {
    cfg.route("/cover", web::get().to(get_cover))
        .route("/cover.bmp", web::get().to(get_cover_bmp))
        .route("/cover.rgb565", web::get().to(get_cover_rgb565));
}

/// Allow browser clients from any origin
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "HEAD"])
        .allow_any_header()
        .max_age(3600)
}

/// Serve until stopped
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let state = Data::new(AppState::new(&args.catalog)?);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::clone(&state))
            .wrap(Logger::default())
            .wrap(cors())
            .configure(configure_service)
    })
    .bind((args.host.as_str(), args.port))
    .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;

    log::info!("Listening on {}:{}", args.host, args.port);
    server.run().await.context("Server failed")
}
