//! JSON manifest resolver.
//!
//! Series locator → `{"title", "servers": [{"name", "episodes": [{"id", "name", "link"}]}]}`.
//! Item locator → `{"grabber", "params": {"token", "options"}}`.
//! Grabber URL queried with `id`, `token` and `options` → `{"data": [{"file", "label"}]}`.
//!
//! Relative links are resolved against the URL of the document they appear in.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::{LinkResolver, ResolveError, SeriesResolver, SourceFile};
use crate::download::{HttpClient, RateLimiter};
use crate::series::{Item, SeriesInfo};

#[derive(Debug, Deserialize)]
struct SeriesDocument {
    title: String,
    #[serde(default)]
    servers: Vec<ServerDocument>,
}

#[derive(Debug, Deserialize)]
struct ServerDocument {
    name: String,
    #[serde(default)]
    episodes: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct EpisodeInfo {
    grabber: String,
    params: GrabberParams,
}

#[derive(Debug, Deserialize)]
struct GrabberParams {
    token: String,
    #[serde(default)]
    options: String,
}

#[derive(Debug, Deserialize)]
struct GrabberResponse {
    data: Vec<SourceFile>,
}

/// Resolves series and items from JSON documents served over HTTP.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    client: HttpClient,
    server: Option<String>,
}

impl ManifestResolver {
    /// Creates a resolver that takes items from `server` when listed,
    /// otherwise from the first listed server.
    #[must_use]
    pub fn new(client: HttpClient, server: Option<String>) -> Self {
        Self { client, server }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResolveError> {
        self.client
            .get_json::<T>(url)
            .await
            .map_err(ResolveError::http)?
            .map_err(|e| ResolveError::malformed(url, e.to_string()))
    }

    fn pick_server(&self, servers: Vec<ServerDocument>) -> Option<ServerDocument> {
        let wanted = self.server.as_deref();
        let position = wanted
            .and_then(|name| servers.iter().position(|server| server.name.trim() == name))
            .unwrap_or(0);
        servers.into_iter().nth(position)
    }
}

#[async_trait]
impl SeriesResolver for ManifestResolver {
    #[instrument(skip(self))]
    async fn resolve_series(&self, page_url: &str) -> Result<SeriesInfo, ResolveError> {
        let base = parse_url(page_url)?;
        let document: SeriesDocument = self.fetch(page_url).await?;

        let server = self
            .pick_server(document.servers)
            .ok_or_else(|| ResolveError::no_servers(page_url))?;

        let items = server
            .episodes
            .into_iter()
            .map(|episode| {
                let locator = join(&base, &episode.locator)?;
                Ok(Arc::new(Item { locator, ..episode }))
            })
            .collect::<Result<Vec<_>, ResolveError>>()?;

        info!(
            title = %document.title,
            server = %server.name.trim(),
            items = items.len(),
            "resolved series"
        );

        Ok(SeriesInfo {
            title: document.title,
            items,
            server: server.name.trim().to_string(),
        })
    }
}

#[async_trait]
impl LinkResolver for ManifestResolver {
    #[instrument(skip(self, item, rate_limiter), fields(item = %item.name))]
    async fn resolve_sources(
        &self,
        item: &Item,
        rate_limiter: &RateLimiter,
    ) -> Result<Vec<SourceFile>, ResolveError> {
        let info: EpisodeInfo = self.fetch(&item.locator).await?;

        let info_url = parse_url(&item.locator)?;
        let mut grabber = parse_url(&join(&info_url, &info.grabber)?)?;
        grabber
            .query_pairs_mut()
            .append_pair("id", &item.id)
            .append_pair("token", &info.params.token)
            .append_pair("options", &info.params.options);
        debug!(grabber = %grabber, "fetching file list");

        rate_limiter.acquire().await;
        let response: GrabberResponse = self.fetch(grabber.as_str()).await?;
        debug!(sources = response.data.len(), "received file list");
        Ok(response.data)
    }
}

fn parse_url(url: &str) -> Result<Url, ResolveError> {
    Url::parse(url).map_err(|e| ResolveError::malformed(url, format!("invalid URL: {e}")))
}

fn join(base: &Url, link: &str) -> Result<String, ResolveError> {
    base.join(link)
        .map(String::from)
        .map_err(|e| ResolveError::malformed(base.as_str(), format!("invalid link {link:?}: {e}")))
}
