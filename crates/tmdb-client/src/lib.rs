//! ReviewDesk TMDB Client
//!
//! HTTP client for The Movie Database v3 API with built-in usage
//! accounting.
//!
//! Every successful call that represents real catalog usage reports itself
//! to a [`UsageSink`] exactly once:
//!
//! | operation | kind | subject |
//! |-----------|------|---------|
//! | [`TmdbClient::search`] | `search` | 0 |
//! | [`TmdbClient::popular`] | `list_popular` | 0 |
//! | [`TmdbClient::movie_details`] | `detail` | movie id |
//! | [`TmdbClient::check_connectivity`] | `status_probe` | 0 |
//!
//! Failed calls are never recorded. The sink is fire-and-forget, so
//! accounting cannot delay or fail the call itself.
//!
//! # Example
//! ```ignore
//! use reviewdesk_tmdb_client::{TmdbClient, TmdbConfig};
//!
//! let client = TmdbClient::without_accounting(TmdbConfig::from_env())?;
//! let page = client.search("parasite", 1).await?;
//! ```

use async_trait::async_trait;
use reviewdesk_usage_core::{validation, CallKind, NoopSink, UsageSink, NO_SUBJECT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub mod config;
pub mod error;
pub mod types;

pub use config::TmdbConfig;
pub use error::{Result, TmdbError};
pub use types::{
    image_url, Genre, ImageSize, Movie, MovieDetails, Page, ProductionCompany, SubjectMetadata,
};

const SEARCH_PATH: &str = "/search/movie";
const POPULAR_PATH: &str = "/movie/popular";
const PROBE_PATH: &str = "/authentication/token/new";

/// Looks up display metadata for a catalog subject
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn resolve_subject(&self, subject_id: i64) -> Result<SubjectMetadata>;
}

/// Live connectivity check against the catalog
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

/// TMDB API client
#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    config: TmdbConfig,
    sink: Arc<dyn UsageSink>,
}

impl TmdbClient {
    /// Create a client that reports usage to `sink`
    pub fn new(config: TmdbConfig, sink: Arc<dyn UsageSink>) -> Result<Self> {
        config.validate().map_err(TmdbError::Client)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TmdbError::Client(e.to_string()))?;

        Ok(Self { http, config, sink })
    }

    /// Create a client that records nothing
    pub fn without_accounting(config: TmdbConfig) -> Result<Self> {
        Self::new(config, Arc::new(NoopSink))
    }

    pub fn config(&self) -> &TmdbConfig {
        &self.config
    }

    /// Search movies by title
    ///
    /// Issues exactly one request; an empty result set is a valid answer.
    pub async fn search(&self, query: &str, page: u32) -> Result<Page<Movie>> {
        validation::validate_search_query(query)?;
        validation::validate_page(page)?;

        let params = [
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("language", self.config.language.clone()),
            ("region", self.config.region.clone()),
            ("include_adult", self.config.include_adult.to_string()),
        ];
        let results: Page<Movie> = self.get_json(SEARCH_PATH, &params).await?;

        self.sink.record(CallKind::Search, NO_SUBJECT, SEARCH_PATH);
        Ok(results)
    }

    /// Currently popular movies in the configured region
    pub async fn popular(&self, page: u32) -> Result<Page<Movie>> {
        validation::validate_page(page)?;

        let params = [
            ("page", page.to_string()),
            ("language", self.config.language.clone()),
            ("region", self.config.region.clone()),
        ];
        let results: Page<Movie> = self.get_json(POPULAR_PATH, &params).await?;

        self.sink.record(CallKind::ListPopular, NO_SUBJECT, POPULAR_PATH);
        Ok(results)
    }

    /// Full details for one movie, recorded as a `detail` call
    pub async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails> {
        let (path, details) = self.request_details(movie_id).await?;

        self.sink.record(CallKind::Detail, movie_id, &path);
        Ok(details)
    }

    /// Full details for one movie without recording usage
    ///
    /// For internal enrichment (e.g. labelling a ranking) where the lookup
    /// is not a user-initiated catalog query.
    pub async fn fetch_movie_details(&self, movie_id: i64) -> Result<MovieDetails> {
        let (_, details) = self.request_details(movie_id).await?;
        Ok(details)
    }

    /// Check that TMDB accepts our key, recording a `status_probe` on success
    pub async fn check_connectivity(&self) -> Result<()> {
        self.send(PROBE_PATH, &[]).await?;

        self.sink.record(CallKind::StatusProbe, NO_SUBJECT, PROBE_PATH);
        Ok(())
    }

    /// Connectivity check that reports failure as `false`
    pub async fn probe_connectivity(&self) -> bool {
        match self.check_connectivity().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "TMDB API status check failed");
                false
            }
        }
    }

    async fn request_details(&self, movie_id: i64) -> Result<(String, MovieDetails)> {
        validation::validate_subject_id(movie_id)?;

        let path = format!("/movie/{}", movie_id);
        let params = [("language", self.config.language.clone())];
        let details: MovieDetails = self.get_json(&path, &params).await?;
        Ok((path, details))
    }

    /// Build the request URL for `path` with the api key and `params`
    fn endpoint_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.config.api_key);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = self.endpoint_url(path, params)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TmdbError::transport(path, e))?;

        let status = response.status();
        debug!(endpoint = path, status = status.as_u16(), "TMDB response");

        if !status.is_success() {
            warn!(endpoint = path, status = status.as_u16(), "TMDB request failed");
            return Err(TmdbError::status(path, status));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let response = self.send(path, params).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TmdbError::decode(path, e))
    }
}

#[async_trait]
impl SubjectResolver for TmdbClient {
    async fn resolve_subject(&self, subject_id: i64) -> Result<SubjectMetadata> {
        let details = self.fetch_movie_details(subject_id).await?;
        Ok(SubjectMetadata::from(&details))
    }
}

#[async_trait]
impl ConnectivityProbe for TmdbClient {
    async fn probe(&self) -> Result<()> {
        self.check_connectivity().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> TmdbClient {
        TmdbClient::without_accounting(
            TmdbConfig::default()
                .with_api_key("test-key")
                .with_base_url(base_url),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_url_keeps_version_prefix() {
        let client = client("https://api.themoviedb.org/3");
        let url = client
            .endpoint_url("/movie/popular", &[("page", "2".to_string())])
            .unwrap();

        assert_eq!(url.path(), "/3/movie/popular");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("api_key".to_string(), "test-key".to_string())));
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn test_endpoint_url_tolerates_trailing_slash() {
        let client = client("https://api.themoviedb.org/3/");
        let url = client.endpoint_url("/search/movie", &[]).unwrap();
        assert_eq!(url.path(), "/3/search/movie");
    }

    #[test]
    fn test_endpoint_url_encodes_query() {
        let client = client("https://api.themoviedb.org/3");
        let url = client
            .endpoint_url("/search/movie", &[("query", "the host & co".to_string())])
            .unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("query=the+host+%26+co"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = TmdbClient::without_accounting(TmdbConfig::default().with_base_url("::"));
        assert!(matches!(result, Err(TmdbError::Client(_))));
    }
}
