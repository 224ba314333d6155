use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{Genre, Movie, MoviePage, TmdbGenreList, TmdbMovie, TmdbPage},
};

/// Upstream calls are bounded so a slow catalog cannot hold handlers open
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// TMDB rejects page numbers above 500 regardless of the reported total
pub const MAX_PAGE_COUNT: u32 = 500;

/// Listing variants that map to dedicated catalog endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    Popular,
    TopRated,
}

/// Movie catalog abstraction
///
/// The catalog owns every read against the external movie database: paged
/// listings, the genre index, detail lookups, and title search. Community
/// data never lives here.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetches one page of movies
    ///
    /// A search query takes precedence over a genre filter, which takes
    /// precedence over the listing variant.
    async fn get_movies(
        &self,
        query: Option<&str>,
        genre_id: Option<i32>,
        page: u32,
        filter: ListFilter,
    ) -> AppResult<MoviePage>;

    /// Fetches the full genre index
    async fn genre_list(&self) -> AppResult<Vec<Genre>>;

    /// Looks up a single movie by catalog id
    ///
    /// Returns `Ok(None)` when the catalog does not know the id, so callers
    /// can drop stale ids without treating them as failures.
    async fn movie_by_id(&self, movie_id: i64) -> AppResult<Option<Movie>>;

    /// Returns the best search hit for a title, `None` when nothing matches
    async fn search_first(&self, title: &str) -> AppResult<Option<Movie>>;
}

/// TMDB-backed catalog client
///
/// API flow:
/// 1. Listings: /movie/popular, /movie/top_rated, /discover/movie, /search/movie
/// 2. Details: /movie/{id}
/// 3. Genres: /genre/movie/list
///
/// Every request carries the api_key and language query parameters; poster
/// paths are resolved against the configured image base URL.
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_base: String,
    language: String,
}

impl TmdbCatalog {
    /// Creates a new TMDB catalog client
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_api_url.clone(),
            image_base: config.tmdb_image_base.clone(),
            language: config.tmdb_language.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json::<T>().await?)
    }

    fn to_page(&self, raw: TmdbPage) -> MoviePage {
        MoviePage {
            results: raw
                .results
                .into_iter()
                .map(|movie| movie.into_movie(&self.image_base))
                .collect(),
            total_pages: raw.total_pages.min(MAX_PAGE_COUNT),
        }
    }
}

/// Picks the endpoint and its parameters for a listing request
fn plan_listing(
    query: Option<&str>,
    genre_id: Option<i32>,
    filter: ListFilter,
) -> (&'static str, Vec<(&'static str, String)>) {
    if let Some(query) = query {
        return ("/search/movie", vec![("query", query.to_string())]);
    }

    if let Some(genre_id) = genre_id {
        return (
            "/discover/movie",
            vec![
                ("with_genres", genre_id.to_string()),
                ("sort_by", "popularity.desc".to_string()),
            ],
        );
    }

    match filter {
        ListFilter::Popular => ("/movie/popular", Vec::new()),
        ListFilter::TopRated => ("/movie/top_rated", Vec::new()),
    }
}

#[async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn get_movies(
        &self,
        query: Option<&str>,
        genre_id: Option<i32>,
        page: u32,
        filter: ListFilter,
    ) -> AppResult<MoviePage> {
        let (path, mut params) = plan_listing(query, genre_id, filter);
        params.push(("page", page.to_string()));

        let raw: TmdbPage = self.get_json(path, &params).await?;
        let listing = self.to_page(raw);

        tracing::info!(
            path = path,
            page = page,
            results = listing.results.len(),
            total_pages = listing.total_pages,
            "Movie listing fetched"
        );

        Ok(listing)
    }

    async fn genre_list(&self) -> AppResult<Vec<Genre>> {
        let raw: TmdbGenreList = self.get_json("/genre/movie/list", &[]).await?;

        tracing::info!(genres = raw.genres.len(), "Genre index fetched");

        Ok(raw.genres)
    }

    async fn movie_by_id(&self, movie_id: i64) -> AppResult<Option<Movie>> {
        let url = format!("{}/movie/{}", self.api_url, movie_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(movie_id = movie_id, "Movie id unknown to the catalog");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let raw: TmdbMovie = response.json().await?;
        Ok(Some(raw.into_movie(&self.image_base)))
    }

    async fn search_first(&self, title: &str) -> AppResult<Option<Movie>> {
        let params = [("query", title.to_string()), ("page", "1".to_string())];
        let raw: TmdbPage = self.get_json("/search/movie", &params).await?;

        let movie = raw
            .results
            .into_iter()
            .next()
            .map(|hit| hit.into_movie(&self.image_base));

        if movie.is_none() {
            tracing::debug!(title = %title, "No catalog match for title");
        }

        Ok(movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    fn create_test_catalog() -> TmdbCatalog {
        catalog_at("http://test.local".to_string())
    }

    fn catalog_at(api_url: String) -> TmdbCatalog {
        TmdbCatalog {
            http_client: HttpClient::new(),
            api_key: "test_key".to_string(),
            api_url,
            image_base: "https://image.test/w500".to_string(),
            language: "en-US".to_string(),
        }
    }

    /// Serves the routes on an ephemeral local port and points a catalog at it
    async fn catalog_with_upstream(routes: Router) -> TmdbCatalog {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, routes).await.unwrap();
        });

        catalog_at(api_url)
    }

    #[test]
    fn test_plan_listing_query_takes_precedence() {
        let (path, params) = plan_listing(Some("dune"), Some(28), ListFilter::TopRated);

        assert_eq!(path, "/search/movie");
        assert_eq!(params, vec![("query", "dune".to_string())]);
    }

    #[test]
    fn test_plan_listing_genre_over_filter() {
        let (path, params) = plan_listing(None, Some(28), ListFilter::TopRated);

        assert_eq!(path, "/discover/movie");
        assert_eq!(params[0], ("with_genres", "28".to_string()));
        assert_eq!(params[1], ("sort_by", "popularity.desc".to_string()));
    }

    #[test]
    fn test_plan_listing_popular_default() {
        let (path, params) = plan_listing(None, None, ListFilter::Popular);

        assert_eq!(path, "/movie/popular");
        assert!(params.is_empty());
    }

    #[test]
    fn test_plan_listing_top_rated() {
        let (path, _) = plan_listing(None, None, ListFilter::TopRated);
        assert_eq!(path, "/movie/top_rated");
    }

    #[test]
    fn test_to_page_clamps_total_pages() {
        let catalog = create_test_catalog();
        let raw: TmdbPage = serde_json::from_str(
            r#"{"results": [{"id": 1, "title": "A", "poster_path": "/a.jpg"}], "total_pages": 8123}"#,
        )
        .unwrap();

        let page = catalog.to_page(raw);
        assert_eq!(page.total_pages, MAX_PAGE_COUNT);
        assert_eq!(
            page.results[0].poster_url.as_deref(),
            Some("https://image.test/w500/a.jpg")
        );
    }

    #[test]
    fn test_to_page_keeps_small_totals() {
        let catalog = create_test_catalog();
        let raw: TmdbPage = serde_json::from_str(r#"{"results": [], "total_pages": 42}"#).unwrap();

        assert_eq!(catalog.to_page(raw).total_pages, 42);
    }

    #[tokio::test]
    async fn test_movie_by_id_maps_upstream_404_to_none() {
        let routes = Router::new().route(
            "/movie/:id",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({
                        "status_message": "The resource you requested could not be found."
                    })),
                )
            }),
        );
        let catalog = catalog_with_upstream(routes).await;

        let movie = catalog.movie_by_id(999_999_999).await.unwrap();
        assert_eq!(movie, None);
    }

    #[tokio::test]
    async fn test_movie_by_id_surfaces_upstream_failures() {
        let routes = Router::new().route(
            "/movie/:id",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
        let catalog = catalog_with_upstream(routes).await;

        let err = catalog.movie_by_id(603).await.unwrap_err();
        match err {
            AppError::ExternalApi(msg) => assert!(msg.contains("500")),
            other => panic!("expected external api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_movie_by_id_resolves_known_ids() {
        let routes = Router::new().route(
            "/movie/:id",
            get(|| async {
                Json(json!({
                    "id": 603,
                    "title": "The Matrix",
                    "poster_path": "/matrix.jpg"
                }))
            }),
        );
        let catalog = catalog_with_upstream(routes).await;

        let movie = catalog.movie_by_id(603).await.unwrap().unwrap();
        assert_eq!(movie.id, 603);
        assert_eq!(movie.title, "The Matrix");
        assert_eq!(
            movie.poster_url.as_deref(),
            Some("https://image.test/w500/matrix.jpg")
        );
    }
}
