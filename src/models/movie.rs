use serde::{Deserialize, Serialize};

/// A catalog movie in the shape returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub overview: String,
    /// Release date as YYYY-MM-DD, empty when the catalog has none
    pub release_date: String,
    pub vote_average: f64,
    /// Full poster URL, absent when the catalog has no artwork
    pub poster_url: Option<String>,
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub results: Vec<Movie>,
    pub total_pages: u32,
}

/// A catalog genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw movie entry as returned by TMDB listing and detail endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl TmdbMovie {
    /// Converts the raw entry into the client shape, resolving the poster
    /// path against the configured image base URL.
    pub fn into_movie(self, image_base: &str) -> Movie {
        Movie {
            id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default(),
            release_date: self.release_date.unwrap_or_default(),
            vote_average: self.vote_average.unwrap_or(0.0),
            poster_url: self.poster_path.map(|path| format!("{}{}", image_base, path)),
        }
    }
}

/// Raw paged listing response from TMDB
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
}

fn default_total_pages() -> u32 {
    1
}

/// Raw genre list response from TMDB
#[derive(Debug, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

    #[test]
    fn test_tmdb_movie_into_movie_with_poster() {
        let raw = TmdbMovie {
            id: 27205,
            title: "Inception".to_string(),
            overview: Some("A thief who steals corporate secrets".to_string()),
            release_date: Some("2010-07-15".to_string()),
            vote_average: Some(8.4),
            poster_path: Some("/inception.jpg".to_string()),
        };

        let movie = raw.into_movie(IMAGE_BASE);
        assert_eq!(movie.id, 27205);
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.release_date, "2010-07-15");
        assert_eq!(
            movie.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/inception.jpg")
        );
    }

    #[test]
    fn test_tmdb_movie_into_movie_fills_missing_fields() {
        let raw: TmdbMovie = serde_json::from_str(r#"{"id": 42}"#).unwrap();

        let movie = raw.into_movie(IMAGE_BASE);
        assert_eq!(movie.id, 42);
        assert_eq!(movie.title, "");
        assert_eq!(movie.overview, "");
        assert_eq!(movie.release_date, "");
        assert_eq!(movie.vote_average, 0.0);
        assert_eq!(movie.poster_url, None);
    }

    #[test]
    fn test_tmdb_page_defaults_total_pages_to_one() {
        let page: TmdbPage = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(page.total_pages, 1);
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_tmdb_genre_list_deserialization() {
        let json = r#"{"genres": [{"id": 28, "name": "Action"}, {"id": 35, "name": "Comedy"}]}"#;
        let list: TmdbGenreList = serde_json::from_str(json).unwrap();

        assert_eq!(list.genres.len(), 2);
        assert_eq!(
            list.genres[0],
            Genre {
                id: 28,
                name: "Action".to_string()
            }
        );
    }
}
