//! TMDB wire types
//!
//! Only the fields the admin console uses are modelled. Everything is
//! defaulted so a sparse record from TMDB still decodes, and an explicit
//! `null` in a string or list field decodes as empty.

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Paged TMDB listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Movie as returned by search and listing endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub original_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub genre_ids: Vec<i64>,
    pub adult: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Genre {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionCompany {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub logo_path: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub origin_country: String,
}

/// Full record from `/movie/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tagline: String,
    #[serde(deserialize_with = "null_as_default")]
    pub production_companies: Vec<ProductionCompany>,
}

/// Display metadata for a catalog subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMetadata {
    pub title: String,
    pub alternate_title: String,
}

impl From<&MovieDetails> for SubjectMetadata {
    fn from(details: &MovieDetails) -> Self {
        Self {
            title: details.movie.title.clone(),
            alternate_title: details.movie.original_title.clone(),
        }
    }
}

/// Poster/backdrop rendition size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    W500,
    Original,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W500 => "w500",
            ImageSize::Original => "original",
        }
    }
}

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// Absolute image URL for a TMDB poster or backdrop path
pub fn image_url(path: Option<&str>, size: ImageSize) -> Option<String> {
    match path {
        Some(p) if !p.is_empty() => Some(format!("{}/{}{}", IMAGE_BASE_URL, size.as_str(), p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url(Some("/abc.jpg"), ImageSize::W500).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(
            image_url(Some("/abc.jpg"), ImageSize::Original).as_deref(),
            Some("https://image.tmdb.org/t/p/original/abc.jpg")
        );
        assert_eq!(image_url(None, ImageSize::W500), None);
        assert_eq!(image_url(Some(""), ImageSize::W500), None);
    }

    #[test]
    fn test_details_decode_flattened() {
        let json = serde_json::json!({
            "id": 496243,
            "title": "기생충",
            "original_title": "기생충",
            "runtime": 132,
            "genres": [{"id": 35, "name": "코미디"}],
            "status": "Released"
        });

        let details: MovieDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.movie.id, 496243);
        assert_eq!(details.runtime, Some(132));
        assert_eq!(details.genres[0].name, "코미디");
        assert!(details.production_companies.is_empty());

        let meta = SubjectMetadata::from(&details);
        assert_eq!(meta.title, "기생충");
    }

    #[test]
    fn test_null_strings_decode_as_empty() {
        let json = serde_json::json!({
            "id": 1,
            "title": "A",
            "original_title": "A",
            "overview": null,
            "release_date": null,
            "tagline": null,
            "status": null,
            "genres": null,
            "production_companies": [{"id": 3, "name": "CJ", "origin_country": null}]
        });

        let details: MovieDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.movie.title, "A");
        assert_eq!(details.movie.overview, "");
        assert_eq!(details.movie.release_date, "");
        assert_eq!(details.tagline, "");
        assert_eq!(details.status, "");
        assert!(details.genres.is_empty());
        assert_eq!(details.production_companies[0].origin_country, "");
    }

    #[test]
    fn test_page_decode() {
        let json = serde_json::json!({
            "page": 1,
            "results": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}],
            "total_pages": 3,
            "total_results": 41
        });

        let page: Page<Movie> = serde_json::from_value(json).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.total_results, 41);
    }
}
