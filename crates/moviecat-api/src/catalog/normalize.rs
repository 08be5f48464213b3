//! Response normalizers.
//!
//! Each function takes the raw JSON returned by the executor and decodes it
//! into a domain type, mapping any mismatch to
//! [`CatalogError::InvalidResponseShape`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{CatalogError, Result};
use super::types::{GenreListing, Movie, MoviesPage};

/// Envelopes the `genres/movies` endpoint is known to use.
///
/// Variants are tried in declaration order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGenreListing {
    /// `{ "genResults": { "data": [...] } }`
    Wrapped {
        #[serde(rename = "genResults")]
        gen_results: GenreListing,
    },
    /// `{ "data": [...] }`
    Bare(GenreListing),
}

impl From<RawGenreListing> for GenreListing {
    fn from(raw: RawGenreListing) -> Self {
        match raw {
            RawGenreListing::Wrapped { gen_results } => gen_results,
            RawGenreListing::Bare(listing) => listing,
        }
    }
}

/// Decodes `raw` into `T`, labelling failures with `what`.
fn decode<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T> {
    serde_json::from_value(raw)
        .map_err(|e| CatalogError::InvalidResponseShape(format!("{what}: {e}")))
}

/// Normalizes a `movies` search response (`data` + `totalPages`).
pub(crate) fn movies_page(raw: Value) -> Result<MoviesPage> {
    decode(raw, "unexpected movies response shape")
}

/// Normalizes a `movies/{id}` response.
pub(crate) fn movie(raw: Value) -> Result<Movie> {
    decode(raw, "unexpected movie details response shape")
}

/// Normalizes a `genres/movies` response, accepting either envelope.
pub(crate) fn genre_listing(raw: Value) -> Result<GenreListing> {
    serde_json::from_value::<RawGenreListing>(raw)
        .map(GenreListing::from)
        .map_err(|_| {
            CatalogError::InvalidResponseShape(String::from(
                "unexpected genres/movies response shape",
            ))
        })
}

/// Validates a movie ID before any request is made.
pub(crate) fn movie_id(id: &str) -> Result<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidArgument(String::from(
            "movie id is required",
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use serde_json::json;

    use super::*;

    fn genre_x() -> Value {
        json!({
            "id": "g1",
            "title": "Action",
            "movies": [{"id": "1", "title": "A"}]
        })
    }

    #[test]
    fn test_genre_listing_wrapped_envelope() {
        // Arrange
        let raw = json!({"genResults": {"data": [genre_x()]}});

        // Act
        let listing = genre_listing(raw).unwrap();

        // Assert
        assert_eq!(listing.data.len(), 1);
        assert_eq!(listing.data[0].title, "Action");
        assert_eq!(listing.data[0].movies[0].id, "1");
    }

    #[test]
    fn test_genre_listing_bare_envelope() {
        // Arrange
        let raw = json!({"data": [genre_x()]});

        // Act
        let listing = genre_listing(raw).unwrap();

        // Assert
        assert_eq!(listing.data.len(), 1);
        assert_eq!(listing.data[0].id, "g1");
    }

    #[test]
    fn test_genre_listing_envelopes_agree() {
        // Arrange
        let wrapped = json!({"genResults": {"data": [genre_x()]}});
        let bare = json!({"data": [genre_x()]});

        // Act & Assert
        assert_eq!(genre_listing(wrapped).unwrap(), genre_listing(bare).unwrap());
    }

    #[test]
    fn test_genre_listing_falls_back_when_wrapper_is_malformed() {
        // Arrange
        let raw = json!({"genResults": {"oops": true}, "data": [genre_x()]});

        // Act
        let listing = genre_listing(raw).unwrap();

        // Assert
        assert_eq!(listing.data.len(), 1);
    }

    #[test]
    fn test_genre_listing_unknown_shape() {
        // Arrange
        let raw = json!({"foo": 1});

        // Act
        let result = genre_listing(raw);

        // Assert
        assert!(matches!(result, Err(CatalogError::InvalidResponseShape(_))));
    }

    #[test]
    fn test_genre_listing_data_not_a_list() {
        // Arrange
        let raw = json!({"data": "nope"});

        // Act & Assert
        assert!(matches!(
            genre_listing(raw),
            Err(CatalogError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn test_movies_page_passthrough() {
        // Arrange
        let raw = json!({"data": [{"id": "1", "title": "A"}], "totalPages": 3});

        // Act
        let page = movies_page(raw).unwrap();

        // Assert
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data[0].id, "1");
        assert_eq!(page.data[0].title, "A");
    }

    #[test]
    fn test_movies_page_missing_total_pages() {
        // Arrange
        let raw = json!({"data": []});

        // Act
        let result = movies_page(raw);

        // Assert
        let err = result.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidResponseShape(_)));
        assert!(err.to_string().contains("totalPages"));
    }

    #[test]
    fn test_movies_page_keeps_movies_with_off_type_fields() {
        // Arrange
        let raw = json!({
            "data": [
                {"id": "1", "title": "A", "directors": ["Ann"]},
                {"id": "2", "title": "B", "directors": "X", "year": "n/a"}
            ],
            "totalPages": 1
        });

        // Act
        let page = movies_page(raw).unwrap();

        // Assert
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].directors, Some(vec![String::from("Ann")]));
        assert_eq!(page.data[1].directors, Some(vec![String::from("X")]));
        assert_eq!(page.data[1].year, None);
    }

    #[test]
    fn test_movie_with_director_string() {
        // Arrange
        let raw = json!({"id": "1", "title": "A", "directors": "Lana Wachowski"});

        // Act
        let parsed = movie(raw).unwrap();

        // Assert
        assert_eq!(parsed.directors, Some(vec![String::from("Lana Wachowski")]));
    }

    #[test]
    fn test_movie_requires_title() {
        // Arrange
        let raw = json!({"id": "1"});

        // Act & Assert
        assert!(matches!(
            movie(raw),
            Err(CatalogError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn test_movie_id_validation() {
        // Arrange & Act & Assert
        assert_eq!(movie_id("tt01").unwrap(), "tt01");
        assert_eq!(movie_id("  tt01 ").unwrap(), "tt01");
        assert!(matches!(movie_id(""), Err(CatalogError::InvalidArgument(_))));
        assert!(matches!(movie_id("   "), Err(CatalogError::InvalidArgument(_))));
    }
}
