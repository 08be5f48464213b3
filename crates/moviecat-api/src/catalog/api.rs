//! `CatalogApi` trait definition.
#![allow(clippy::future_not_send)]

use super::error::Result;
use super::types::{GenreListing, Movie, MoviesPage, SearchMoviesParams};

/// Movie catalog API trait.
///
/// Abstracts the catalog operations for mock substitution in callers.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(CatalogApi: Send)]
pub trait LocalCatalogApi {
    /// Searches movies, one page at a time.
    ///
    /// Empty `search`/`genre` filters are not sent. `page` and `limit`
    /// are passed through unclamped.
    ///
    /// # Errors
    ///
    /// - `AuthFailure` / `InvalidResponseShape` if no token can be obtained.
    /// - `RequestFailure` on a non-2xx response (after one 401 recovery).
    /// - `InvalidResponseShape` if the body lacks `data` or `totalPages`.
    async fn search_movies(&self, params: &SearchMoviesParams) -> Result<MoviesPage>;

    /// Fetches a single movie by ID.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `id` is empty; no request is sent.
    /// - Otherwise the same as [`LocalCatalogApi::search_movies`].
    async fn movie_details(&self, id: &str) -> Result<Movie>;

    /// Fetches every genre together with its movies.
    ///
    /// # Errors
    ///
    /// - `InvalidResponseShape` if the body matches neither known envelope.
    /// - Otherwise the same as [`LocalCatalogApi::search_movies`].
    async fn genres_with_movies(&self) -> Result<GenreListing>;
}
