//! Movie catalog API client module.
//!
//! Acquires and caches the bearer token, attaches it to every request,
//! and decodes the movie search, movie details and genre listing endpoints.

mod api;
mod client;
mod error;
mod normalize;
mod token;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{CatalogApi, LocalCatalogApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{ApiRequest, CatalogClient, CatalogClientBuilder, DEFAULT_BASE_URL};
#[allow(clippy::module_name_repetitions)]
pub use error::{CatalogError, Result};
pub use types::{
    GenreListing, GenreRef, GenreWithMovies, Movie, MoviesPage, NumberOrString,
    SearchMoviesParams,
};
