//! API client library for moviecat.
//!
//! Provides an authenticated client for the movie catalog API: bearer token
//! caching, one-shot recovery from token expiry, and normalized responses.

/// Movie catalog API client.
pub mod catalog;
