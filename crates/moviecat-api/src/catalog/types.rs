//! Catalog API response types and search parameters.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Regex for ISO-8601 durations such as `PT2H10M`.
#[allow(clippy::expect_used)]
static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?").expect("failed to compile duration regex")
});

/// Placeholder used when a value cannot be displayed.
const NOT_AVAILABLE: &str = "N/A";

// --- Movie ---

/// A JSON scalar the API sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    /// Numeric form.
    Number(f64),
    /// String form.
    Text(String),
}

impl fmt::Display for NumberOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Genre reference embedded in a movie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenreRef {
    /// Genre ID.
    pub id: String,
    /// Genre title (e.g. "Action").
    pub title: String,
}

/// A single movie, as returned by search and details endpoints.
///
/// Only `id` and `title` are required. An optional field of an unexpected
/// type decodes as `None`, so one odd movie never sinks a whole page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Movie ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Poster image URL.
    #[serde(default, deserialize_with = "lenient")]
    pub poster_url: Option<String>,
    /// Release year.
    #[serde(default, deserialize_with = "lenient")]
    pub year: Option<i32>,
    /// Content rating (e.g. "PG-13").
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<String>,
    /// Runtime, usually an ISO-8601 duration (`PT1H46M`).
    #[serde(default, deserialize_with = "lenient")]
    pub duration: Option<NumberOrString>,
    /// Plot summary.
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
    /// Genres the movie belongs to.
    #[serde(default, deserialize_with = "lenient")]
    pub genres: Option<Vec<GenreRef>>,
    /// Director names. A single name string becomes a one-element list.
    #[serde(default, deserialize_with = "directors")]
    pub directors: Option<Vec<String>>,
    /// Audience score.
    #[serde(default, deserialize_with = "lenient")]
    pub rating_value: Option<NumberOrString>,
    /// Maximum possible score.
    #[serde(default, deserialize_with = "lenient")]
    pub best_rating: Option<NumberOrString>,
    /// Publication date (RFC 3339 or `YYYY-MM-DD`).
    #[serde(default, deserialize_with = "lenient")]
    pub date_published: Option<String>,
}

/// Decodes an optional field, treating a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

/// `directors` as sent by the API: a list of names or one name.
#[derive(Deserialize)]
#[serde(untagged)]
enum Names {
    Many(Vec<String>),
    One(String),
}

fn directors<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, Names>(deserializer)?.map(|names| match names {
        Names::Many(list) => list,
        Names::One(name) => vec![name],
    }))
}

impl Movie {
    /// Formats the runtime for display.
    ///
    /// `PT1H30M` becomes `"1h 30m"`, a bare number is taken as minutes,
    /// and anything else yields `"N/A"`.
    #[must_use]
    pub fn display_duration(&self) -> String {
        match &self.duration {
            Some(NumberOrString::Text(iso)) => format_iso_duration(iso),
            Some(NumberOrString::Number(minutes)) if minutes.is_finite() && *minutes >= 0.0 => {
                format!("{minutes}m")
            }
            _ => String::from(NOT_AVAILABLE),
        }
    }

    /// Returns the year of `date_published`, if it parses.
    #[must_use]
    pub fn published_year(&self) -> Option<i32> {
        let date = self.date_published.as_deref()?;
        DateTime::parse_from_rfc3339(date)
            .map(|dt| dt.year())
            .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d").map(|d| d.year()))
            .ok()
    }
}

/// Formats an ISO-8601 `PT#H#M` duration as `"#h #m"`.
fn format_iso_duration(iso: &str) -> String {
    let Some(caps) = ISO_DURATION_RE.captures(iso) else {
        return String::from(NOT_AVAILABLE);
    };

    let parts: Vec<String> = [(1, 'h'), (2, 'm')]
        .into_iter()
        .filter_map(|(group, unit)| caps.get(group).map(|m| format!("{}{unit}", m.as_str())))
        .collect();

    if parts.is_empty() {
        String::from(NOT_AVAILABLE)
    } else {
        parts.join(" ")
    }
}

// --- Movie Search ---

/// One page of `movies` search results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesPage {
    /// Movies on the current page.
    pub data: Vec<Movie>,
    /// Total number of pages.
    pub total_pages: u32,
}

// --- Genres ---

/// A genre together with its movies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenreWithMovies {
    /// Genre ID.
    pub id: String,
    /// Genre title.
    pub title: String,
    /// Movies in this genre.
    pub movies: Vec<Movie>,
}

/// Normalized `genres/movies` listing, independent of the envelope the
/// backend used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenreListing {
    /// Genres with their movies.
    pub data: Vec<GenreWithMovies>,
}

impl GenreListing {
    /// Returns the distinct genre titles in ascending order.
    #[must_use]
    pub fn sorted_titles(&self) -> Vec<&str> {
        self.data
            .iter()
            .map(|g| g.title.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// --- Search Parameters ---

/// Parameters for the `movies` search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMoviesParams {
    /// Page number (1-based). Not clamped.
    pub page: u32,
    /// Page size. Not clamped.
    pub limit: u32,
    /// Free-text title search.
    pub search: Option<String>,
    /// Genre title filter.
    pub genre: Option<String>,
}

impl SearchMoviesParams {
    /// Creates params for the given page and page size.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            search: None,
            genre: None,
        }
    }

    /// Sets the title search text.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Sets the genre filter.
    #[must_use]
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Builds the query pairs. Empty `search`/`genre` values are omitted.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query: Vec<(&'static str, String)> = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", String::from(search)));
        }
        if let Some(genre) = self.genre.as_deref().filter(|g| !g.is_empty()) {
            query.push(("genre", String::from(genre)));
        }
        query
    }
}
