//! Catalog queries and the values derived from them.
//!
//! A [`CatalogQuery`] names one slice of the upstream movie catalog. Everything
//! the proxy needs to serve it is a pure function of the query:
//!
//! - [`CatalogQuery::cache_key`] gives the key used for cache reads and writes
//! - [`CatalogQuery::upstream_request`] gives the endpoint and parameters sent upstream

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

const TOP_KEY: &str = "catalog:top";
const GENRE_KEY_PREFIX: &str = "catalog:genre:";

const POPULAR_ENDPOINT: &str = "/movie/popular";
const DISCOVER_ENDPOINT: &str = "/discover/movie";

/// Genre identifier as accepted by the upstream `with_genres` filter.
///
/// Usually numeric (`28`), but kept opaque so that list forms such as `28,12`
/// pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenreId(String);

impl GenreId {
    /// Build a genre id, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_genre_id(raw.as_ref()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for GenreId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<u32> for GenreId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to fetch from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogQuery {
    /// The fixed "popular movies" slice.
    Top,
    /// Movies filtered by genre.
    ByGenre(GenreId),
}

impl CatalogQuery {
    pub fn by_genre(genre: impl Into<GenreId>) -> Self {
        Self::ByGenre(genre.into())
    }

    /// Derive the cache key for this query.
    ///
    /// Equal queries always map to equal keys; the two query shapes use
    /// disjoint prefixes so they never collide with each other.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::Top => CacheKey(TOP_KEY.to_string()),
            Self::ByGenre(genre) => CacheKey(format!("{GENRE_KEY_PREFIX}{genre}")),
        }
    }

    /// Derive the upstream endpoint and query parameters for this query.
    ///
    /// Credentials and language are added by the upstream client.
    pub fn upstream_request(&self) -> UpstreamRequest {
        match self {
            Self::Top => UpstreamRequest {
                endpoint: POPULAR_ENDPOINT,
                params: Vec::new(),
            },
            Self::ByGenre(genre) => UpstreamRequest {
                endpoint: DISCOVER_ENDPOINT,
                params: vec![("with_genres", genre.to_string())],
            },
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::ByGenre(_) => "by_genre",
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::ByGenre(genre) => write!(f, "genre {genre}"),
        }
    }
}

/// Cache key derived from a [`CatalogQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Endpoint path plus ordered query parameters for one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub endpoint: &'static str,
    pub params: Vec<(&'static str, String)>,
}
