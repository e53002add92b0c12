//! Geocoding domain: endpoints, queries, cache keys, and the [`Geocoder`].
//!
//! A [`GeocodeQuery`] is built once per request by the validators, already
//! normalized. The geocoder derives its cache key, runs it through
//! [`CacheAside`], and calls the provider only on a miss.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::{Cache, CacheAside};
use crate::upstream::{PlacesProvider, ResultArray, UpstreamError};

pub mod envelope;
pub mod handlers;

/// The three proxied operations.
///
/// The name doubles as the cache key prefix and the last URL path segment,
/// so keys from different endpoints never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ReverseGeocode,
    Geocode,
    Autocomplete,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Self::ReverseGeocode, Self::Geocode, Self::Autocomplete];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReverseGeocode => "reverse-geocode",
            Self::Geocode => "geocode",
            Self::Autocomplete => "autocomplete",
        }
    }

    /// Route path, e.g. `/api/geocode`.
    pub fn path(self) -> String {
        format!("/api/{}", self.as_str())
    }

    /// The query parameter the endpoint cannot do without.
    pub fn required_param(self) -> &'static str {
        match self {
            Self::ReverseGeocode => "place_id",
            Self::Geocode => "address",
            Self::Autocomplete => "input",
        }
    }

    /// The name clients are told to send when the required parameter is missing.
    ///
    /// Reverse geocoding has always reported `placeId` here even though the
    /// query parameter is `place_id`; clients match on the message.
    pub fn required_param_label(self) -> &'static str {
        match self {
            Self::ReverseGeocode => "placeId",
            Self::Geocode => "address",
            Self::Autocomplete => "input",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Place-type filters accepted by autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaceType {
    Geocode,
    Address,
    Establishment,
    Regions,
    #[default]
    Cities,
}

impl PlaceType {
    pub const ALL: [PlaceType; 5] = [
        Self::Geocode,
        Self::Address,
        Self::Establishment,
        Self::Regions,
        Self::Cities,
    ];

    /// The provider's spelling, e.g. `(cities)`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Geocode => "geocode",
            Self::Address => "address",
            Self::Establishment => "establishment",
            Self::Regions => "(regions)",
            Self::Cities => "(cities)",
        }
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of [`PlaceType::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlaceType(pub String);

impl FromStr for PlaceType {
    type Err = UnknownPlaceType;

    /// Case-insensitive; `(Cities)` and `(cities)` are the same filter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| UnknownPlaceType(s.to_owned()))
    }
}

/// A validated, normalized request for one of the [`Endpoint`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeQuery {
    ReverseGeocode {
        place_id: String,
    },
    Geocode {
        address: String,
    },
    Autocomplete {
        input: String,
        types: PlaceType,
        session_token: String,
    },
}

impl GeocodeQuery {
    pub fn reverse_geocode(place_id: impl Into<String>) -> Self {
        Self::ReverseGeocode {
            place_id: place_id.into(),
        }
    }

    /// `address` is lowercased.
    pub fn geocode(address: &str) -> Self {
        Self::Geocode {
            address: address.to_lowercase(),
        }
    }

    /// `input` is lowercased.
    pub fn autocomplete(input: &str, types: PlaceType, session_token: impl Into<String>) -> Self {
        Self::Autocomplete {
            input: input.to_lowercase(),
            types,
            session_token: session_token.into(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::ReverseGeocode { .. } => Endpoint::ReverseGeocode,
            Self::Geocode { .. } => Endpoint::Geocode,
            Self::Autocomplete { .. } => Endpoint::Autocomplete,
        }
    }

    /// `<endpoint>:<normalized input>`.
    ///
    /// Autocomplete keys on `input` alone; `types` and the session token do
    /// not partition the cache.
    pub fn cache_key(&self) -> String {
        let subject = match self {
            Self::ReverseGeocode { place_id } => place_id,
            Self::Geocode { address } => address,
            Self::Autocomplete { input, .. } => input,
        };
        format!("{}:{}", self.endpoint(), subject)
    }
}

/// Resolves [`GeocodeQuery`]s through the cache and the provider.
pub struct Geocoder {
    cache: CacheAside,
    provider: Arc<dyn PlacesProvider>,
}

impl Geocoder {
    pub fn new(cache: Arc<dyn Cache>, provider: Arc<dyn PlacesProvider>) -> Self {
        Self::with_cache_aside(CacheAside::new(cache), provider)
    }

    pub fn with_cache_aside(cache: CacheAside, provider: Arc<dyn PlacesProvider>) -> Self {
        Self { cache, provider }
    }

    /// Cached result for `query`, fetching from the provider on a miss.
    ///
    /// # Errors
    ///
    /// Only provider failures are returned; cache trouble is logged and
    /// absorbed by [`CacheAside`].
    pub async fn lookup(&self, query: &GeocodeQuery) -> Result<ResultArray, UpstreamError> {
        let key = query.cache_key();
        self.cache.resolve(&key, || self.fetch(query)).await
    }

    async fn fetch(&self, query: &GeocodeQuery) -> Result<ResultArray, UpstreamError> {
        match query {
            GeocodeQuery::ReverseGeocode { place_id } => self.provider.reverse_geocode(place_id).await,
            GeocodeQuery::Geocode { address } => self.provider.geocode(address).await,
            GeocodeQuery::Autocomplete {
                input,
                types,
                session_token,
            } => {
                self.provider
                    .autocomplete(input, *types, session_token)
                    .await
            }
        }
    }
}
