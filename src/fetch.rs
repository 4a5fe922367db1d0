//! Fetches individual resources from the static host. Each fetch reports one
//! of three things: the resource ([`FetchOutcome::Found`]), its absence
//! ([`FetchOutcome::NotFound`], an HTTP 404), or a transport failure
//! ([`Error`]) naming the resource ID and the underlying cause.

use crate::id::ResourceId;
use crate::path::{Location, PathTemplate};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;
use url::Url;

/// The non-failure result of fetching a single resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome<R> {
    /// The resource exists.
    Found(R),

    /// The host answered 404. This is the end-of-collection signal, not an
    /// error.
    NotFound,
}

impl<R> FetchOutcome<R> {
    pub fn found(self) -> Option<R> {
        match self {
            FetchOutcome::Found(r) => Some(r),
            FetchOutcome::NotFound => None,
        }
    }
}

/// HTTP client for resources laid out under a [`Location`].
pub struct HttpFetcher {
    client: Client,
    location: Location,
}

impl HttpFetcher {
    pub fn new(location: Location) -> Result<HttpFetcher> {
        let client = Client::builder()
            .user_agent(concat!("skald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Client)?;
        Ok(HttpFetcher::with_client(client, location))
    }

    pub fn with_client(client: Client, location: Location) -> HttpFetcher {
        HttpFetcher { client, location }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Fetches the resource at `template` for `id` and parses it as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        template: &PathTemplate,
        id: ResourceId,
    ) -> Result<FetchOutcome<T>> {
        let body = match self.fetch_text(template, id).await? {
            FetchOutcome::Found(body) => body,
            FetchOutcome::NotFound => return Ok(FetchOutcome::NotFound),
        };
        serde_json::from_str(&body)
            .map(FetchOutcome::Found)
            .map_err(|err| Error::Json { id, err })
    }

    /// Fetches the resource at `template` for `id` as text (e.g. Markdown).
    pub async fn fetch_text(
        &self,
        template: &PathTemplate,
        id: ResourceId,
    ) -> Result<FetchOutcome<String>> {
        let response = match self.get(template, id).await? {
            Some(response) => response,
            None => return Ok(FetchOutcome::NotFound),
        };
        response
            .text()
            .await
            .map(FetchOutcome::Found)
            .map_err(|err| Error::Body { id, err })
    }

    // Returns `None` for a 404 and an error for every other non-2xx status.
    async fn get(
        &self,
        template: &PathTemplate,
        id: ResourceId,
    ) -> Result<Option<Response>> {
        let url = self.location.url_for(template, id)?;
        debug!(%id, %url, "fetching resource");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| Error::Initiate { id, err })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%id, %url, "resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Status { id, url, status });
        }
        Ok(Some(response))
    }
}

/// The result of a fallible fetch.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to fetch a resource. Everything but
/// [`Error::MissingId`] and [`Error::Client`] is a transport failure for one
/// specific resource.
#[derive(Debug)]
pub enum Error {
    /// Returned when the caller supplies ID `0`, before any I/O.
    MissingId,

    /// Returned when the HTTP client can't be constructed.
    Client(reqwest::Error),

    /// Returned when the resource URL can't be built.
    Url(url::ParseError),

    /// Returned when the request couldn't be sent (e.g., the host is
    /// unreachable).
    Initiate { id: ResourceId, err: reqwest::Error },

    /// Returned for any non-2xx status other than 404.
    Status {
        id: ResourceId,
        url: Url,
        status: StatusCode,
    },

    /// Returned when the response body can't be read.
    Body { id: ResourceId, err: reqwest::Error },

    /// Returned when the response body isn't valid JSON for the expected
    /// type.
    Json { id: ResourceId, err: serde_json::Error },
}

impl Error {
    /// The resource the failure belongs to, if any.
    pub fn id(&self) -> Option<ResourceId> {
        match self {
            Error::MissingId | Error::Client(_) | Error::Url(_) => None,
            Error::Initiate { id, .. }
            | Error::Status { id, .. }
            | Error::Body { id, .. }
            | Error::Json { id, .. } => Some(*id),
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingId => write!(f, "a non-zero resource ID is required"),
            Error::Client(err) => write!(f, "building HTTP client: {}", err),
            Error::Url(err) => write!(f, "building resource URL: {}", err),
            Error::Initiate { id, err } => write!(
                f,
                "Failed to initiate retrieval of resource '{}': {}",
                id, err
            ),
            Error::Status { id, url, status } => write!(
                f,
                "Failed to retrieve resource '{}' from {}: HTTP status code {}",
                id,
                url,
                status.as_u16()
            ),
            Error::Body { id, err } => {
                write!(f, "Failed to read resource '{}': {}", id, err)
            }
            Error::Json { id, err } => {
                write!(f, "Failed to parse resource '{}' as JSON: {}", id, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingId => None,
            Error::Client(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::Initiate { err, .. } => Some(err),
            Error::Status { .. } => None,
            Error::Body { err, .. } => Some(err),
            Error::Json { err, .. } => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}
