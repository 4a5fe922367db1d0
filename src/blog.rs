//! The blog client: discovers post metadata on the static host and fetches
//! post content, producing rendered [`Post`]s.

use crate::config::Source;
use crate::discover::{self, discover_all, Discovered, Settings};
use crate::fetch::{self, FetchOutcome, HttpFetcher};
use crate::id::ResourceId;
use crate::path::{Location, PathTemplate};
use crate::post::{Post, PostMetadata};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use tracing::{debug, info};
use url::Url;

/// Reads posts from a static host. Every post has a metadata document at
/// `metadata`; its Markdown body is either a separate document at `content`
/// or inlined in the metadata's `content` field.
pub struct Blog {
    pub fetcher: HttpFetcher,
    pub metadata: PathTemplate,
    pub content: Option<PathTemplate>,
    pub settings: Settings,

    /// The `chrono` format for displayed dates.
    pub date_format: String,
}

impl Blog {
    /// Creates the client described by a project's [`Source`].
    pub fn new(source: &Source) -> Result<Blog> {
        let location = Location::new(source.source_url.clone(), &source.prefixes);
        info!(
            source = %source.source_url,
            prefix = location.prefix(),
            "reading posts"
        );
        Ok(Blog {
            fetcher: HttpFetcher::new(location)?,
            metadata: source.metadata_path.clone(),
            content: source.content_path.clone(),
            settings: source.discovery.clone(),
            date_format: source.date_format.clone(),
        })
    }

    /// Discovers the metadata of every post, in ID order.
    pub async fn list(&self) -> Result<Vec<Discovered<PostMetadata>>> {
        let (fetcher, template) = (&self.fetcher, &self.metadata);
        Ok(discover_all(
            move |id| fetcher.fetch_json::<PostMetadata>(template, id),
            &self.settings,
        )
        .await?)
    }

    /// Fetches and renders a single post, or `None` if it doesn't exist.
    /// Fails with [`fetch::Error::MissingId`] for ID `0` before any request is
    /// made.
    pub async fn post(&self, id: u32, posts_url: &Url) -> Result<Option<Post>> {
        let id = ResourceId::new(id)?;
        match self
            .fetcher
            .fetch_json::<PostMetadata>(&self.metadata, id)
            .await?
        {
            FetchOutcome::Found(metadata) => self
                .render(Discovered { id, resource: metadata }, posts_url)
                .await
                .map(Some),
            FetchOutcome::NotFound => Ok(None),
        }
    }

    /// Discovers every post and renders it. Content is fetched with at most
    /// `settings.batch_size` requests in flight; the result keeps ID order.
    pub async fn posts(&self, posts_url: &Url) -> Result<Vec<Post>> {
        let listed = self.list().await?;
        stream::iter(listed)
            .map(|discovered| self.render(discovered, posts_url))
            .buffered(self.settings.batch_size.max(1))
            .try_collect()
            .await
    }

    async fn render(
        &self,
        discovered: Discovered<PostMetadata>,
        posts_url: &Url,
    ) -> Result<Post> {
        let Discovered { id, mut resource } = discovered;
        let markdown = match &self.content {
            Some(template) => match self.fetcher.fetch_text(template, id).await? {
                FetchOutcome::Found(markdown) => markdown,
                FetchOutcome::NotFound => return Err(Error::MissingContent(id)),
            },
            None => resource.content.take().unwrap_or_default(),
        };
        debug!(%id, bytes = markdown.len(), "rendering post");
        Ok(Post::render(id, resource, &markdown, posts_url, &self.date_format)?)
    }
}

/// The result of a blog operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure reading posts from the static host.
#[derive(Debug)]
pub enum Error {
    /// Returned when discovery fails.
    Discover(discover::Error),

    /// Returned when a single fetch fails.
    Fetch(fetch::Error),

    /// Returned when a post's metadata exists but its content doesn't.
    MissingContent(ResourceId),

    /// Returned when a post's page URL can't be built.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Discover(err) => err.fmt(f),
            Error::Fetch(err) => err.fmt(f),
            Error::MissingContent(id) => {
                write!(f, "post '{}' has metadata but no content", id)
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Discover(err) => Some(err),
            Error::Fetch(err) => Some(err),
            Error::MissingContent(_) => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<discover::Error> for Error {
    fn from(err: discover::Error) -> Error {
        Error::Discover(err)
    }
}

impl From<fetch::Error> for Error {
    fn from(err: fetch::Error) -> Error {
        Error::Fetch(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
