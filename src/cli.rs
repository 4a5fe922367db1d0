//! The `list` and `show` subcommands. Output goes to any [`Write`] so the
//! binary can hand over stdout.

use crate::blog::{self, Blog};
use crate::config::Source;
use std::fmt;
use std::io::Write;

/// Discovers every post and writes its metadata as one JSON object per line,
/// with the post's ID merged in.
pub async fn list<W: Write>(source: &Source, out: &mut W) -> Result<()> {
    for post in Blog::new(source)?.list().await? {
        serde_json::to_writer(&mut *out, &post)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Fetches the post named by `id` and writes it as pretty-printed JSON.
pub async fn show<W: Write>(source: &Source, id: &str, out: &mut W) -> Result<()> {
    let id: u32 = id
        .parse()
        .map_err(|e| Error::Usage(format!("invalid post ID `{}`: {}", id, e)))?;
    if id == 0 {
        return Err(Error::Usage(String::from("post IDs start at 1")));
    }
    match Blog::new(source)?.post(id, &source.posts_url).await? {
        Some(post) => {
            serde_json::to_writer_pretty(&mut *out, &post)?;
            writeln!(out)?;
            Ok(())
        }
        None => Err(Error::NotFound(id)),
    }
}

/// The result of a subcommand.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed subcommand.
#[derive(Debug)]
pub enum Error {
    /// Returned for arguments the subcommand can't use.
    Usage(String),

    /// Returned by `show` when the post doesn't exist.
    NotFound(u32),

    /// Returned when reading posts fails.
    Blog(blog::Error),

    /// Returned when a post can't be encoded.
    Json(serde_json::Error),

    /// Returned when the output can't be written.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Usage(msg) => msg.fmt(f),
            Error::NotFound(id) => write!(f, "post '{}' not found", id),
            Error::Blog(err) => err.fmt(f),
            Error::Json(err) => write!(f, "encoding post: {}", err),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Usage(_) | Error::NotFound(_) => None,
            Error::Blog(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<blog::Error> for Error {
    fn from(err: blog::Error) -> Error {
        Error::Blog(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
