//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: reading the posts from the
//! static host ([`crate::blog`]), rendering index and post pages
//! ([`crate::write`]), and copying the theme's static assets into the output
//! directory.

use crate::blog::{Blog, Error as BlogError};
use crate::config::Config;
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Builds the site from a [`Config`] object. This calls into [`Blog::posts`]
/// and [`Writer::write_posts`] which do the heavy-lifting. This function also
/// copies the static assets from the theme to the output directory.
pub async fn build_site(config: Config) -> Result<()> {
    // Parse the templates first so a broken theme fails before any requests
    // are made.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;

    let posts = Blog::new(&config.source)?
        .posts(&config.source.posts_url)
        .await?;

    // Blow away the old output directories so we don't have any collisions.
    // The root output directory itself is left alone in case the user passes
    // the wrong directory.
    rmdir(&config.posts_output_directory)?;
    rmdir(&config.index_output_directory)?;
    rmdir(&config.static_output_directory)?;

    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        index_base_url: &config.index_url,
        index_output_directory: &config.index_output_directory,
        posts_output_directory: &config.posts_output_directory,
        index_page_size: config.index_page_size,
        home_page: &config.home_page,
        static_url: &config.static_url,
    };
    writer.write_posts(&posts)?;

    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    }

    // copy /pages/index.html to /index.html
    std::fs::copy(
        config.index_output_directory.join("index.html"),
        config.root_output_directory.join("index.html"),
    )?;

    info!(
        posts = posts.len(),
        output = %config.root_output_directory.display(),
        "site built"
    );
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a single template.
fn parse_template<P: AsRef<Path>>(
    template_files: impl Iterator<Item = P>,
) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during reading posts,
/// writing, cleaning output directories, parsing template files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading posts from the static host.
    Blog(BlogError),

    /// Returned for errors writing [`crate::post::Post`]s to disk as HTML
    /// files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Blog(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing templates: {}", err),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Blog(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { err, .. } => Some(err),
            Error::OpenTemplateFile { err, .. } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<BlogError> for Error {
    /// Converts [`BlogError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: BlogError) -> Error {
        Error::Blog(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_project(dir: &Path, source_url: &str) {
        fs::write(
            dir.join("skald.yaml"),
            format!(
                "source_url: {}\nsite_url: https://example.org/\nmetadata_path: posts/{{id}}.json\nindex_page_size: 1\n",
                source_url
            ),
        )
        .unwrap();
        let theme = dir.join("theme");
        fs::create_dir_all(theme.join("static")).unwrap();
        fs::write(
            theme.join("theme.yaml"),
            "index_template: [index.html]\nposts_template: [post.html]\n",
        )
        .unwrap();
        fs::write(
            theme.join("index.html"),
            "{{range .item}}<a href=\"{{.url}}\">{{.title}}</a>{{end}}",
        )
        .unwrap();
        fs::write(theme.join("post.html"), "<h2>{{.item.title}}</h2>{{.item.body}}").unwrap();
        fs::write(theme.join("static").join("style.css"), "body {}").unwrap();
    }

    #[tokio::test]
    async fn test_build_site() {
        let server = MockServer::start().await;
        for (id, title) in [(1, "One"), (2, "Two")] {
            Mock::given(method("GET"))
                .and(path(format!("/posts/{}.json", id)))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    r#"{{"title":"{}","content":"Hello from {}"}}"#,
                    title, id
                )))
                .mount(&server)
                .await;
        }

        let project = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_project(project.path(), &server.uri());

        let config = Config::from_directory(project.path(), out.path()).unwrap();
        build_site(config).await.unwrap();

        let read = |p: &str| fs::read_to_string(out.path().join(p)).unwrap();
        assert_eq!(
            "<a href=\"https://example.org/posts/1.html\">One</a>",
            read("index.html")
        );
        assert_eq!(read("index.html"), read("pages/index.html"));
        assert!(read("pages/1.html").contains(">Two<"));
        assert!(read("posts/2.html").contains("Hello from 2"));
        assert_eq!("body {}", read("static/style.css"));
    }

    #[tokio::test]
    async fn test_broken_theme_fails_before_fetching() {
        let server = MockServer::start().await;
        let project = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_project(project.path(), &server.uri());
        fs::remove_file(project.path().join("theme").join("post.html")).unwrap();

        let config = Config::from_directory(project.path(), out.path()).unwrap();
        let err = build_site(config).await.unwrap_err();
        assert!(matches!(err, Error::OpenTemplateFile { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
