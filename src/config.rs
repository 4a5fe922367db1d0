//! Loads a project's configuration from `skald.yaml` and its theme's
//! `theme/theme.yaml`.

use crate::discover::{FailurePolicy, Settings, StopRule};
use crate::path::{PathTemplate, PrefixRules};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

const PROJECT_FILE: &str = "skald.yaml";

#[derive(Deserialize)]
struct BatchSize(usize);
impl Default for BatchSize {
    fn default() -> Self {
        BatchSize(15)
    }
}

#[derive(Deserialize)]
struct MaxId(u32);
impl Default for MaxId {
    fn default() -> Self {
        MaxId(1000)
    }
}

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct DateFormat(String);
impl Default for DateFormat {
    fn default() -> Self {
        DateFormat(String::from("%B %-d, %Y"))
    }
}

#[derive(Deserialize)]
struct Project {
    /// The static host serving the post documents.
    source_url: Url,

    /// Where the generated site will be served.
    site_url: Url,

    /// Path prefix per host name of `source_url`.
    #[serde(default)]
    prefixes: HashMap<String, String>,

    /// Path prefix for hosts missing from `prefixes`.
    #[serde(default)]
    default_prefix: String,

    metadata_path: PathTemplate,

    #[serde(default)]
    content_path: Option<PathTemplate>,

    #[serde(default)]
    batch_size: BatchSize,

    #[serde(default)]
    max_id: MaxId,

    #[serde(default)]
    stop_rule: StopRule,

    #[serde(default)]
    on_fetch_error: FailurePolicy,

    #[serde(default)]
    index_page_size: PageSize,

    #[serde(default)]
    date_format: DateFormat,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
}

/// Everything needed to read posts from the static host. This is all `list`
/// and `show` need; it doesn't require a theme.
pub struct Source {
    pub source_url: Url,
    pub prefixes: PrefixRules,
    pub metadata_path: PathTemplate,
    pub content_path: Option<PathTemplate>,
    pub discovery: Settings,
    pub date_format: String,

    /// The base URL of the generated post pages, for post links.
    pub posts_url: Url,
}

impl Source {
    /// Searches `dir` and its ancestors for a `skald.yaml` file and loads it.
    pub fn from_directory(dir: &Path) -> Result<Source> {
        let project: Project = load_yaml(&find_project(dir)?)?;
        let site_url = with_trailing_slash(project.site_url.clone());
        Source::new(project, &site_url)
    }

    fn new(project: Project, site_url: &Url) -> Result<Source> {
        Ok(Source {
            source_url: project.source_url,
            prefixes: PrefixRules::new(project.prefixes, project.default_prefix),
            metadata_path: project.metadata_path,
            content_path: project.content_path,
            discovery: Settings {
                batch_size: project.batch_size.0,
                max_id: project.max_id.0,
                stop_rule: project.stop_rule,
                on_fetch_error: project.on_fetch_error,
            },
            date_format: project.date_format.0,
            posts_url: site_url.join("posts/")?,
        })
    }
}

/// Everything needed to build the site: the [`Source`] plus the theme and
/// output layout.
pub struct Config {
    pub source: Source,
    pub home_page: Url,
    pub index_url: Url,
    pub static_url: Url,
    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub index_page_size: usize,
    pub static_source_directory: PathBuf,
    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub static_output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its ancestors for a `skald.yaml` file and loads it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        Config::from_project_file(&find_project(dir)?, output_directory)
    }

    /// Loads the project file at `path` and the theme file at
    /// `{project_root}/theme/theme.yaml`.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = load_yaml(path)?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));
        let theme_dir = project_root.join("theme");
        let theme: Theme = load_yaml(&theme_dir.join("theme.yaml"))?;

        let site_url = with_trailing_slash(project.site_url.clone());
        let index_page_size = project.index_page_size.0;
        Ok(Config {
            source: Source::new(project, &site_url)?,
            index_url: site_url.join("pages/")?,
            static_url: site_url.join("static/")?,
            home_page: site_url,
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            posts_template: theme
                .posts_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            index_page_size,
            static_source_directory: theme_dir.join("static"),
            root_output_directory: output_directory.to_owned(),
            index_output_directory: output_directory.join("pages"),
            posts_output_directory: output_directory.join("posts"),
            static_output_directory: output_directory.join("static"),
        })
    }
}

fn find_project(dir: &Path) -> Result<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(PROJECT_FILE))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::ProjectNotFound(dir.to_owned()))
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_yaml::from_reader(file).map_err(|err| Error::DeserializeYaml {
        path: path.to_owned(),
        err,
    })
}

// `Url::join` treats the last segment of a base without a trailing slash as
// a file name and drops it.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no `skald.yaml` exists in the directory or any parent.
    ProjectNotFound(PathBuf),

    /// Returned when a configuration file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a configuration file isn't valid.
    DeserializeYaml { path: PathBuf, err: serde_yaml::Error },

    /// Returned when a site URL can't be derived.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectNotFound(dir) => write!(
                f,
                "Could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "Loading configuration `{}`: {}", path.display(), err)
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectNotFound(_) => None,
            Error::Open { err, .. } => Some(err),
            Error::DeserializeYaml { err, .. } => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
