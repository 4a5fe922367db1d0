//! Resolves where a resource lives on the static host: a [`PathTemplate`]
//! names the per-resource path (e.g. `posts/{id}/metadata.json`), and
//! [`PrefixRules`] pick the deployment's path prefix from the host name (e.g.
//! `""` on a development host, `/blog` on a public one).

use crate::id::ResourceId;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use url::{ParseError, Url};

const PLACEHOLDER: &str = "{id}";

/// A resource path with exactly one `{id}` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTemplate {
    /// Text before the placeholder.
    head: String,

    /// Text after the placeholder.
    tail: String,
}

impl PathTemplate {
    pub fn render(&self, id: ResourceId) -> String {
        format!("{}{}{}", self.head, id, self.tail)
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(PLACEHOLDER) {
            None => Err(TemplateError::MissingPlaceholder(s.to_owned())),
            Some((_, tail)) if tail.contains(PLACEHOLDER) => {
                Err(TemplateError::RepeatedPlaceholder(s.to_owned()))
            }
            Some((head, tail)) => Ok(PathTemplate {
                head: head.trim_start_matches('/').to_owned(),
                tail: tail.to_owned(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D>(deserializer: D) -> Result<PathTemplate, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<PathTemplate>()
            .map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.head, PLACEHOLDER, self.tail)
    }
}

/// Maps host names onto the path prefix under which the deployment serves
/// its resources.
#[derive(Clone, Debug, Default)]
pub struct PrefixRules {
    /// Prefix per lowercased host name, e.g. `someone.github.io: /blog`.
    hosts: HashMap<String, String>,

    /// Prefix for any host not listed in `hosts`.
    default: String,
}

impl PrefixRules {
    /// Host names are case-insensitive, so they're lowercased here to match
    /// what [`Url::host_str`] reports.
    pub fn new(
        hosts: impl IntoIterator<Item = (String, String)>,
        default: String,
    ) -> PrefixRules {
        PrefixRules {
            hosts: hosts
                .into_iter()
                .map(|(host, prefix)| (host.to_ascii_lowercase(), prefix))
                .collect(),
            default,
        }
    }

    pub fn resolve(&self, host: &str) -> &str {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .unwrap_or(&self.default)
    }
}

/// The base URL of a deployment together with its resolved prefix.
#[derive(Clone, Debug)]
pub struct Location {
    base: Url,
    prefix: String,
}

impl Location {
    /// Resolves the prefix for `base`'s host against `rules`. URLs without a
    /// host (e.g. `file:`) get the default prefix.
    pub fn new(mut base: Url, rules: &PrefixRules) -> Location {
        // `Url::join` replaces the last path segment of a base without a
        // trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let prefix = match base.host_str() {
            Some(host) => rules.resolve(host),
            None => rules.default.as_str(),
        }
        .trim_matches('/')
        .to_owned();
        Location { base, prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Builds `{base}/{prefix}/{template(id)}`, keeping any path on `base`.
    pub fn url_for(
        &self,
        template: &PathTemplate,
        id: ResourceId,
    ) -> Result<Url, ParseError> {
        let path = match self.prefix.is_empty() {
            true => template.render(id),
            false => format!("{}/{}", self.prefix, template.render(id)),
        };
        self.base.join(&path)
    }
}

/// Represents an invalid [`PathTemplate`].
#[derive(Debug)]
pub enum TemplateError {
    /// Returned when the template has no `{id}` placeholder.
    MissingPlaceholder(String),

    /// Returned when the template has more than one `{id}` placeholder.
    RepeatedPlaceholder(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TemplateError::MissingPlaceholder(t) => {
                write!(f, "path template `{}` has no `{}` placeholder", t, PLACEHOLDER)
            }
            TemplateError::RepeatedPlaceholder(t) => write!(
                f,
                "path template `{}` has more than one `{}` placeholder",
                t, PLACEHOLDER
            ),
        }
    }
}

impl std::error::Error for TemplateError {}
