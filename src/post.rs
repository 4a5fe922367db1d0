//! Defines [`PostMetadata`], the JSON record the static host serves for each
//! post, and [`Post`], a fully rendered post. See [`Post::to_value`] and
//! [`Post::summarize`] for how posts are converted into template values.

use crate::id::ResourceId;
use crate::markdown;
use chrono::NaiveDate;
use gtmpl::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// The metadata payload of a post. The payload does not include the post's
/// ID; see [`crate::discover::Discovered`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PostMetadata {
    /// The title of the post.
    pub title: String,

    /// The date of the post (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// A hand-written summary. Takes precedence over the `<!-- more -->`
    /// fold when rendering index pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// The Markdown body for deployments that serve a single file per post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A post with its body rendered to HTML.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Post {
    pub id: ResourceId,

    pub title: String,

    /// The date as displayed, formatted with the configured date format.
    pub date: Option<String>,

    pub tags: Vec<String>,

    /// The full HTML body.
    pub body: String,

    /// The HTML shown on index pages.
    pub summary: String,

    /// Whether `summary` is shorter than `body`.
    pub summarized: bool,

    /// The URL of the post's page on the generated site.
    pub url: Url,
}

impl Post {
    /// Renders `markdown` and combines it with `metadata`. `posts_url` is the
    /// base URL for post pages and should end in a trailing slash; the post
    /// lands at `{posts_url}/{id}.html`.
    pub fn render(
        id: ResourceId,
        metadata: PostMetadata,
        markdown: &str,
        posts_url: &Url,
        date_format: &str,
    ) -> Result<Post, url::ParseError> {
        let mut body = String::new();
        markdown::to_html(&mut body, markdown);

        let (summary, summarized) = match &metadata.summary {
            Some(summary) => {
                let mut html = String::new();
                markdown::to_html(&mut html, summary);
                (html, true)
            }
            None => {
                let (summary, summarized) = markdown::summary(&body);
                (summary.to_owned(), summarized)
            }
        };

        Ok(Post {
            id,
            url: posts_url.join(&format!("{}.html", id))?,
            title: metadata.title,
            date: metadata.date.map(|d| display_date(&d, date_format)),
            tags: metadata.tags,
            body,
            summary,
            summarized,
        })
    }

    /// Converts the post into a [`Value`] for the post template, with fields
    /// `id`, `title`, `date`, `tags`, `url`, and `body`.
    pub fn to_value(&self) -> Value {
        let mut m = self.common_fields();
        m.insert("body".to_owned(), Value::String(self.body.clone()));
        Value::Object(m)
    }

    /// Converts the post into a [`Value`] for index pages. Same as
    /// [`Post::to_value`] except `body` is replaced by `summary` and
    /// `summarized`.
    pub fn summarize(&self) -> Value {
        let mut m = self.common_fields();
        m.insert("summary".to_owned(), Value::String(self.summary.clone()));
        m.insert("summarized".to_owned(), Value::Bool(self.summarized));
        Value::Object(m)
    }

    fn common_fields(&self) -> HashMap<String, Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), Value::from(self.id.get()));
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert(
            "date".to_owned(),
            match &self.date {
                Some(date) => Value::String(date.clone()),
                None => Value::Nil,
            },
        );
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(|t| Value::String(t.clone())).collect()),
        );
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m
    }
}

// Dates that don't parse as `YYYY-MM-DD` are shown as written.
fn display_date(date: &str, format: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format(format).to_string(),
        Err(_) => date.to_owned(),
    }
}
